use super::{config::GateConfig, provider::ProviderClient, session::SessionCodec};

/// Process-wide state shared by every request. Read-only after startup.
#[derive(Debug)]
pub struct GateState {
    config: GateConfig,
    codec: SessionCodec,
    provider: ProviderClient,
}

impl GateState {
    #[must_use]
    pub fn new(config: GateConfig, codec: SessionCodec, provider: ProviderClient) -> Self {
        Self {
            config,
            codec,
            provider,
        }
    }

    #[must_use]
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    #[must_use]
    pub fn codec(&self) -> &SessionCodec {
        &self.codec
    }

    #[must_use]
    pub fn provider(&self) -> &ProviderClient {
        &self.provider
    }
}
