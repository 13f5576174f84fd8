use clap::Command;
use staticgate::staticgate::config::generate_cookie_key;

// Prints a fresh pair of cookie keys in env-file format.
fn main() {
    Command::new("generate-secrets")
        .about("Generate random cookie keys for staticgate")
        .version(env!("CARGO_PKG_VERSION"))
        .get_matches();

    println!("STATICGATE_COOKIE_KEY=\"{}\"", generate_cookie_key());
    println!("STATICGATE_COOKIE_FALLBACK_KEY=\"{}\"", generate_cookie_key());
}
