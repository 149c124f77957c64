use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over `default_level`.
///
/// Records from the `log` crate (actix-web's request logger) are forwarded
/// to the same subscriber.
pub fn init(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(true)
        .with_file(false)
        .with_writer(std::io::stderr)
        .try_init();
    if let Err(e) = result {
        eprintln!("fail to setup logging: {e}");
    }
}
