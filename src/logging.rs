//! Log output setup.

use tracing_subscriber::EnvFilter;

/// Default filter directive for a `-v`/`-q` count.
pub fn level_for(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the CLI verbosity.
pub fn init(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pmaker={}", level_for(verbose, quiet))));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose > 1)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init();
}
