//! Log setup for the command line
//!
//! The library only emits `tracing` events. The binary installs a fmt
//! subscriber writing to stderr so stdout stays machine-readable.

use tracing_subscriber::EnvFilter;

/// Filter for a `-v` count. `RUST_LOG` wins when set.
pub fn filter_for(verbose: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(verbose)))
}

fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

pub fn init(verbose: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
