use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Installs a global `tracing` subscriber printing to stderr.
///
/// Verbosity is taken from `RUST_LOG` and defaults to `lazydag=info`, which
/// shows a span per executed task. `lazydag=debug` adds task registration and
/// `lazydag=trace` adds every request answered from a memo.
///
/// # Errors
/// Fails if a global subscriber has already been set.
pub fn init_logging() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lazydag=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}
