//! Console logging for applications embedding the engine.
//!
//! The engine itself only emits `tracing` events; installing a subscriber is
//! left to the host, which can use [`setup_logging`] or its own.

use anyhow::Context;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global subscriber writing to stdout, with warnings and errors
/// also on stderr.
///
/// `base_level` is an `EnvFilter` directive (e.g. `"info"` or
/// `"antighost=debug"`); `RUST_LOG` takes precedence when set.
pub fn setup_logging(base_level: &str) -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(base_level)
            .with_context(|| format!("Invalid log filter: {base_level}"))?,
    };

    let console_writer = std::io::stdout.and(std::io::stderr.with_max_level(Level::WARN));
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_writer(console_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init()
        .context("Logger initialization failed")?;
    Ok(())
}
