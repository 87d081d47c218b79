use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "SPEECH_LOG";
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Installs the global fmt subscriber. `directive` is the `SPEECH_LOG` value
/// carried by `Settings`, so `.env` has been read by the time this runs.
/// A second call is a no-op.
pub fn init(directive: &str) {
    let _ = tracing_subscriber::registry()
        .with(filter_for(directive))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}

/// Unparseable directives fall back to `info`.
pub fn filter_for(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}
