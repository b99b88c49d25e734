// Path: crates/telemetry/src/init.rs
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

/// Output encoding of the log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line (default; what the log shipper expects).
    Json,
    /// Human-readable lines for local development.
    Pretty,
}

impl LogFormat {
    /// Reads `AETHER_LOG_FORMAT` (`json` | `pretty`), defaulting to JSON.
    pub fn from_env() -> Self {
        match std::env::var("AETHER_LOG_FORMAT").as_deref() {
            Ok("pretty") | Ok("text") => Self::Pretty,
            _ => Self::Json,
        }
    }
}

/// Initializes the global `tracing` subscriber for structured logging.
///
/// The filter is taken from `RUST_LOG` and defaults to `info`. Records emitted
/// through the `log` facade are forwarded as well.
pub fn init_tracing() -> Result<(), anyhow::Error> {
    init_tracing_with(LogFormat::from_env())
}

/// Same as [`init_tracing`] with an explicit output format.
pub fn init_tracing_with(format: LogFormat) -> Result<(), anyhow::Error> {
    let fmt_layer = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = Registry::default().with(filter).with(fmt_layer);
    tracing_log::LogTracer::init()?;
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
