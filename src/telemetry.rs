use tracing_subscriber::{fmt, EnvFilter};

/// Installs the process-wide log subscriber. `RUST_LOG` wins when set.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
