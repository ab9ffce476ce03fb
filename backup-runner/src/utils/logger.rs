//! Log subscriber setup.

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. A non-empty `RUST_LOG` overrides `level`.
pub fn init(level: &str) -> anyhow::Result<()> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::fmt()
        .with_env_filter(filter_for(env.as_deref(), level))
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {}", e))
}

/// Unparseable directives fall through to the next source, ending at `info`.
fn filter_for(env: Option<&str>, level: &str) -> EnvFilter {
    env.filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}
