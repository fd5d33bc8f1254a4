use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when RUST_LOG is unset
pub const DEFAULT_FILTER: &str = "info,wxwatch=debug";

/// Initialize logging.
/// - JSON logs, one event per line
/// - RUST_LOG respected; default to "info,wxwatch=debug"
pub fn init(service_name: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init();

    match installed {
        Ok(()) => tracing::info!(service = %service_name, "Logging initialized"),
        // a subscriber was already set (tests, embedding)
        Err(_) => tracing::debug!(service = %service_name, "Logging already initialized"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_does_not_panic() {
        init("wxwatch-test");
        init("wxwatch-test");
    }

    #[test]
    fn default_filter_parses() {
        assert!(DEFAULT_FILTER.parse::<EnvFilter>().is_ok());
    }
}
