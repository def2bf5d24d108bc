use tracing_subscriber::EnvFilter;

/// Install the process-wide tracing subscriber.
///
/// Called once at the top of every binary; later calls are no-ops so tests
/// and embedded use cannot panic on double-initialisation. `component` is
/// attached to the root span of the process so every line carries the
/// component identity the way the original `[name]` prefixes did.
pub fn init(component: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
    if result.is_ok() {
        tracing::info!(component, "logging initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_init_is_harmless() {
        init("test");
        init("test-again");
    }
}
