use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "WORLDKEEPER_LOG";

/// Run records are already echoed to the terminal, so their `tracing`
/// mirror stays off unless the filter asks for it.
const DEFAULT_DIRECTIVE: &str = "warn,worldkeeper::run=off";

/// Installs the stderr diagnostics subscriber, filtered by `WORLDKEEPER_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(resolve_filter(std::env::var(LOG_ENV).ok().as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub(crate) fn resolve_filter(directive: Option<&str>) -> EnvFilter {
    match directive.map(str::trim).filter(|value| !value.is_empty()) {
        Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|err| {
            eprintln!("invalid {LOG_ENV} directive ({err}); defaulting to warn");
            EnvFilter::new(DEFAULT_DIRECTIVE)
        }),
        None => EnvFilter::new(DEFAULT_DIRECTIVE),
    }
}
