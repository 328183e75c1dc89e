use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` overrides the flags.
pub fn init(debug: bool, ddebug: bool) {
    let default_level = if ddebug {
        "trace"
    } else if debug {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}
