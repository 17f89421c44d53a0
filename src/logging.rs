use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber for the crate's `tracing` output.
///
/// Without `debug` the level is pinned to `info`. With `debug` it starts
/// at `debug` and `RUST_LOG` may override it.
pub fn init(debug: bool) {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    };

    // a subscriber installed by the host application wins
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
