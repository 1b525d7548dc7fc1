use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber.
///
/// Defaults to `info`, or `warn` while the terminal UI owns the screen.
/// With `verbose` the level drops to `debug` and `RUST_LOG` may override it;
/// otherwise `RUST_LOG` is ignored.
pub fn init(verbose: bool, interactive: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new(default_level(interactive))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn default_level(interactive: bool) -> &'static str {
    if interactive {
        "warn"
    } else {
        "info"
    }
}
