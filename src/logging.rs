//! Structured, leveled log initialization. Replaces ad hoc `println!`/
//! `eprintln!` diagnostics with `tracing` spans the harness and engine emit
//! via `info!`/`warn!`/`error!`.

/// Initializes a global `tracing` subscriber reading its filter from
/// `RUST_LOG` (defaulting to `info` when unset), writing to stderr so
/// stdout stays free for any machine-readable output a subcommand prints.
pub fn init() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}
