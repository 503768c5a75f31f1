use tracing_subscriber::EnvFilter;

/// `RUST_LOG`, when set, wins over the filter passed in.
pub fn set_log(default_filter: String) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(true)
        .init();
}
