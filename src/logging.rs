use tracing_subscriber::EnvFilter;

/// Filter directive for shell diagnostics, e.g. `MICROSHELL_LOG=debug`.
pub const LOG_ENV: &str = "MICROSHELL_LOG";

/// Installs a stderr subscriber. Logging stays off unless `MICROSHELL_LOG`
/// asks for it, so error output is only the shell's own diagnostics.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("off"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
