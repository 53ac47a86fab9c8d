use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// CloudWatch stamps each line already.
    Lambda,
    Server,
}

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init_tracing(target: LogTarget) {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter());
    let result = match target {
        LogTarget::Lambda => builder.with_target(false).without_time().try_init(),
        LogTarget::Server => builder.try_init(),
    };

    if let Err(error) = result {
        eprintln!("tracing subscriber already installed: {error}");
    }
}
