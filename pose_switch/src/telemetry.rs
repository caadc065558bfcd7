use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_DIRECTIVES: &str = "pose_switch=info,camera_runner=info,ort=warn";

/// Installs the global tracing subscriber.
///
/// `RUST_LOG`, when set, replaces the default directives entirely; `LOG_FORMAT=json`
/// switches to JSON lines.
pub fn init() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = env_filter(std::env::var("RUST_LOG").ok().as_deref());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false).with_thread_ids(false))
            .with(env_filter)
            .init();
    }
}

/// Builds the filter from `RUST_LOG`, falling back to the defaults when it is unset,
/// blank or unparsable.
fn env_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}
