//! Logging setup
//!
//! `RUST_LOG` wins when set; otherwise the level comes from configuration.
//! Output goes to stdout, or to a daily-rolling file when `log_dir` exists.

use std::path::Path;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

const LOG_FILE_PREFIX: &str = "loyalty-server";

/// Initialize the global subscriber; call once at startup
pub fn init_logger(log_level: &str, json: bool, log_dir: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(log_level)));

    let writer = match log_dir.map(Path::new).filter(|dir| dir.is_dir()) {
        Some(dir) => BoxMakeWriter::new(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX)),
        None => BoxMakeWriter::new(std::io::stdout),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(writer);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn default_directives(log_level: &str) -> String {
    format!("{log_level},tower_http=info,sqlx=warn")
}
