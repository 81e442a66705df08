//! Logging initialisation via tracing-subscriber.
//!
//! Call [`init`] once at startup with the resolved `[server]` settings.
//! Filter precedence is `--log-level` > `RUST_LOG` > `server.log_level`.

use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::config::ServerConfig;
use crate::error::AppError;

/// Initialise the global tracing subscriber for the service.
///
/// `cli_level` is the already-validated `--log-level` / `-v` value, if any.
/// Logs go to stderr, or are appended without ANSI colours to
/// `server.log_file` when one is configured.
pub fn init(server: &ServerConfig, cli_level: Option<&str>) -> Result<(), AppError> {
    let filter = resolve_filter(&server.log_level, cli_level)?;
    let log_file = server.log_file.as_deref();
    let writer = make_writer(log_file)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(log_file.is_none())
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))?;

    Ok(())
}

/// Level string the subscriber will start from, for the startup log line.
pub fn effective_level<'a>(server: &'a ServerConfig, cli_level: Option<&'a str>) -> &'a str {
    cli_level.unwrap_or(server.log_level.as_str())
}

fn resolve_filter(configured: &str, cli_level: Option<&str>) -> Result<EnvFilter, AppError> {
    match cli_level {
        Some(level) => EnvFilter::try_new(level)
            .map_err(|e| AppError::Logger(format!("invalid --log-level '{level}': {e}"))),
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(configured))
            .map_err(|e| {
                AppError::Logger(format!("invalid server.log_level '{configured}': {e}"))
            }),
    }
}

fn make_writer(log_file: Option<&Path>) -> Result<BoxMakeWriter, AppError> {
    let Some(path) = log_file else {
        return Ok(BoxMakeWriter::new(std::io::stderr));
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AppError::Logger(format!("failed to open log file '{}': {e}", path.display())))?;
    Ok(BoxMakeWriter::new(file))
}

/// Validate a `--log-level` value before init.
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}
