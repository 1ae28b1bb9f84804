use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use std::{
    fs,
    io::{stderr, IsTerminal},
    path::PathBuf,
};
use tracing_appender::rolling;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, format::debug_fn},
    prelude::*,
    registry, EnvFilter,
};

use crate::settings::consts::{
    APP_NAME, APP_ORGANIZATION, APP_QUALIFIER, DEFAULT_LOG_LEVEL, LOG_FILE, VERBOSE_LOG_LEVEL,
};

/// Console logs go to stderr, filtered by `RUST_LOG` (or `--verbose`), while every event
/// down to TRACE is appended as JSON to `kiosk.log` in the platform data directory.
pub fn init_logger(verbose: bool) -> Result<()> {
    let directory = log_directory()?;
    fs::create_dir_all(&directory)?;

    let file_appender = rolling::never(&directory, LOG_FILE);

    // Only the message is printed on the console, structured fields end up in the file.
    let console_layer = fmt::layer()
        .with_writer(stderr)
        .with_ansi(IsTerminal::is_terminal(&stderr()))
        .with_level(true)
        .with_target(verbose)
        .without_time()
        .compact()
        .fmt_fields(debug_fn(|writer, field, value| {
            if field.name() == "message" {
                write!(writer, "{:?}", value)?;
            }
            Ok(())
        }))
        .with_filter(console_filter(verbose));

    let json_layer = fmt::layer()
        .json()
        .with_writer(file_appender)
        .with_target(true)
        .with_level(true)
        .flatten_event(true)
        .with_filter(LevelFilter::TRACE);

    registry().with(console_layer).with(json_layer).init();

    Ok(())
}

fn log_directory() -> Result<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| anyhow!("Could not determine project directories"))
}

fn console_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            VERBOSE_LOG_LEVEL
        } else {
            DEFAULT_LOG_LEVEL
        })
    })
}
