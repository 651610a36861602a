//! Diagnostic logging.
//!
//! Console output goes through the `info!`/`warning!` macros. Everything the
//! core wants to leave behind for later inspection (refresh attempts, fallback
//! decisions, swallowed enqueue failures) goes through the `log` facade and
//! ends up in `<config dir>/spotpilot.log`.

use std::path::{Path, PathBuf};

use crate::Res;

pub fn log_path(config_dir: &Path) -> PathBuf {
    config_dir.join("spotpilot.log")
}

/// Routes `log` records into the log file inside `config_dir`.
///
/// `verbose` lowers the level filter from `Info` to `Debug`.
pub fn setup(config_dir: &Path, verbose: bool) -> Res<PathBuf> {
    std::fs::create_dir_all(config_dir).map_err(|e| {
        format!(
            "Failed to create log directory {}: {}",
            config_dir.display(),
            e
        )
    })?;

    let path = log_path(config_dir);
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        // keep dependency chatter out of the file
        .level_for("reqwest", log::LevelFilter::Warn)
        .level_for("hyper_util", log::LevelFilter::Warn)
        .chain(fern::log_file(&path)?)
        .apply()?;

    Ok(path)
}
