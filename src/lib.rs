//! spotpilot library
//!
//! Keeps a Spotify playback queue populated with fresh, non-repeating tracks.
//! The crate is split into a small core (token lifecycle, discovery, exclusion
//! tracking and the autopilot loop) and a thin command-line layer on top.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints for the local OAuth callback server
//! - `autopilot` - Polling state machine that refills the queue on track changes
//! - `cli` - Command-line interface implementations
//! - `clock` - Time source and sleep seam used for backoff and polling
//! - `config` - Configuration management and environment variables
//! - `discovery` - Recommendation engine with its fallback cascade
//! - `error` - Error taxonomy shared by the core
//! - `exclusions` - URIs that must never be (re-)suggested
//! - `logging` - Diagnostic log file setup
//! - `management` - Credential storage and token lifecycle
//! - `mood` - Mood presets and mood-term derivation
//! - `server` - Local HTTP server for OAuth callbacks
//! - `spotify` - Spotify Web API client implementation
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```
//! use spotpilot::{cli, config, logging};
//!
//! #[tokio::main]
//! async fn main() -> spotpilot::Res<()> {
//!     config::load_env().await?;
//!     let settings = config::Settings::from_env();
//!     logging::setup(&settings.config_dir, false)?;
//!     cli::show_queue(&settings).await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod autopilot;
pub mod cli;
pub mod clock;
pub mod config;
pub mod discovery;
pub mod error;
pub mod exclusions;
pub mod logging;
pub mod management;
pub mod mood;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// A convenient Result type alias for operations that may fail.
///
/// Used by start-up glue such as [`logging::setup`]. The core modules return
/// their own typed errors from [`error`].
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Autopilot engaged");
/// info!("Queue depth: {} / threshold: {}", depth, threshold);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Authentication successful!");
/// success!("Queued {} tracks", count);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only command entry points use this. The autopilot loop never calls it, a
/// failing tick degrades to [`warning!`] instead.
///
/// # Example
///
/// ```
/// error!("Missing Spotify credentials");
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// # Example
///
/// ```
/// warning!("Refill error: {}", e);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
