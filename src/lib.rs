//! Spotify collection client library
//!
//! Fetches complete track collections (playlists, albums, the user's saved
//! library) from the Spotify Web API and joins them with audio features. It
//! covers both OAuth grant families, walks cursor-linked pages, and splits
//! large id lists into bounded batches.
//!
//! # Modules
//!
//! - `api` - HTTP handlers of the local authorization listener
//! - `batch` - Bounded-size batch enrichment
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `error` - The crate error type
//! - `format` - Mapping of raw provider items into canonical records
//! - `management` - Token manager and refresh-token cache
//! - `paging` - Cursor-walking pagination engine
//! - `server` - One-shot local HTTP listener for OAuth callbacks
//! - `spotify` - Spotify Web API client
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```ignore
//! use spotcollect::{AuthMode, SpotifyClient, config};
//!
//! #[tokio::main]
//! async fn main() -> spotcollect::Res<()> {
//!     config::load_env();
//!     let settings = config::Settings::from_env()?;
//!     let scope = settings.scope.clone();
//!     let client = SpotifyClient::connect(&settings, AuthMode::User { scope }).await?;
//!     let liked = client.get_liked_tracks().await?;
//!     println!("{} liked tracks", liked.len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod management;
pub mod paging;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

pub use error::Error;
pub use management::{AuthMode, AuthState};
pub use spotify::SpotifyClient;

/// A convenient Result type alias for the command-line layer.
///
/// Library operations return [`Error`]; the CLI mixes them with other
/// failures and uses this boxed form.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// Diagnostics go to stderr so machine-readable output on stdout stays
/// clean.
///
/// # Example
///
/// ```ignore
/// info!("Fetching {} pages", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only the binary uses this; library code returns [`Error`] instead.
///
/// # Example
///
/// ```ignore
/// error!("Missing required environment variable: {}", var_name);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Used for recoverable issues: skipped pages, failed chunks, token
/// exchanges that were rejected.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
