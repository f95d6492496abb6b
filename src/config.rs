//! Configuration management.
//!
//! Values come from environment variables, optionally seeded from `.env`
//! files:
//! 1. Environment variables (highest priority)
//! 2. `.env` in the local data directory (`spotcollect/.env`)
//! 3. `.env` in the working directory
//! 4. Defaults below
//!
//! Only the client id and secret are required.

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use crate::{
    Error,
    management::CacheFile,
    paging::FailurePolicy,
    server::{DEFAULT_CALLBACK_PORT, DEFAULT_CALLBACK_TIMEOUT},
    types::Credentials,
};

pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_SCOPE: &str = "playlist-read-private user-library-read";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Loads `.env` files from the local data directory and the working
/// directory. Variables already set in the environment win; missing files
/// are skipped.
pub fn load_env() {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("spotcollect/.env");
    let _ = dotenv::from_path(&path);
    let _ = dotenv::dotenv();
}

/// Returns the client id (`SPOTIFY_API_AUTH_CLIENT_ID`).
pub fn spotify_client_id() -> Result<String, Error> {
    required("SPOTIFY_API_AUTH_CLIENT_ID")
}

/// Returns the client secret (`SPOTIFY_API_AUTH_CLIENT_SECRET`).
///
/// The secret should be kept confidential and never exposed in logs
/// or version control.
pub fn spotify_client_secret() -> Result<String, Error> {
    required("SPOTIFY_API_AUTH_CLIENT_SECRET")
}

pub fn spotify_scope() -> String {
    optional("SPOTIFY_API_AUTH_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.to_string())
}

pub fn spotify_apiurl() -> String {
    optional("SPOTIFY_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

pub fn spotify_apitoken_url() -> String {
    optional("SPOTIFY_API_TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string())
}

pub fn spotify_apiauth_url() -> String {
    optional("SPOTIFY_API_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTHORIZE_URL.to_string())
}

/// Runtime settings of a client.
#[derive(Debug, Clone)]
pub struct Settings {
    pub credentials: Credentials,
    pub scope: String,
    pub api_url: String,
    pub token_url: String,
    pub authorize_url: String,
    pub callback_port: u16,
    pub show_dialog: bool,
    pub callback_timeout: Duration,
    pub request_timeout: Duration,
    pub cache_file: PathBuf,
    pub failure_policy: FailurePolicy,
}

impl Settings {
    /// Settings with the provider defaults for the given credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            scope: DEFAULT_SCOPE.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            callback_port: DEFAULT_CALLBACK_PORT,
            show_dialog: true,
            callback_timeout: DEFAULT_CALLBACK_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            cache_file: CacheFile::default_path(),
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn from_env() -> Result<Self, Error> {
        let credentials = Credentials::new(spotify_client_id()?, spotify_client_secret()?);
        let mut settings = Self::new(credentials);

        settings.scope = spotify_scope();
        settings.api_url = spotify_apiurl();
        settings.token_url = spotify_apitoken_url();
        settings.authorize_url = spotify_apiauth_url();
        if let Some(value) = optional("CALLBACK_PORT") {
            settings.callback_port = callback_port(&value)?;
        }
        if let Some(show_dialog) = parsed::<bool>("SHOW_DIALOG")? {
            settings.show_dialog = show_dialog;
        }
        if let Some(secs) = parsed::<u64>("CALLBACK_TIMEOUT_SECS")? {
            settings.callback_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parsed::<u64>("REQUEST_TIMEOUT_SECS")? {
            settings.request_timeout = Duration::from_secs(secs);
        }
        if let Some(path) = optional("CACHE_FILE") {
            settings.cache_file = PathBuf::from(path);
        }
        if let Some(policy) = optional("FAILURE_POLICY") {
            settings.failure_policy = policy.parse()?;
        }

        Ok(settings)
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn required(key: &str) -> Result<String, Error> {
    optional(key).ok_or_else(|| Error::Config(format!("{} must be set", key)))
}

fn parsed<T: FromStr>(key: &str) -> Result<Option<T>, Error>
where
    T::Err: std::fmt::Display,
{
    optional(key)
        .map(|value| parse_value(key, &value))
        .transpose()
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, Error>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| Error::Config(format!("invalid {}: {}", key, e)))
}

/// The redirect URI registered with the provider carries this port, so an
/// ephemeral port (0) can never match it.
fn callback_port(value: &str) -> Result<u16, Error> {
    match parse_value::<u16>("CALLBACK_PORT", value)? {
        0 => Err(Error::Config(
            "CALLBACK_PORT must be a fixed port, not 0".to_string(),
        )),
        port => Ok(port),
    }
}
