//! # Spotify Client
//!
//! [`SpotifyClient`] owns one shared `reqwest` client pointed at the Web API
//! base URL, the bearer-token slot, and the [`TokenManager`] that fills it.
//! The high-level operations are built from the paging and batching engines:
//!
//! ```text
//! get_playlist_tracks / get_album_tracks / get_user_* / get_liked_tracks
//!          ↓
//! Paginator ── ResourcePages (cursor or offset/limit GET)
//!          ↓
//! format::* (per item)
//!
//! get_audio_features / get_audio_features_by_id
//!          ↓
//! BatchChunker ── AudioFeatureBatches (GET /audio-features?ids=…)
//! ```
//!
//! Every request goes through [`SpotifyClient::get_json`], which attaches the
//! bearer token, re-authorizes once on a 401 and waits out a short
//! `Retry-After` once on a 429.
//!
//! ## Example
//!
//! ```rust,ignore
//! use spotcollect::{AuthMode, SpotifyClient, config::Settings};
//!
//! let settings = Settings::from_env()?;
//! let client = SpotifyClient::connect(&settings, AuthMode::AppOnly).await?;
//! let tracks = client.get_playlist_tracks("37i9dQZEVXcN0pKiFKeFaA", None).await?;
//! println!("{} tracks, complete: {}", tracks.len(), tracks.is_complete());
//! ```

pub mod auth;
mod features;
mod library;
mod search;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::{sync::Mutex, time::sleep};

use crate::{
    Error,
    config::Settings,
    management::{AuthMode, AuthState, CacheFile, SharedToken, TokenManager},
    paging::{FailurePolicy, PageRequest, PageSource, Paginator},
    server::CallbackListener,
    types::Page,
    utils, warning,
};

pub use auth::{Grant, HttpTokenEndpoint, TokenEndpoint};

/// Longest `Retry-After` the client waits out on its own.
const MAX_RETRY_AFTER_SECS: u64 = 120;
/// Tokens this close to expiry are renewed before the request is sent.
const EXPIRY_MARGIN_SECS: u64 = 60;

pub struct SpotifyClient {
    http: Client,
    api_url: String,
    token: SharedToken,
    auth: Mutex<TokenManager>,
    policy: FailurePolicy,
}

impl SpotifyClient {
    /// Wraps an HTTP client and a token manager. No request succeeds until
    /// [`authorize`](Self::authorize) has completed.
    pub fn new(http: Client, api_url: impl Into<String>, manager: TokenManager) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: manager.token_slot(),
            auth: Mutex::new(manager),
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builds a client from settings with the HTTP token endpoint, the local
    /// callback listener and the on-disk cache, then authorizes it.
    pub async fn connect(settings: &Settings, mode: AuthMode) -> Result<Self, Error> {
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .build()?;

        let endpoint = Arc::new(HttpTokenEndpoint::new(http.clone(), &settings.token_url));
        let listener = Arc::new(
            CallbackListener::new(&settings.authorize_url)
                .with_port(settings.callback_port)
                .with_show_dialog(settings.show_dialog)
                .with_timeout(settings.callback_timeout),
        );
        let store = Arc::new(CacheFile::new(&settings.cache_file));
        let manager = TokenManager::new(
            settings.credentials.clone(),
            utils::redirect_uri(settings.callback_port),
            endpoint,
            listener,
            store,
        );

        let client =
            Self::new(http, &settings.api_url, manager).with_policy(settings.failure_policy);
        client.authorize(&mode).await?;
        Ok(client)
    }

    pub async fn authorize(&self, mode: &AuthMode) -> Result<(), Error> {
        self.auth.lock().await.authorize(mode).await
    }

    /// Drops the cached refresh token and the installed bearer token.
    pub async fn forget(&self) -> Result<(), Error> {
        self.auth.lock().await.forget().await
    }

    pub async fn auth_state(&self) -> AuthState {
        self.auth.lock().await.state()
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Absolute URL of an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    pub(crate) fn paginator(&self, page_size: usize) -> Paginator {
        Paginator::new(page_size).with_policy(self.policy)
    }

    pub(crate) fn pages(&self, path: impl Into<String>) -> ResourcePages<'_> {
        ResourcePages {
            client: self,
            path: path.into(),
        }
    }

    /// Authenticated GET returning the decoded JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        let mut reauthorized = false;
        let mut waited = false;

        loop {
            let bearer = self.bearer().await?;
            let res = self
                .http
                .get(url)
                .query(query)
                .bearer_auth(bearer)
                .send()
                .await?;
            let status = res.status();

            if status == StatusCode::UNAUTHORIZED {
                if reauthorized {
                    return Err(Error::TokenExpired);
                }
                reauthorized = true;
                self.auth.lock().await.reauthorize().await?;
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS && !waited {
                if let Some(retry_after) = retry_after(&res) {
                    if retry_after <= MAX_RETRY_AFTER_SECS {
                        warning!("Rate limited, retrying {} in {}s", url, retry_after);
                        sleep(Duration::from_secs(retry_after)).await;
                        waited = true;
                        continue;
                    }
                    warning!(
                        "Retry-After of {} seconds is too long to wait for {}",
                        retry_after,
                        url
                    );
                }
            }

            if !status.is_success() {
                let body = res.text().await.unwrap_or_default();
                return Err(Error::Api {
                    url: url.to_string(),
                    status: status.as_u16(),
                    body,
                });
            }

            return Ok(res.json::<T>().await?);
        }
    }

    async fn bearer(&self) -> Result<String, Error> {
        let state = self.token.read().await.clone();
        let Some(access_token) = state.access_token.clone() else {
            return Err(Error::Unauthenticated);
        };

        if !state.is_expired(EXPIRY_MARGIN_SECS) {
            return Ok(access_token);
        }

        self.auth.lock().await.reauthorize().await?;
        self.token
            .read()
            .await
            .access_token
            .clone()
            .ok_or(Error::Unauthenticated)
    }
}

fn retry_after(res: &reqwest::Response) -> Option<u64> {
    res.headers()
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Page source for a paginated API path. The first page, and any page whose
/// predecessor failed, is addressed by offset and limit; the others follow
/// the previous page's `next` link.
pub struct ResourcePages<'a> {
    client: &'a SpotifyClient,
    path: String,
}

#[async_trait]
impl PageSource for ResourcePages<'_> {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<Value>, Error> {
        match &request.cursor {
            Some(next) => self.client.get_json(next, &[]).await,
            None => {
                let url = self.client.url(&self.path);
                let query = [
                    ("offset", request.offset.to_string()),
                    ("limit", request.limit.to_string()),
                ];
                self.client.get_json(&url, &query).await
            }
        }
    }
}
