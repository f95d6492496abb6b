use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Client credentials issued by the provider's developer dashboard.
///
/// The `Debug` output never contains the secret, so the value can be logged
/// when an exchange fails.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

/// Body returned by the token endpoint for every grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Tokens currently held by a client instance.
///
/// Only `refresh_token` outlives the process; it is persisted through a
/// [`TokenStore`](crate::management::TokenStore).
#[derive(Debug, Clone, Default)]
pub struct TokenState {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    pub obtained_at: Option<u64>,
}

impl TokenState {
    /// True when the access token is within `margin_secs` of its expiry.
    /// Tokens without a known lifetime never count as expired.
    pub fn is_expired(&self, margin_secs: u64) -> bool {
        match (self.expires_in, self.obtained_at) {
            (Some(expires_in), Some(obtained_at)) => {
                let now = Utc::now().timestamp() as u64;
                now + margin_secs >= obtained_at + expires_in
            }
            _ => false,
        }
    }
}

/// One page of a cursor-linked collection.
///
/// `total` is read from the first page of a walk only; `next` is replaced by
/// every response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub next: Option<String>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            next: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawArtist {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawImage {
    pub url: Option<String>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAlbum {
    pub id: Option<String>,
    pub name: Option<String>,
    pub images: Option<Vec<RawImage>>,
    pub release_date: Option<String>,
}

/// Track object as returned by the provider. Every field is optional; album
/// listings return simplified tracks without an `album`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTrack {
    pub id: Option<String>,
    pub name: Option<String>,
    pub artists: Option<Vec<RawArtist>>,
    pub album: Option<RawAlbum>,
    pub disc_number: Option<u32>,
    pub track_number: Option<u32>,
}

/// Canonical track record.
///
/// Unavailable tracks are represented by [`TrackRecord::unavailable`], which
/// serializes to `{"title":"","artists":[""]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
    pub title: String,
    pub artists: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub disc_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub track_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cover_art: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub year: Option<String>,
}

impl TrackRecord {
    pub fn unavailable() -> Self {
        Self {
            id: None,
            title: String::new(),
            artists: vec![String::new()],
            album: None,
            disc_number: None,
            track_number: None,
            cover_art: None,
            year: None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.id.is_none() && self.title.is_empty() && self.artists == [String::new()]
    }
}

/// Audio analysis summary for one track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioFeatures {
    pub id: String,
    pub danceability: f64,
    pub energy: f64,
    pub key: i32,
    pub loudness: f64,
    pub mode: i32,
    pub speechiness: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub valence: f64,
    pub tempo: f64,
    pub duration_ms: u64,
    pub time_signature: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AudioFeaturesResponse {
    #[serde(default)]
    pub audio_features: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub tracks: Page<serde_json::Value>,
}

/// A track record joined with its audio features, if any were returned.
#[derive(Debug, Clone, Serialize)]
pub struct FeaturedTrack {
    #[serde(flatten)]
    pub track: TrackRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<AudioFeatures>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAlbumSummary {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub year: Option<String>,
}

#[derive(Tabled)]
pub struct TrackTableRow {
    pub title: String,
    pub artists: String,
    pub album: String,
    pub year: String,
}

#[derive(Tabled)]
pub struct PlaylistTableRow {
    pub id: String,
    pub name: String,
    pub tracks: u64,
}

#[derive(Tabled)]
pub struct AlbumTableRow {
    pub id: String,
    pub name: String,
    pub artists: String,
    pub year: String,
}

#[derive(Tabled)]
pub struct FeatureTableRow {
    pub id: String,
    pub tempo: String,
    pub energy: String,
    pub danceability: String,
    pub valence: String,
}
