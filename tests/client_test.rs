use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use spotcollect::{
    AuthMode, AuthState, Error, SpotifyClient,
    config::Settings,
    management::{CacheFile, TokenManager, TokenStore},
    paging::{FailurePolicy, FailureSite},
    server::CallbackListener,
    spotify::HttpTokenEndpoint,
    types::Credentials,
    utils,
};
use tokio::net::TcpListener;

const PLAYLIST_TOTAL: usize = 250;
const LIKED_TOTAL: usize = 45;

/// In-process stand-in for the accounts service and the Web API.
struct Provider {
    base: String,
    issued: AtomicUsize,
    current: Mutex<String>,
    grants: Mutex<Vec<String>>,
    requests: Mutex<Vec<String>>,
    /// Number of liked-track requests still to answer with 401.
    reject_liked: AtomicUsize,
    /// Number of audio-features requests still to answer with 401.
    reject_features: AtomicUsize,
}

impl Provider {
    fn record(&self, path: &str, query: &HashMap<String, String>) {
        let mut keys: Vec<_> = query.iter().collect();
        keys.sort();
        let query: Vec<String> = keys.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        self.requests
            .lock()
            .unwrap()
            .push(format!("{}?{}", path, query.join("&")));
    }

    fn requests_to(&self, path: &str) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.starts_with(path))
            .cloned()
            .collect()
    }

    fn reject(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {}", self.current.lock().unwrap());
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            == Some(expected.as_str())
    }
}

type Shared = Arc<Provider>;

async fn token(
    State(provider): State<Shared>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let basic = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    // base64("client:secret")
    if basic != "Basic Y2xpZW50OnNlY3JldA==" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid_client" })),
        )
            .into_response();
    }

    let grant = form.get("grant_type").cloned().unwrap_or_default();
    provider.grants.lock().unwrap().push(grant.clone());

    let n = provider.issued.fetch_add(1, Ordering::SeqCst) + 1;
    let access = format!("token-{}", n);
    *provider.current.lock().unwrap() = access.clone();

    let mut body = json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": 3600,
    });
    if grant == "refresh_token" {
        body["refresh_token"] = json!("rotated");
    }
    Json(body).into_response()
}

fn offset_limit(query: &HashMap<String, String>, default_limit: usize) -> (usize, usize) {
    let offset = query.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let limit = query
        .get("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(default_limit);
    (offset, limit)
}

fn track(n: usize) -> Value {
    json!({
        "id": format!("t{}", n),
        "name": format!("Track {}", n),
        "artists": [{ "name": "Artist" }],
        "album": {
            "name": "Album",
            "release_date": "2020-01-01",
            "images": [{ "url": format!("https://img/{}", n), "height": 640 }]
        }
    })
}

fn page(provider: &Provider, path: &str, total: usize, offset: usize, limit: usize) -> Value {
    let end = (offset + limit).min(total);
    let items: Vec<Value> = (offset..end).map(|n| json!({ "track": track(n) })).collect();
    let next = (end < total).then(|| {
        format!(
            "{}/{}?offset={}&limit={}",
            provider.base, path, end, limit
        )
    });
    json!({ "items": items, "total": total, "next": next })
}

async fn playlist_tracks(
    State(provider): State<Shared>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let path = format!("playlists/{}/tracks", id);
    provider.record(&path, &query);
    if !provider.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let (offset, limit) = offset_limit(&query, 100);
    if id == "flaky" && offset == 100 {
        return StatusCode::BAD_GATEWAY.into_response();
    }
    if id == "removed" {
        let mut body = page(&provider, &path, 3, offset, limit);
        body["items"][1] = json!({ "track": { "id": null, "name": null } });
        return Json(body).into_response();
    }

    Json(page(&provider, &path, PLAYLIST_TOTAL, offset, limit)).into_response()
}

async fn liked_tracks(
    State(provider): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    provider.record("me/tracks", &query);
    if Provider::reject(&provider.reject_liked) || !provider.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let (offset, limit) = offset_limit(&query, 20);
    Json(page(&provider, "me/tracks", LIKED_TOTAL, offset, limit)).into_response()
}

async fn audio_features(
    State(provider): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    provider.record("audio-features", &query);
    if Provider::reject(&provider.reject_features) || !provider.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let features: Vec<Value> = query
        .get("ids")
        .map(String::as_str)
        .unwrap_or_default()
        .split(',')
        .map(|id| {
            if id.starts_with("unknown") {
                Value::Null
            } else {
                json!({ "id": id, "tempo": 120.0, "energy": 0.5 })
            }
        })
        .collect();
    Json(json!({ "audio_features": features })).into_response()
}

async fn search(
    State(provider): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    provider.record("search", &query);
    if !provider.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let q = query.get("q").cloned().unwrap_or_default();
    let items = if q == "track:Song artist:Band" {
        vec![track(7)]
    } else {
        Vec::new()
    };
    let total = items.len();
    Json(json!({ "tracks": { "items": items, "total": total, "next": null } })).into_response()
}

async fn start_provider() -> Shared {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let provider = Arc::new(Provider {
        base: format!("http://{}/v1", addr),
        issued: AtomicUsize::new(0),
        current: Mutex::new(String::new()),
        grants: Mutex::new(Vec::new()),
        requests: Mutex::new(Vec::new()),
        reject_liked: AtomicUsize::new(0),
        reject_features: AtomicUsize::new(0),
    });

    let app = Router::new()
        .route("/api/token", post(token))
        .route("/v1/playlists/{id}/tracks", get(playlist_tracks))
        .route("/v1/me/tracks", get(liked_tracks))
        .route("/v1/audio-features", get(audio_features))
        .route("/v1/search", get(search))
        .with_state(Arc::clone(&provider));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    provider
}

fn temp_cache(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!(
        "spotcollect-client-{}-{}/cache.json",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    path
}

fn settings(provider: &Provider, cache: &str) -> Settings {
    let root = provider.base.trim_end_matches("/v1");
    let mut settings = Settings::new(Credentials::new("client", "secret"));
    settings.api_url = provider.base.clone();
    settings.token_url = format!("{}/api/token", root);
    settings.authorize_url = format!("{}/authorize", root);
    settings.callback_port = 0;
    settings.callback_timeout = Duration::from_millis(200);
    settings.request_timeout = Duration::from_secs(5);
    settings.cache_file = temp_cache(cache);
    settings
}

async fn app_client(provider: &Provider, cache: &str) -> SpotifyClient {
    SpotifyClient::connect(&settings(provider, cache), AuthMode::AppOnly)
        .await
        .unwrap()
}

#[tokio::test]
async fn walks_every_playlist_page_in_order() {
    let provider = start_provider().await;
    let client = app_client(&provider, "walk").await;

    let tracks = client.get_playlist_tracks("p1", None).await.unwrap();

    assert_eq!(provider.requests_to("playlists/p1").len(), 3);
    assert!(tracks.is_complete());
    assert_eq!(tracks.len(), PLAYLIST_TOTAL);
    let ids: Vec<String> = tracks.items.iter().filter_map(|t| t.id.clone()).collect();
    let expected: Vec<String> = (0..PLAYLIST_TOTAL).map(|n| format!("t{}", n)).collect();
    assert_eq!(ids, expected);
    assert_eq!(tracks.items[0].cover_art.as_deref(), Some("https://img/0"));
    assert_eq!(tracks.items[0].year.as_deref(), Some("2020"));
}

#[tokio::test]
async fn page_cap_limits_requests() {
    let provider = start_provider().await;
    let client = app_client(&provider, "cap").await;

    let tracks = client.get_playlist_tracks("p1", Some(2)).await.unwrap();

    assert_eq!(provider.requests_to("playlists/p1").len(), 2);
    assert_eq!(tracks.len(), 200);
}

#[tokio::test]
async fn failed_page_loses_only_its_items() {
    let provider = start_provider().await;
    let client = app_client(&provider, "flaky").await;

    let tracks = client.get_playlist_tracks("flaky", None).await.unwrap();

    assert_eq!(tracks.len(), PLAYLIST_TOTAL - 100);
    assert_eq!(tracks.items[100].id.as_deref(), Some("t200"));
    assert_eq!(tracks.failures.len(), 1);
    assert_eq!(tracks.failures[0].site, FailureSite::Page(2));

    // the page after the failure is addressed by offset
    let requests = provider.requests_to("playlists/flaky");
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2], "playlists/flaky/tracks?limit=100&offset=200");
}

#[tokio::test]
async fn fail_fast_surfaces_page_error() {
    let provider = start_provider().await;
    let client = app_client(&provider, "failfast")
        .await
        .with_policy(FailurePolicy::FailFast);

    let err = client.get_playlist_tracks("flaky", None).await.unwrap_err();

    match err {
        Error::PageFetch { page, source } => {
            assert_eq!(page, 2);
            assert!(matches!(*source, Error::Api { status: 502, .. }));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn removed_tracks_become_placeholders() {
    let provider = start_provider().await;
    let client = app_client(&provider, "removed").await;

    let tracks = client.get_playlist_tracks("removed", None).await.unwrap();

    assert_eq!(tracks.len(), 3);
    assert!(tracks.items[1].is_unavailable());
    assert!(!tracks.items[0].is_unavailable());
}

#[tokio::test]
async fn rejected_token_is_renewed_once() {
    let provider = start_provider().await;
    let client = app_client(&provider, "reauth").await;
    provider.reject_liked.store(1, Ordering::SeqCst);

    let liked = client.get_liked_tracks().await.unwrap();

    assert_eq!(liked.len(), LIKED_TOTAL);
    assert!(liked.is_complete());
    assert_eq!(provider.issued.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn persistent_rejection_ends_best_effort_walk() {
    let provider = start_provider().await;
    let client = app_client(&provider, "expired").await;
    assert_eq!(client.policy(), FailurePolicy::BestEffort);
    provider.reject_liked.store(usize::MAX, Ordering::SeqCst);

    let err = client.get_liked_tracks().await.unwrap_err();

    assert!(matches!(err, Error::TokenExpired));
    // one renewal, then the walk stops at the first page
    assert_eq!(provider.issued.load(Ordering::SeqCst), 2);
    assert_eq!(provider.requests_to("me/tracks").len(), 2);
}

#[tokio::test]
async fn persistent_rejection_ends_best_effort_batches() {
    let provider = start_provider().await;
    let client = app_client(&provider, "expired-features").await;
    provider.reject_features.store(usize::MAX, Ordering::SeqCst);
    let ids: Vec<String> = (0..150).map(|n| format!("t{}", n)).collect();

    let err = client.get_audio_features(&ids).await.unwrap_err();

    assert!(matches!(err, Error::TokenExpired));
    assert_eq!(provider.issued.load(Ordering::SeqCst), 2);
    assert_eq!(provider.requests_to("audio-features").len(), 2);
}

#[tokio::test]
async fn persistent_rejection_is_not_wrapped_under_fail_fast() {
    let provider = start_provider().await;
    let client = app_client(&provider, "expired-failfast")
        .await
        .with_policy(FailurePolicy::FailFast);
    provider.reject_liked.store(usize::MAX, Ordering::SeqCst);

    let err = client.get_liked_tracks().await.unwrap_err();

    assert!(matches!(err, Error::TokenExpired));
}

#[tokio::test]
async fn unauthorized_client_cannot_walk() {
    let provider = start_provider().await;
    let settings = settings(&provider, "unauthorized");
    let http = reqwest::Client::new();
    let manager = TokenManager::new(
        settings.credentials.clone(),
        utils::redirect_uri(8008),
        Arc::new(HttpTokenEndpoint::new(http.clone(), &settings.token_url)),
        Arc::new(CallbackListener::new(&settings.authorize_url).with_browser(false)),
        Arc::new(CacheFile::new(&settings.cache_file)),
    );
    let client = SpotifyClient::new(http, &settings.api_url, manager);

    let err = client.get_playlist_tracks("p1", None).await.unwrap_err();
    assert!(matches!(err, Error::Unauthenticated));

    let err = client
        .get_audio_features(&["t1".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthenticated));

    // nothing reached the provider
    assert!(provider.requests.lock().unwrap().is_empty());
    assert!(provider.grants.lock().unwrap().is_empty());
}

#[tokio::test]
async fn audio_features_are_fetched_in_chunks() {
    let provider = start_provider().await;
    let client = app_client(&provider, "features").await;
    let mut ids: Vec<String> = (0..149).map(|n| format!("t{}", n)).collect();
    ids.insert(50, "unknown-1".to_string());

    let features = client.get_audio_features(&ids).await.unwrap();

    let requests = provider.requests_to("audio-features");
    assert_eq!(requests.len(), 2);
    assert_eq!(features.len(), 150);
    assert!(features.items[50].is_none());
    assert_eq!(
        features.items[51].as_ref().map(|f| f.id.as_str()),
        Some("t50")
    );

    let keyed = client.get_audio_features_by_id(&ids).await.unwrap();
    assert_eq!(keyed.by_id.len(), 149);
    assert_eq!(keyed.get("t148").map(|f| f.tempo), Some(120.0));
}

#[tokio::test]
async fn enrich_tracks_joins_by_id() {
    let provider = start_provider().await;
    let client = app_client(&provider, "enrich").await;
    let tracks = client.get_playlist_tracks("removed", None).await.unwrap();

    let featured = client.enrich_tracks(tracks.into_items()).await.unwrap();

    assert_eq!(featured.len(), 3);
    assert!(featured.items[0].features.is_some());
    assert!(featured.items[1].features.is_none());
    assert_eq!(
        featured.items[2].features.as_ref().map(|f| f.id.as_str()),
        Some("t2")
    );
}

#[tokio::test]
async fn search_returns_first_match() {
    let provider = start_provider().await;
    let client = app_client(&provider, "search").await;

    let found = client.search_track("Song", "Band").await.unwrap();
    assert_eq!(found.map(|t| t.title), Some("Track 7".to_string()));

    let missing = client.search_track("Nothing", "Nobody").await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn cached_refresh_token_skips_consent() {
    let provider = start_provider().await;
    let settings = settings(&provider, "refresh");
    let cache = CacheFile::new(&settings.cache_file);
    cache.save_refresh_token("cached").await.unwrap();

    let client = SpotifyClient::connect(
        &settings,
        AuthMode::User {
            scope: "user-library-read".into(),
        },
    )
    .await
    .unwrap();

    assert_eq!(client.auth_state().await, AuthState::Authenticated);
    assert_eq!(*provider.grants.lock().unwrap(), vec!["refresh_token"]);
    // the rotated refresh token replaces the cached one
    assert_eq!(
        cache.load_refresh_token().await.unwrap().as_deref(),
        Some("rotated")
    );
}

#[tokio::test]
async fn rejected_credentials_fail_authorization() {
    let provider = start_provider().await;
    let mut settings = settings(&provider, "badcreds");
    settings.credentials = Credentials::new("client", "wrong");

    let err = SpotifyClient::connect(&settings, AuthMode::AppOnly)
        .await
        .err()
        .unwrap();

    assert!(matches!(
        err,
        Error::Auth {
            grant: "client_credentials",
            status: 401,
            ..
        }
    ));
    assert!(err.is_auth());
}
