use crate::{
    error, info,
    management::{CacheFile, TokenStore},
    success,
};

use super::{Options, connect, settings};

/// Runs the user authorization once so later commands can refresh silently.
/// With `fresh`, the cached refresh token is dropped first and the consent
/// page is opened again.
pub async fn auth(fresh: bool, opts: Options) {
    if fresh {
        let cache = CacheFile::new(settings(&opts).cache_file);
        if let Err(e) = cache.clear_refresh_token().await {
            error!("Cannot clear cached refresh token. Err: {}", e);
        }
        info!("Cleared cached refresh token in {}", cache.path().display());
    }

    let client = connect(&opts, true).await;
    success!("Authorized ({:?})", client.auth_state().await);
}
