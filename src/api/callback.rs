use std::{collections::HashMap, sync::Arc};

use axum::{
    Extension,
    extract::Query,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tokio::sync::{Mutex, oneshot};

use crate::warning;

/// Hands the captured code (or its absence) to the waiting listener. The
/// sender is taken on first use, so only the first callback counts.
pub type CodeSender = Arc<Mutex<Option<oneshot::Sender<Option<String>>>>>;

pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(sender): Extension<CodeSender>,
) -> Response {
    let code = params.get("code").filter(|c| !c.is_empty()).cloned();

    let Some(tx) = sender.lock().await.take() else {
        return (StatusCode::GONE, "Authorization already completed.").into_response();
    };

    let captured = code.is_some();
    if tx.send(code).is_err() {
        warning!("Authorization callback arrived after the listener stopped waiting");
    }

    if captured {
        Html("<h2>Authorization Successful</h2><p>You can close this window.</p>").into_response()
    } else {
        let reason = params
            .get("error")
            .map(String::as_str)
            .unwrap_or("no authorization code returned");
        (
            StatusCode::BAD_REQUEST,
            format!("Authorization failed: {}", reason),
        )
            .into_response()
    }
}
