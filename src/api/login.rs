use axum::{
    Extension,
    http::{StatusCode, header},
    response::IntoResponse,
};

/// Consent page the root path redirects to.
#[derive(Debug, Clone)]
pub struct ConsentUrl(pub String);

pub async fn login(Extension(ConsentUrl(url)): Extension<ConsentUrl>) -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, url)])
}
