use async_trait::async_trait;
use reqwest::{Client, header};

use crate::{
    Error,
    types::{Credentials, TokenResponse},
    utils,
};

/// Token request, one variant per grant family, each carrying only the
/// fields its exchange needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    /// App-only token, no user scope.
    ClientCredentials,
    /// Single-use code captured from the consent redirect.
    AuthorizationCode { code: String, redirect_uri: String },
    /// Cached refresh token from a previous run.
    RefreshToken {
        refresh_token: String,
        redirect_uri: String,
    },
}

impl Grant {
    pub fn grant_type(&self) -> &'static str {
        match self {
            Grant::ClientCredentials => "client_credentials",
            Grant::AuthorizationCode { .. } => "authorization_code",
            Grant::RefreshToken { .. } => "refresh_token",
        }
    }

    /// Form-encoded body of the token request.
    pub fn form(&self) -> Vec<(&'static str, &str)> {
        let mut form = vec![("grant_type", self.grant_type())];
        match self {
            Grant::ClientCredentials => {}
            Grant::AuthorizationCode { code, redirect_uri } => {
                form.push(("code", code.as_str()));
                form.push(("redirect_uri", redirect_uri.as_str()));
            }
            Grant::RefreshToken {
                refresh_token,
                redirect_uri,
            } => {
                form.push(("refresh_token", refresh_token.as_str()));
                form.push(("redirect_uri", redirect_uri.as_str()));
            }
        }
        form
    }
}

/// Exchanges a grant for tokens.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    async fn exchange(
        &self,
        credentials: &Credentials,
        grant: &Grant,
    ) -> Result<TokenResponse, Error>;
}

/// Token endpoint reached over HTTP with a Basic-auth header.
#[derive(Debug, Clone)]
pub struct HttpTokenEndpoint {
    client: Client,
    token_url: String,
}

impl HttpTokenEndpoint {
    pub fn new(client: Client, token_url: impl Into<String>) -> Self {
        Self {
            client,
            token_url: token_url.into(),
        }
    }
}

#[async_trait]
impl TokenEndpoint for HttpTokenEndpoint {
    async fn exchange(
        &self,
        credentials: &Credentials,
        grant: &Grant,
    ) -> Result<TokenResponse, Error> {
        let res = self
            .client
            .post(&self.token_url)
            .header(header::AUTHORIZATION, utils::basic_auth_header(credentials))
            .form(&grant.form())
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(Error::Auth {
                grant: grant.grant_type(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(res.json::<TokenResponse>().await?)
    }
}
