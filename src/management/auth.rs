use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    Error, info,
    management::TokenStore,
    server::CodeReceiver,
    spotify::auth::{Grant, TokenEndpoint},
    types::{Credentials, TokenResponse, TokenState},
    warning,
};

/// Bearer-token slot shared by a [`TokenManager`] and the client that issues
/// resource requests.
///
/// The manager is the only writer. Authorization must complete before the
/// client issues its first resource call; every request reads the slot
/// afterwards, and a request that finds it empty fails with
/// [`Error::Unauthenticated`].
pub type SharedToken = Arc<RwLock<TokenState>>;

/// Which grant family a client authorizes with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Client-credentials grant, no user data.
    AppOnly,
    /// Authorization-code grant on first use, refresh-token grant afterwards.
    User { scope: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authorizing,
    Refreshing,
    Authenticated,
}

/// Runs both grant flows and installs the resulting bearer token.
pub struct TokenManager {
    credentials: Credentials,
    redirect_uri: String,
    endpoint: Arc<dyn TokenEndpoint>,
    receiver: Arc<dyn CodeReceiver>,
    store: Arc<dyn TokenStore>,
    token: SharedToken,
    state: AuthState,
    mode: Option<AuthMode>,
}

impl TokenManager {
    pub fn new(
        credentials: Credentials,
        redirect_uri: impl Into<String>,
        endpoint: Arc<dyn TokenEndpoint>,
        receiver: Arc<dyn CodeReceiver>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            credentials,
            redirect_uri: redirect_uri.into(),
            endpoint,
            receiver,
            store,
            token: SharedToken::default(),
            state: AuthState::Unauthenticated,
            mode: None,
        }
    }

    /// Handle to the bearer-token slot, for the client issuing requests.
    pub fn token_slot(&self) -> SharedToken {
        Arc::clone(&self.token)
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn mode(&self) -> Option<&AuthMode> {
        self.mode.as_ref()
    }

    pub async fn token_state(&self) -> TokenState {
        self.token.read().await.clone()
    }

    pub async fn authorize(&mut self, mode: &AuthMode) -> Result<(), Error> {
        match mode {
            AuthMode::AppOnly => self.authorize_app_only().await,
            AuthMode::User { scope } => self.authorize_user(scope).await,
        }
    }

    /// Client-credentials grant. On failure the slot is emptied, so later
    /// resource calls fail with [`Error::Unauthenticated`].
    pub async fn authorize_app_only(&mut self) -> Result<(), Error> {
        self.mode = Some(AuthMode::AppOnly);
        self.state = AuthState::Authorizing;

        let grant = Grant::ClientCredentials;
        match self.endpoint.exchange(&self.credentials, &grant).await {
            Ok(response) => {
                self.install(response, None).await;
                Ok(())
            }
            Err(e) => Err(self.fail(grant.grant_type(), e).await),
        }
    }

    /// User-scoped authorization.
    ///
    /// With a cached refresh token this is a single refresh-token exchange.
    /// Without one, a code is captured through the [`CodeReceiver`] and
    /// exchanged once. A refresh token returned by the provider replaces the
    /// cached one; a response without one leaves the cache untouched.
    pub async fn authorize_user(&mut self, scope: &str) -> Result<(), Error> {
        self.mode = Some(AuthMode::User {
            scope: scope.to_string(),
        });

        let cached = match self.store.load_refresh_token().await {
            Ok(token) => token,
            Err(e) => {
                warning!("Cannot read cached refresh token: {}", e);
                None
            }
        };
        let cached = match cached {
            Some(token) => Some(token),
            None => self.token.read().await.refresh_token.clone(),
        };

        let grant = match cached.clone() {
            Some(refresh_token) => {
                self.state = AuthState::Refreshing;
                Grant::RefreshToken {
                    refresh_token,
                    redirect_uri: self.redirect_uri.clone(),
                }
            }
            None => {
                self.state = AuthState::Authorizing;
                let code = match self
                    .receiver
                    .receive_code(&self.credentials.client_id, scope)
                    .await
                {
                    Ok(Some(code)) => code,
                    Ok(None) => {
                        let e = Error::Callback(
                            "provider redirected back without an authorization code".into(),
                        );
                        return Err(self.fail("authorization_code", e).await);
                    }
                    Err(e) => return Err(self.fail("authorization_code", e).await),
                };
                Grant::AuthorizationCode {
                    code,
                    redirect_uri: self.redirect_uri.clone(),
                }
            }
        };

        let response = match self.endpoint.exchange(&self.credentials, &grant).await {
            Ok(response) => response,
            Err(e) => return Err(self.fail(grant.grant_type(), e).await),
        };
        drop(grant);

        if let Some(refresh_token) = response.refresh_token.as_deref() {
            if let Err(e) = self.store.save_refresh_token(refresh_token).await {
                warning!("Cannot persist refresh token: {}", e);
            }
        }

        self.install(response, cached).await;
        Ok(())
    }

    /// Repeats the last authorization, e.g. after the provider rejected the
    /// bearer token with a 401.
    pub async fn reauthorize(&mut self) -> Result<(), Error> {
        match self.mode.clone() {
            Some(mode) => {
                info!("Re-authorizing after the access token was rejected");
                self.authorize(&mode).await
            }
            None => Err(Error::Unauthenticated),
        }
    }

    /// Drops the cached refresh token so the next user authorization is
    /// interactive.
    pub async fn forget(&mut self) -> Result<(), Error> {
        self.store.clear_refresh_token().await?;
        *self.token.write().await = TokenState::default();
        self.state = AuthState::Unauthenticated;
        Ok(())
    }

    async fn install(&mut self, response: TokenResponse, previous_refresh: Option<String>) {
        let state = TokenState {
            access_token: Some(response.access_token),
            refresh_token: response.refresh_token.or(previous_refresh),
            expires_in: response.expires_in,
            obtained_at: Some(Utc::now().timestamp() as u64),
        };
        *self.token.write().await = state;
        self.state = AuthState::Authenticated;
    }

    async fn fail(&mut self, grant: &str, error: Error) -> Error {
        {
            let mut token = self.token.write().await;
            token.access_token = None;
            token.expires_in = None;
            token.obtained_at = None;
        }
        self.state = AuthState::Unauthenticated;

        warning!("Error during {} authorization: {}", grant, error);
        warning!("Attempted with {:?}", self.credentials);
        error
    }
}
