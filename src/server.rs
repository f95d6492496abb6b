//! One-shot local HTTP listener that captures an authorization code.
//!
//! The listener binds `127.0.0.1:{port}`, redirects `/` to the consent page
//! and waits for the provider to call `/callback`. The socket is owned by a
//! [`ServerGuard`]; it is released after the callback, on timeout and when
//! the waiting future is dropped.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{Extension, Router, routing::get};
use reqwest::Url;
use tokio::{
    net::TcpListener,
    sync::{Mutex, oneshot},
    task::JoinHandle,
};

use crate::{
    Error,
    api::{self, CodeSender, ConsentUrl},
    info, utils, warning,
};

pub const DEFAULT_CALLBACK_PORT: u16 = 8008;
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// How long a stopping listener may take to finish in-flight responses.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Source of authorization codes for the authorization-code grant.
#[async_trait]
pub trait CodeReceiver: Send + Sync {
    /// Runs one consent round trip. `Ok(None)` means the provider redirected
    /// back without a code.
    async fn receive_code(&self, client_id: &str, scope: &str) -> Result<Option<String>, Error>;
}

#[derive(Debug, Clone)]
pub struct CallbackListener {
    pub authorize_url: String,
    pub port: u16,
    pub show_dialog: bool,
    pub timeout: Duration,
    pub open_browser: bool,
}

impl CallbackListener {
    pub fn new(authorize_url: impl Into<String>) -> Self {
        Self {
            authorize_url: authorize_url.into(),
            port: DEFAULT_CALLBACK_PORT,
            show_dialog: true,
            timeout: DEFAULT_CALLBACK_TIMEOUT,
            open_browser: true,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_show_dialog(mut self, show_dialog: bool) -> Self {
        self.show_dialog = show_dialog;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }

    /// Consent page URL carrying the client id, scope and redirect URI.
    pub fn consent_url(&self, client_id: &str, scope: &str, port: u16) -> Result<String, Error> {
        let show_dialog = self.show_dialog.to_string();
        let redirect_uri = utils::redirect_uri(port);
        let url = Url::parse_with_params(
            &self.authorize_url,
            &[
                ("client_id", client_id),
                ("response_type", "code"),
                ("redirect_uri", redirect_uri.as_str()),
                ("scope", scope),
                ("show_dialog", show_dialog.as_str()),
            ],
        )
        .map_err(|e| Error::Config(format!("invalid authorize URL: {}", e)))?;

        Ok(url.to_string())
    }

    /// Binds the listening socket and starts serving. Port `0` picks a free
    /// port; the redirect URI then uses the port actually bound.
    pub async fn bind(&self, client_id: &str, scope: &str) -> Result<BoundListener, Error> {
        let listener = TcpListener::bind(("127.0.0.1", self.port))
            .await
            .map_err(|e| {
                Error::Callback(format!("cannot listen on port {}: {}", self.port, e))
            })?;
        let addr = listener.local_addr()?;
        let consent_url = self.consent_url(client_id, scope, addr.port())?;

        let (code_tx, code_rx) = oneshot::channel();
        let sender: CodeSender = Arc::new(Mutex::new(Some(code_tx)));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = Router::new()
            .route("/", get(api::login))
            .route("/callback", get(api::callback))
            .layer(Extension(ConsentUrl(consent_url)))
            .layer(Extension(sender));

        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve.await {
                warning!("Authorization listener stopped with an error: {}", e);
            }
        });

        Ok(BoundListener {
            addr,
            code_rx,
            timeout: self.timeout,
            guard: ServerGuard {
                shutdown: Some(shutdown_tx),
                handle: Some(handle),
            },
        })
    }
}

#[async_trait]
impl CodeReceiver for CallbackListener {
    async fn receive_code(&self, client_id: &str, scope: &str) -> Result<Option<String>, Error> {
        let bound = self.bind(client_id, scope).await?;
        let start_url = bound.start_url();
        info!("Waiting for authorization on {}", start_url);

        if self.open_browser && webbrowser::open(&start_url).is_err() {
            warning!(
                "Failed to open browser. Please navigate to the following URL manually:\n{}",
                start_url
            );
        }

        bound.wait_for_code().await
    }
}

/// A listener that is bound and serving, waiting for its single callback.
pub struct BoundListener {
    addr: SocketAddr,
    code_rx: oneshot::Receiver<Option<String>>,
    timeout: Duration,
    guard: ServerGuard,
}

impl BoundListener {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// URL that starts the flow when opened in a browser.
    pub fn start_url(&self) -> String {
        format!("http://localhost:{}", self.addr.port())
    }

    /// Waits for the callback, then stops the listener and releases the port.
    pub async fn wait_for_code(mut self) -> Result<Option<String>, Error> {
        let outcome = tokio::time::timeout(self.timeout, &mut self.code_rx).await;
        self.guard.shutdown().await;

        match outcome {
            Ok(Ok(code)) => Ok(code),
            Ok(Err(_)) => Err(Error::Callback(
                "listener stopped before the callback arrived".into(),
            )),
            Err(_) => Err(Error::CallbackTimeout(self.timeout)),
        }
    }
}

/// Owns the serving task. Dropping it signals shutdown and aborts the task.
struct ServerGuard {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ServerGuard {
    async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let abort = handle.abort_handle();
            if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
                abort.abort();
            }
        }
    }
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
