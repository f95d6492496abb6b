//! # API Module
//!
//! HTTP handlers of the one-shot authorization listener started by
//! [`crate::server`].
//!
//! - [`login`] answers the root path with a `302` to the provider's consent
//!   page, so opening `http://localhost:{port}` in a browser starts the flow.
//! - [`callback`] receives the provider redirect, extracts the `code` query
//!   parameter and hands it to the waiting listener. A callback without a code
//!   (consent denied) is delivered as `None` so the listener still terminates.
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use spotcollect::api::{callback, login};
//!
//! let app = Router::new()
//!     .route("/", get(login))
//!     .route("/callback", get(callback));
//! ```

mod callback;
mod login;

pub use callback::{CodeSender, callback};
pub use login::{ConsentUrl, login};
