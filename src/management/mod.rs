mod auth;
mod cache;

pub use auth::AuthMode;
pub use auth::AuthState;
pub use auth::SharedToken;
pub use auth::TokenManager;
pub use cache::CacheFile;
pub use cache::REFRESH_TOKEN_KEY;
pub use cache::TokenStore;
