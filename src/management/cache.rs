use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{Error, warning};

pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Persistence for the refresh token, the only credential that outlives a
/// process run.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load_refresh_token(&self) -> Result<Option<String>, Error>;
    async fn save_refresh_token(&self, token: &str) -> Result<(), Error>;
    async fn clear_refresh_token(&self) -> Result<(), Error>;
}

/// Flat key-value JSON document on local disk.
#[derive(Debug, Clone)]
pub struct CacheFile {
    path: PathBuf,
}

impl CacheFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("spotcollect/cache.json");
        path
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self, key: &str) -> Result<Option<String>, Error> {
        let map = self.load().await?;
        Ok(map.get(key).and_then(Value::as_str).map(str::to_string))
    }

    pub async fn write(&self, key: &str, value: &str) -> Result<(), Error> {
        let mut map = self.load().await?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.persist(&map).await
    }

    pub async fn remove(&self, key: &str) -> Result<(), Error> {
        let mut map = self.load().await?;
        if map.remove(key).is_some() {
            self.persist(&map).await?;
        }
        Ok(())
    }

    async fn load(&self) -> Result<Map<String, Value>, Error> {
        let content = match async_fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(Error::Io(e)),
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => {
                warning!(
                    "Ignoring unreadable cache file {}",
                    self.path.display()
                );
                Ok(Map::new())
            }
        }
    }

    async fn persist(&self, map: &Map<String, Value>) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                async_fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(map)?;
        async_fs::write(&self.path, json).await?;
        Ok(())
    }
}

impl Default for CacheFile {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

#[async_trait]
impl TokenStore for CacheFile {
    async fn load_refresh_token(&self) -> Result<Option<String>, Error> {
        Ok(self
            .read(REFRESH_TOKEN_KEY)
            .await?
            .filter(|token| !token.is_empty()))
    }

    async fn save_refresh_token(&self, token: &str) -> Result<(), Error> {
        self.write(REFRESH_TOKEN_KEY, token).await
    }

    async fn clear_refresh_token(&self) -> Result<(), Error> {
        self.remove(REFRESH_TOKEN_KEY).await
    }
}
