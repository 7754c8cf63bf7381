//! Persistent TTL cache for raw provider payloads.
//!
//! Plays the role the hosted deployment delegated to its caching HTTP
//! session: repeated provider requests inside the TTL are answered from disk
//! instead of going back out on the wire. The cache is owned by the provider
//! client and injected where needed; the pipelines themselves never touch it.

use crate::error::WxError;
use crate::Result;
use fjall::Keyspace;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task;

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    payload: Vec<u8>,
    expires_at: u64, // Unix timestamp (seconds)
}

pub struct PersistentCache {
    store: Keyspace,
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    Ok(store
        .get(key)
        .map_err(|e| WxError::cache(e.to_string()))?
        .map(|v| v.to_vec()))
}

fn unix_now() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| WxError::cache(e.to_string()))?
        .as_secs())
}

impl PersistentCache {
    /// Open (or create) the cache database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path)
            .open()
            .map_err(|e| WxError::cache(format!("Failed to open cache database: {e}")))?;
        let store = db
            .keyspace("provider_responses", fjall::KeyspaceCreateOptions::default)
            .map_err(|e| WxError::cache(e.to_string()))?;
        Ok(PersistentCache { store })
    }

    /// Stores a raw payload with a time-to-live (TTL).
    #[tracing::instrument(name = "put_cache", level = "debug", skip(self, payload))]
    pub async fn put(&self, key: &str, payload: Vec<u8>, ttl: Duration) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        let expires_at = unix_now()?.saturating_add(ttl.as_secs());
        let entry = StoredEntry {
            payload,
            expires_at,
        };
        let bytes = postcard::to_stdvec(&entry).map_err(|e| WxError::cache(e.to_string()))?;

        task::spawn_blocking(move || store.insert(key, bytes))
            .await
            .map_err(|e| WxError::cache(e.to_string()))?
            .map_err(|e| WxError::cache(e.to_string()))?;
        Ok(())
    }

    /// Retrieves a payload if it exists and has not expired.
    /// Returns `None` for cache misses or expired entries.
    #[tracing::instrument(name = "query_cache", level = "debug", skip(self))]
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        let maybe_bytes: Option<Vec<u8>> =
            task::spawn_blocking(move || get_from_store(store, key_bytes))
                .await
                .map_err(|e| WxError::cache(e.to_string()))??;

        if let Some(bytes) = maybe_bytes {
            let entry: StoredEntry =
                postcard::from_bytes(&bytes).map_err(|e| WxError::cache(e.to_string()))?;

            if unix_now()? < entry.expires_at {
                tracing::debug!("Key found and still fresh");
                Ok(Some(entry.payload))
            } else {
                tracing::debug!("Key found but expired");
                self.remove(key).await?;
                Ok(None)
            }
        } else {
            tracing::debug!("Key not found");
            Ok(None)
        }
    }

    /// Manually removes a key from the cache.
    pub async fn remove(&self, key: &str) -> Result<()> {
        let key = key.as_bytes().to_vec();
        let store = self.store.clone();
        task::spawn_blocking(move || store.remove(key))
            .await
            .map_err(|e| WxError::cache(e.to_string()))?
            .map_err(|e| WxError::cache(e.to_string()))?;
        Ok(())
    }
}
