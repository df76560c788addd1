//! # Template Asset Storage
//!
//! The gateway only ever reads from the template store; objects are written
//! out of band by the deployment tooling. Lookups go through [`AssetStore`]
//! so the resolver can run against an in-memory map in tests.

use async_trait::async_trait;
use worker::kv::KvStore;

use crate::errors::{AppError, AppResult};

/// Read-only key-value access to stored assets.
#[async_trait(?Send)]
pub trait AssetStore {
    /// Returns the stored bytes, or `None` when the key does not exist.
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>>;
}

/// [`AssetStore`] backed by a Workers KV namespace.
pub struct KvAssetStore {
    kv: KvStore,
}

impl KvAssetStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }
}

#[async_trait(?Send)]
impl AssetStore for KvAssetStore {
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        self.kv
            .get(key)
            .bytes()
            .await
            .map_err(|e| AppError::Worker(e.into()))
    }
}
