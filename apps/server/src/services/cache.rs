// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Disk-based model persistence using cacache.

use crate::error::ApiError;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Content-addressable disk cache, keyed by model id.
#[derive(Debug, Clone)]
pub struct DiskCache {
    cache_dir: PathBuf,
}

impl DiskCache {
    /// Create a new cache in the specified directory.
    pub async fn new(cache_dir: &str) -> Self {
        let path = PathBuf::from(cache_dir);

        if let Err(e) = tokio::fs::create_dir_all(&path).await {
            tracing::warn!(
                error = %e,
                path = %path.display(),
                "Failed to create cache directory"
            );
        }

        Self { cache_dir: path }
    }

    /// SHA-256 hex digest of document bytes.
    pub fn digest(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    fn key(model_id: &str) -> String {
        format!("model:{model_id}")
    }

    /// Stored document of a model, if any.
    pub async fn load(&self, model_id: &str) -> Result<Option<Vec<u8>>, ApiError> {
        match cacache::read(&self.cache_dir, Self::key(model_id)).await {
            Ok(data) => Ok(Some(data)),
            Err(cacache::Error::EntryNotFound(_, _)) => Ok(None),
            Err(e) => Err(ApiError::Cache(e.to_string())),
        }
    }

    pub async fn store(&self, model_id: &str, data: &[u8]) -> Result<(), ApiError> {
        cacache::write(&self.cache_dir, Self::key(model_id), data).await?;
        tracing::debug!(model_id = %model_id, size = data.len(), "Persisted model");
        Ok(())
    }

    pub async fn remove(&self, model_id: &str) -> Result<(), ApiError> {
        match cacache::remove(&self.cache_dir, Self::key(model_id)).await {
            Ok(()) | Err(cacache::Error::EntryNotFound(_, _)) => Ok(()),
            Err(e) => Err(ApiError::Cache(e.to_string())),
        }
    }
}
