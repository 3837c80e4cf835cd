// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory model registry.
//!
//! Each model id owns an async mutex: edits on one model run one at a time
//! in arrival order, edits on different models run concurrently. The edit
//! itself is CPU-bound and runs on the blocking pool.

use std::sync::Arc;

use ifc_lite_fragments::{
    decode_document, edit_document, encode_document, new_model, EditOptions, EditRequest,
    LocalId, ModelOptions,
};
use rustc_hash::FxHashMap;
use tokio::sync::{Mutex, RwLock};

use super::DiskCache;
use crate::error::ApiError;

type Slot = Arc<Mutex<Option<Arc<Vec<u8>>>>>;

/// Outcome of a committed edit.
#[derive(Debug, Clone)]
pub struct EditCommit {
    /// Full document in full mode, the delta document in delta mode.
    pub document: Vec<u8>,
    pub items: Vec<LocalId>,
    pub created: Vec<LocalId>,
}

pub struct ModelStore {
    models: RwLock<FxHashMap<String, Slot>>,
    cache: Option<Arc<DiskCache>>,
}

impl ModelStore {
    /// Store that persists committed models to `cache` when given.
    pub fn new(cache: Option<Arc<DiskCache>>) -> Self {
        Self {
            models: RwLock::new(FxHashMap::default()),
            cache,
        }
    }

    async fn slot(&self, model_id: &str) -> Slot {
        if let Some(slot) = self.models.read().await.get(model_id) {
            return slot.clone();
        }
        self.models
            .write()
            .await
            .entry(model_id.to_string())
            .or_default()
            .clone()
    }

    /// Current document of a model, loading it from disk on first use.
    async fn current(&self, model_id: &str, stored: &mut Option<Arc<Vec<u8>>>) -> Result<Arc<Vec<u8>>, ApiError> {
        if let Some(bytes) = stored {
            return Ok(bytes.clone());
        }
        if let Some(cache) = &self.cache {
            if let Some(bytes) = cache.load(model_id).await? {
                tracing::debug!(model_id = %model_id, size = bytes.len(), "Loaded model from disk");
                let bytes = Arc::new(bytes);
                *stored = Some(bytes.clone());
                return Ok(bytes);
            }
        }
        Err(ApiError::NotFound(model_id.to_string()))
    }

    async fn commit(&self, model_id: &str, stored: &mut Option<Arc<Vec<u8>>>, bytes: Vec<u8>) -> Result<(), ApiError> {
        if let Some(cache) = &self.cache {
            cache.store(model_id, &bytes).await?;
        }
        *stored = Some(Arc::new(bytes));
        Ok(())
    }

    /// Creates an empty model, replacing any model stored under the id.
    pub async fn create(&self, model_id: &str, options: ModelOptions) -> Result<Arc<Vec<u8>>, ApiError> {
        let slot = self.slot(model_id).await;
        let mut stored = slot.lock().await;
        let bytes = new_model(&options)?;
        self.commit(model_id, &mut stored, bytes).await?;
        self.current(model_id, &mut stored).await
    }

    pub async fn get(&self, model_id: &str) -> Result<Arc<Vec<u8>>, ApiError> {
        let slot = self.slot(model_id).await;
        let mut stored = slot.lock().await;
        self.current(model_id, &mut stored).await
    }

    /// Applies a batch and commits the full result.
    ///
    /// The stored model always advances by the full document; in delta mode
    /// the caller gets the delta document built from the same source.
    pub async fn edit(
        &self,
        model_id: &str,
        requests: Vec<EditRequest>,
        options: EditOptions,
    ) -> Result<EditCommit, ApiError> {
        let slot = self.slot(model_id).await;
        let mut stored = slot.lock().await;
        let source = self.current(model_id, &mut stored).await?;

        let (full, commit) = tokio::task::spawn_blocking(move || {
            let doc = decode_document(&source)?;
            let full_options = EditOptions {
                delta: false,
                ..options
            };
            let full = edit_document(&doc, &requests, &full_options)?;
            let full_bytes = encode_document(&full.document, options.raw)?;

            let document = if options.delta {
                let delta = edit_document(&doc, &requests, &options)?;
                encode_document(&delta.document, options.raw)?
            } else {
                full_bytes.clone()
            };
            Ok::<_, ifc_lite_fragments::Error>((
                full_bytes,
                EditCommit {
                    document,
                    items: full.items,
                    created: full.created,
                },
            ))
        })
        .await??;

        self.commit(model_id, &mut stored, full).await?;
        tracing::info!(
            model_id = %model_id,
            delta = options.delta,
            affected = commit.items.len(),
            created = commit.created.len(),
            "Committed edit"
        );
        Ok(commit)
    }

    /// Drops a model from memory and disk. Returns whether it existed.
    ///
    /// The disk entry goes first, under the model lock, so a queued or
    /// later edit cannot reload the model.
    pub async fn delete(&self, model_id: &str) -> Result<bool, ApiError> {
        let slot = self.slot(model_id).await;
        let mut stored = slot.lock().await;
        let mut existed = stored.take().is_some();
        if let Some(cache) = &self.cache {
            existed |= cache.load(model_id).await?.is_some();
            cache.remove(model_id).await?;
        }
        self.models.write().await.remove(model_id);
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifc_lite_fragments::{parse_requests, DocumentReader, EntityKind};

    fn batch(json: &str) -> Vec<EditRequest> {
        parse_requests(json).unwrap()
    }

    #[tokio::test]
    async fn edits_advance_the_stored_model() {
        let store = ModelStore::new(None);
        store.create("m1", ModelOptions::default()).await.unwrap();

        let commit = store
            .edit(
                "m1",
                batch(r#"[{"type": "CREATE_ITEM", "tempId": "a", "data": {"category": "IFCWALL"}}]"#),
                EditOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(commit.created, vec![2]);

        let stored = store.get("m1").await.unwrap();
        let doc = decode_document(&stored).unwrap();
        let reader = DocumentReader::new(&doc).unwrap();
        assert!(reader.contains(EntityKind::Item, 2));
    }

    #[tokio::test]
    async fn failed_edit_leaves_the_model_untouched() {
        let store = ModelStore::new(None);
        let before = store.create("m1", ModelOptions::default()).await.unwrap();

        let result = store
            .edit(
                "m1",
                batch(r#"[{"type": "DELETE_MATERIAL", "localId": 4}]"#),
                EditOptions::default(),
            )
            .await;
        assert!(matches!(result, Err(ApiError::Fragments(_))));
        assert_eq!(store.get("m1").await.unwrap(), before);
    }

    #[tokio::test]
    async fn concurrent_edits_on_one_model_serialize() {
        let store = Arc::new(ModelStore::new(None));
        store.create("m1", ModelOptions::default()).await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let json = format!(
                    r#"[{{"type": "CREATE_ITEM", "data": {{"category": "IFCWALL{i}"}}}}]"#
                );
                store
                    .edit("m1", parse_requests(&json).unwrap(), EditOptions::default())
                    .await
                    .unwrap()
                    .created
            }));
        }
        let mut created: Vec<LocalId> = Vec::new();
        for task in tasks {
            created.extend(task.await.unwrap());
        }
        created.sort_unstable();
        assert_eq!(created, (2..10).collect::<Vec<_>>());

        let doc = decode_document(&store.get("m1").await.unwrap()).unwrap();
        assert_eq!(doc.items.len(), 8);
    }

    #[tokio::test]
    async fn queued_edit_after_delete_finds_nothing() {
        let dir = std::env::temp_dir().join(format!("fragments-store-{}", uuid::Uuid::new_v4()));
        let cache = Arc::new(DiskCache::new(&dir.to_string_lossy()).await);
        let store = Arc::new(ModelStore::new(Some(cache.clone())));
        store.create("m1", ModelOptions::default()).await.unwrap();

        // Hold the model lock so the edit queues behind the delete.
        let slot = store.slot("m1").await;
        let guard = slot.lock().await;
        let edit = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .edit(
                        "m1",
                        batch(r#"[{"type": "CREATE_ITEM", "data": {"category": "IFCWALL"}}]"#),
                        EditOptions::default(),
                    )
                    .await
            })
        };
        let delete = {
            let store = store.clone();
            tokio::spawn(async move { store.delete("m1").await })
        };
        tokio::task::yield_now().await;
        drop(guard);

        assert!(delete.await.unwrap().unwrap());
        // Either order is fine as long as nothing survives the delete.
        let _ = edit.await.unwrap();
        assert!(matches!(store.get("m1").await, Err(ApiError::NotFound(_))));
        assert!(cache.load("m1").await.unwrap().is_none());
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn missing_models_are_not_found() {
        let store = ModelStore::new(None);
        assert!(matches!(store.get("nope").await, Err(ApiError::NotFound(_))));
        assert!(!store.delete("nope").await.unwrap());
    }
}
