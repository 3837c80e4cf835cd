// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Method dispatch for `POST /api/v1/call`.

use crate::error::ApiError;
use crate::services::DiskCache;
use crate::types::{CallRequest, CallResponse, DeleteResponse, DocumentPayload, EditArgs, EditResponse};
use crate::AppState;
use axum::{extract::State, Json};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ifc_lite_fragments::{requests_from_value, EditOptions, ModelOptions};
use serde_json::Value;

fn payload(bytes: &[u8]) -> DocumentPayload {
    DocumentPayload {
        document: STANDARD.encode(bytes),
        digest: DiskCache::digest(bytes),
        bytes: bytes.len(),
    }
}

fn model_id(request: &CallRequest) -> Result<String, ApiError> {
    request
        .model_id
        .clone()
        .ok_or_else(|| ApiError::InvalidArgs(format!("{} requires a modelId", request.method)))
}

fn args<T: serde::de::DeserializeOwned + Default>(value: Value) -> Result<T, ApiError> {
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(value)?)
}

/// POST /api/v1/call - Run one engine method.
pub async fn call(
    State(state): State<AppState>,
    Json(request): Json<CallRequest>,
) -> Result<Json<CallResponse>, ApiError> {
    tracing::debug!(method = %request.method, model_id = ?request.model_id, "Call");

    let (model_id, result) = match request.method.as_str() {
        "newModel" => {
            let options: ModelOptions = args(request.args.clone())?;
            let id = request
                .model_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let bytes = state.store.create(&id, options).await?;
            (Some(id), serde_json::to_value(payload(&bytes))?)
        }
        "edit" => {
            let edit: EditArgs = args(request.args.clone())?;
            let requests = requests_from_value(edit.requests)?;
            let options = EditOptions {
                raw: edit.raw,
                delta: edit.delta,
            };
            match (request.model_id.clone(), edit.document) {
                (Some(id), _) => {
                    let commit = state.store.edit(&id, requests, options).await?;
                    let response = EditResponse {
                        document: payload(&commit.document),
                        items: commit.items,
                        created: commit.created,
                    };
                    (Some(id), serde_json::to_value(response)?)
                }
                (None, Some(document)) => {
                    let source = STANDARD.decode(document)?;
                    let output = tokio::task::spawn_blocking(move || {
                        ifc_lite_fragments::edit(&source, &requests, &options)
                    })
                    .await??;
                    let response = EditResponse {
                        document: payload(&output.document),
                        items: output.items,
                        created: output.created,
                    };
                    (None, serde_json::to_value(response)?)
                }
                (None, None) => {
                    return Err(ApiError::InvalidArgs(
                        "edit requires a modelId or a document".to_string(),
                    ))
                }
            }
        }
        "getModel" => {
            let id = model_id(&request)?;
            let bytes = state.store.get(&id).await?;
            (Some(id), serde_json::to_value(payload(&bytes))?)
        }
        "deleteModel" => {
            let id = model_id(&request)?;
            let deleted = state.store.delete(&id).await?;
            (Some(id), serde_json::to_value(DeleteResponse { deleted })?)
        }
        other => return Err(ApiError::UnknownMethod(other.to_string())),
    };

    Ok(Json(CallResponse { model_id, result }))
}
