// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types and handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ifc_lite_fragments::Error as FragmentsError;
use serde::Serialize;
use thiserror::Error;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Model not found: {0}")]
    NotFound(String),

    #[error("Edit failed: {0}")]
    Fragments(#[from] FragmentsError),

    #[error("Invalid base64 document: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Join error")]
    Join(#[from] tokio::task::JoinError),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::UnknownMethod(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_METHOD"),
            ApiError::InvalidArgs(_) => (StatusCode::BAD_REQUEST, "INVALID_ARGS"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Base64(_) => (StatusCode::BAD_REQUEST, "INVALID_BASE64"),
            ApiError::Cache(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CACHE_ERROR"),
            ApiError::Join(_) => (StatusCode::INTERNAL_SERVER_ERROR, "TASK_ERROR"),
            ApiError::Fragments(err) => match err {
                FragmentsError::ReferentialIntegrity(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "REFERENTIAL_INTEGRITY")
                }
                FragmentsError::DuplicateLocalId { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "DUPLICATE_LOCAL_ID")
                }
                FragmentsError::NegativeCount { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "NEGATIVE_COUNT")
                }
                FragmentsError::UnsupportedRepresentationClass(_) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "UNSUPPORTED_REPRESENTATION_CLASS",
                ),
                FragmentsError::UnresolvedTempId(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "UNRESOLVED_TEMP_ID")
                }
                FragmentsError::Codec(_) => (StatusCode::BAD_REQUEST, "CODEC_ERROR"),
                FragmentsError::Compression(_) => (StatusCode::BAD_REQUEST, "COMPRESSION_ERROR"),
                FragmentsError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
                FragmentsError::Json(_) => (StatusCode::BAD_REQUEST, "JSON_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code, "Call failed");
        } else {
            tracing::debug!(error = %self, code, "Call rejected");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<cacache::Error> for ApiError {
    fn from(err: cacache::Error) -> Self {
        ApiError::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InvalidArgs(err.to_string())
    }
}
