// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire types of the call endpoint.

use ifc_lite_fragments::LocalId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope of `POST /api/v1/call`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(default)]
    pub model_id: Option<String>,
    pub method: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    pub result: Value,
}

/// Arguments of `edit`.
///
/// `requests` stays a raw value so request parsing errors surface as
/// engine errors rather than envelope errors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditArgs {
    pub requests: Value,
    pub raw: bool,
    pub delta: bool,
    /// Base64 source document for a stateless edit without a `modelId`.
    pub document: Option<String>,
}

/// An encoded document as returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPayload {
    /// Base64 of the document bytes.
    pub document: String,
    /// SHA-256 hex of the document bytes.
    pub digest: String,
    pub bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResponse {
    #[serde(flatten)]
    pub document: DocumentPayload,
    pub items: Vec<LocalId>,
    pub created: Vec<LocalId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}
