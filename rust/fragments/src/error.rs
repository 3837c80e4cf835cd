// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for document decoding and editing.

use crate::ids::{EntityKind, LocalId};

/// Result type alias for fragment operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding or editing a fragment document.
///
/// Every error is fatal to the call that produced it. Nothing is committed
/// before an edit returns, so callers can drop the failed call and resubmit.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A reference does not resolve to a live entry in the table being built.
    #[error("referential integrity: {0}")]
    ReferentialIntegrity(String),

    /// Two entities of one kind were assigned the same local id.
    #[error("duplicate local id {id} in {kind} table")]
    DuplicateLocalId { kind: EntityKind, id: LocalId },

    /// Deletions exceed the entries available in a table.
    #[error(
        "negative count for {kind} table: {available} available, {created} created, {deleted} deleted"
    )]
    NegativeCount {
        kind: EntityKind,
        available: usize,
        created: usize,
        deleted: usize,
    },

    /// A representation class tag is neither shell nor circle extrusion.
    #[error("unsupported representation class tag {0}")]
    UnsupportedRepresentationClass(u8),

    /// A string reference has no matching temp id in the batch.
    #[error("unresolved temp id {0:?}")]
    UnresolvedTempId(String),

    /// Document bytes are truncated, malformed or inconsistent.
    #[error("malformed document: {0}")]
    Codec(String),

    /// Deflate stream could not be read or written.
    #[error("compression error: {0}")]
    Compression(#[from] std::io::Error),

    /// An edit request has an unknown type or a malformed payload.
    #[error("invalid edit request: {0}")]
    InvalidRequest(String),

    /// Request or attribute JSON could not be (de)serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Reference from one entity to another that is absent.
    pub fn missing(
        from: EntityKind,
        from_id: LocalId,
        target: EntityKind,
        target_id: LocalId,
    ) -> Self {
        Error::ReferentialIntegrity(format!(
            "{from} {from_id} references missing {target} {target_id}"
        ))
    }

    /// Update or delete naming an entity that does not exist.
    pub fn unknown(kind: EntityKind, id: LocalId) -> Self {
        Error::ReferentialIntegrity(format!("{kind} {id} does not exist"))
    }

    pub(crate) fn codec(msg: impl Into<String>) -> Self {
        Error::Codec(msg.into())
    }

    pub(crate) fn request(msg: impl Into<String>) -> Self {
        Error::InvalidRequest(msg.into())
    }
}
