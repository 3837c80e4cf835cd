// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC-Lite Fragments
//!
//! Columnar BIM fragment documents and a batched edit engine on top of them.
//!
//! ## Overview
//!
//! A fragment document stores a model as parallel tables (materials,
//! representations, samples, transforms, items, relations) addressed by
//! slot index, each with a column of stable local ids. This crate provides:
//!
//! - **Codec**: compact little-endian binary layout, optionally zlib
//!   compressed, auto-detected on read
//! - **ID Solver**: mints local ids for new entities and resolves temp id
//!   references inside a batch
//! - **Delta Selection**: the minimal closed working set a batch touches
//! - **Document Builder**: applies a batch in two phases (slot assignment,
//!   then reverse-order table emission) to produce a full or delta document
//! - **Affected Items**: item ids whose geometry or data a batch changes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ifc_lite_fragments::{edit, new_model, parse_requests, EditOptions, ModelOptions};
//!
//! let model = new_model(&ModelOptions::default())?;
//! let requests = parse_requests(r#"[
//!     {"type": "CREATE_ITEM", "tempId": "wall", "data": {"category": "IFCWALL"}},
//!     {"type": "CREATE_MATERIAL", "data": {"r": 200, "g": 200, "b": 200, "a": 255}}
//! ]"#)?;
//!
//! let output = edit(&model, &requests, &EditOptions::default())?;
//! println!("created {:?}, affected {:?}", output.created, output.items);
//! ```
//!
//! ## Delta Mode
//!
//! With [`EditOptions::delta`] set, the output only holds the entities the
//! batch touches plus everything they reference, so the result is a small
//! but self-contained document. The affected item list is the same in both
//! modes.

pub mod attributes;
mod affected;
mod builder;
pub mod codec;
pub mod delta;
pub mod error;
pub mod geometry;
pub mod id_solver;
pub mod ids;
pub mod model;
pub mod options;
pub mod reader;
pub mod request;

pub use attributes::{AttributeValue, Attributes, ItemData, StringPool};
pub use builder::BuildStage;
pub use codec::{decode_document, decode_document_as, encode_document, Encoding};
pub use delta::DeltaSelection;
pub use error::{Error, Result};
pub use geometry::{RawAxis, RawCircleCurve, RawCircleExtrusion, RawGeometry, RawShell};
pub use id_solver::solve_ids;
pub use ids::{EntityKind, IdRef, LocalId};
pub use model::{Document, Material, Representation, RepresentationClass, SpatialNode, Transform};
pub use options::{EditOptions, ModelOptions};
pub use reader::{DocumentReader, SampleRefs};
pub use request::{
    parse_requests, requests_from_value, EditRequest, EntityData, GlobalTransformData,
    RelationPayload, RepresentationData, SampleData,
};

use tracing::{debug, info};

/// Result of [`edit`].
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutput {
    /// Encoded output document.
    pub document: Vec<u8>,
    /// Affected item ids, ascending.
    pub items: Vec<LocalId>,
    /// Ids minted for the batch's creates, in request order.
    pub created: Vec<LocalId>,
}

/// Result of [`edit_document`].
#[derive(Debug, Clone, PartialEq)]
pub struct EditResult {
    pub document: Document,
    pub items: Vec<LocalId>,
    pub created: Vec<LocalId>,
}

/// Applies `requests` to an encoded document and encodes the result.
///
/// The call is all-or-nothing: any error leaves no output.
pub fn edit(document: &[u8], requests: &[EditRequest], options: &EditOptions) -> Result<EditOutput> {
    let source = decode_document(document)?;
    let result = edit_document(&source, requests, options)?;
    let bytes = encode_document(&result.document, options.raw)?;

    info!(
        requests = requests.len(),
        delta = options.delta,
        raw = options.raw,
        bytes = bytes.len(),
        affected = result.items.len(),
        created = result.created.len(),
        "edited model"
    );
    Ok(EditOutput {
        document: bytes,
        items: result.items,
        created: result.created,
    })
}

/// Applies `requests` to a decoded document.
pub fn edit_document(
    source: &Document,
    requests: &[EditRequest],
    options: &EditOptions,
) -> Result<EditResult> {
    let reader = DocumentReader::new(source)?;

    let mut requests = requests.to_vec();
    let created = solve_ids(&mut requests, source.max_local_id)?;
    let plan = builder::BatchPlan::from_requests(&requests)?;

    // Computed in full mode too, so both modes report the same items.
    let selection = DeltaSelection::select(&reader, &requests)?;
    let document = builder::build(&reader, &plan, options.delta.then_some(&selection))?;
    let items = affected::affected_items(&reader, &requests, &plan, &selection)?;

    debug!(
        items = document.items.len(),
        samples = document.meshes.samples.len(),
        max_local_id = document.max_local_id,
        "built document"
    );
    Ok(EditResult {
        document,
        items,
        created,
    })
}

/// Encodes an empty model with a fresh v4 GUID.
pub fn new_model(options: &ModelOptions) -> Result<Vec<u8>> {
    let doc = Document::empty(uuid::Uuid::new_v4().to_string());
    encode_document(&doc, options.raw)
}
