// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory form of a fragment document.
//!
//! Tables reference each other by slot index. Local ids only appear in the
//! parallel id columns, so a document snapshot is self-contained and can be
//! compacted freely as long as every slot reference is rewritten.

pub mod geometry;
pub mod items;
pub mod meshes;

pub use geometry::{
    Axis, AxisPart, CircleCurve, CircleExtrusion, Shell, ShellHole, ShellKind, Wire, WireSet,
};
pub use items::{AttributeList, Items, RelationData, Relations, SpatialNode};
pub use meshes::{
    Material, Meshes, RenderedFaces, Representation, RepresentationClass, Sample, Stroke,
    Transform,
};

use crate::error::{Error, Result};
use crate::ids::LocalId;

/// Root container of a BIM model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub guid: String,
    /// Opaque metadata blob, usually JSON.
    pub metadata: String,
    /// Upper bound of every local id handed out so far.
    pub max_local_id: LocalId,
    pub meshes: Meshes,
    pub items: Items,
    pub relations: Relations,
    pub spatial_structure: Option<SpatialNode>,
}

impl Document {
    /// Empty document with every table empty and `max_local_id = 1`.
    pub fn empty(guid: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            max_local_id: 1,
            ..Self::default()
        }
    }

    /// Structural consistency check run after decoding: parallel columns
    /// line up and every slot reference points inside its table.
    ///
    /// Representation class tags are not checked here; unknown tags only
    /// fail once an edit needs to interpret them.
    pub fn validate(&self) -> Result<()> {
        let m = &self.meshes;
        parallel("global_transform_ids", m.global_transform_ids.len(), m.global_transforms.len())?;
        parallel("meshes_items", m.meshes_items.len(), m.global_transforms.len())?;
        parallel("local_transform_ids", m.local_transform_ids.len(), m.local_transforms.len())?;
        parallel("material_ids", m.material_ids.len(), m.materials.len())?;
        parallel("representation_ids", m.representation_ids.len(), m.representations.len())?;
        parallel("sample_ids", m.sample_ids.len(), m.samples.len())?;

        let items = &self.items;
        parallel("item_categories", items.item_categories.len(), items.ids.len())?;
        parallel("guids", items.guids.len(), items.ids.len())?;
        parallel("item_attributes", items.item_attributes.len(), items.ids.len())?;
        parallel("relations", self.relations.data.len(), self.relations.items.len())?;

        for (slot, &item) in m.meshes_items.iter().enumerate() {
            in_table("meshes_items", slot, item, items.ids.len())?;
        }
        for (slot, sample) in m.samples.iter().enumerate() {
            in_table("sample global transform", slot, sample.global_transform, m.global_transforms.len())?;
            in_table("sample material", slot, sample.material, m.materials.len())?;
            in_table("sample representation", slot, sample.representation, m.representations.len())?;
            in_table("sample local transform", slot, sample.local_transform, m.local_transforms.len())?;
        }
        for (slot, rep) in m.representations.iter().enumerate() {
            if let Ok(class) = rep.class() {
                in_table("representation geometry", slot, rep.geometry, m.geometry_count(class))?;
            }
        }
        for (slot, &category) in items.item_categories.iter().enumerate() {
            in_table("item category", slot, category, items.categories.len())?;
        }
        for (slot, list) in items.item_attributes.iter().enumerate() {
            for &attr in list {
                in_table("item attribute", slot, attr, items.attributes.len())?;
            }
        }
        for (slot, &item) in self.relations.items.iter().enumerate() {
            in_table("relation item", slot, item, items.ids.len())?;
        }
        Ok(())
    }
}

fn parallel(column: &str, len: usize, expected: usize) -> Result<()> {
    if len != expected {
        return Err(Error::codec(format!(
            "column {column} has {len} entries, expected {expected}"
        )));
    }
    Ok(())
}

fn in_table(what: &str, slot: usize, target: u32, len: usize) -> Result<()> {
    if target as usize >= len {
        return Err(Error::codec(format!(
            "{what} at slot {slot} points to {target}, table has {len} entries"
        )));
    }
    Ok(())
}
