// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Document builder: source document + resolved batch → new document.
//!
//! Building runs in two phases. Phase A assigns every surviving or created
//! entity its new slot, stage by stage in [`BuildStage::ORDER`]; Phase B
//! emits the tables, rewriting every slot reference through the Phase A
//! maps. In delta mode only the entities of a [`DeltaSelection`] are
//! walked, and the result is a self-contained subset document.

mod emit;
mod geometry;
mod index;
mod plan;
mod relations;

use rustc_hash::FxHashSet;
use tracing::debug;

use self::emit::Emitter;
use self::geometry::GeometryLayout;
use self::index::{SlotMaps, TableIndex};
pub(crate) use self::plan::BatchPlan;
use self::plan::KindPlan;
use crate::delta::DeltaSelection;
use crate::error::Result;
use crate::ids::{EntityKind, LocalId};
use crate::model::{Document, RelationData, RepresentationClass, SpatialNode};
use crate::reader::DocumentReader;

/// Order in which Phase A visits the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    GlobalTransforms,
    Materials,
    LocalTransforms,
    Representations,
    Samples,
    Items,
    Relations,
}

impl BuildStage {
    pub const ORDER: [BuildStage; 7] = [
        BuildStage::GlobalTransforms,
        BuildStage::Materials,
        BuildStage::LocalTransforms,
        BuildStage::Representations,
        BuildStage::Samples,
        BuildStage::Items,
        BuildStage::Relations,
    ];

    /// Table the stage fills.
    pub fn kind(self) -> EntityKind {
        match self {
            BuildStage::GlobalTransforms => EntityKind::GlobalTransform,
            BuildStage::Materials => EntityKind::Material,
            BuildStage::LocalTransforms => EntityKind::LocalTransform,
            BuildStage::Representations => EntityKind::Representation,
            BuildStage::Samples => EntityKind::Sample,
            BuildStage::Items => EntityKind::Item,
            BuildStage::Relations => EntityKind::Relation,
        }
    }
}

/// Applies `plan` to the document behind `reader`.
///
/// With a `selection` the output only holds the selected entities; without
/// one every table is rebuilt.
pub(crate) fn build(
    reader: &DocumentReader<'_>,
    plan: &BatchPlan,
    selection: Option<&DeltaSelection>,
) -> Result<Document> {
    let source = reader.document();
    let subset = |kind: EntityKind| selection.map(|s| s.selected(kind));

    let relations = relations::cascade(
        reader,
        &plan.relations,
        &plan.items.delete,
        subset(EntityKind::Relation),
    );

    let mut slots = SlotMaps::default();
    for stage in BuildStage::ORDER {
        let kind = stage.kind();
        slots.0[kind] = assign(kind, reader, plan, &relations, subset(kind))?;
    }

    let available = selection.map(|s| {
        (
            s.geometry(RepresentationClass::Shell),
            s.geometry(RepresentationClass::CircleExtrusion),
        )
    });
    let layout = GeometryLayout::assign(
        reader,
        &slots.0[EntityKind::Representation],
        &plan.representations,
        available,
    )?;

    let emitter = Emitter {
        reader,
        plan,
        relations: &relations,
        slots: &slots,
        layout: &layout,
    };
    let meshes = emitter.meshes()?;
    let items = emitter.items()?;
    let relations = emitter.relations()?;

    let max_local_id = [Some(source.max_local_id), plan.highest_created(), plan.max_local_id]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(source.max_local_id);

    Ok(Document {
        guid: source.guid.clone(),
        metadata: plan.metadata.clone().unwrap_or_else(|| source.metadata.clone()),
        max_local_id,
        meshes,
        items,
        relations,
        spatial_structure: spatial_structure(reader, plan, selection.is_some()),
    })
}

fn assign(
    kind: EntityKind,
    reader: &DocumentReader<'_>,
    plan: &BatchPlan,
    relations: &KindPlan<RelationData>,
    subset: Option<&FxHashSet<LocalId>>,
) -> Result<TableIndex> {
    match kind {
        EntityKind::Material => assign_table(kind, reader, &plan.materials, subset),
        EntityKind::Representation => assign_table(kind, reader, &plan.representations, subset),
        EntityKind::Sample => assign_table(kind, reader, &plan.samples, subset),
        EntityKind::GlobalTransform => {
            assign_table(kind, reader, &plan.global_transforms, subset)
        }
        EntityKind::LocalTransform => assign_table(kind, reader, &plan.local_transforms, subset),
        EntityKind::Item => assign_table(kind, reader, &plan.items, subset),
        EntityKind::Relation => assign_table(kind, reader, relations, subset),
    }
}

fn assign_table<T>(
    kind: EntityKind,
    reader: &DocumentReader<'_>,
    plan: &KindPlan<T>,
    subset: Option<&FxHashSet<LocalId>>,
) -> Result<TableIndex> {
    let index = TableIndex::assign(kind, reader, plan, subset)?;
    debug!(
        table = %kind,
        entries = index.len(),
        created = plan.create.len(),
        updated = plan.update.len(),
        deleted = plan.delete.len(),
        "assigned slots"
    );
    Ok(index)
}

/// Spatial tree of the output, with deleted items pruned.
///
/// A delta document only carries the tree when the batch changes it.
fn spatial_structure(
    reader: &DocumentReader<'_>,
    plan: &BatchPlan,
    delta: bool,
) -> Option<SpatialNode> {
    let deleted = &plan.items.delete;
    let mut root = match &plan.spatial_structure {
        Some(root) => root.clone(),
        None if delta && deleted.is_empty() => return None,
        None => reader.spatial_structure()?.clone(),
    };
    if !deleted.is_empty() {
        root.prune(&|id| deleted.contains(&id));
    }
    Some(root)
}
