// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Minimal working set of a batch.
//!
//! Selection seeds the ids a batch names directly, widens them through the
//! sample graph (item → global transform → sample → material,
//! representation, local transform) and finally closes over every reference
//! a retained entity still needs. Deleted ids stay in the selection so table
//! sizes can be accounted for, but are never retained.

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::error::{Error, Result};
use crate::ids::{EntityKind, KindMap, LocalId};
use crate::model::RepresentationClass;
use crate::reader::{DocumentReader, SampleRefs};
use crate::request::{EditRequest, EntityData};

/// Sample-graph widening passes. Covers item → global transform → sample →
/// {material, representation, local transform}.
const EXPANSION_PASSES: usize = 2;

type IdSet = FxHashSet<LocalId>;

/// Entities of the source document a batch touches.
#[derive(Debug, Clone, Default)]
pub struct DeltaSelection {
    selected: KindMap<IdSet>,
    deleted: KindMap<IdSet>,
    shells: FxHashSet<u32>,
    circle_extrusions: FxHashSet<u32>,
}

impl DeltaSelection {
    /// Computes the selection of a resolved batch against `reader`.
    pub fn select(reader: &DocumentReader<'_>, requests: &[EditRequest]) -> Result<Self> {
        let mut selection = DeltaSelection::default();
        let mut required: KindMap<IdSet> = KindMap::default();

        for request in requests {
            selection.seed(reader, request, &mut required)?;
        }
        selection.seed_relation_cascade(reader);
        selection.expand(reader);
        selection.close(reader, &required);
        selection.project(reader)?;

        debug!(
            materials = selection.retained_count(EntityKind::Material),
            representations = selection.retained_count(EntityKind::Representation),
            samples = selection.retained_count(EntityKind::Sample),
            global_transforms = selection.retained_count(EntityKind::GlobalTransform),
            local_transforms = selection.retained_count(EntityKind::LocalTransform),
            items = selection.retained_count(EntityKind::Item),
            relations = selection.retained_count(EntityKind::Relation),
            "delta selection"
        );
        Ok(selection)
    }

    /// Ids of `kind` in the working set, deleted ones included.
    pub fn selected(&self, kind: EntityKind) -> &FxHashSet<LocalId> {
        &self.selected[kind]
    }

    /// Ids of `kind` the batch deletes.
    pub fn deleted(&self, kind: EntityKind) -> &FxHashSet<LocalId> {
        &self.deleted[kind]
    }

    /// Whether `id` survives into a delta document.
    #[inline]
    pub fn retains(&self, kind: EntityKind, id: LocalId) -> bool {
        self.selected[kind].contains(&id) && !self.deleted[kind].contains(&id)
    }

    pub fn retained(&self, kind: EntityKind) -> impl Iterator<Item = LocalId> + '_ {
        self.selected[kind]
            .iter()
            .copied()
            .filter(move |id| !self.deleted[kind].contains(id))
    }

    pub fn retained_count(&self, kind: EntityKind) -> usize {
        self.retained(kind).count()
    }

    /// Source geometry indices backing the retained representations.
    pub fn geometry(&self, class: RepresentationClass) -> &FxHashSet<u32> {
        match class {
            RepresentationClass::Shell => &self.shells,
            RepresentationClass::CircleExtrusion => &self.circle_extrusions,
        }
    }

    fn seed_existing(&mut self, reader: &DocumentReader<'_>, kind: EntityKind, id: LocalId) {
        if reader.contains(kind, id) {
            self.selected[kind].insert(id);
        }
    }

    fn seed(
        &mut self,
        reader: &DocumentReader<'_>,
        request: &EditRequest,
        required: &mut KindMap<IdSet>,
    ) -> Result<()> {
        match request {
            EditRequest::Create(create) => {
                let id = create.local_id.as_ref().map(|r| r.id()).transpose()?;
                self.seed_payload(reader, &create.data, id, required)?;
            }
            EditRequest::Update(update) => {
                let id = update.local_id.id()?;
                self.seed_existing(reader, update.data.kind(), id);
                self.seed_payload(reader, &update.data, Some(id), required)?;
            }
            EditRequest::Delete(delete) => {
                let id = delete.local_id.id()?;
                self.seed_existing(reader, delete.kind, id);
                self.deleted[delete.kind].insert(id);
                if delete.kind == EntityKind::Relation {
                    self.seed_existing(reader, EntityKind::Item, id);
                }
            }
            EditRequest::UpdateMetadata(_)
            | EditRequest::UpdateSpatialStructure(_)
            | EditRequest::UpdateMaxLocalId(_) => {}
        }
        Ok(())
    }

    fn seed_payload(
        &mut self,
        reader: &DocumentReader<'_>,
        data: &EntityData,
        id: Option<LocalId>,
        required: &mut KindMap<IdSet>,
    ) -> Result<()> {
        match data {
            EntityData::GlobalTransform(gt) => {
                let item = gt.item_id.id()?;
                self.seed_existing(reader, EntityKind::Item, item);
                required[EntityKind::Item].insert(item);
            }
            EntityData::Sample(sample) => {
                let gt = sample.global_transform.id()?;
                self.seed_existing(reader, EntityKind::GlobalTransform, gt);
                required[EntityKind::GlobalTransform].insert(gt);
                required[EntityKind::Material].insert(sample.material.id()?);
                required[EntityKind::Representation].insert(sample.representation.id()?);
                required[EntityKind::LocalTransform].insert(sample.local_transform.id()?);
            }
            EntityData::Relation(_) => {
                if let Some(owner) = id {
                    self.seed_existing(reader, EntityKind::Relation, owner);
                    self.seed_existing(reader, EntityKind::Item, owner);
                }
            }
            EntityData::Material(_)
            | EntityData::Representation(_)
            | EntityData::LocalTransform(_)
            | EntityData::Item(_) => {}
        }
        Ok(())
    }

    /// Relation rows naming a deleted item change too.
    fn seed_relation_cascade(&mut self, reader: &DocumentReader<'_>) {
        if self.deleted[EntityKind::Item].is_empty() {
            return;
        }
        let rows = reader
            .local_ids(EntityKind::Relation)
            .iter()
            .zip(&reader.document().relations.data);
        let mut owners = Vec::new();
        for (&owner, data) in rows {
            let names_deleted = data
                .values()
                .flatten()
                .any(|target| self.deleted[EntityKind::Item].contains(target));
            if names_deleted {
                owners.push(owner);
            }
        }
        for owner in owners {
            self.selected[EntityKind::Relation].insert(owner);
            self.selected[EntityKind::Item].insert(owner);
        }
    }

    /// Pulls in every sample touching a seeded entity, with everything that
    /// sample references.
    fn expand(&mut self, reader: &DocumentReader<'_>) {
        let samples: Vec<(LocalId, SampleRefs, Option<LocalId>)> = reader
            .local_ids(EntityKind::Sample)
            .iter()
            .enumerate()
            .filter_map(|(slot, &id)| {
                let refs = reader.sample_refs_at(slot)?;
                let owner = reader.global_transform_owner(refs.global_transform);
                Some((id, refs, owner))
            })
            .collect();

        for _ in 0..EXPANSION_PASSES {
            let seeds = self.selected.clone();
            let touches = |kind: EntityKind, id: LocalId| seeds[kind].contains(&id);
            for (id, refs, owner) in &samples {
                let hit = touches(EntityKind::Sample, *id)
                    || touches(EntityKind::GlobalTransform, refs.global_transform)
                    || touches(EntityKind::Material, refs.material)
                    || touches(EntityKind::Representation, refs.representation)
                    || touches(EntityKind::LocalTransform, refs.local_transform)
                    || owner.is_some_and(|item| touches(EntityKind::Item, item));
                if hit {
                    self.selected[EntityKind::Sample].insert(*id);
                    self.add_sample_refs(refs, *owner);
                }
            }
        }
    }

    /// Adds whatever retained entities reference, without widening further.
    fn close(&mut self, reader: &DocumentReader<'_>, required: &KindMap<IdSet>) {
        let samples: Vec<LocalId> = self.retained(EntityKind::Sample).collect();
        for id in samples {
            if let Some(refs) = reader.sample_refs(id) {
                let owner = reader.global_transform_owner(refs.global_transform);
                self.add_sample_refs(&refs, owner);
            }
        }

        let transforms: Vec<LocalId> = self.retained(EntityKind::GlobalTransform).collect();
        for id in transforms {
            if let Some(item) = reader.global_transform_owner(id) {
                self.selected[EntityKind::Item].insert(item);
            }
        }

        for (kind, ids) in required.iter() {
            for &id in ids {
                self.seed_existing(reader, kind, id);
            }
        }

        // Relation rows travel with their owning item.
        let owners: Vec<LocalId> = self.retained(EntityKind::Item).collect();
        for item in owners {
            self.seed_existing(reader, EntityKind::Relation, item);
        }
    }

    fn add_sample_refs(&mut self, refs: &SampleRefs, owner: Option<LocalId>) {
        self.selected[EntityKind::GlobalTransform].insert(refs.global_transform);
        self.selected[EntityKind::Material].insert(refs.material);
        self.selected[EntityKind::Representation].insert(refs.representation);
        self.selected[EntityKind::LocalTransform].insert(refs.local_transform);
        if let Some(item) = owner {
            self.selected[EntityKind::Item].insert(item);
        }
    }

    fn project(&mut self, reader: &DocumentReader<'_>) -> Result<()> {
        let retained: Vec<LocalId> = self.retained(EntityKind::Representation).collect();
        for id in retained {
            let rep = reader
                .representation(id)
                .ok_or_else(|| Error::unknown(EntityKind::Representation, id))?;
            match rep.class()? {
                RepresentationClass::Shell => self.shells.insert(rep.geometry),
                RepresentationClass::CircleExtrusion => self.circle_extrusions.insert(rep.geometry),
            };
        }
        Ok(())
    }
}
