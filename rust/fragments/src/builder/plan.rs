// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Partition of a resolved batch into per-table create/update/delete sets.

use std::hash::BuildHasherDefault;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHasher;

use crate::attributes::ItemData;
use crate::error::{Error, Result};
use crate::ids::{EntityKind, LocalId};
use crate::model::{Material, RelationData, SpatialNode, Transform};
use crate::reader::SampleRefs;
use crate::request::{EditRequest, EntityData, RelationPayload, RepresentationData};

pub(crate) type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;
pub(crate) type FxIndexSet<K> = IndexSet<K, BuildHasherDefault<FxHasher>>;

/// Global transform payload with its owner resolved.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GlobalTransformRow {
    pub transform: Transform,
    pub item: LocalId,
}

/// Pending changes to one table, in request order.
#[derive(Debug, Clone)]
pub(crate) struct KindPlan<T> {
    pub create: FxIndexMap<LocalId, T>,
    pub update: FxIndexMap<LocalId, T>,
    pub delete: FxIndexSet<LocalId>,
}

impl<T> Default for KindPlan<T> {
    fn default() -> Self {
        Self {
            create: FxIndexMap::default(),
            update: FxIndexMap::default(),
            delete: FxIndexSet::default(),
        }
    }
}

impl<T> KindPlan<T> {
    fn create(&mut self, kind: EntityKind, id: LocalId, data: T) -> Result<()> {
        if self.create.contains_key(&id) {
            return Err(Error::DuplicateLocalId { kind, id });
        }
        self.create.insert(id, data);
        Ok(())
    }

    fn update(&mut self, id: LocalId, data: T) {
        if let Some(created) = self.create.get_mut(&id) {
            *created = data;
        } else if !self.delete.contains(&id) {
            self.update.insert(id, data);
        }
    }

    fn delete(&mut self, id: LocalId) {
        if self.create.shift_remove(&id).is_some() {
            return;
        }
        self.update.shift_remove(&id);
        self.delete.insert(id);
    }

    fn route(&mut self, kind: EntityKind, id: LocalId, data: T, create: bool) -> Result<()> {
        if create {
            self.create(kind, id, data)
        } else {
            self.update(id, data);
            Ok(())
        }
    }

    /// New payload for `id`, if the batch creates or updates it.
    pub fn payload(&self, id: LocalId) -> Option<&T> {
        self.update.get(&id).or_else(|| self.create.get(&id))
    }
}

/// A resolved batch, split per table.
#[derive(Debug, Default)]
pub(crate) struct BatchPlan {
    pub materials: KindPlan<Material>,
    pub representations: KindPlan<RepresentationData>,
    pub samples: KindPlan<SampleRefs>,
    pub global_transforms: KindPlan<GlobalTransformRow>,
    pub local_transforms: KindPlan<Transform>,
    pub items: KindPlan<ItemData>,
    pub relations: KindPlan<RelationData>,
    pub metadata: Option<String>,
    pub spatial_structure: Option<SpatialNode>,
    pub max_local_id: Option<LocalId>,
}

impl BatchPlan {
    /// Partitions `requests`, which must already be id-solved.
    pub fn from_requests(requests: &[EditRequest]) -> Result<Self> {
        let mut plan = BatchPlan::default();
        for request in requests {
            match request {
                EditRequest::Create(create) => {
                    let id = match &create.local_id {
                        Some(local_id) => local_id.id()?,
                        None => {
                            return Err(Error::request(format!(
                                "create {} has no local id",
                                create.data.kind()
                            )))
                        }
                    };
                    plan.apply(id, &create.data, true)?;
                }
                EditRequest::Update(update) => {
                    plan.apply(update.local_id.id()?, &update.data, false)?;
                }
                EditRequest::Delete(delete) => {
                    let id = delete.local_id.id()?;
                    match delete.kind {
                        EntityKind::Material => plan.materials.delete(id),
                        EntityKind::Representation => plan.representations.delete(id),
                        EntityKind::Sample => plan.samples.delete(id),
                        EntityKind::GlobalTransform => plan.global_transforms.delete(id),
                        EntityKind::LocalTransform => plan.local_transforms.delete(id),
                        EntityKind::Item => plan.items.delete(id),
                        EntityKind::Relation => plan.relations.delete(id),
                    }
                }
                EditRequest::UpdateMetadata(metadata) => plan.metadata = Some(metadata.clone()),
                EditRequest::UpdateSpatialStructure(root) => {
                    plan.spatial_structure = Some(root.clone())
                }
                EditRequest::UpdateMaxLocalId(id) => {
                    plan.max_local_id = Some(plan.max_local_id.map_or(*id, |m| m.max(*id)));
                }
            }
        }
        Ok(plan)
    }

    fn apply(&mut self, id: LocalId, data: &EntityData, create: bool) -> Result<()> {
        match data {
            EntityData::Material(m) => {
                self.materials.route(EntityKind::Material, id, *m, create)
            }
            EntityData::Representation(r) => {
                self.representations
                    .route(EntityKind::Representation, id, r.clone(), create)
            }
            EntityData::Sample(s) => {
                let refs = SampleRefs {
                    global_transform: s.global_transform.id()?,
                    material: s.material.id()?,
                    representation: s.representation.id()?,
                    local_transform: s.local_transform.id()?,
                };
                self.samples.route(EntityKind::Sample, id, refs, create)
            }
            EntityData::GlobalTransform(gt) => {
                let row = GlobalTransformRow {
                    transform: gt.transform,
                    item: gt.item_id.id()?,
                };
                self.global_transforms
                    .route(EntityKind::GlobalTransform, id, row, create)
            }
            EntityData::LocalTransform(t) => {
                self.local_transforms
                    .route(EntityKind::LocalTransform, id, *t, create)
            }
            EntityData::Item(item) => self.items.route(EntityKind::Item, id, item.clone(), create),
            EntityData::Relation(relation) => {
                let row = resolve_relation(relation)?;
                self.relations.route(EntityKind::Relation, id, row, create)
            }
        }
    }

    /// Highest id the batch creates, across all tables.
    pub fn highest_created(&self) -> Option<LocalId> {
        [
            self.materials.create.keys().max(),
            self.representations.create.keys().max(),
            self.samples.create.keys().max(),
            self.global_transforms.create.keys().max(),
            self.local_transforms.create.keys().max(),
            self.items.create.keys().max(),
        ]
        .into_iter()
        .flatten()
        .max()
        .copied()
    }
}

fn resolve_relation(payload: &RelationPayload) -> Result<RelationData> {
    payload
        .0
        .iter()
        .map(|(name, targets)| {
            let ids = targets.iter().map(|t| t.id()).collect::<Result<Vec<_>>>()?;
            Ok((name.clone(), ids))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdRef;

    fn material(r: u8) -> Material {
        Material::rgba(r, 0, 0, 255)
    }

    #[test]
    fn update_of_created_entity_replaces_payload() {
        let plan = BatchPlan::from_requests(&[
            EditRequest::create(material(1)).with_local_id(IdRef::Resolved(50)),
            EditRequest::update(50, material(2)),
        ])
        .unwrap();
        assert_eq!(plan.materials.create[&50], material(2));
        assert!(plan.materials.update.is_empty());
    }

    #[test]
    fn delete_cancels_create_and_beats_update() {
        let plan = BatchPlan::from_requests(&[
            EditRequest::create(material(1)).with_local_id(IdRef::Resolved(50)),
            EditRequest::delete(EntityKind::Material, 50),
            EditRequest::update(10, material(3)),
            EditRequest::delete(EntityKind::Material, 10),
            EditRequest::update(10, material(4)),
            EditRequest::delete(EntityKind::Material, 10),
        ])
        .unwrap();
        assert!(plan.materials.create.is_empty());
        assert!(plan.materials.update.is_empty());
        assert_eq!(plan.materials.delete.len(), 1);
    }

    #[test]
    fn repeated_create_is_a_duplicate() {
        let result = BatchPlan::from_requests(&[
            EditRequest::create(material(1)).with_local_id(IdRef::Resolved(50)),
            EditRequest::create(material(2)).with_local_id(IdRef::Resolved(50)),
        ]);
        assert!(matches!(
            result,
            Err(Error::DuplicateLocalId { kind: EntityKind::Material, id: 50 })
        ));
    }

    #[test]
    fn unsolved_requests_are_rejected() {
        let result = BatchPlan::from_requests(&[EditRequest::create(material(1))]);
        assert!(matches!(result, Err(Error::InvalidRequest(_))));

        let result = BatchPlan::from_requests(&[EditRequest::create(material(1))
            .with_local_id(IdRef::from("tmp"))]);
        assert!(matches!(result, Err(Error::UnresolvedTempId(_))));
    }

    #[test]
    fn max_local_id_updates_keep_the_largest() {
        let plan = BatchPlan::from_requests(&[
            EditRequest::UpdateMaxLocalId(90),
            EditRequest::UpdateMaxLocalId(40),
            EditRequest::create(material(1)).with_local_id(IdRef::Resolved(120)),
        ])
        .unwrap();
        assert_eq!(plan.max_local_id, Some(90));
        assert_eq!(plan.highest_created(), Some(120));
    }
}
