// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Phase B: table emission.
//!
//! Every table is written from its last slot down to slot 0 into a
//! [`ReverseTable`]. Slot references are rewritten through the Phase A
//! maps, so a reference to anything that did not survive fails here.

use super::geometry::{materialize, GeometryLayout};
use super::index::{Origin, SlotMaps, TableIndex};
use super::plan::{BatchPlan, KindPlan};
use crate::attributes::{intern_attributes, StringPool};
use crate::codec::table::ReverseTable;
use crate::error::{Error, Result};
use crate::ids::{EntityKind, LocalId};
use crate::model::{AttributeList, Items, Meshes, RelationData, Relations, Sample, Transform};
use crate::reader::DocumentReader;

/// Writes `len` entries, highest slot first, and returns them in slot order.
fn emit<T>(
    name: &'static str,
    len: usize,
    mut row: impl FnMut(usize) -> Result<T>,
) -> Result<Vec<T>> {
    let mut table = ReverseTable::with_len(name, len);
    while let Some(slot) = table.next_slot() {
        let value = row(slot)?;
        table.push(slot, value)?;
    }
    table.finish()
}

/// Payload of an output slot: batch payload first, then the source row.
fn payload<'a, T>(
    kind: EntityKind,
    index: &TableIndex,
    plan: &'a KindPlan<T>,
    source: &'a [T],
    slot: usize,
) -> Result<(LocalId, &'a T)> {
    let id = index.ids[slot];
    if let Some(data) = plan.payload(id) {
        return Ok((id, data));
    }
    match index.origins[slot] {
        Origin::Source(old) => source
            .get(old)
            .map(|data| (id, data))
            .ok_or_else(|| Error::codec(format!("{kind} slot {old} out of range"))),
        Origin::Created => Err(Error::codec(format!("created {kind} {id} has no payload"))),
    }
}

pub(crate) struct Emitter<'r, 'a> {
    pub reader: &'r DocumentReader<'a>,
    pub plan: &'r BatchPlan,
    pub relations: &'r KindPlan<RelationData>,
    pub slots: &'r SlotMaps,
    pub layout: &'r GeometryLayout,
}

impl Emitter<'_, '_> {
    pub fn meshes(&self) -> Result<Meshes> {
        let source = &self.reader.document().meshes;
        let maps = &self.slots.0;

        let materials = &maps[EntityKind::Material];
        let local = &maps[EntityKind::LocalTransform];
        let reps = &maps[EntityKind::Representation];
        let samples = &maps[EntityKind::Sample];
        let (global_transforms, meshes_items) = self.global_transforms()?;

        Ok(Meshes {
            global_transform_ids: maps[EntityKind::GlobalTransform].ids.clone(),
            global_transforms,
            meshes_items,

            local_transforms: emit("local_transforms", local.len(), |slot| {
                payload(
                    EntityKind::LocalTransform,
                    local,
                    &self.plan.local_transforms,
                    &source.local_transforms,
                    slot,
                )
                .map(|(_, t)| *t)
            })?,
            local_transform_ids: local.ids.clone(),

            materials: emit("materials", materials.len(), |slot| {
                payload(
                    EntityKind::Material,
                    materials,
                    &self.plan.materials,
                    &source.materials,
                    slot,
                )
                .map(|(_, m)| *m)
            })?,
            material_ids: materials.ids.clone(),

            representations: emit("representations", reps.len(), |slot| {
                self.layout
                    .representations
                    .get(slot)
                    .copied()
                    .ok_or_else(|| Error::codec("representation layout out of step"))
            })?,
            representation_ids: reps.ids.clone(),

            shells: emit("shells", self.layout.shells.len(), |slot| {
                materialize(&self.layout.shells[slot], &source.shells, "shell")
            })?,
            circle_extrusions: emit(
                "circle_extrusions",
                self.layout.circle_extrusions.len(),
                |slot| {
                    materialize(
                        &self.layout.circle_extrusions[slot],
                        &source.circle_extrusions,
                        "circle extrusion",
                    )
                },
            )?,

            samples: emit("samples", samples.len(), |slot| self.sample(samples, slot))?,
            sample_ids: samples.ids.clone(),
        })
    }

    fn global_transforms(&self) -> Result<(Vec<Transform>, Vec<u32>)> {
        let index = &self.slots.0[EntityKind::GlobalTransform];
        let source = &self.reader.document().meshes.global_transforms;

        let rows = emit("global_transforms", index.len(), |slot| {
            let id = index.ids[slot];
            let (transform, owner) = match (self.plan.global_transforms.payload(id), index.origins[slot]) {
                (Some(row), _) => (row.transform, row.item),
                (None, Origin::Source(old)) => {
                    let transform = source.get(old).copied().ok_or_else(|| {
                        Error::codec(format!("global transform slot {old} out of range"))
                    })?;
                    let owner = self.reader.global_transform_owner_at(old).ok_or_else(|| {
                        Error::codec(format!("global transform {id} has no owning item"))
                    })?;
                    (transform, owner)
                }
                (None, Origin::Created) => {
                    return Err(Error::codec(format!("created global transform {id} has no payload")))
                }
            };
            let item = self
                .slots
                .resolve(EntityKind::GlobalTransform, id, EntityKind::Item, owner)?;
            Ok((transform, item))
        })?;
        Ok(rows.into_iter().unzip())
    }

    fn sample(&self, index: &TableIndex, slot: usize) -> Result<Sample> {
        let id = index.ids[slot];
        let refs = match (self.plan.samples.payload(id), index.origins[slot]) {
            (Some(refs), _) => *refs,
            (None, Origin::Source(old)) => self
                .reader
                .sample_refs_at(old)
                .ok_or_else(|| Error::codec(format!("sample {id} has dangling references")))?,
            (None, Origin::Created) => {
                return Err(Error::codec(format!("created sample {id} has no payload")))
            }
        };
        let resolve = |kind, target| self.slots.resolve(EntityKind::Sample, id, kind, target);
        Ok(Sample {
            global_transform: resolve(EntityKind::GlobalTransform, refs.global_transform)?,
            material: resolve(EntityKind::Material, refs.material)?,
            representation: resolve(EntityKind::Representation, refs.representation)?,
            local_transform: resolve(EntityKind::LocalTransform, refs.local_transform)?,
        })
    }

    /// Item table with freshly interned category and attribute pools.
    ///
    /// Pools are filled in slot order, so an unchanged table keeps its pool
    /// layout.
    pub fn items(&self) -> Result<Items> {
        let index = &self.slots.0[EntityKind::Item];
        let source = &self.reader.document().items;

        let mut categories = StringPool::new();
        let mut attributes = StringPool::new();
        let mut rows: Vec<(u32, String, AttributeList)> = Vec::with_capacity(index.len());

        for (slot, (&id, origin)) in index.ids.iter().zip(&index.origins).enumerate() {
            let row = match (self.plan.items.payload(id), origin) {
                (Some(data), _) => {
                    let category = categories.intern(&data.category)?;
                    let list = AttributeList::from_vec(intern_attributes(
                        &data.attributes,
                        &mut attributes,
                    )?);
                    (category, data.guid.clone().unwrap_or_default(), list)
                }
                (None, Origin::Source(old)) => {
                    let category = self.reader.item_category(id).ok_or_else(|| {
                        Error::codec(format!("item {id} has no category at slot {slot}"))
                    })?;
                    let category = categories.intern(category)?;
                    let list = self
                        .reader
                        .item_attribute_strings(*old)
                        .map(|raw| attributes.intern(raw))
                        .collect::<Result<AttributeList>>()?;
                    let guid = source.guids.get(*old).cloned().unwrap_or_default();
                    (category, guid, list)
                }
                (None, Origin::Created) => {
                    return Err(Error::codec(format!("created item {id} has no payload")))
                }
            };
            rows.push(row);
        }

        let mut item_categories = Vec::new();
        let mut guids = Vec::new();
        let mut item_attributes = Vec::new();
        let emitted = emit("items", rows.len(), |slot| Ok(std::mem::take(&mut rows[slot])))?;
        for (category, guid, list) in emitted {
            item_categories.push(category);
            guids.push(guid);
            item_attributes.push(list);
        }

        Ok(Items {
            ids: index.ids.clone(),
            categories: categories.into_strings(),
            item_categories,
            guids,
            attributes: attributes.into_strings(),
            item_attributes,
        })
    }

    pub fn relations(&self) -> Result<Relations> {
        let index = &self.slots.0[EntityKind::Relation];
        let source = &self.reader.document().relations.data;

        let rows = emit("relations", index.len(), |slot| {
            let (owner, data) =
                payload(EntityKind::Relation, index, self.relations, source, slot)?;
            let item = self
                .slots
                .resolve(EntityKind::Relation, owner, EntityKind::Item, owner)?;
            Ok((item, data.clone()))
        })?;
        let (items, data) = rows.into_iter().unzip();
        Ok(Relations { items, data })
    }
}
