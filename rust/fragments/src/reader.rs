// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read-only lookups over a decoded document, keyed by local id.

use rustc_hash::FxHashMap;

use crate::attributes::{decode_attribute, ItemData};
use crate::error::{Error, Result};
use crate::ids::{EntityKind, KindMap, LocalId};
use crate::model::{
    Document, Material, RelationData, Representation, Sample, SpatialNode, Transform,
};

/// A sample with its slot references translated back to local ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRefs {
    pub global_transform: LocalId,
    pub material: LocalId,
    pub representation: LocalId,
    pub local_transform: LocalId,
}

/// Id → slot index over every table of one document snapshot.
///
/// Relation rows are addressed by the local id of their owning item.
pub struct DocumentReader<'a> {
    doc: &'a Document,
    slots: KindMap<FxHashMap<LocalId, usize>>,
    relation_ids: Vec<LocalId>,
}

impl<'a> DocumentReader<'a> {
    /// Indexes `doc`. Fails if a table repeats a local id.
    pub fn new(doc: &'a Document) -> Result<Self> {
        let relation_ids = doc
            .relations
            .items
            .iter()
            .map(|&slot| {
                doc.items.ids.get(slot as usize).copied().ok_or_else(|| {
                    Error::codec(format!("relation owner slot {slot} out of range"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut reader = Self {
            doc,
            slots: KindMap::default(),
            relation_ids,
        };
        for kind in EntityKind::ALL {
            let mut map = FxHashMap::default();
            map.reserve(reader.local_ids(kind).len());
            for (slot, &id) in reader.local_ids(kind).iter().enumerate() {
                if map.insert(id, slot).is_some() {
                    return Err(Error::DuplicateLocalId { kind, id });
                }
            }
            reader.slots[kind] = map;
        }
        Ok(reader)
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// Parallel id column of `kind`, in slot order.
    pub fn local_ids(&self, kind: EntityKind) -> &[LocalId] {
        let m = &self.doc.meshes;
        match kind {
            EntityKind::Material => &m.material_ids,
            EntityKind::Representation => &m.representation_ids,
            EntityKind::Sample => &m.sample_ids,
            EntityKind::GlobalTransform => &m.global_transform_ids,
            EntityKind::LocalTransform => &m.local_transform_ids,
            EntityKind::Item => &self.doc.items.ids,
            EntityKind::Relation => &self.relation_ids,
        }
    }

    #[inline]
    pub fn slot(&self, kind: EntityKind, id: LocalId) -> Option<usize> {
        self.slots[kind].get(&id).copied()
    }

    #[inline]
    pub fn contains(&self, kind: EntityKind, id: LocalId) -> bool {
        self.slots[kind].contains_key(&id)
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.local_ids(kind).len()
    }

    /// Local id stored at `slot` of `kind`.
    pub fn local_id(&self, kind: EntityKind, slot: usize) -> Option<LocalId> {
        self.local_ids(kind).get(slot).copied()
    }

    pub fn material(&self, id: LocalId) -> Option<&'a Material> {
        let slot = self.slot(EntityKind::Material, id)?;
        self.doc.meshes.materials.get(slot)
    }

    pub fn representation(&self, id: LocalId) -> Option<&'a Representation> {
        let slot = self.slot(EntityKind::Representation, id)?;
        self.doc.meshes.representations.get(slot)
    }

    pub fn global_transform(&self, id: LocalId) -> Option<&'a Transform> {
        let slot = self.slot(EntityKind::GlobalTransform, id)?;
        self.doc.meshes.global_transforms.get(slot)
    }

    pub fn local_transform(&self, id: LocalId) -> Option<&'a Transform> {
        let slot = self.slot(EntityKind::LocalTransform, id)?;
        self.doc.meshes.local_transforms.get(slot)
    }

    pub fn sample(&self, id: LocalId) -> Option<&'a Sample> {
        let slot = self.slot(EntityKind::Sample, id)?;
        self.doc.meshes.samples.get(slot)
    }

    /// References of the sample at `slot`, as local ids.
    pub fn sample_refs_at(&self, slot: usize) -> Option<SampleRefs> {
        let s = self.doc.meshes.samples.get(slot)?;
        Some(SampleRefs {
            global_transform: self
                .local_id(EntityKind::GlobalTransform, s.global_transform as usize)?,
            material: self.local_id(EntityKind::Material, s.material as usize)?,
            representation: self.local_id(EntityKind::Representation, s.representation as usize)?,
            local_transform: self.local_id(EntityKind::LocalTransform, s.local_transform as usize)?,
        })
    }

    pub fn sample_refs(&self, id: LocalId) -> Option<SampleRefs> {
        self.sample_refs_at(self.slot(EntityKind::Sample, id)?)
    }

    /// Item positioned by the global transform at `slot`.
    pub fn global_transform_owner_at(&self, slot: usize) -> Option<LocalId> {
        let item_slot = *self.doc.meshes.meshes_items.get(slot)?;
        self.local_id(EntityKind::Item, item_slot as usize)
    }

    pub fn global_transform_owner(&self, id: LocalId) -> Option<LocalId> {
        self.global_transform_owner_at(self.slot(EntityKind::GlobalTransform, id)?)
    }

    /// Item a sample belongs to, through its global transform.
    pub fn sample_owner(&self, id: LocalId) -> Option<LocalId> {
        let sample = self.sample(id)?;
        self.global_transform_owner_at(sample.global_transform as usize)
    }

    /// Samples placed under any global transform of `item`, in slot order.
    pub fn samples_of_item(&self, item: LocalId) -> Vec<LocalId> {
        let Some(item_slot) = self.slot(EntityKind::Item, item) else {
            return Vec::new();
        };
        let meshes = &self.doc.meshes;
        meshes
            .samples
            .iter()
            .zip(&meshes.sample_ids)
            .filter(|(s, _)| {
                meshes.meshes_items.get(s.global_transform as usize) == Some(&(item_slot as u32))
            })
            .map(|(_, &id)| id)
            .collect()
    }

    /// Category of an item, resolved through the category pool.
    pub fn item_category(&self, id: LocalId) -> Option<&'a str> {
        let items = &self.doc.items;
        let slot = self.slot(EntityKind::Item, id)?;
        let category = *items.item_categories.get(slot)?;
        items.categories.get(category as usize).map(String::as_str)
    }

    /// Attribute strings of the item at `slot`, straight from the pool.
    pub fn item_attribute_strings(&self, slot: usize) -> impl Iterator<Item = &'a str> + 'a {
        let doc: &'a Document = self.doc;
        let items = &doc.items;
        items
            .item_attributes
            .get(slot)
            .into_iter()
            .flat_map(move |list| list.iter().filter_map(move |&idx| items.attributes.get(idx as usize)))
            .map(String::as_str)
    }

    /// Full payload of an item, with attributes decoded from the pool.
    pub fn item_data(&self, id: LocalId) -> Result<Option<ItemData>> {
        let Some(slot) = self.slot(EntityKind::Item, id) else {
            return Ok(None);
        };
        let items = &self.doc.items;
        let mut data = ItemData::new(self.item_category(id).unwrap_or_default());
        for raw in self.item_attribute_strings(slot) {
            let (name, value) = decode_attribute(raw)?;
            data.attributes.insert(name, value);
        }
        data.guid = items
            .guids
            .get(slot)
            .filter(|guid| !guid.is_empty())
            .cloned();
        Ok(Some(data))
    }

    pub fn relations_of(&self, item: LocalId) -> Option<&'a RelationData> {
        let slot = self.slot(EntityKind::Relation, item)?;
        self.doc.relations.data.get(slot)
    }

    pub fn spatial_structure(&self) -> Option<&'a SpatialNode> {
        self.doc.spatial_structure.as_ref()
    }
}
