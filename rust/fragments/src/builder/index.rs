// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Phase A: new slot for every surviving or created entity.

use rustc_hash::{FxHashMap, FxHashSet};

use super::plan::KindPlan;
use crate::error::{Error, Result};
use crate::ids::{EntityKind, KindMap, LocalId};
use crate::reader::DocumentReader;

/// Where the payload of an output slot comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Slot in the source table.
    Source(usize),
    Created,
}

/// Output slot order of one table.
#[derive(Debug, Clone, Default)]
pub(crate) struct TableIndex {
    pub ids: Vec<LocalId>,
    pub origins: Vec<Origin>,
    slots: FxHashMap<LocalId, u32>,
}

impl TableIndex {
    /// Survivors first, in source order, then created entries in request
    /// order. In delta mode only ids in `subset` are considered.
    pub fn assign<T>(
        kind: EntityKind,
        reader: &DocumentReader<'_>,
        plan: &KindPlan<T>,
        subset: Option<&FxHashSet<LocalId>>,
    ) -> Result<Self> {
        let source = reader.local_ids(kind);
        let created = plan.create.len();
        let deleted = plan.delete.len();
        // Checked against the whole source table in both modes.
        if source.len() + created < deleted {
            return Err(Error::NegativeCount {
                kind,
                available: source.len(),
                created,
                deleted,
            });
        }
        if let Some(&missing) = plan.delete.iter().find(|id| !reader.contains(kind, **id)) {
            return Err(Error::unknown(kind, missing));
        }
        let available = subset.map_or(source.len(), |s| s.len());
        let count = (available + created).saturating_sub(deleted);

        let mut index = TableIndex {
            ids: Vec::with_capacity(count),
            origins: Vec::with_capacity(count),
            slots: FxHashMap::default(),
        };
        index.slots.reserve(count);

        for (slot, &id) in source.iter().enumerate() {
            if subset.is_some_and(|s| !s.contains(&id)) {
                continue;
            }
            if plan.delete.contains(&id) {
                continue;
            }
            index.push(kind, id, Origin::Source(slot))?;
        }

        if let Some(&missing) = plan.update.keys().find(|id| !index.slots.contains_key(*id)) {
            return Err(Error::unknown(kind, missing));
        }

        for &id in plan.create.keys() {
            // Outside the delta subset a source entity is not walked, but
            // still owns its id.
            if reader.contains(kind, id) && !plan.delete.contains(&id) {
                return Err(Error::DuplicateLocalId { kind, id });
            }
            index.push(kind, id, Origin::Created)?;
        }
        Ok(index)
    }

    fn push(&mut self, kind: EntityKind, id: LocalId, origin: Origin) -> Result<()> {
        let slot = u32::try_from(self.ids.len())
            .map_err(|_| Error::codec(format!("{kind} table exceeds u32 entries")))?;
        if self.slots.insert(id, slot).is_some() {
            return Err(Error::DuplicateLocalId { kind, id });
        }
        self.ids.push(id);
        self.origins.push(origin);
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn slot(&self, id: LocalId) -> Option<u32> {
        self.slots.get(&id).copied()
    }
}

/// Phase A result for every table.
#[derive(Debug, Default)]
pub(crate) struct SlotMaps(pub KindMap<TableIndex>);

impl SlotMaps {
    /// New slot of `target_id`, which `from_id` references.
    pub fn resolve(
        &self,
        from: EntityKind,
        from_id: LocalId,
        target: EntityKind,
        target_id: LocalId,
    ) -> Result<u32> {
        self.0[target]
            .slot(target_id)
            .ok_or_else(|| Error::missing(from, from_id, target, target_id))
    }
}
