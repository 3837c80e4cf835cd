// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relation cascade for deleted items.
//!
//! Runs before index assignment so rows left empty become ordinary deletes
//! and are accounted for like any other.

use rustc_hash::FxHashSet;

use super::plan::{FxIndexSet, KindPlan};
use crate::ids::{EntityKind, LocalId};
use crate::model::RelationData;
use crate::reader::DocumentReader;

/// Returns the relation plan with deleted items stripped from every row.
///
/// Rows owned by a deleted item and rows left without targets are deleted.
pub(crate) fn cascade(
    reader: &DocumentReader<'_>,
    relations: &KindPlan<RelationData>,
    deleted_items: &FxIndexSet<LocalId>,
    subset: Option<&FxHashSet<LocalId>>,
) -> KindPlan<RelationData> {
    let mut plan = relations.clone();
    if deleted_items.is_empty() {
        return plan;
    }

    plan.create.retain(|owner, data| {
        !deleted_items.contains(owner) && strip(data, deleted_items)
    });

    let owners = reader.local_ids(EntityKind::Relation);
    let rows = &reader.document().relations.data;
    for (&owner, source) in owners.iter().zip(rows) {
        if subset.is_some_and(|s| !s.contains(&owner)) || plan.delete.contains(&owner) {
            continue;
        }
        if deleted_items.contains(&owner) {
            plan.update.shift_remove(&owner);
            plan.delete.insert(owner);
            continue;
        }

        let keep = match plan.update.get_mut(&owner) {
            Some(updated) => strip(updated, deleted_items),
            None => {
                let mut data = source.clone();
                let keep = strip(&mut data, deleted_items);
                if keep && data != *source {
                    plan.update.insert(owner, data);
                }
                keep
            }
        };
        if !keep {
            plan.update.shift_remove(&owner);
            plan.delete.insert(owner);
        }
    }
    plan
}

/// Removes deleted targets and empty relations; `false` when nothing is left.
fn strip(data: &mut RelationData, deleted_items: &FxIndexSet<LocalId>) -> bool {
    for targets in data.values_mut() {
        targets.retain(|target| !deleted_items.contains(target));
    }
    data.retain(|_, targets| !targets.is_empty());
    !data.is_empty()
}
