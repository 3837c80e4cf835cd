// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Item ids a batch touches, for cache invalidation on the caller's side.

use crate::builder::BatchPlan;
use crate::delta::DeltaSelection;
use crate::error::Result;
use crate::ids::{EntityKind, LocalId};
use crate::reader::DocumentReader;
use crate::request::EditRequest;

/// Retained and created items, plus the pre-edit owner of every sample the
/// batch updates or deletes. Sorted ascending, without duplicates.
pub(crate) fn affected_items(
    reader: &DocumentReader<'_>,
    requests: &[EditRequest],
    plan: &BatchPlan,
    selection: &DeltaSelection,
) -> Result<Vec<LocalId>> {
    let mut items: Vec<LocalId> = selection.retained(EntityKind::Item).collect();
    items.extend(plan.items.create.keys().copied());

    for request in requests {
        let sample = match request {
            EditRequest::Update(update) if update.data.kind() == EntityKind::Sample => {
                update.local_id.id()?
            }
            EditRequest::Delete(delete) if delete.kind == EntityKind::Sample => {
                delete.local_id.id()?
            }
            _ => continue,
        };
        items.extend(reader.sample_owner(sample));
    }

    items.sort_unstable();
    items.dedup();
    Ok(items)
}
