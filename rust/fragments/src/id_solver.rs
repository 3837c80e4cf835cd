// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Local id assignment and temp id resolution for a request batch.
//!
//! Two passes over the batch:
//!
//! 1. Every create without a numeric local id gets `max_local_id + 1`,
//!    `+ 2`, ... in request order; its temp id (and a string local id, which
//!    is treated as one) is bound to the minted id.
//! 2. Every string reference is replaced by the id bound to it: the
//!    request's own local id, the four sample references, the owning item
//!    of a global transform and relation targets.
//!
//! After solving, no [`IdRef::Pending`] is left in the batch.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::ids::{EntityKind, IdRef, LocalId};
use crate::request::{EditRequest, EntityData};

/// Resolves `requests` in place and returns the minted ids in request order.
pub fn solve_ids(requests: &mut [EditRequest], max_local_id: LocalId) -> Result<Vec<LocalId>> {
    // None once the id space is used up; only fails if a create needs an id.
    let mut next = max_local_id.checked_add(1);
    let mut temp_ids: FxHashMap<String, LocalId> = FxHashMap::default();
    let mut created = Vec::new();

    for request in requests.iter_mut() {
        let EditRequest::Create(create) = request else {
            continue;
        };

        // Relation rows are keyed by their owning item and never minted.
        if create.data.kind() == EntityKind::Relation {
            if create.local_id.is_none() {
                return Err(Error::ReferentialIntegrity(
                    "relation create without an owning item id".to_string(),
                ));
            }
            continue;
        }

        let id = match &create.local_id {
            Some(IdRef::Resolved(id)) => *id,
            pending => {
                let id = next
                    .ok_or_else(|| Error::request("local id space exhausted"))?;
                next = id.checked_add(1);
                created.push(id);
                if let Some(IdRef::Pending(name)) = pending {
                    bind(&mut temp_ids, name, id)?;
                }
                create.local_id = Some(IdRef::Resolved(id));
                id
            }
        };
        if let Some(name) = &create.temp_id {
            bind(&mut temp_ids, name, id)?;
        }
    }

    let resolve = |r: &mut IdRef| -> Result<()> {
        if let IdRef::Pending(name) = r {
            let id = temp_ids
                .get(name.as_str())
                .copied()
                .ok_or_else(|| Error::UnresolvedTempId(name.clone()))?;
            *r = IdRef::Resolved(id);
        }
        Ok(())
    };

    for request in requests.iter_mut() {
        match request {
            EditRequest::Create(create) => {
                if let Some(local_id) = &mut create.local_id {
                    resolve(local_id)?;
                }
                resolve_payload(&mut create.data, &resolve)?;
            }
            EditRequest::Update(update) => {
                resolve(&mut update.local_id)?;
                resolve_payload(&mut update.data, &resolve)?;
            }
            EditRequest::Delete(delete) => resolve(&mut delete.local_id)?,
            EditRequest::UpdateMetadata(_)
            | EditRequest::UpdateSpatialStructure(_)
            | EditRequest::UpdateMaxLocalId(_) => {}
        }
    }

    debug!(
        requests = requests.len(),
        minted = created.len(),
        temp_ids = temp_ids.len(),
        "solved local ids"
    );
    Ok(created)
}

fn bind(temp_ids: &mut FxHashMap<String, LocalId>, name: &str, id: LocalId) -> Result<()> {
    match temp_ids.insert(name.to_string(), id) {
        Some(previous) if previous != id => Err(Error::request(format!(
            "temp id {name:?} bound to both {previous} and {id}"
        ))),
        _ => Ok(()),
    }
}

fn resolve_payload(data: &mut EntityData, resolve: &impl Fn(&mut IdRef) -> Result<()>) -> Result<()> {
    match data {
        EntityData::Sample(sample) => {
            resolve(&mut sample.global_transform)?;
            resolve(&mut sample.material)?;
            resolve(&mut sample.representation)?;
            resolve(&mut sample.local_transform)?;
        }
        EntityData::GlobalTransform(gt) => resolve(&mut gt.item_id)?,
        EntityData::Relation(relation) => {
            for target in relation.0.values_mut().flatten() {
                resolve(target)?;
            }
        }
        EntityData::Material(_)
        | EntityData::Representation(_)
        | EntityData::LocalTransform(_)
        | EntityData::Item(_) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::ItemData;
    use crate::model::{Material, Transform};
    use crate::request::{GlobalTransformData, RelationPayload, SampleData};

    fn sample(gt: &str) -> SampleData {
        SampleData {
            global_transform: gt.into(),
            material: IdRef::Resolved(10),
            representation: IdRef::Resolved(6),
            local_transform: IdRef::Resolved(5),
        }
    }

    #[test]
    fn mints_sequential_ids_and_resolves_forward_references() {
        let mut batch = vec![
            EditRequest::create(ItemData::new("IFCWALL")).with_temp_id("new1"),
            EditRequest::create(GlobalTransformData {
                transform: Transform::default(),
                item_id: "new1".into(),
            })
            .with_temp_id("gt1"),
            EditRequest::create(sample("gt1")).with_temp_id("s1"),
        ];

        let created = solve_ids(&mut batch, 10).unwrap();
        assert_eq!(created, vec![11, 12, 13]);

        let EditRequest::Create(gt) = &batch[1] else {
            panic!("expected a create");
        };
        let EntityData::GlobalTransform(data) = &gt.data else {
            panic!("expected a global transform");
        };
        assert_eq!(data.item_id, IdRef::Resolved(11));

        let EditRequest::Create(s) = &batch[2] else {
            panic!("expected a create");
        };
        assert_eq!(s.local_id, Some(IdRef::Resolved(13)));
        let EntityData::Sample(data) = &s.data else {
            panic!("expected a sample");
        };
        assert_eq!(data.global_transform, IdRef::Resolved(12));
    }

    #[test]
    fn all_numeric_batch_is_untouched() {
        let mut batch = vec![
            EditRequest::update(10, Material::rgba(0, 0, 0, 255)),
            EditRequest::delete(EntityKind::Sample, 8),
            EditRequest::create(Material::rgba(9, 9, 9, 255)).with_local_id(IdRef::Resolved(40)),
        ];
        let before = batch.clone();

        let created = solve_ids(&mut batch, 10).unwrap();
        assert!(created.is_empty());
        assert_eq!(batch, before);
    }

    #[test]
    fn string_local_id_binds_with_its_temp_id() {
        let mut batch = vec![
            EditRequest::create(ItemData::new("IFCSLAB"))
                .with_local_id("slab".into())
                .with_temp_id("slab-alias"),
            EditRequest::create(RelationPayload::default().with("Covers", [IdRef::from("slab-alias")]))
                .with_local_id("slab".into()),
        ];

        let created = solve_ids(&mut batch, 1).unwrap();
        assert_eq!(created, vec![2]);
        assert_eq!(batch[1].local_id(), Some(&IdRef::Resolved(2)));
        let EditRequest::Create(relation) = &batch[1] else {
            panic!("expected a create");
        };
        let EntityData::Relation(payload) = &relation.data else {
            panic!("expected a relation");
        };
        assert_eq!(payload.0["Covers"], vec![IdRef::Resolved(2)]);
    }

    #[test]
    fn unknown_temp_id_fails() {
        let mut batch = vec![EditRequest::create(sample("missing"))];
        assert!(matches!(
            solve_ids(&mut batch, 1),
            Err(Error::UnresolvedTempId(name)) if name == "missing"
        ));
    }

    #[test]
    fn relation_create_needs_an_owner() {
        let mut batch = vec![EditRequest::create(RelationPayload::default())];
        assert!(matches!(
            solve_ids(&mut batch, 1),
            Err(Error::ReferentialIntegrity(_))
        ));
    }

    #[test]
    fn conflicting_temp_ids_fail() {
        let mut batch = vec![
            EditRequest::create(ItemData::new("A")).with_temp_id("x"),
            EditRequest::create(ItemData::new("B")).with_temp_id("x"),
        ];
        assert!(matches!(solve_ids(&mut batch, 1), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn minting_past_the_id_space_fails() {
        let mut numeric =
            vec![EditRequest::create(ItemData::new("A")).with_local_id(IdRef::Resolved(3))];
        assert!(solve_ids(&mut numeric, LocalId::MAX).unwrap().is_empty());
        assert!(solve_ids(&mut [], LocalId::MAX).unwrap().is_empty());

        let mut last = vec![EditRequest::create(ItemData::new("A"))];
        assert_eq!(solve_ids(&mut last, LocalId::MAX - 1).unwrap(), vec![LocalId::MAX]);

        let mut batch = vec![
            EditRequest::create(ItemData::new("A")),
            EditRequest::create(ItemData::new("B")),
        ];
        assert!(matches!(
            solve_ids(&mut batch, LocalId::MAX - 1),
            Err(Error::InvalidRequest(msg)) if msg.contains("exhausted")
        ));
    }
}
