// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Local ids, forward references and entity kinds.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Stable, externally visible identifier of an entity, unique per kind.
pub type LocalId = u64;

/// A reference to another entity inside an edit request.
///
/// Callers may reference entities created earlier in the same batch by the
/// temp id they gave them. The id solver collapses every `Pending` reference
/// to `Resolved` before the batch reaches the builder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdRef {
    Resolved(LocalId),
    Pending(String),
}

impl IdRef {
    /// Returns the numeric id, if already resolved.
    #[inline]
    pub fn resolved(&self) -> Option<LocalId> {
        match self {
            IdRef::Resolved(id) => Some(*id),
            IdRef::Pending(_) => None,
        }
    }

    /// Returns the numeric id, failing on a temp id that was never resolved.
    #[inline]
    pub fn id(&self) -> Result<LocalId> {
        match self {
            IdRef::Resolved(id) => Ok(*id),
            IdRef::Pending(tmp) => Err(Error::UnresolvedTempId(tmp.clone())),
        }
    }
}

impl From<LocalId> for IdRef {
    fn from(id: LocalId) -> Self {
        IdRef::Resolved(id)
    }
}

impl From<&str> for IdRef {
    fn from(tmp: &str) -> Self {
        IdRef::Pending(tmp.to_string())
    }
}

impl From<String> for IdRef {
    fn from(tmp: String) -> Self {
        IdRef::Pending(tmp)
    }
}

/// Entity kinds addressable by edit requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Material = 0,
    Representation = 1,
    Sample = 2,
    GlobalTransform = 3,
    LocalTransform = 4,
    Item = 5,
    Relation = 6,
}

impl EntityKind {
    pub const COUNT: usize = 7;

    pub const ALL: [EntityKind; Self::COUNT] = [
        EntityKind::Material,
        EntityKind::Representation,
        EntityKind::Sample,
        EntityKind::GlobalTransform,
        EntityKind::LocalTransform,
        EntityKind::Item,
        EntityKind::Relation,
    ];

    /// Name used in request `type` strings (`CREATE_<NAME>`).
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Material => "MATERIAL",
            EntityKind::Representation => "REPRESENTATION",
            EntityKind::Sample => "SAMPLE",
            EntityKind::GlobalTransform => "GLOBAL_TRANSFORM",
            EntityKind::LocalTransform => "LOCAL_TRANSFORM",
            EntityKind::Item => "ITEM",
            EntityKind::Relation => "RELATION",
        }
    }

    /// Parses the kind suffix of a request `type` string.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Material => "material",
            EntityKind::Representation => "representation",
            EntityKind::Sample => "sample",
            EntityKind::GlobalTransform => "global transform",
            EntityKind::LocalTransform => "local transform",
            EntityKind::Item => "item",
            EntityKind::Relation => "relation",
        };
        f.write_str(name)
    }
}

/// Fixed-size map with one slot per [`EntityKind`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KindMap<T> {
    slots: [T; EntityKind::COUNT],
}

impl<T> KindMap<T> {
    pub fn iter(&self) -> impl Iterator<Item = (EntityKind, &T)> {
        EntityKind::ALL.into_iter().zip(self.slots.iter())
    }
}

impl<T> Index<EntityKind> for KindMap<T> {
    type Output = T;

    fn index(&self, kind: EntityKind) -> &T {
        &self.slots[kind as usize]
    }
}

impl<T> IndexMut<EntityKind> for KindMap<T> {
    fn index_mut(&mut self, kind: EntityKind) -> &mut T {
        &mut self.slots[kind as usize]
    }
}
