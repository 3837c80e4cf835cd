// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Item, relation and spatial structure tables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::ids::LocalId;

/// Pool indices of one item's attributes.
pub type AttributeList = SmallVec<[u32; 8]>;

/// BIM elements. Categories and attribute triples live in deduplicated
/// pools; per-item columns index into them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Items {
    pub ids: Vec<LocalId>,
    /// Category pool.
    pub categories: Vec<String>,
    pub item_categories: Vec<u32>,
    /// Empty string means the item has no GUID.
    pub guids: Vec<String>,
    /// Attribute pool: JSON triples `[name, value, type]`.
    pub attributes: Vec<String>,
    pub item_attributes: Vec<AttributeList>,
}

impl Items {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Relation name → ordered target item ids.
pub type RelationData = BTreeMap<String, Vec<LocalId>>;

/// Directed relations, one row per owning item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relations {
    /// Owning item slot, parallel to `data`.
    pub items: Vec<u32>,
    pub data: Vec<RelationData>,
}

/// Node of the spatial tree: an item reference, a category grouping, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<LocalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SpatialNode>,
}

impl SpatialNode {
    pub fn item(local_id: LocalId) -> Self {
        Self {
            local_id: Some(local_id),
            ..Self::default()
        }
    }

    pub fn category(name: impl Into<String>, children: Vec<SpatialNode>) -> Self {
        Self {
            local_id: None,
            category: Some(name.into()),
            children,
        }
    }

    /// Removes item nodes whose id matches `removed`. Children of a removed
    /// node are dropped with it; category nodes are kept even when emptied.
    pub fn prune(&mut self, removed: &impl Fn(LocalId) -> bool) {
        self.children
            .retain(|child| !child.local_id.is_some_and(|id| removed(id)));
        for child in &mut self.children {
            child.prune(removed);
        }
    }

    /// Item ids referenced anywhere in the subtree, preorder.
    pub fn item_ids(&self) -> Vec<LocalId> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.extend(node.local_id);
            stack.extend(node.children.iter().rev());
        }
        out
    }
}
