// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Item attributes and the string pool they are interned into.
//!
//! Attribute triples are stored as compact JSON arrays
//! `["Name", value, "IFCLABEL"]`, so identical name/value/type combinations
//! across thousands of items collapse into a single pool entry.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Arena of unique strings plus a reverse index.
///
/// One pool is created per emitted table and passed explicitly through the
/// build; nothing is cached between calls.
#[derive(Debug, Clone, Default)]
pub struct StringPool {
    strings: Vec<String>,
    index: FxHashMap<String, u32>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pool index of `value`, inserting it on first sight.
    pub fn intern(&mut self, value: &str) -> Result<u32> {
        if let Some(&idx) = self.index.get(value) {
            return Ok(idx);
        }
        let idx = u32::try_from(self.strings.len())
            .map_err(|_| Error::codec("string pool exceeds u32 entries"))?;
        self.strings.push(value.to_string());
        self.index.insert(value.to_string(), idx);
        Ok(idx)
    }

    pub fn get(&self, idx: u32) -> Option<&str> {
        self.strings.get(idx as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn into_strings(self) -> Vec<String> {
        self.strings
    }
}

/// Attribute value with its optional schema type (e.g. `IFCLABEL`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub value: serde_json::Value,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
}

impl AttributeValue {
    pub fn new(value: impl Into<serde_json::Value>, ty: Option<&str>) -> Self {
        Self {
            value: value.into(),
            ty: ty.map(str::to_string),
        }
    }
}

/// Attribute name → value.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Payload of an item: attributes, category and optional GUID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemData {
    #[serde(default, alias = "data")]
    pub attributes: Attributes,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
}

impl ItemData {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: &str, value: AttributeValue) -> Self {
        self.attributes.insert(name.to_string(), value);
        self
    }

    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        self.guid = Some(guid.into());
        self
    }
}

/// Encodes one attribute as its pool string.
pub fn encode_attribute(name: &str, attr: &AttributeValue) -> Result<String> {
    Ok(serde_json::to_string(&(name, &attr.value, &attr.ty))?)
}

/// Decodes a pool string back into name and value.
pub fn decode_attribute(raw: &str) -> Result<(String, AttributeValue)> {
    let (name, value, ty): (String, serde_json::Value, Option<String>) =
        serde_json::from_str(raw)?;
    Ok((name, AttributeValue { value, ty }))
}

/// Interns every attribute of `data` and returns the pool indices.
pub fn intern_attributes(data: &Attributes, pool: &mut StringPool) -> Result<Vec<u32>> {
    data.iter()
        .map(|(name, attr)| pool.intern(&encode_attribute(name, attr)?))
        .collect()
}
