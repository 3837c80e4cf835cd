// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Edit requests and their JSON wire shape.
//!
//! On the wire a batch is an ordered array of records
//! `{ "type": "CREATE_SAMPLE", "localId"?, "tempId"?, "data"? }`. Reference
//! fields accept either a number or a temp id string.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::attributes::ItemData;
use crate::error::{Error, Result};
use crate::geometry::RawGeometry;
use crate::ids::{EntityKind, IdRef, LocalId};
use crate::model::{Material, SpatialNode, Transform};

/// Representation payload. `geometry` is required on create; on update it
/// may be omitted to keep the stored geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepresentationData {
    /// Overrides the box computed from `geometry`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f32; 6]>,
    pub representation_class: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<RawGeometry>,
}

/// Sample payload: the four entities one placed instance is made of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleData {
    /// Owning global transform. Named `item` on the wire.
    #[serde(rename = "item", alias = "globalTransform")]
    pub global_transform: IdRef,
    pub material: IdRef,
    pub representation: IdRef,
    pub local_transform: IdRef,
}

/// Global transform payload: a placement plus the item it positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalTransformData {
    #[serde(flatten)]
    pub transform: Transform,
    pub item_id: IdRef,
}

/// Relation payload: relation name → target item ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationPayload(pub BTreeMap<String, Vec<IdRef>>);

impl RelationPayload {
    pub fn with(mut self, name: &str, targets: impl IntoIterator<Item = IdRef>) -> Self {
        self.0
            .entry(name.to_string())
            .or_default()
            .extend(targets);
        self
    }
}

/// Payload of a create or update, one variant per entity kind.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityData {
    Material(Material),
    Representation(RepresentationData),
    Sample(SampleData),
    GlobalTransform(GlobalTransformData),
    LocalTransform(Transform),
    Item(ItemData),
    Relation(RelationPayload),
}

impl EntityData {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityData::Material(_) => EntityKind::Material,
            EntityData::Representation(_) => EntityKind::Representation,
            EntityData::Sample(_) => EntityKind::Sample,
            EntityData::GlobalTransform(_) => EntityKind::GlobalTransform,
            EntityData::LocalTransform(_) => EntityKind::LocalTransform,
            EntityData::Item(_) => EntityKind::Item,
            EntityData::Relation(_) => EntityKind::Relation,
        }
    }

    fn from_wire(kind: EntityKind, data: Value) -> serde_json::Result<Self> {
        Ok(match kind {
            EntityKind::Material => EntityData::Material(serde_json::from_value(data)?),
            EntityKind::Representation => {
                EntityData::Representation(serde_json::from_value(data)?)
            }
            EntityKind::Sample => EntityData::Sample(serde_json::from_value(data)?),
            EntityKind::GlobalTransform => {
                EntityData::GlobalTransform(serde_json::from_value(data)?)
            }
            EntityKind::LocalTransform => {
                EntityData::LocalTransform(serde_json::from_value(data)?)
            }
            EntityKind::Item => EntityData::Item(serde_json::from_value(data)?),
            EntityKind::Relation => EntityData::Relation(serde_json::from_value(data)?),
        })
    }

    fn to_wire(&self) -> serde_json::Result<Value> {
        match self {
            EntityData::Material(d) => serde_json::to_value(d),
            EntityData::Representation(d) => serde_json::to_value(d),
            EntityData::Sample(d) => serde_json::to_value(d),
            EntityData::GlobalTransform(d) => serde_json::to_value(d),
            EntityData::LocalTransform(d) => serde_json::to_value(d),
            EntityData::Item(d) => serde_json::to_value(d),
            EntityData::Relation(d) => serde_json::to_value(d),
        }
    }
}

macro_rules! entity_data_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for EntityData {
            fn from(data: $ty) -> Self {
                EntityData::$variant(data)
            }
        })*
    };
}

entity_data_from! {
    Material => Material,
    RepresentationData => Representation,
    SampleData => Sample,
    GlobalTransformData => GlobalTransform,
    Transform => LocalTransform,
    ItemData => Item,
    RelationPayload => Relation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest {
    /// Explicit id; minted by the id solver when absent.
    pub local_id: Option<IdRef>,
    /// Name later requests of the batch can use to reference this entity.
    pub temp_id: Option<String>,
    pub data: EntityData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub local_id: IdRef,
    pub data: EntityData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteRequest {
    pub kind: EntityKind,
    pub local_id: IdRef,
}

/// One entry of an edit batch.
///
/// Relation requests are keyed by the local id of the item owning the
/// relation row.
#[derive(Debug, Clone, PartialEq)]
pub enum EditRequest {
    Create(CreateRequest),
    Update(UpdateRequest),
    Delete(DeleteRequest),
    UpdateMetadata(String),
    UpdateSpatialStructure(SpatialNode),
    UpdateMaxLocalId(LocalId),
}

impl EditRequest {
    pub fn create(data: impl Into<EntityData>) -> Self {
        EditRequest::Create(CreateRequest {
            local_id: None,
            temp_id: None,
            data: data.into(),
        })
    }

    pub fn update(local_id: LocalId, data: impl Into<EntityData>) -> Self {
        EditRequest::Update(UpdateRequest {
            local_id: IdRef::Resolved(local_id),
            data: data.into(),
        })
    }

    pub fn delete(kind: EntityKind, local_id: LocalId) -> Self {
        EditRequest::Delete(DeleteRequest {
            kind,
            local_id: IdRef::Resolved(local_id),
        })
    }

    /// Sets the temp id of a create; other requests are returned unchanged.
    pub fn with_temp_id(mut self, temp_id: &str) -> Self {
        if let EditRequest::Create(create) = &mut self {
            create.temp_id = Some(temp_id.to_string());
        }
        self
    }

    /// Sets the explicit local id of a create; other requests are returned
    /// unchanged.
    pub fn with_local_id(mut self, local_id: IdRef) -> Self {
        if let EditRequest::Create(create) = &mut self {
            create.local_id = Some(local_id);
        }
        self
    }

    /// Entity kind addressed, `None` for document-level updates.
    pub fn kind(&self) -> Option<EntityKind> {
        match self {
            EditRequest::Create(r) => Some(r.data.kind()),
            EditRequest::Update(r) => Some(r.data.kind()),
            EditRequest::Delete(r) => Some(r.kind),
            _ => None,
        }
    }

    pub fn local_id(&self) -> Option<&IdRef> {
        match self {
            EditRequest::Create(r) => r.local_id.as_ref(),
            EditRequest::Update(r) => Some(&r.local_id),
            EditRequest::Delete(r) => Some(&r.local_id),
            _ => None,
        }
    }

    /// Wire `type` string, e.g. `CREATE_GLOBAL_TRANSFORM`.
    pub fn type_name(&self) -> String {
        match self {
            EditRequest::Create(r) => format!("CREATE_{}", r.data.kind().as_str()),
            EditRequest::Update(r) => format!("UPDATE_{}", r.data.kind().as_str()),
            EditRequest::Delete(r) => format!("DELETE_{}", r.kind.as_str()),
            EditRequest::UpdateMetadata(_) => UPDATE_METADATA.to_string(),
            EditRequest::UpdateSpatialStructure(_) => UPDATE_SPATIAL_STRUCTURE.to_string(),
            EditRequest::UpdateMaxLocalId(_) => UPDATE_MAX_LOCAL_ID.to_string(),
        }
    }
}

const UPDATE_METADATA: &str = "UPDATE_METADATA";
const UPDATE_SPATIAL_STRUCTURE: &str = "UPDATE_SPATIAL_STRUCTURE";
const UPDATE_MAX_LOCAL_ID: &str = "UPDATE_MAX_LOCAL_ID";

/// Record as it appears on the wire.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    local_id: Option<IdRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    temp_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl TryFrom<WireRequest> for EditRequest {
    type Error = Error;

    fn try_from(wire: WireRequest) -> Result<Self> {
        let ty = wire.ty.as_str();
        let payload = |data: Option<Value>| {
            data.ok_or_else(|| Error::request(format!("{ty} requires data")))
        };

        match ty {
            UPDATE_METADATA => {
                return Ok(EditRequest::UpdateMetadata(match payload(wire.data)? {
                    Value::String(s) => s,
                    other => other.to_string(),
                }))
            }
            UPDATE_SPATIAL_STRUCTURE => {
                let root = serde_json::from_value(payload(wire.data)?)
                    .map_err(|e| Error::request(format!("{ty}: {e}")))?;
                return Ok(EditRequest::UpdateSpatialStructure(root));
            }
            UPDATE_MAX_LOCAL_ID => {
                let value = payload(wire.data)?;
                let id = value
                    .as_u64()
                    .ok_or_else(|| Error::request(format!("{ty}: expected a number, got {value}")))?;
                return Ok(EditRequest::UpdateMaxLocalId(id));
            }
            _ => {}
        }

        let (op, kind) = ty
            .split_once('_')
            .and_then(|(op, kind)| Some((op, EntityKind::from_wire(kind)?)))
            .ok_or_else(|| Error::request(format!("unknown request type {ty}")))?;

        let decode = |data: Option<Value>| {
            EntityData::from_wire(kind, payload(data)?)
                .map_err(|e| Error::request(format!("{ty}: {e}")))
        };
        let local_id = || {
            wire.local_id
                .clone()
                .ok_or_else(|| Error::request(format!("{ty} requires localId")))
        };

        match op {
            "CREATE" => Ok(EditRequest::Create(CreateRequest {
                local_id: wire.local_id.clone(),
                temp_id: wire.temp_id.clone(),
                data: decode(wire.data)?,
            })),
            "UPDATE" => Ok(EditRequest::Update(UpdateRequest {
                local_id: local_id()?,
                data: decode(wire.data)?,
            })),
            "DELETE" => Ok(EditRequest::Delete(DeleteRequest {
                kind,
                local_id: local_id()?,
            })),
            _ => Err(Error::request(format!("unknown request type {ty}"))),
        }
    }
}

impl EditRequest {
    fn to_wire(&self) -> serde_json::Result<WireRequest> {
        let mut wire = WireRequest {
            ty: self.type_name(),
            local_id: self.local_id().cloned(),
            temp_id: None,
            data: None,
        };
        match self {
            EditRequest::Create(r) => {
                wire.temp_id = r.temp_id.clone();
                wire.data = Some(r.data.to_wire()?);
            }
            EditRequest::Update(r) => wire.data = Some(r.data.to_wire()?),
            EditRequest::Delete(_) => {}
            EditRequest::UpdateMetadata(s) => wire.data = Some(Value::String(s.clone())),
            EditRequest::UpdateSpatialStructure(root) => {
                wire.data = Some(serde_json::to_value(root)?)
            }
            EditRequest::UpdateMaxLocalId(id) => wire.data = Some(Value::from(*id)),
        }
        Ok(wire)
    }
}

impl Serialize for EditRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_wire()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EditRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let wire = WireRequest::deserialize(deserializer)?;
        EditRequest::try_from(wire).map_err(serde::de::Error::custom)
    }
}

/// Parses a JSON request batch.
pub fn parse_requests(json: &str) -> Result<Vec<EditRequest>> {
    let wire: Vec<WireRequest> = serde_json::from_str(json)?;
    wire.into_iter().map(EditRequest::try_from).collect()
}

/// Converts an already-parsed JSON value into a request batch.
pub fn requests_from_value(value: Value) -> Result<Vec<EditRequest>> {
    let wire: Vec<WireRequest> = serde_json::from_value(value)
        .map_err(|e| Error::request(format!("request batch: {e}")))?;
    wire.into_iter().map(EditRequest::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_the_temp_id_batch() {
        let batch = parse_requests(
            r#"[
                {"type":"CREATE_ITEM","tempId":"new1","data":{"category":"IFCWALL","data":{}}},
                {"type":"CREATE_GLOBAL_TRANSFORM","tempId":"gt1","data":{
                    "position":[0,0,0],"xDirection":[1,0,0],"yDirection":[0,1,0],"itemId":"new1"}},
                {"type":"CREATE_SAMPLE","tempId":"s1","data":{
                    "item":"gt1","material":10,"representation":6,"localTransform":5}}
            ]"#,
        )
        .unwrap();

        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0].kind(), Some(EntityKind::Item));
        let EditRequest::Create(gt) = &batch[1] else {
            panic!("expected a create");
        };
        assert_eq!(gt.temp_id.as_deref(), Some("gt1"));
        let EntityData::GlobalTransform(data) = &gt.data else {
            panic!("expected a global transform");
        };
        assert_eq!(data.item_id, IdRef::from("new1"));

        let EditRequest::Create(sample) = &batch[2] else {
            panic!("expected a create");
        };
        let EntityData::Sample(data) = &sample.data else {
            panic!("expected a sample");
        };
        assert_eq!(data.global_transform, IdRef::from("gt1"));
        assert_eq!(data.material, IdRef::from(10u64));
    }

    #[test]
    fn document_level_requests() {
        let batch = parse_requests(
            r#"[
                {"type":"UPDATE_METADATA","data":{"schema":"IFC4"}},
                {"type":"UPDATE_MAX_LOCAL_ID","data":500},
                {"type":"UPDATE_SPATIAL_STRUCTURE","data":{"category":"IFCPROJECT","children":[{"localId":1}]}}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            batch[0],
            EditRequest::UpdateMetadata(r#"{"schema":"IFC4"}"#.to_string())
        );
        assert_eq!(batch[1], EditRequest::UpdateMaxLocalId(500));
        assert!(matches!(&batch[2], EditRequest::UpdateSpatialStructure(root) if root.item_ids() == vec![1]));
        assert!(batch.iter().all(|r| r.kind().is_none()));
    }

    #[test]
    fn update_and_delete_need_a_local_id() {
        assert!(matches!(
            parse_requests(r#"[{"type":"DELETE_MATERIAL"}]"#),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            parse_requests(r#"[{"type":"UPDATE_MATERIAL","data":{"r":1,"g":1,"b":1,"a":1}}]"#),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn unknown_types_and_bad_payloads_are_rejected() {
        assert!(matches!(
            parse_requests(r#"[{"type":"CREATE_WINDOW","data":{}}]"#),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            parse_requests(r#"[{"type":"RENAME_ITEM","localId":1}]"#),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            parse_requests(r#"[{"type":"CREATE_MATERIAL","data":{"r":"red"}}]"#),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(parse_requests("not json"), Err(Error::Json(_))));
    }

    #[test]
    fn serializes_back_to_the_wire_shape() {
        let request = EditRequest::create(RelationPayload::default().with(
            "ContainsElements",
            [IdRef::from(2u64), IdRef::from("new-wall")],
        ))
        .with_local_id(IdRef::Resolved(1));

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "CREATE_RELATION",
                "localId": 1,
                "data": {"ContainsElements": [2, "new-wall"]}
            })
        );
        let back: EditRequest = serde_json::from_value(value).unwrap();
        assert_eq!(back, request);
    }
}
