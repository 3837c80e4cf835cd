// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end edit scenarios against a small two-element model.
//!
//! The model is built through the edit engine itself:
//! items 1 (wall) and 2 (slab), global transforms 3 → 1 and 4 → 2, local
//! transform 5, shell representations 6 and 9, samples 7 (3, 10, 6, 5) and
//! 8 (4, 10, 9, 5), material 10 and a relation row on item 1 naming item 2.

use ifc_lite_fragments::codec::MAGIC;
use ifc_lite_fragments::{
    decode_document, edit, edit_document, encode_document, new_model, parse_requests, Document,
    DocumentReader, EditOptions, EditRequest, EntityKind, Error, ModelOptions,
};

const MODEL: &str = r#"[
    {"type": "CREATE_ITEM", "localId": 1, "data": {
        "category": "IFCWALL",
        "data": {"Name": {"value": "Wall", "type": "IFCLABEL"}},
        "guid": "2O2Fr$t4X7Zf8NOew3FLOH"}},
    {"type": "CREATE_ITEM", "localId": 2, "data": {
        "category": "IFCSLAB",
        "data": {"Name": {"value": "Slab", "type": "IFCLABEL"}}}},
    {"type": "CREATE_GLOBAL_TRANSFORM", "localId": 3, "data": {
        "position": [0, 0, 0], "xDirection": [1, 0, 0], "yDirection": [0, 1, 0], "itemId": 1}},
    {"type": "CREATE_GLOBAL_TRANSFORM", "localId": 4, "data": {
        "position": [0, 0, 3], "xDirection": [1, 0, 0], "yDirection": [0, 1, 0], "itemId": 2}},
    {"type": "CREATE_LOCAL_TRANSFORM", "localId": 5, "data": {
        "position": [0, 0, 0], "xDirection": [1, 0, 0], "yDirection": [0, 1, 0]}},
    {"type": "CREATE_REPRESENTATION", "localId": 6, "data": {
        "representationClass": 1,
        "geometry": {"points": [[0, 0, 0], [4, 0, 0], [4, 0.2, 0]], "profiles": [[0, 1, 2]]}}},
    {"type": "CREATE_REPRESENTATION", "localId": 9, "data": {
        "representationClass": 1,
        "geometry": {
            "points": [[0, 0, 0], [5, 0, 0], [5, 5, 0], [0, 5, 0]],
            "profiles": [[0, 1, 2, 3]]}}},
    {"type": "CREATE_SAMPLE", "localId": 7, "data": {
        "item": 3, "material": 10, "representation": 6, "localTransform": 5}},
    {"type": "CREATE_SAMPLE", "localId": 8, "data": {
        "item": 4, "material": 10, "representation": 9, "localTransform": 5}},
    {"type": "CREATE_MATERIAL", "localId": 10, "data": {"r": 200, "g": 200, "b": 200, "a": 255}},
    {"type": "CREATE_RELATION", "localId": 1, "data": {"ConnectedTo": [2]}},
    {"type": "UPDATE_SPATIAL_STRUCTURE", "data": {
        "category": "IFCPROJECT", "children": [{"localId": 1}, {"localId": 2}]}},
    {"type": "UPDATE_MAX_LOCAL_ID", "data": 10}
]"#;

fn full() -> EditOptions {
    EditOptions::default()
}

fn delta() -> EditOptions {
    EditOptions {
        delta: true,
        ..EditOptions::default()
    }
}

fn model_bytes() -> Vec<u8> {
    let empty = new_model(&ModelOptions::default()).unwrap();
    let requests = parse_requests(MODEL).unwrap();
    edit(&empty, &requests, &full()).unwrap().document
}

fn model() -> Document {
    decode_document(&model_bytes()).unwrap()
}

fn requests(json: &str) -> Vec<EditRequest> {
    parse_requests(json).unwrap()
}

/// Every sample and global transform resolves inside its document.
fn assert_closed(doc: &Document) {
    doc.validate().unwrap();
    let reader = DocumentReader::new(doc).unwrap();
    for &id in reader.local_ids(EntityKind::Sample) {
        assert!(reader.sample_refs(id).is_some(), "sample {id} is dangling");
        assert!(reader.sample_owner(id).is_some(), "sample {id} has no owner");
    }
    for &id in reader.local_ids(EntityKind::GlobalTransform) {
        assert!(reader.global_transform_owner(id).is_some());
    }
}

#[test]
fn model_fixture_is_consistent() {
    let doc = model();
    assert_closed(&doc);
    assert_eq!(doc.max_local_id, 10);
    assert_eq!(doc.meshes.shells.len(), 2);

    let reader = DocumentReader::new(&doc).unwrap();
    assert_eq!(reader.samples_of_item(1), vec![7]);
    assert_eq!(reader.samples_of_item(2), vec![8]);
    assert_eq!(reader.relations_of(1).unwrap()["ConnectedTo"], vec![2]);
}

#[test]
fn new_model_is_empty_and_valid() {
    let bytes = new_model(&ModelOptions { raw: true }).unwrap();
    assert!(bytes.starts_with(&MAGIC));

    let doc = decode_document(&bytes).unwrap();
    assert_eq!(doc.max_local_id, 1);
    assert!(doc.items.is_empty());
    assert!(doc.meshes.samples.is_empty());
    assert!(uuid_like(&doc.guid));

    let other = decode_document(&new_model(&ModelOptions::default()).unwrap()).unwrap();
    assert_ne!(doc.guid, other.guid);
}

fn uuid_like(guid: &str) -> bool {
    guid.len() == 36 && guid.chars().filter(|&c| c == '-').count() == 4
}

#[test]
fn temp_ids_chain_through_a_new_placed_item() {
    let batch = requests(
        r#"[
            {"type": "CREATE_ITEM", "tempId": "new1", "data": {"category": "IFCWALL"}},
            {"type": "CREATE_GLOBAL_TRANSFORM", "tempId": "gt1", "data": {
                "position": [1, 0, 0], "xDirection": [1, 0, 0], "yDirection": [0, 1, 0],
                "itemId": "new1"}},
            {"type": "CREATE_SAMPLE", "tempId": "s1", "data": {
                "item": "gt1", "material": 10, "representation": 6, "localTransform": 5}}
        ]"#,
    );
    let source = model_bytes();

    for options in [full(), delta()] {
        let output = edit(&source, &batch, &options).unwrap();
        assert_eq!(output.created, vec![11, 12, 13]);
        assert!(output.items.contains(&11));

        let doc = decode_document(&output.document).unwrap();
        assert_closed(&doc);
        assert_eq!(doc.max_local_id, 13);

        let reader = DocumentReader::new(&doc).unwrap();
        assert_eq!(reader.sample_owner(13), Some(11));
        assert_eq!(reader.item_category(11), Some("IFCWALL"));
        let refs = reader.sample_refs(13).unwrap();
        assert_eq!((refs.material, refs.representation), (10, 6));
    }
}

#[test]
fn delta_output_holds_only_the_working_set() {
    let batch = requests(
        r#"[
            {"type": "CREATE_ITEM", "tempId": "new1", "data": {"category": "IFCWALL"}},
            {"type": "CREATE_GLOBAL_TRANSFORM", "tempId": "gt1", "data": {
                "position": [1, 0, 0], "xDirection": [1, 0, 0], "yDirection": [0, 1, 0],
                "itemId": "new1"}},
            {"type": "CREATE_SAMPLE", "data": {
                "item": "gt1", "material": 10, "representation": 6, "localTransform": 5}}
        ]"#,
    );
    let output = edit(&model_bytes(), &batch, &delta()).unwrap();
    let doc = decode_document(&output.document).unwrap();

    assert_eq!(doc.items.ids, vec![11]);
    assert_eq!(doc.meshes.material_ids, vec![10]);
    assert_eq!(doc.meshes.representation_ids, vec![6]);
    assert_eq!(doc.meshes.local_transform_ids, vec![5]);
    assert_eq!(doc.meshes.shells.len(), 1);
    assert!(doc.spatial_structure.is_none());
    assert_eq!(output.items, vec![11]);
}

#[test]
fn deleting_the_only_sample_keeps_the_item() {
    let source = model();
    let before = DocumentReader::new(&source).unwrap().item_data(2).unwrap();
    let batch = vec![EditRequest::delete(EntityKind::Sample, 8)];

    for options in [full(), delta()] {
        let result = edit_document(&source, &batch, &options).unwrap();
        assert!(result.items.contains(&2));
        assert_closed(&result.document);

        let reader = DocumentReader::new(&result.document).unwrap();
        assert!(!reader.contains(EntityKind::Sample, 8));
        assert!(reader.samples_of_item(2).is_empty());
        assert_eq!(reader.item_data(2).unwrap(), before);
    }
}

#[test]
fn untouched_entities_keep_their_local_ids() {
    let source = model();
    let batch = requests(
        r#"[
            {"type": "UPDATE_MATERIAL", "localId": 10, "data": {"r": 10, "g": 20, "b": 30, "a": 255}},
            {"type": "DELETE_SAMPLE", "localId": 7}
        ]"#,
    );
    let result = edit_document(&source, &batch, &full()).unwrap();
    let doc = &result.document;

    assert_eq!(doc.items.ids, source.items.ids);
    assert_eq!(doc.meshes.global_transform_ids, source.meshes.global_transform_ids);
    assert_eq!(doc.meshes.representation_ids, source.meshes.representation_ids);
    assert_eq!(doc.meshes.sample_ids, vec![8]);

    let reader = DocumentReader::new(doc).unwrap();
    assert_eq!(reader.material(10).unwrap().r, 10);
    assert_eq!(reader.sample_refs(8).unwrap().representation, 9);
    assert_closed(doc);
}

#[test]
fn empty_batch_is_a_structural_no_op() {
    let source = model();
    let result = edit_document(&source, &[], &full()).unwrap();
    assert_eq!(result.document, source);
    assert!(result.items.is_empty());
    assert!(result.created.is_empty());

    let delta_result = edit_document(&source, &[], &delta()).unwrap();
    assert!(delta_result.document.items.is_empty());
    assert_eq!(delta_result.document.guid, source.guid);
}

#[test]
fn full_and_delta_report_the_same_items() {
    let source = model();
    let batches = [
        r#"[{"type": "UPDATE_MATERIAL", "localId": 10, "data": {"r": 1, "g": 2, "b": 3, "a": 4}}]"#,
        r#"[{"type": "UPDATE_ITEM", "localId": 2, "data": {"category": "IFCSLAB"}}]"#,
        r#"[{"type": "DELETE_SAMPLE", "localId": 7}]"#,
        r#"[{"type": "UPDATE_GLOBAL_TRANSFORM", "localId": 4, "data": {
            "position": [0, 0, 6], "xDirection": [1, 0, 0], "yDirection": [0, 1, 0], "itemId": 2}}]"#,
        r#"[{"type": "UPDATE_RELATION", "localId": 1, "data": {"ConnectedTo": []}}]"#,
    ];

    for json in batches {
        let batch = requests(json);
        let full_items = edit_document(&source, &batch, &full()).unwrap().items;
        let delta_result = edit_document(&source, &batch, &delta()).unwrap();
        assert_eq!(full_items, delta_result.items, "batch {json}");
        assert_closed(&delta_result.document);
    }
}

#[test]
fn item_update_widens_through_shared_material() {
    let batch = requests(r#"[{"type": "UPDATE_ITEM", "localId": 2, "data": {"category": "IFCROOF"}}]"#);
    let output = edit(&model_bytes(), &batch, &delta()).unwrap();
    let doc = decode_document(&output.document).unwrap();

    // Item 2 pulls in its sample and the sample's material and local
    // transform, which the wall's sample shares.
    assert!(doc.items.ids.contains(&2));
    assert_eq!(output.items, vec![1, 2]);
    let reader = DocumentReader::new(&doc).unwrap();
    assert_eq!(reader.item_category(2), Some("IFCROOF"));
}

#[test]
fn all_numeric_batch_creates_nothing() {
    let batch = vec![EditRequest::update(
        10,
        ifc_lite_fragments::Material::rgba(0, 0, 0, 255),
    )];
    let result = edit_document(&model(), &batch, &full()).unwrap();
    assert!(result.created.is_empty());
    assert_eq!(result.document.max_local_id, 10);
}

#[test]
fn deleting_an_item_cascades_into_relations_and_the_tree() {
    let source = model();
    let batch = requests(
        r#"[
            {"type": "DELETE_SAMPLE", "localId": 8},
            {"type": "DELETE_GLOBAL_TRANSFORM", "localId": 4},
            {"type": "DELETE_ITEM", "localId": 2}
        ]"#,
    );

    let result = edit_document(&source, &batch, &full()).unwrap();
    let doc = &result.document;
    assert_eq!(doc.items.ids, vec![1]);
    assert!(doc.relations.data.is_empty());
    assert_eq!(doc.spatial_structure.as_ref().unwrap().item_ids(), vec![1]);
    assert_closed(doc);

    let delta_result = edit_document(&source, &batch, &delta()).unwrap();
    assert!(delta_result.document.relations.data.is_empty());
    assert_eq!(delta_result.items, result.items);
}

#[test]
fn deleting_an_item_with_live_geometry_fails() {
    let batch = vec![EditRequest::delete(EntityKind::Item, 2)];
    assert!(matches!(
        edit_document(&model(), &batch, &full()),
        Err(Error::ReferentialIntegrity(_))
    ));
}

#[test]
fn deleting_from_an_empty_table_is_a_negative_count() {
    let empty = new_model(&ModelOptions::default()).unwrap();
    let batch = vec![EditRequest::delete(EntityKind::Material, 4)];
    assert!(matches!(
        edit(&empty, &batch, &full()),
        Err(Error::NegativeCount {
            kind: EntityKind::Material,
            available: 0,
            deleted: 1,
            ..
        })
    ));
}

#[test]
fn deleting_an_unknown_id_fails_alike_in_both_modes() {
    let batch = requests(r#"[{"type": "DELETE_LOCAL_TRANSFORM", "localId": 99}]"#);
    for options in [full(), delta()] {
        assert!(matches!(
            edit(&model_bytes(), &batch, &options),
            Err(Error::ReferentialIntegrity(_))
        ));
    }

    let empty = new_model(&ModelOptions::default()).unwrap();
    let batch = vec![EditRequest::delete(EntityKind::Material, 4)];
    for options in [full(), delta()] {
        assert!(matches!(
            edit(&empty, &batch, &options),
            Err(Error::NegativeCount { available: 0, .. })
        ));
    }
}

#[test]
fn creating_an_existing_id_is_a_duplicate() {
    let batch = requests(
        r#"[{"type": "CREATE_MATERIAL", "localId": 10, "data": {"r": 0, "g": 0, "b": 0, "a": 0}}]"#,
    );
    for options in [full(), delta()] {
        assert!(matches!(
            edit_document(&model(), &batch, &options),
            Err(Error::DuplicateLocalId {
                kind: EntityKind::Material,
                id: 10
            })
        ));
    }
}

#[test]
fn unknown_temp_id_fails_the_whole_batch() {
    let batch = requests(
        r#"[{"type": "CREATE_SAMPLE", "data": {
            "item": "nowhere", "material": 10, "representation": 6, "localTransform": 5}}]"#,
    );
    assert!(matches!(
        edit(&model_bytes(), &batch, &full()),
        Err(Error::UnresolvedTempId(name)) if name == "nowhere"
    ));
}

#[test]
fn unsupported_representation_class_is_rejected() {
    let batch = requests(
        r#"[{"type": "UPDATE_REPRESENTATION", "localId": 6, "data": {"representationClass": 7}}]"#,
    );
    assert!(matches!(
        edit(&model_bytes(), &batch, &full()),
        Err(Error::UnsupportedRepresentationClass(7))
    ));

    // A stored tag 7 fails as soon as the representation is touched.
    let mut doc = model();
    doc.meshes.representations[0].class_tag = 7;
    let bytes = encode_document(&doc, true).unwrap();
    let batch = requests(r#"[{"type": "DELETE_SAMPLE", "localId": 7}]"#);
    assert!(matches!(
        edit(&bytes, &batch, &delta()),
        Err(Error::UnsupportedRepresentationClass(7))
    ));
}

#[test]
fn deleting_a_representation_drops_its_geometry() {
    let source = model();
    let kept_shell = source.meshes.shells[1].clone();
    let batch = requests(
        r#"[
            {"type": "DELETE_SAMPLE", "localId": 7},
            {"type": "DELETE_REPRESENTATION", "localId": 6}
        ]"#,
    );

    let result = edit_document(&source, &batch, &full()).unwrap();
    let doc = &result.document;
    assert_eq!(doc.meshes.representation_ids, vec![9]);
    assert_eq!(doc.meshes.shells, vec![kept_shell]);
    assert_eq!(doc.meshes.representations[0].geometry, 0);
    assert_closed(doc);
}

#[test]
fn deleting_a_used_representation_fails() {
    let batch = vec![EditRequest::delete(EntityKind::Representation, 6)];
    assert!(matches!(
        edit_document(&model(), &batch, &full()),
        Err(Error::ReferentialIntegrity(_))
    ));
}

#[test]
fn representation_update_replaces_geometry() {
    let batch = requests(
        r#"[{"type": "UPDATE_REPRESENTATION", "localId": 6, "data": {
            "representationClass": 1,
            "geometry": {"points": [[0, 0, 0], [8, 0, 0], [8, 1, 2]], "profiles": [[0, 1, 2]]}}}]"#,
    );
    let result = edit_document(&model(), &batch, &full()).unwrap();
    let reader = DocumentReader::new(&result.document).unwrap();

    let rep = reader.representation(6).unwrap();
    assert_eq!(rep.bbox, [0.0, 0.0, 0.0, 8.0, 1.0, 2.0]);
    assert_eq!(result.document.meshes.shells.len(), 2);
    assert_eq!(result.document.meshes.shells[rep.geometry as usize].points[1], [8.0, 0.0, 0.0]);
}

#[test]
fn metadata_and_max_local_id_updates() {
    let batch = requests(
        r#"[
            {"type": "UPDATE_METADATA", "data": {"schema": "IFC4X3"}},
            {"type": "UPDATE_MAX_LOCAL_ID", "data": 500}
        ]"#,
    );
    let result = edit_document(&model(), &batch, &full()).unwrap();
    assert_eq!(result.document.max_local_id, 500);
    let metadata: serde_json::Value = serde_json::from_str(&result.document.metadata).unwrap();
    assert_eq!(metadata["schema"], "IFC4X3");
}

#[test]
fn exhausted_id_space_rejects_creates_but_not_edits() {
    let bumped = edit(
        &model_bytes(),
        &requests(r#"[{"type": "UPDATE_MAX_LOCAL_ID", "data": 18446744073709551615}]"#),
        &full(),
    )
    .unwrap()
    .document;
    assert_eq!(decode_document(&bumped).unwrap().max_local_id, u64::MAX);

    // Batches that mint nothing still go through.
    assert!(edit(&bumped, &[], &full()).is_ok());
    let rename = requests(
        r#"[{"type": "UPDATE_MATERIAL", "localId": 10, "data": {"r": 1, "g": 2, "b": 3, "a": 4}}]"#,
    );
    assert!(edit(&bumped, &rename, &delta()).is_ok());

    let create = requests(r#"[{"type": "CREATE_ITEM", "data": {"category": "IFCWALL"}}]"#);
    for options in [full(), delta()] {
        assert!(matches!(
            edit(&bumped, &create, &options),
            Err(Error::InvalidRequest(msg)) if msg.contains("exhausted")
        ));
    }
}

#[test]
fn raw_and_compressed_outputs_decode_equally() {
    let source = model_bytes();
    let batch = requests(r#"[{"type": "DELETE_SAMPLE", "localId": 7}]"#);

    let raw = edit(&source, &batch, &EditOptions { raw: true, delta: false }).unwrap();
    let compressed = edit(&source, &batch, &full()).unwrap();

    assert!(raw.document.starts_with(&MAGIC));
    assert!(!compressed.document.starts_with(&MAGIC));
    assert_eq!(
        decode_document(&raw.document).unwrap(),
        decode_document(&compressed.document).unwrap()
    );
    assert_eq!(raw.items, compressed.items);
}

#[test]
fn truncated_input_is_a_codec_error() {
    let raw = encode_document(&model(), true).unwrap();
    let cut = &raw[..raw.len() / 2];
    assert!(matches!(edit(cut, &[], &full()), Err(Error::Codec(_))));
}
