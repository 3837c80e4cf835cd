// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary document format.
//!
//! ```text
//! header    magic "IFLF" · version u16 · flags u16
//! document  guid str · metadata str · max_local_id u64
//! meshes    global_transforms · global_transform_ids · meshes_items
//!           local_transforms · local_transform_ids
//!           materials · material_ids
//!           representations · representation_ids
//!           shells · circle_extrusions
//!           samples · sample_ids
//! items     ids · categories · item_categories · guids · attributes · item_attributes
//! relations items · data
//! spatial   present u8 · preorder nodes
//! ```
//!
//! Integers are little-endian, strings and columns are `u32`-length
//! prefixed. A compressed document is the zlib stream of the raw bytes;
//! readers that do not find the magic inflate first.

pub mod io;
pub mod table;
mod types;

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{AttributeList, Document, Items, Meshes, RelationData, Relations, SpatialNode};
use io::{ByteReader, ByteWriter};

pub const MAGIC: [u8; 4] = *b"IFLF";
pub const VERSION: u16 = 1;

/// Deepest spatial tree a document may carry, root included.
pub const MAX_SPATIAL_DEPTH: usize = 256;

/// Largest inflated document accepted from compressed input.
pub const MAX_INFLATED_SIZE: u64 = 1 << 30;

const NODE_HAS_ID: u8 = 0b01;
const NODE_HAS_CATEGORY: u8 = 0b10;

/// How document bytes are (or should be) wrapped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Encoding {
    /// Detect from the magic bytes (read only; writes compress).
    #[default]
    Auto,
    Raw,
    Compressed,
}

/// Serializes a document, deflating it unless `raw` is set.
pub fn encode_document(doc: &Document, raw: bool) -> Result<Vec<u8>> {
    let bytes = encode_raw(doc)?;
    if raw {
        Ok(bytes)
    } else {
        compress(&bytes)
    }
}

/// Parses document bytes, auto-detecting compression.
pub fn decode_document(bytes: &[u8]) -> Result<Document> {
    decode_document_as(bytes, Encoding::Auto)
}

/// Parses document bytes with an explicit encoding.
pub fn decode_document_as(bytes: &[u8], encoding: Encoding) -> Result<Document> {
    let raw_input = match encoding {
        Encoding::Raw => true,
        Encoding::Compressed => false,
        Encoding::Auto => bytes.starts_with(&MAGIC),
    };
    let doc = if raw_input {
        decode_raw(bytes)?
    } else {
        decode_raw(&decompress(bytes)?)?
    };
    doc.validate()?;
    Ok(doc)
}

pub fn compress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    inflate(bytes, MAX_INFLATED_SIZE)
}

fn inflate(bytes: &[u8], limit: u64) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(bytes.len().saturating_mul(4).min(limit as usize));
    ZlibDecoder::new(bytes)
        .take(limit.saturating_add(1))
        .read_to_end(&mut out)?;
    if out.len() as u64 > limit {
        return Err(Error::codec(format!("document inflates past {limit} bytes")));
    }
    Ok(out)
}

fn encode_raw(doc: &Document) -> Result<Vec<u8>> {
    let mut w = ByteWriter::with_capacity(4096);
    w.put_bytes(&MAGIC);
    w.put_u16(VERSION);
    w.put_u16(0);

    w.put_str(&doc.guid)?;
    w.put_str(&doc.metadata)?;
    w.put_u64(doc.max_local_id);

    encode_meshes(&doc.meshes, &mut w)?;
    encode_items(&doc.items, &mut w)?;
    encode_relations(&doc.relations, &mut w)?;

    match &doc.spatial_structure {
        Some(root) => {
            w.put_u8(1);
            encode_node(root, 1, &mut w)?;
        }
        None => w.put_u8(0),
    }
    Ok(w.into_vec())
}

fn decode_raw(bytes: &[u8]) -> Result<Document> {
    let mut r = ByteReader::new(bytes);
    let magic = r.get_bytes(MAGIC.len())?;
    if magic != MAGIC {
        return Err(Error::codec(format!("bad magic {magic:?}")));
    }
    let version = r.get_u16()?;
    if version != VERSION {
        return Err(Error::codec(format!("unsupported version {version}")));
    }
    let _flags = r.get_u16()?;

    let guid = r.get_str()?;
    let metadata = r.get_str()?;
    let max_local_id = r.get_u64()?;
    let meshes = decode_meshes(&mut r)?;
    let items = decode_items(&mut r)?;
    let relations = decode_relations(&mut r)?;
    let spatial_structure = match r.get_u8()? {
        0 => None,
        1 => Some(decode_node(&mut r, 1)?),
        other => return Err(Error::codec(format!("bad spatial flag {other}"))),
    };

    if r.remaining() != 0 {
        return Err(Error::codec(format!("{} trailing bytes", r.remaining())));
    }

    Ok(Document {
        guid,
        metadata,
        max_local_id,
        meshes,
        items,
        relations,
        spatial_structure,
    })
}

fn encode_meshes(m: &Meshes, w: &mut ByteWriter) -> Result<()> {
    w.put_col(&m.global_transforms)?;
    w.put_col(&m.global_transform_ids)?;
    w.put_col(&m.meshes_items)?;
    w.put_col(&m.local_transforms)?;
    w.put_col(&m.local_transform_ids)?;
    w.put_col(&m.materials)?;
    w.put_col(&m.material_ids)?;
    w.put_col(&m.representations)?;
    w.put_col(&m.representation_ids)?;
    w.put_col(&m.shells)?;
    w.put_col(&m.circle_extrusions)?;
    w.put_col(&m.samples)?;
    w.put_col(&m.sample_ids)
}

fn decode_meshes(r: &mut ByteReader<'_>) -> Result<Meshes> {
    Ok(Meshes {
        global_transforms: r.get_col()?,
        global_transform_ids: r.get_col()?,
        meshes_items: r.get_col()?,
        local_transforms: r.get_col()?,
        local_transform_ids: r.get_col()?,
        materials: r.get_col()?,
        material_ids: r.get_col()?,
        representations: r.get_col()?,
        representation_ids: r.get_col()?,
        shells: r.get_col()?,
        circle_extrusions: r.get_col()?,
        samples: r.get_col()?,
        sample_ids: r.get_col()?,
    })
}

fn encode_items(items: &Items, w: &mut ByteWriter) -> Result<()> {
    w.put_col(&items.ids)?;
    w.put_col(&items.categories)?;
    w.put_col(&items.item_categories)?;
    w.put_col(&items.guids)?;
    w.put_col(&items.attributes)?;
    w.put_len(items.item_attributes.len())?;
    for list in &items.item_attributes {
        w.put_len(list.len())?;
        for &idx in list {
            w.put_u32(idx);
        }
    }
    Ok(())
}

fn decode_items(r: &mut ByteReader<'_>) -> Result<Items> {
    let ids = r.get_col()?;
    let categories = r.get_col()?;
    let item_categories = r.get_col()?;
    let guids = r.get_col()?;
    let attributes = r.get_col()?;
    let count = r.get_len()?;
    let mut item_attributes = Vec::with_capacity(count.min(r.remaining()));
    for _ in 0..count {
        let len = r.get_len()?;
        let mut list = AttributeList::with_capacity(len.min(r.remaining()));
        for _ in 0..len {
            list.push(r.get_u32()?);
        }
        item_attributes.push(list);
    }
    Ok(Items {
        ids,
        categories,
        item_categories,
        guids,
        attributes,
        item_attributes,
    })
}

fn encode_relations(relations: &Relations, w: &mut ByteWriter) -> Result<()> {
    w.put_col(&relations.items)?;
    w.put_len(relations.data.len())?;
    for data in &relations.data {
        w.put_len(data.len())?;
        for (name, targets) in data {
            w.put_str(name)?;
            w.put_col(targets)?;
        }
    }
    Ok(())
}

fn decode_relations(r: &mut ByteReader<'_>) -> Result<Relations> {
    let items = r.get_col()?;
    let count = r.get_len()?;
    let mut data = Vec::with_capacity(count.min(r.remaining()));
    for _ in 0..count {
        let names = r.get_len()?;
        let mut row = RelationData::new();
        for _ in 0..names {
            let name = r.get_str()?;
            let targets = r.get_col()?;
            row.insert(name, targets);
        }
        data.push(row);
    }
    Ok(Relations { items, data })
}

fn check_depth(depth: usize) -> Result<()> {
    if depth > MAX_SPATIAL_DEPTH {
        return Err(Error::codec(format!(
            "spatial structure nested deeper than {MAX_SPATIAL_DEPTH}"
        )));
    }
    Ok(())
}

fn encode_node(node: &SpatialNode, depth: usize, w: &mut ByteWriter) -> Result<()> {
    check_depth(depth)?;
    let mut tag = 0;
    if node.local_id.is_some() {
        tag |= NODE_HAS_ID;
    }
    if node.category.is_some() {
        tag |= NODE_HAS_CATEGORY;
    }
    w.put_u8(tag);
    if let Some(id) = node.local_id {
        w.put_u64(id);
    }
    if let Some(category) = &node.category {
        w.put_str(category)?;
    }
    w.put_len(node.children.len())?;
    for child in &node.children {
        encode_node(child, depth + 1, w)?;
    }
    Ok(())
}

fn decode_node(r: &mut ByteReader<'_>, depth: usize) -> Result<SpatialNode> {
    check_depth(depth)?;
    let tag = r.get_u8()?;
    if tag & !(NODE_HAS_ID | NODE_HAS_CATEGORY) != 0 {
        return Err(Error::codec(format!("bad spatial node tag {tag}")));
    }
    let local_id = if tag & NODE_HAS_ID != 0 {
        Some(r.get_u64()?)
    } else {
        None
    };
    let category = if tag & NODE_HAS_CATEGORY != 0 {
        Some(r.get_str()?)
    } else {
        None
    };
    let count = r.get_len()?;
    let mut children = Vec::with_capacity(count.min(r.remaining()));
    for _ in 0..count {
        children.push(decode_node(r, depth + 1)?);
    }
    Ok(SpatialNode {
        local_id,
        category,
        children,
    })
}
