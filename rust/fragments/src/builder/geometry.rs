// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry tables re-derived from the surviving representations.
//!
//! A surviving representation keeps its geometry, addressed by its old
//! index in its class table. Geometry no surviving representation points at
//! is dropped, and geometry shared by several representations is kept once.

use rustc_hash::{FxHashMap, FxHashSet};

use super::index::{Origin, TableIndex};
use super::plan::KindPlan;
use crate::error::{Error, Result};
use crate::geometry::{encode_geometry, Geometry};
use crate::ids::{EntityKind, LocalId};
use crate::model::{CircleExtrusion, Representation, RepresentationClass, Shell};
use crate::reader::DocumentReader;
use crate::request::RepresentationData;

/// Payload of one output geometry slot.
#[derive(Debug, Clone)]
pub(crate) enum Stored<T> {
    /// Index in the source table.
    Source(u32),
    New(T),
}

/// Representation rows in output slot order plus the geometry they use.
#[derive(Debug, Default)]
pub(crate) struct GeometryLayout {
    pub representations: Vec<Representation>,
    pub shells: Vec<Stored<Shell>>,
    pub circle_extrusions: Vec<Stored<CircleExtrusion>>,
}

impl GeometryLayout {
    /// Walks the representation index in slot order and assigns every
    /// geometry a slot in its class table.
    ///
    /// `available` limits which source geometry may be reused; it is the
    /// projection of the delta selection and `None` in full mode.
    pub fn assign(
        reader: &DocumentReader<'_>,
        index: &TableIndex,
        plan: &KindPlan<RepresentationData>,
        available: Option<(&FxHashSet<u32>, &FxHashSet<u32>)>,
    ) -> Result<Self> {
        let mut layout = GeometryLayout::default();
        let mut reused: FxHashMap<(RepresentationClass, u32), u32> = FxHashMap::default();
        let source = &reader.document().meshes;

        for (&id, origin) in index.ids.iter().zip(&index.origins) {
            let old = match origin {
                Origin::Source(slot) => Some(source.representations.get(*slot).ok_or_else(
                    || Error::codec(format!("representation slot {slot} out of range")),
                )?),
                Origin::Created => None,
            };

            let row = match (plan.payload(id), old) {
                (Some(data), old) => layout.changed(id, data, old, &mut reused, available)?,
                (None, Some(old)) => {
                    let class = old.class()?;
                    let geometry = layout.reuse(class, old.geometry, &mut reused, available, id)?;
                    Representation {
                        geometry,
                        ..*old
                    }
                }
                (None, None) => {
                    return Err(Error::codec(format!(
                        "created representation {id} has no payload"
                    )))
                }
            };
            layout.representations.push(row);
        }
        Ok(layout)
    }

    fn changed(
        &mut self,
        id: LocalId,
        data: &RepresentationData,
        old: Option<&Representation>,
        reused: &mut FxHashMap<(RepresentationClass, u32), u32>,
        available: Option<(&FxHashSet<u32>, &FxHashSet<u32>)>,
    ) -> Result<Representation> {
        let class = RepresentationClass::try_from(data.representation_class)?;

        if let Some(raw) = &data.geometry {
            let encoded = encode_geometry(class, raw)?;
            let geometry = match encoded.geometry {
                Geometry::Shell(shell) => push(&mut self.shells, Stored::New(shell))?,
                Geometry::CircleExtrusion(ext) => {
                    push(&mut self.circle_extrusions, Stored::New(ext))?
                }
            };
            return Ok(Representation {
                bbox: data.bbox.unwrap_or(encoded.bbox),
                class_tag: class.tag(),
                geometry,
            });
        }

        let Some(old) = old else {
            return Err(Error::request(format!(
                "representation {id} is created without geometry"
            )));
        };
        if old.class()? != class {
            return Err(Error::request(format!(
                "representation {id} changes class without new geometry"
            )));
        }
        let geometry = self.reuse(class, old.geometry, reused, available, id)?;
        Ok(Representation {
            bbox: data.bbox.unwrap_or(old.bbox),
            class_tag: class.tag(),
            geometry,
        })
    }

    fn reuse(
        &mut self,
        class: RepresentationClass,
        old_index: u32,
        reused: &mut FxHashMap<(RepresentationClass, u32), u32>,
        available: Option<(&FxHashSet<u32>, &FxHashSet<u32>)>,
        id: LocalId,
    ) -> Result<u32> {
        if let Some(&slot) = reused.get(&(class, old_index)) {
            return Ok(slot);
        }
        if let Some((shells, extrusions)) = available {
            let projected = match class {
                RepresentationClass::Shell => shells,
                RepresentationClass::CircleExtrusion => extrusions,
            };
            if !projected.contains(&old_index) {
                return Err(Error::ReferentialIntegrity(format!(
                    "{} {id} uses geometry {old_index} outside the selection",
                    EntityKind::Representation
                )));
            }
        }
        let slot = match class {
            RepresentationClass::Shell => push(&mut self.shells, Stored::Source(old_index))?,
            RepresentationClass::CircleExtrusion => {
                push(&mut self.circle_extrusions, Stored::Source(old_index))?
            }
        };
        reused.insert((class, old_index), slot);
        Ok(slot)
    }
}

fn push<T>(table: &mut Vec<Stored<T>>, value: Stored<T>) -> Result<u32> {
    let slot = u32::try_from(table.len())
        .map_err(|_| Error::codec("geometry table exceeds u32 entries"))?;
    table.push(value);
    Ok(slot)
}

/// Resolves a stored slot against the source geometry table.
pub(crate) fn materialize<T: Clone>(stored: &Stored<T>, source: &[T], table: &str) -> Result<T> {
    match stored {
        Stored::Source(idx) => source.get(*idx as usize).cloned().ok_or_else(|| {
            Error::codec(format!("{table} geometry {idx} out of range"))
        }),
        Stored::New(value) => Ok(value.clone()),
    }
}
