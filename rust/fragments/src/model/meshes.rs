// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh tables: transforms, materials, representations and samples.

use serde::{Deserialize, Serialize};

use super::geometry::{CircleExtrusion, Shell};
use crate::error::{Error, Result};
use crate::ids::LocalId;

/// Placement frame. The z axis is implied by `x_direction × y_direction`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub position: [f64; 3],
    pub x_direction: [f32; 3],
    pub y_direction: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            x_direction: [1.0, 0.0, 0.0],
            y_direction: [0.0, 1.0, 0.0],
        }
    }
}

impl Transform {
    /// Identity rotation at the given position.
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: [x, y, z],
            ..Self::default()
        }
    }
}

/// Which faces of a mesh get rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderedFaces {
    #[default]
    One = 0,
    Two = 1,
}

impl RenderedFaces {
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(RenderedFaces::One),
            1 => Some(RenderedFaces::Two),
            _ => None,
        }
    }
}

/// Outline style of a material.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stroke {
    #[default]
    Default = 0,
}

impl Stroke {
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Stroke::Default),
            _ => None,
        }
    }
}

/// Surface appearance: RGBA color plus face and stroke mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
    #[serde(default)]
    pub rendered_faces: RenderedFaces,
    #[serde(default)]
    pub stroke: Stroke,
}

impl Material {
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r,
            g,
            b,
            a,
            rendered_faces: RenderedFaces::One,
            stroke: Stroke::Default,
        }
    }
}

/// Geometry table a representation points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepresentationClass {
    Shell = 1,
    CircleExtrusion = 2,
}

impl RepresentationClass {
    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for RepresentationClass {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(RepresentationClass::Shell),
            2 => Ok(RepresentationClass::CircleExtrusion),
            other => Err(Error::UnsupportedRepresentationClass(other)),
        }
    }
}

/// Geometry definition: bounding box plus a private index into the geometry
/// table selected by `class_tag`.
///
/// The tag is kept raw so documents with unknown classes still decode; the
/// builder rejects them when it has to interpret the geometry index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Representation {
    /// `[min_x, min_y, min_z, max_x, max_y, max_z]`
    pub bbox: [f32; 6],
    pub class_tag: u8,
    pub geometry: u32,
}

impl Representation {
    #[inline]
    pub fn class(&self) -> Result<RepresentationClass> {
        RepresentationClass::try_from(self.class_tag)
    }
}

/// One placed instance. All four fields are slot indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sample {
    pub global_transform: u32,
    pub material: u32,
    pub representation: u32,
    pub local_transform: u32,
}

/// Geometry half of a document. Every data table has a parallel local id
/// array; `meshes_items` runs parallel to `global_transforms` and holds the
/// owning item's slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Meshes {
    pub global_transforms: Vec<Transform>,
    pub global_transform_ids: Vec<LocalId>,
    pub meshes_items: Vec<u32>,

    pub local_transforms: Vec<Transform>,
    pub local_transform_ids: Vec<LocalId>,

    pub materials: Vec<Material>,
    pub material_ids: Vec<LocalId>,

    pub representations: Vec<Representation>,
    pub representation_ids: Vec<LocalId>,

    pub shells: Vec<Shell>,
    pub circle_extrusions: Vec<CircleExtrusion>,

    pub samples: Vec<Sample>,
    pub sample_ids: Vec<LocalId>,
}

impl Meshes {
    /// Number of geometries in the table selected by `class`.
    pub fn geometry_count(&self, class: RepresentationClass) -> usize {
        match class {
            RepresentationClass::Shell => self.shells.len(),
            RepresentationClass::CircleExtrusion => self.circle_extrusions.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn representation_class_from_tag() {
        assert_eq!(
            RepresentationClass::try_from(1).unwrap(),
            RepresentationClass::Shell
        );
        assert_eq!(
            RepresentationClass::try_from(2).unwrap(),
            RepresentationClass::CircleExtrusion
        );
        assert!(matches!(
            RepresentationClass::try_from(0),
            Err(Error::UnsupportedRepresentationClass(0))
        ));
    }

    #[test]
    fn material_payload_defaults_face_mode() {
        let material: Material = serde_json::from_str(r#"{"r":255,"g":0,"b":0,"a":128}"#).unwrap();
        assert_eq!(material, Material::rgba(255, 0, 0, 128));

        let two_sided: Material =
            serde_json::from_str(r#"{"r":1,"g":2,"b":3,"a":4,"renderedFaces":"TWO"}"#).unwrap();
        assert_eq!(two_sided.rendered_faces, RenderedFaces::Two);
    }

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.x_direction, [1.0, 0.0, 0.0]);
        assert_eq!(t.y_direction, [0.0, 1.0, 0.0]);
        assert_eq!(Transform::at(1.0, 2.0, 3.0).position, [1.0, 2.0, 3.0]);
    }
}
