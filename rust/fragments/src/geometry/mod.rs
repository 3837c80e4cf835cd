// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Encoders from caller-supplied raw geometry to stored geometry payloads.
//!
//! Raw input uses `f64` coordinates; stored payloads use `f32`. Every
//! encoder validates its indices and reports the bounding box used for the
//! owning representation.

mod extrusion;
mod shell;

pub use extrusion::{RawAxis, RawCircleCurve, RawCircleExtrusion};
pub use shell::RawShell;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{CircleExtrusion, RepresentationClass, Shell};

/// Raw geometry attached to a representation create or update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawGeometry {
    Shell(RawShell),
    CircleExtrusion(RawCircleExtrusion),
}

impl RawGeometry {
    pub fn class(&self) -> RepresentationClass {
        match self {
            RawGeometry::Shell(_) => RepresentationClass::Shell,
            RawGeometry::CircleExtrusion(_) => RepresentationClass::CircleExtrusion,
        }
    }
}

/// Stored geometry payload, ready for its class table.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Shell(Shell),
    CircleExtrusion(CircleExtrusion),
}

/// Encoded payload plus its bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedGeometry {
    pub geometry: Geometry,
    pub bbox: [f32; 6],
}

/// Encodes `raw` as geometry of class `class`.
pub fn encode_geometry(class: RepresentationClass, raw: &RawGeometry) -> Result<EncodedGeometry> {
    if raw.class() != class {
        return Err(Error::request(format!(
            "geometry payload is {:?} but representation class is {:?}",
            raw.class(),
            class
        )));
    }
    match raw {
        RawGeometry::Shell(shell) => shell.encode(),
        RawGeometry::CircleExtrusion(extrusion) => extrusion.encode(),
    }
}

/// Axis-aligned bounds accumulated in model precision.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Bounds {
    min: Point3<f64>,
    max: Point3<f64>,
    empty: bool,
}

impl Bounds {
    pub(crate) fn new() -> Self {
        Self {
            min: Point3::origin(),
            max: Point3::origin(),
            empty: true,
        }
    }

    pub(crate) fn add(&mut self, p: Point3<f64>) {
        if self.empty {
            self.min = p;
            self.max = p;
            self.empty = false;
        } else {
            self.min = self.min.inf(&p);
            self.max = self.max.sup(&p);
        }
    }

    /// Adds a cube of half-size `r` around `p`.
    pub(crate) fn add_ball(&mut self, p: Point3<f64>, r: f64) {
        let r = r.abs();
        self.add(Point3::new(p.x - r, p.y - r, p.z - r));
        self.add(Point3::new(p.x + r, p.y + r, p.z + r));
    }

    /// Grows every face outward by `r`.
    pub(crate) fn inflate(&mut self, r: f64) {
        if self.empty {
            return;
        }
        let r = r.abs();
        self.min -= nalgebra::Vector3::repeat(r);
        self.max += nalgebra::Vector3::repeat(r);
    }

    pub(crate) fn merge(&mut self, other: &Bounds) {
        if !other.empty {
            self.add(other.min);
            self.add(other.max);
        }
    }

    /// `[min_x, min_y, min_z, max_x, max_y, max_z]`; all zero when empty.
    pub(crate) fn to_bbox(self) -> [f32; 6] {
        [
            self.min.x as f32,
            self.min.y as f32,
            self.min.z as f32,
            self.max.x as f32,
            self.max.y as f32,
            self.max.z as f32,
        ]
    }
}

pub(crate) fn to_f32(p: &[f64; 3]) -> [f32; 3] {
    [p[0] as f32, p[1] as f32, p[2] as f32]
}

pub(crate) fn point(p: &[f64; 3]) -> Point3<f64> {
    Point3::new(p[0], p[1], p[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_payload_picks_the_right_class() {
        let shell: RawGeometry =
            serde_json::from_str(r#"{"points":[[0,0,0],[1,0,0],[0,1,0]],"profiles":[[0,1,2]]}"#)
                .unwrap();
        assert_eq!(shell.class(), RepresentationClass::Shell);

        let pipe: RawGeometry = serde_json::from_str(
            r#"{"radius":[0.1],"axes":[{"wires":[[0,0,0,0,0,3]],"order":[0],"parts":["WIRE"]}]}"#,
        )
        .unwrap();
        assert_eq!(pipe.class(), RepresentationClass::CircleExtrusion);
    }

    #[test]
    fn class_mismatch_is_rejected() {
        let raw: RawGeometry =
            serde_json::from_str(r#"{"points":[[0,0,0]],"profiles":[]}"#).unwrap();
        assert!(matches!(
            encode_geometry(RepresentationClass::CircleExtrusion, &raw),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn empty_bounds_are_zero() {
        assert_eq!(Bounds::new().to_bbox(), [0.0; 6]);
    }
}
