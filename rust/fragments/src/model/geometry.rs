// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stored geometry payloads referenced by representations.

use serde::{Deserialize, Serialize};

/// Index width hint for consumers: `Big` shells need 32-bit indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShellKind {
    #[default]
    Normal = 0,
    Big = 1,
}

impl ShellKind {
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ShellKind::Normal),
            1 => Some(ShellKind::Big),
            _ => None,
        }
    }

    /// `Big` once point indices no longer fit in 16 bits.
    pub fn for_point_count(count: usize) -> Self {
        if count > u16::MAX as usize {
            ShellKind::Big
        } else {
            ShellKind::Normal
        }
    }
}

/// Inner loop of a shell profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellHole {
    /// Index of the profile this hole cuts.
    pub profile: u32,
    pub indices: Vec<u32>,
}

/// Boundary-represented mesh: planar profiles over a shared point list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shell {
    pub points: Vec<[f32; 3]>,
    pub profiles: Vec<Vec<u32>>,
    pub holes: Vec<ShellHole>,
    pub kind: ShellKind,
}

/// Straight segment of an extrusion axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wire {
    pub p1: [f32; 3],
    pub p2: [f32; 3],
}

/// Polyline segment of an extrusion axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireSet {
    pub ps: Vec<[f32; 3]>,
}

/// Circular arc segment of an extrusion axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleCurve {
    pub aperture: f32,
    pub position: [f32; 3],
    pub radius: f32,
    pub x_direction: [f32; 3],
    pub y_direction: [f32; 3],
}

/// Which list of an [`Axis`] an `order` entry indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AxisPart {
    Wire = 0,
    WireSet = 1,
    CircleCurve = 2,
}

impl AxisPart {
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(AxisPart::Wire),
            1 => Some(AxisPart::WireSet),
            2 => Some(AxisPart::CircleCurve),
            _ => None,
        }
    }
}

/// Sweep path made of wires, wire sets and circle curves, visited in `order`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Axis {
    pub wires: Vec<Wire>,
    pub order: Vec<u32>,
    pub parts: Vec<AxisPart>,
    pub wire_sets: Vec<WireSet>,
    pub circle_curves: Vec<CircleCurve>,
}

/// Circular profile swept along one or more axes (pipes, rebars).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CircleExtrusion {
    /// One radius per axis.
    pub radius: Vec<f64>,
    pub axes: Vec<Axis>,
}
