// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

use super::{point, to_f32, Bounds, EncodedGeometry, Geometry};
use crate::error::{Error, Result};
use crate::model::{Axis, AxisPart, CircleCurve, CircleExtrusion, Wire, WireSet};

/// Circle extrusion as sent by callers: one radius per axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCircleExtrusion {
    pub radius: Vec<f64>,
    pub axes: Vec<RawAxis>,
}

/// Sweep path; `order[i]` indexes the list named by `parts[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAxis {
    /// `[x1, y1, z1, x2, y2, z2]`
    #[serde(default)]
    pub wires: Vec<[f64; 6]>,
    pub order: Vec<u32>,
    pub parts: Vec<AxisPart>,
    #[serde(default)]
    pub wire_sets: Vec<Vec<[f64; 3]>>,
    #[serde(default)]
    pub circle_curves: Vec<RawCircleCurve>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCircleCurve {
    pub aperture: f64,
    pub position: [f64; 3],
    pub radius: f64,
    pub x_direction: [f64; 3],
    pub y_direction: [f64; 3],
}

impl RawCircleExtrusion {
    pub fn encode(&self) -> Result<EncodedGeometry> {
        if self.radius.len() != self.axes.len() {
            return Err(Error::request(format!(
                "circle extrusion has {} radii for {} axes",
                self.radius.len(),
                self.axes.len()
            )));
        }

        let mut bounds = Bounds::new();
        let mut axes = Vec::with_capacity(self.axes.len());
        for (raw, &radius) in self.axes.iter().zip(&self.radius) {
            let (axis, mut axis_bounds) = raw.encode()?;
            axis_bounds.inflate(radius);
            bounds.merge(&axis_bounds);
            axes.push(axis);
        }

        Ok(EncodedGeometry {
            geometry: Geometry::CircleExtrusion(CircleExtrusion {
                radius: self.radius.clone(),
                axes,
            }),
            bbox: bounds.to_bbox(),
        })
    }
}

impl RawAxis {
    fn encode(&self) -> Result<(Axis, Bounds)> {
        if self.order.len() != self.parts.len() {
            return Err(Error::request(format!(
                "axis has {} order entries for {} parts",
                self.order.len(),
                self.parts.len()
            )));
        }
        for (&idx, part) in self.order.iter().zip(&self.parts) {
            let len = match part {
                AxisPart::Wire => self.wires.len(),
                AxisPart::WireSet => self.wire_sets.len(),
                AxisPart::CircleCurve => self.circle_curves.len(),
            };
            if idx as usize >= len {
                return Err(Error::request(format!(
                    "axis part {part:?} index {idx} out of range ({len} entries)"
                )));
            }
        }

        let mut bounds = Bounds::new();
        let wires = self
            .wires
            .iter()
            .map(|w| {
                let p1 = [w[0], w[1], w[2]];
                let p2 = [w[3], w[4], w[5]];
                bounds.add(point(&p1));
                bounds.add(point(&p2));
                Wire {
                    p1: to_f32(&p1),
                    p2: to_f32(&p2),
                }
            })
            .collect();
        let wire_sets = self
            .wire_sets
            .iter()
            .map(|ps| {
                ps.iter().for_each(|p| bounds.add(point(p)));
                WireSet {
                    ps: ps.iter().map(to_f32).collect(),
                }
            })
            .collect();
        let circle_curves = self
            .circle_curves
            .iter()
            .map(|c| {
                bounds.add_ball(point(&c.position), c.radius);
                CircleCurve {
                    aperture: c.aperture as f32,
                    position: to_f32(&c.position),
                    radius: c.radius as f32,
                    x_direction: to_f32(&c.x_direction),
                    y_direction: to_f32(&c.y_direction),
                }
            })
            .collect();

        Ok((
            Axis {
                wires,
                order: self.order.clone(),
                parts: self.parts.clone(),
                wire_sets,
                circle_curves,
            },
            bounds,
        ))
    }
}
