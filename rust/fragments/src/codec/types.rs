// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary layout of the row types stored in mesh and geometry tables.

use super::io::{ByteReader, ByteWriter, Decode, Encode};
use crate::error::{Error, Result};
use crate::model::{
    Axis, AxisPart, CircleCurve, CircleExtrusion, Material, RenderedFaces, Representation,
    Sample, Shell, ShellHole, ShellKind, Stroke, Transform, Wire, WireSet,
};

fn bad_tag(what: &str, tag: u8) -> Error {
    Error::codec(format!("unknown {what} tag {tag}"))
}

impl Encode for Transform {
    fn encode(&self, w: &mut ByteWriter) -> Result<()> {
        for c in self.position {
            w.put_f64(c);
        }
        w.put_vec3(&self.x_direction);
        w.put_vec3(&self.y_direction);
        Ok(())
    }
}

impl Decode for Transform {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            position: [r.get_f64()?, r.get_f64()?, r.get_f64()?],
            x_direction: r.get_vec3()?,
            y_direction: r.get_vec3()?,
        })
    }
}

impl Encode for Material {
    fn encode(&self, w: &mut ByteWriter) -> Result<()> {
        w.put_bytes(&[self.r, self.g, self.b, self.a]);
        w.put_u8(self.rendered_faces as u8);
        w.put_u8(self.stroke as u8);
        Ok(())
    }
}

impl Decode for Material {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        let rgba = r.get_bytes(4)?;
        let faces = r.get_u8()?;
        let stroke = r.get_u8()?;
        Ok(Self {
            r: rgba[0],
            g: rgba[1],
            b: rgba[2],
            a: rgba[3],
            rendered_faces: RenderedFaces::from_u8(faces)
                .ok_or_else(|| bad_tag("rendered faces", faces))?,
            stroke: Stroke::from_u8(stroke).ok_or_else(|| bad_tag("stroke", stroke))?,
        })
    }
}

impl Encode for Representation {
    fn encode(&self, w: &mut ByteWriter) -> Result<()> {
        for c in self.bbox {
            w.put_f32(c);
        }
        w.put_u8(self.class_tag);
        w.put_u32(self.geometry);
        Ok(())
    }
}

impl Decode for Representation {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        let mut bbox = [0.0f32; 6];
        for c in &mut bbox {
            *c = r.get_f32()?;
        }
        Ok(Self {
            bbox,
            class_tag: r.get_u8()?,
            geometry: r.get_u32()?,
        })
    }
}

impl Encode for Sample {
    fn encode(&self, w: &mut ByteWriter) -> Result<()> {
        w.put_u32(self.global_transform);
        w.put_u32(self.material);
        w.put_u32(self.representation);
        w.put_u32(self.local_transform);
        Ok(())
    }
}

impl Decode for Sample {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            global_transform: r.get_u32()?,
            material: r.get_u32()?,
            representation: r.get_u32()?,
            local_transform: r.get_u32()?,
        })
    }
}

impl Encode for ShellHole {
    fn encode(&self, w: &mut ByteWriter) -> Result<()> {
        w.put_u32(self.profile);
        w.put_col(&self.indices)
    }
}

impl Decode for ShellHole {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            profile: r.get_u32()?,
            indices: r.get_col()?,
        })
    }
}

impl Encode for Shell {
    fn encode(&self, w: &mut ByteWriter) -> Result<()> {
        w.put_u8(self.kind as u8);
        w.put_col(&self.points)?;
        w.put_col(&self.profiles)?;
        w.put_col(&self.holes)
    }
}

impl Decode for Shell {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        let kind = r.get_u8()?;
        Ok(Self {
            kind: ShellKind::from_u8(kind).ok_or_else(|| bad_tag("shell kind", kind))?,
            points: r.get_col()?,
            profiles: r.get_col()?,
            holes: r.get_col()?,
        })
    }
}

impl Encode for Wire {
    fn encode(&self, w: &mut ByteWriter) -> Result<()> {
        w.put_vec3(&self.p1);
        w.put_vec3(&self.p2);
        Ok(())
    }
}

impl Decode for Wire {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            p1: r.get_vec3()?,
            p2: r.get_vec3()?,
        })
    }
}

impl Encode for WireSet {
    fn encode(&self, w: &mut ByteWriter) -> Result<()> {
        w.put_col(&self.ps)
    }
}

impl Decode for WireSet {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self { ps: r.get_col()? })
    }
}

impl Encode for CircleCurve {
    fn encode(&self, w: &mut ByteWriter) -> Result<()> {
        w.put_f32(self.aperture);
        w.put_vec3(&self.position);
        w.put_f32(self.radius);
        w.put_vec3(&self.x_direction);
        w.put_vec3(&self.y_direction);
        Ok(())
    }
}

impl Decode for CircleCurve {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            aperture: r.get_f32()?,
            position: r.get_vec3()?,
            radius: r.get_f32()?,
            x_direction: r.get_vec3()?,
            y_direction: r.get_vec3()?,
        })
    }
}

impl Encode for AxisPart {
    fn encode(&self, w: &mut ByteWriter) -> Result<()> {
        w.put_u8(*self as u8);
        Ok(())
    }
}

impl Decode for AxisPart {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        let tag = r.get_u8()?;
        AxisPart::from_u8(tag).ok_or_else(|| bad_tag("axis part", tag))
    }
}

impl Encode for Axis {
    fn encode(&self, w: &mut ByteWriter) -> Result<()> {
        w.put_col(&self.wires)?;
        w.put_col(&self.order)?;
        w.put_col(&self.parts)?;
        w.put_col(&self.wire_sets)?;
        w.put_col(&self.circle_curves)
    }
}

impl Decode for Axis {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            wires: r.get_col()?,
            order: r.get_col()?,
            parts: r.get_col()?,
            wire_sets: r.get_col()?,
            circle_curves: r.get_col()?,
        })
    }
}

impl Encode for CircleExtrusion {
    fn encode(&self, w: &mut ByteWriter) -> Result<()> {
        w.put_col(&self.radius)?;
        w.put_col(&self.axes)
    }
}

impl Decode for CircleExtrusion {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            radius: r.get_col()?,
            axes: r.get_col()?,
        })
    }
}
