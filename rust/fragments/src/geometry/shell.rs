// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{point, to_f32, Bounds, EncodedGeometry, Geometry};
use crate::error::{Error, Result};
use crate::model::{Shell, ShellHole, ShellKind};

/// Shell as sent by callers: points, outer profiles, and holes keyed by the
/// profile they cut.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawShell {
    pub points: Vec<[f64; 3]>,
    pub profiles: Vec<Vec<u32>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub holes: BTreeMap<u32, Vec<Vec<u32>>>,
}

impl RawShell {
    pub fn encode(&self) -> Result<EncodedGeometry> {
        let point_count = self.points.len();
        let check = |indices: &[u32], what: &str| -> Result<()> {
            match indices.iter().find(|&&i| i as usize >= point_count) {
                Some(bad) => Err(Error::request(format!(
                    "shell {what} references point {bad}, shell has {point_count} points"
                ))),
                None => Ok(()),
            }
        };

        for profile in &self.profiles {
            check(profile, "profile")?;
        }

        let mut holes = Vec::new();
        for (&profile, loops) in &self.holes {
            if profile as usize >= self.profiles.len() {
                return Err(Error::request(format!(
                    "shell hole cuts profile {profile}, shell has {} profiles",
                    self.profiles.len()
                )));
            }
            for indices in loops {
                check(indices, "hole")?;
                holes.push(ShellHole {
                    profile,
                    indices: indices.clone(),
                });
            }
        }

        let mut bounds = Bounds::new();
        for p in &self.points {
            bounds.add(point(p));
        }

        Ok(EncodedGeometry {
            geometry: Geometry::Shell(Shell {
                points: self.points.iter().map(to_f32).collect(),
                profiles: self.profiles.clone(),
                holes,
                kind: ShellKind::for_point_count(point_count),
            }),
            bbox: bounds.to_bbox(),
        })
    }
}
