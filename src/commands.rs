//! `/setblock` and `/fill` command generation.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::mesh::CuboidMesher;
use crate::region::Region;

/// Options for command generation, usually read from a JSON settings string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandOptions {
    /// World position of the region's (0, 0, 0) voxel.
    pub origin: (i32, i32, i32),
}

impl CommandOptions {
    pub fn with_origin(origin: (i32, i32, i32)) -> Self {
        CommandOptions { origin }
    }

    /// Parse `{"origin": [x, y, z]}`. Missing settings mean the defaults.
    pub fn from_settings(settings: Option<&str>) -> Result<Self> {
        match settings {
            Some(json) if !json.trim().is_empty() => Ok(serde_json::from_str(json)?),
            _ => Ok(CommandOptions::default()),
        }
    }

    /// The same options with the origin moved by `delta`, clamped to `i32`.
    pub fn shifted(&self, delta: (i64, i64, i64)) -> Self {
        let shift = |base: i32, d: i64| clamp_i32(i64::from(base) + d);
        CommandOptions {
            origin: (
                shift(self.origin.0, delta.0),
                shift(self.origin.1, delta.1),
                shift(self.origin.2, delta.2),
            ),
        }
    }

    // World coordinates past the i32 range clamp to its edge
    fn offset(&self, (x, y, z): (usize, usize, usize)) -> (i32, i32, i32) {
        let shift = |base: i32, d: usize| clamp_i32(i64::from(base).saturating_add(d as i64));
        (
            shift(self.origin.0, x),
            shift(self.origin.1, y),
            shift(self.origin.2, z),
        )
    }
}

fn clamp_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    SetBlock {
        position: (i32, i32, i32),
        block: String,
    },
    Fill {
        from: (i32, i32, i32),
        to: (i32, i32, i32),
        block: String,
    },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetBlock {
                position: (x, y, z),
                block,
            } => write!(f, "/setblock {} {} {} {}", x, y, z, block),
            Command::Fill {
                from: (x1, y1, z1),
                to: (x2, y2, z2),
                block,
            } => write!(
                f,
                "/fill {} {} {} {} {} {} {}",
                x1, y1, z1, x2, y2, z2, block
            ),
        }
    }
}

/// Compress the region into cuboids and emit one command per cuboid:
/// `/setblock` for single voxels, `/fill` otherwise.
pub fn fill_commands(region: &Region, options: &CommandOptions) -> Vec<Command> {
    let mut commands = Vec::new();
    for cuboid in CuboidMesher::new(&region.grid) {
        let block = match region.palette.get(cuboid.palette_index) {
            Some(block) if block.is_air() => {
                debug!("Skipping air palette entry {}", cuboid.palette_index);
                continue;
            }
            Some(block) => block.command_string(),
            None => {
                warn!(
                    "Palette index {} out of range in region '{}', skipping {} blocks",
                    cuboid.palette_index,
                    region.name,
                    cuboid.volume()
                );
                continue;
            }
        };

        let from = options.offset(cuboid.start);
        if cuboid.is_single_block() {
            commands.push(Command::SetBlock {
                position: from,
                block,
            });
        } else {
            commands.push(Command::Fill {
                from,
                to: options.offset(cuboid.end),
                block,
            });
        }
    }
    commands
}

/// One `/setblock` per non-air voxel, in x → y → z order.
pub fn setblock_commands(region: &Region, options: &CommandOptions) -> Vec<Command> {
    let (width, height, depth) = region.get_dimensions();
    let mut commands = Vec::new();
    for x in 0..width {
        for y in 0..height {
            for z in 0..depth {
                let index = region.grid.at(x, y, z);
                if index == 0 {
                    continue;
                }
                match region.palette.get(index) {
                    Some(block) if !block.is_air() => commands.push(Command::SetBlock {
                        position: options.offset((x, y, z)),
                        block: block.command_string(),
                    }),
                    _ => {}
                }
            }
        }
    }
    commands
}

/// Commands joined one per line.
pub fn to_script(commands: &[Command]) -> String {
    commands
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
