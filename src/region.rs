use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::bitfield::{self, PackedWords};
use crate::block_state::{namespaced, normalize_name, BlockState};
use crate::error::{LitematicError, Result};
use crate::mesh::{self, Cuboid};
use crate::palette::Palette;
use crate::voxel_grid::VoxelGrid;

/// Material-list key for voxels whose palette index has no entry.
pub const UNKNOWN_BLOCK: &str = "unknown";

/// One named sub-volume of a litematic: a palette plus a dense voxel grid.
///
/// `size` keeps the sign stored in the file (Litematica writes negative sizes
/// for regions selected towards negative coordinates); the grid always uses
/// the absolute extents.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    pub position: (i32, i32, i32),
    pub size: (i32, i32, i32),
    pub palette: Palette,
    pub grid: VoxelGrid,
}

impl Region {
    pub fn new(name: String, position: (i32, i32, i32), size: (i32, i32, i32)) -> Result<Self> {
        let grid = VoxelGrid::new(abs_size(size))?;
        Ok(Region {
            name,
            position,
            size,
            palette: Palette::new(),
            grid,
        })
    }

    pub fn from_parts(
        name: String,
        position: (i32, i32, i32),
        size: (i32, i32, i32),
        palette: Palette,
        grid: VoxelGrid,
    ) -> Self {
        Region {
            name,
            position,
            size,
            palette,
            grid,
        }
    }

    /// Build a region from its packed block states, in any of the accepted layouts.
    pub fn from_packed(
        name: String,
        position: (i32, i32, i32),
        size: (i32, i32, i32),
        palette: Palette,
        block_states: PackedWords<'_>,
    ) -> Result<Self> {
        let nbits = bitfield::bits_for_palette(palette.len())?;
        let words = block_states.to_words();
        let grid = bitfield::decode(&words, nbits, abs_size(size))?;
        debug!(
            "Decoded region '{}' ({}x{}x{}, {} palette entries, {} bits per entry)",
            name,
            grid.width(),
            grid.height(),
            grid.depth(),
            palette.len(),
            nbits
        );
        Ok(Region::from_parts(name, position, size, palette, grid))
    }

    /// Block states packed into an NBT long array.
    pub fn packed_block_states(&self) -> Result<Vec<i64>> {
        let words = bitfield::encode(&self.grid, self.palette.len())?;
        Ok(bitfield::words_to_longs(&words))
    }

    pub fn get_dimensions(&self) -> (usize, usize, usize) {
        self.grid.dimensions()
    }

    /// World position of the grid's (0, 0, 0) voxel. A negative size
    /// component places the region below its position on that axis.
    pub fn min_corner(&self) -> (i64, i64, i64) {
        let corner = |pos: i32, size: i32| {
            if size >= 0 {
                i64::from(pos)
            } else {
                i64::from(pos) + i64::from(size) + 1
            }
        };
        (
            corner(self.position.0, self.size.0),
            corner(self.position.1, self.size.1),
            corner(self.position.2, self.size.2),
        )
    }

    pub fn volume(&self) -> usize {
        self.grid.volume()
    }

    pub fn get_block(&self, x: usize, y: usize, z: usize) -> Option<&BlockState> {
        self.grid.get(x, y, z).and_then(|i| self.palette.get(i))
    }

    pub fn get_block_index(&self, x: usize, y: usize, z: usize) -> Option<usize> {
        self.grid.get(x, y, z)
    }

    pub fn set_block(&mut self, x: usize, y: usize, z: usize, block: &BlockState) -> bool {
        if !self.grid.contains(x, y, z) {
            return false;
        }
        let index = self.palette.get_or_insert(block);
        self.grid.set(x, y, z, index)
    }

    /// Replace the voxel with air, returning the palette index it held.
    pub fn break_block(&mut self, x: usize, y: usize, z: usize) -> Option<usize> {
        let previous = self.grid.get(x, y, z)?;
        self.grid.set(x, y, z, 0);
        Some(previous)
    }

    pub fn count_non_air_blocks(&self) -> usize {
        self.grid.count_non_air()
    }

    /// Non-air block counts keyed by `minecraft:<name>`, properties ignored.
    pub fn material_list(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        self.add_materials(&mut counts);
        counts
    }

    pub(crate) fn add_materials(&self, counts: &mut BTreeMap<String, usize>) {
        for &index in self.grid.cells() {
            if index == 0 {
                continue;
            }
            let key = match self.palette.get(index) {
                Some(block) => block.namespaced_name(),
                None => UNKNOWN_BLOCK.to_string(),
            };
            *counts.entry(key).or_insert(0) += 1;
        }
    }

    /// Blocks present in the region that match `term`, best match first.
    ///
    /// Names are compared as display names, lowercase without namespace and
    /// with `_` read as a space. An exact match scores 100, a prefix 80, a
    /// substring 60 and a name whose words start with each word of the term
    /// 40. An empty term lists every block with score 1.
    pub fn search_blocks(&self, term: &str) -> Vec<(String, u32)> {
        let term = display_name(term);
        let mut hits: Vec<(String, u32)> = self
            .material_list()
            .into_keys()
            .filter(|name| name != UNKNOWN_BLOCK)
            .filter_map(|name| {
                let score = match_score(&display_name(&name), &term);
                (score > 0).then_some((name, score))
            })
            .collect();
        hits.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        hits
    }

    /// Replace every variant of `target` with `replacement`, matching names
    /// without namespace and case. Returns the number of voxels changed.
    pub fn replace_block(&mut self, target: &str, replacement: &str) -> usize {
        let target = normalize_name(target);
        let replacement_norm = normalize_name(replacement);

        let targets: Vec<usize> = self
            .palette
            .iter()
            .enumerate()
            .filter(|(_, b)| b.normalized_name() == target)
            .map(|(i, _)| i)
            .collect();
        if targets.is_empty() {
            debug!("Block '{}' not in palette of region '{}'", target, self.name);
            return 0;
        }

        let existing = self
            .palette
            .iter()
            .position(|b| b.normalized_name() == replacement_norm);
        let replacement_index = match existing {
            Some(i) => i,
            None => self
                .palette
                .get_or_insert(&BlockState::new(namespaced(&replacement_norm))),
        };

        let mut replaced = 0;
        for cell in self.grid.cells_mut() {
            if targets.contains(cell) && *cell != replacement_index {
                *cell = replacement_index;
                replaced += 1;
            }
        }
        replaced
    }

    /// Copy of this region keeping only voxels with `y_min <= y <= y_max + 1`
    /// whose namespaced name is in `filter` (any name when `filter` is `None`).
    /// The palette is shared unchanged.
    pub fn filtered(&self, y_min: usize, y_max: usize, filter: Option<&[&str]>) -> Result<Region> {
        let mut grid = self.grid.clone();
        let filter: Option<Vec<String>> = filter.map(|f| f.iter().map(|n| namespaced(n)).collect());
        let mut kept = 0;

        for (i, cell) in grid.cells_mut().iter_mut().enumerate() {
            let (_, y, _) = self.grid.coords_of(i);
            let keep = y >= y_min
                && y <= y_max.saturating_add(1)
                && *cell > 0
                && match self.palette.get(*cell) {
                    Some(block) => filter
                        .as_ref()
                        .map_or(true, |names| names.contains(&block.namespaced_name())),
                    None => false,
                };
            if keep {
                kept += 1;
            } else {
                *cell = 0;
            }
        }

        if kept == 0 {
            return Err(LitematicError::EmptySelection);
        }
        Ok(Region::from_parts(
            self.name.clone(),
            self.position,
            self.size,
            self.palette.clone(),
            grid,
        ))
    }

    /// Greedy cuboid cover of the region's non-air voxels.
    pub fn cuboids(&self) -> Vec<Cuboid> {
        mesh::compress(&self.grid)
    }
}

fn display_name(name: &str) -> String {
    normalize_name(name).replace('_', " ").trim().to_string()
}

fn match_score(name: &str, term: &str) -> u32 {
    if term.is_empty() {
        1
    } else if name == term {
        100
    } else if name.starts_with(term) {
        80
    } else if name.contains(term) {
        60
    } else if term
        .split_whitespace()
        .all(|part| name.split(' ').any(|word| word.starts_with(part)))
    {
        40
    } else {
        0
    }
}

pub(crate) fn abs_size(size: (i32, i32, i32)) -> (i32, i32, i32) {
    (size.0.abs(), size.1.abs(), size.2.abs())
}
