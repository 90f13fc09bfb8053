//! Rotations and mirrors of a region, with block-state property remapping.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::block_state::BlockState;
use crate::error::Result;
use crate::palette::Palette;
use crate::region::Region;
use crate::voxel_grid::VoxelGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformKind {
    /// 90° clockwise around Y: `(x, z) -> (z, width - 1 - x)`.
    RotateY90,
    /// Mirror across the YZ plane.
    FlipX,
    /// Mirror across the XY plane.
    FlipZ,
}

type PropertyMap = &'static [(&'static str, &'static [(&'static str, &'static str)])];

const ROTATE_Y_MAP: PropertyMap = &[
    (
        "facing",
        &[("north", "west"), ("west", "south"), ("south", "east"), ("east", "north")],
    ),
    ("axis", &[("x", "z"), ("z", "x"), ("y", "y")]),
    (
        "shape",
        &[
            ("straight", "straight"),
            ("inner_left", "outer_right"),
            ("inner_right", "outer_left"),
            ("outer_left", "inner_right"),
            ("outer_right", "inner_left"),
        ],
    ),
    ("half", &[("top", "top"), ("bottom", "bottom")]),
    ("hinge", &[("left", "right"), ("right", "left")]),
    ("open", &[("true", "true"), ("false", "false")]),
    ("powered", &[("true", "true"), ("false", "false")]),
];

const FLIP_X_MAP: PropertyMap = &[
    (
        "facing",
        &[("east", "west"), ("west", "east"), ("north", "north"), ("south", "south")],
    ),
    ("axis", &[("x", "x"), ("z", "z"), ("y", "y")]),
    (
        "shape",
        &[
            ("straight", "straight"),
            ("inner_left", "inner_right"),
            ("inner_right", "inner_left"),
            ("outer_left", "outer_right"),
            ("outer_right", "outer_left"),
        ],
    ),
    ("half", &[("top", "top"), ("bottom", "bottom")]),
    ("hinge", &[("left", "right"), ("right", "left")]),
];

const FLIP_Z_MAP: PropertyMap = &[
    (
        "facing",
        &[("north", "south"), ("south", "north"), ("east", "east"), ("west", "west")],
    ),
    ("axis", &[("x", "x"), ("z", "z"), ("y", "y")]),
    (
        "shape",
        &[
            ("straight", "straight"),
            ("inner_left", "outer_left"),
            ("outer_left", "inner_left"),
            ("inner_right", "outer_right"),
            ("outer_right", "inner_right"),
        ],
    ),
    ("half", &[("top", "top"), ("bottom", "bottom")]),
    ("hinge", &[("left", "left"), ("right", "right")]),
];

impl TransformKind {
    fn property_map(self) -> PropertyMap {
        match self {
            TransformKind::RotateY90 => ROTATE_Y_MAP,
            TransformKind::FlipX => FLIP_X_MAP,
            TransformKind::FlipZ => FLIP_Z_MAP,
        }
    }

    fn map_value(self, property: &str, value: &str) -> Option<&'static str> {
        self.property_map()
            .iter()
            .find(|(name, _)| *name == property)
            .and_then(|(_, values)| values.iter().find(|(from, _)| *from == value))
            .map(|(_, to)| *to)
    }
}

/// The block state produced by applying `kind` to `block`. Properties without
/// a mapping are kept.
pub fn transform_block_state(block: &BlockState, kind: TransformKind) -> BlockState {
    let properties = block
        .properties
        .iter()
        .map(|(k, v)| match kind.map_value(k, v) {
            Some(mapped) => (k.clone(), SmolStr::new(mapped)),
            None => (k.clone(), v.clone()),
        })
        .collect();
    BlockState {
        name: block.name.clone(),
        properties,
    }
}

/// Memoises `(old palette index, transform) -> new palette index` while a
/// region is being transformed.
#[derive(Debug, Default)]
pub struct PaletteTransformCache {
    map: FxHashMap<(usize, TransformKind), usize>,
}

impl PaletteTransformCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index in `new_palette` of the transformed state of `old_palette[index]`.
    /// Air stays 0 and indices missing from the old palette are passed through.
    pub fn remap(
        &mut self,
        old_palette: &Palette,
        new_palette: &mut Palette,
        index: usize,
        kind: TransformKind,
    ) -> usize {
        if index == 0 {
            return 0;
        }
        if let Some(&cached) = self.map.get(&(index, kind)) {
            return cached;
        }
        let Some(block) = old_palette.get(index) else {
            return index;
        };
        let new_index = new_palette.get_or_insert(&transform_block_state(block, kind));
        self.map.insert((index, kind), new_index);
        new_index
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Region {
    pub fn rotate_y_90(&mut self) -> Result<()> {
        let (width, height, depth) = self.grid.dimensions();
        self.remap_cells((depth, height, width), TransformKind::RotateY90, |x, y, z| {
            (z, y, width - 1 - x)
        })
    }

    pub fn flip_x(&mut self) -> Result<()> {
        let (width, height, depth) = self.grid.dimensions();
        self.remap_cells((width, height, depth), TransformKind::FlipX, |x, y, z| {
            (width - 1 - x, y, z)
        })
    }

    pub fn flip_z(&mut self) -> Result<()> {
        let (width, height, depth) = self.grid.dimensions();
        self.remap_cells((width, height, depth), TransformKind::FlipZ, |x, y, z| {
            (x, y, depth - 1 - z)
        })
    }

    pub fn apply_transform(&mut self, kind: TransformKind) -> Result<()> {
        match kind {
            TransformKind::RotateY90 => self.rotate_y_90(),
            TransformKind::FlipX => self.flip_x(),
            TransformKind::FlipZ => self.flip_z(),
        }
    }

    fn remap_cells<F>(
        &mut self,
        new_size: (usize, usize, usize),
        kind: TransformKind,
        position: F,
    ) -> Result<()>
    where
        F: Fn(usize, usize, usize) -> (usize, usize, usize),
    {
        let size = (new_size.0 as i32, new_size.1 as i32, new_size.2 as i32);
        let mut grid = VoxelGrid::new(size)?;
        let mut palette = self.palette.clone();
        let mut cache = PaletteTransformCache::new();

        for ((x, y, z), index) in self.grid.iter() {
            let (nx, ny, nz) = position(x, y, z);
            let new_index = cache.remap(&self.palette, &mut palette, index, kind);
            grid.set(nx, ny, nz, new_index);
        }

        self.grid = grid;
        self.palette = palette;
        self.size = size;
        Ok(())
    }
}
