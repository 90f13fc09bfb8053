//! Greedy cuboid compression of a voxel grid.
//!
//! Every non-air voxel ends up in exactly one uniform, axis-aligned box. Boxes
//! grow from each unclaimed seed along +X first, then +Z, then +Y. The result
//! is deterministic but not the minimum possible box count.

use serde::{Deserialize, Serialize};

use crate::voxel_grid::VoxelGrid;

/// An inclusive box of identical palette indices, in grid-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cuboid {
    pub start: (usize, usize, usize),
    pub end: (usize, usize, usize),
    pub palette_index: usize,
}

impl Cuboid {
    /// True for a 1x1x1 box, which formats as `/setblock` rather than `/fill`.
    pub fn is_single_block(&self) -> bool {
        self.start == self.end
    }

    pub fn volume(&self) -> usize {
        (self.end.0 - self.start.0 + 1)
            * (self.end.1 - self.start.1 + 1)
            * (self.end.2 - self.start.2 + 1)
    }

    pub fn contains(&self, x: usize, y: usize, z: usize) -> bool {
        x >= self.start.0
            && x <= self.end.0
            && y >= self.start.1
            && y <= self.end.1
            && z >= self.start.2
            && z <= self.end.2
    }
}

/// Compress `grid` into cuboids, in seed order.
pub fn compress(grid: &VoxelGrid) -> Vec<Cuboid> {
    CuboidMesher::new(grid).collect()
}

/// Lazily yields the cuboids of a grid.
///
/// Seeds are visited y-major, then x, then z. Pulling one cuboid at a time
/// lets a caller on a cooperative scheduler yield between boxes.
pub struct CuboidMesher<'a> {
    grid: &'a VoxelGrid,
    visited: Vec<bool>,
    y: usize,
    x: usize,
    z: usize,
}

impl<'a> CuboidMesher<'a> {
    pub fn new(grid: &'a VoxelGrid) -> Self {
        CuboidMesher {
            grid,
            visited: vec![false; grid.volume()],
            y: 0,
            x: 0,
            z: 0,
        }
    }

    #[inline(always)]
    fn claimable(&self, x: usize, y: usize, z: usize, value: usize) -> bool {
        !self.visited[self.grid.index_of(x, y, z)] && self.grid.at(x, y, z) == value
    }

    fn advance(&mut self) {
        self.z += 1;
        if self.z == self.grid.depth() {
            self.z = 0;
            self.x += 1;
            if self.x == self.grid.width() {
                self.x = 0;
                self.y += 1;
            }
        }
    }

    fn grow(&mut self, x: usize, y: usize, z: usize, value: usize) -> Cuboid {
        let (width, height, depth) = self.grid.dimensions();

        let mut end_x = x;
        while end_x + 1 < width && self.claimable(end_x + 1, y, z, value) {
            end_x += 1;
        }

        let mut end_z = z;
        while end_z + 1 < depth && (x..=end_x).all(|ix| self.claimable(ix, y, end_z + 1, value)) {
            end_z += 1;
        }

        let mut end_y = y;
        while end_y + 1 < height
            && (x..=end_x)
                .all(|ix| (z..=end_z).all(|iz| self.claimable(ix, end_y + 1, iz, value)))
        {
            end_y += 1;
        }

        for iy in y..=end_y {
            for iz in z..=end_z {
                let row = self.grid.index_of(x, iy, iz);
                self.visited[row..=row + (end_x - x)].fill(true);
            }
        }

        Cuboid {
            start: (x, y, z),
            end: (end_x, end_y, end_z),
            palette_index: value,
        }
    }
}

impl Iterator for CuboidMesher<'_> {
    type Item = Cuboid;

    fn next(&mut self) -> Option<Cuboid> {
        while self.y < self.grid.height() {
            let (x, y, z) = (self.x, self.y, self.z);
            self.advance();

            let value = self.grid.at(x, y, z);
            if value == 0 || self.visited[self.grid.index_of(x, y, z)] {
                continue;
            }
            return Some(self.grow(x, y, z, value));
        }
        None
    }
}
