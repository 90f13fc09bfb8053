use serde::{Deserialize, Serialize};

use crate::error::{LitematicError, Result};

/// Dense 3D array of palette indices, addressed by `(x, y, z)`.
///
/// Cells are stored in the packed scan order (y-major, then z, then x), so
/// the linear index of a cell equals its entry index in the litematic bit array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoxelGrid {
    width: usize,
    height: usize,
    depth: usize,
    cells: Vec<usize>,
}

impl VoxelGrid {
    /// An all-air grid. Every dimension must be positive.
    pub fn new(size: (i32, i32, i32)) -> Result<Self> {
        let (width, height, depth) = validate_size(size)?;
        Ok(VoxelGrid {
            width,
            height,
            depth,
            cells: vec![0; width * height * depth],
        })
    }

    /// Wrap cells that are already in y → z → x order.
    pub fn from_cells(size: (i32, i32, i32), cells: Vec<usize>) -> Result<Self> {
        let (width, height, depth) = validate_size(size)?;
        let volume = width * height * depth;
        if cells.len() != volume {
            return Err(LitematicError::MalformedPackedData(format!(
                "expected {} cells for a {}x{}x{} grid, got {}",
                volume,
                width,
                height,
                depth,
                cells.len()
            )));
        }
        Ok(VoxelGrid {
            width,
            height,
            depth,
            cells,
        })
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline(always)]
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn dimensions(&self) -> (usize, usize, usize) {
        (self.width, self.height, self.depth)
    }

    pub fn volume(&self) -> usize {
        self.cells.len()
    }

    #[inline(always)]
    pub fn contains(&self, x: usize, y: usize, z: usize) -> bool {
        x < self.width && y < self.height && z < self.depth
    }

    #[inline(always)]
    pub fn index_of(&self, x: usize, y: usize, z: usize) -> usize {
        y * self.width * self.depth + z * self.width + x
    }

    pub fn coords_of(&self, index: usize) -> (usize, usize, usize) {
        let layer = self.width * self.depth;
        let y = index / layer;
        let rem = index % layer;
        (rem % self.width, y, rem / self.width)
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<usize> {
        if self.contains(x, y, z) {
            Some(self.cells[self.index_of(x, y, z)])
        } else {
            None
        }
    }

    /// Unchecked read for hot loops that already bound their coordinates.
    #[inline(always)]
    pub(crate) fn at(&self, x: usize, y: usize, z: usize) -> usize {
        self.cells[self.index_of(x, y, z)]
    }

    /// Store `value` at `(x, y, z)`. Returns false if the cell is outside the grid.
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: usize) -> bool {
        if !self.contains(x, y, z) {
            return false;
        }
        let index = self.index_of(x, y, z);
        self.cells[index] = value;
        true
    }

    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [usize] {
        &mut self.cells
    }

    /// `((x, y, z), value)` for every cell in scan order.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize, usize), usize)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &v)| (self.coords_of(i), v))
    }

    pub fn count_non_air(&self) -> usize {
        self.cells.iter().filter(|&&v| v != 0).count()
    }
}

fn validate_size(size: (i32, i32, i32)) -> Result<(usize, usize, usize)> {
    let (w, h, d) = size;
    if w <= 0 || h <= 0 || d <= 0 {
        return Err(LitematicError::MalformedPackedData(format!(
            "region dimensions must be positive, got {}x{}x{}",
            w, h, d
        )));
    }
    Ok((w as usize, h as usize, d as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive_dimensions() {
        assert!(VoxelGrid::new((0, 1, 1)).is_err());
        assert!(VoxelGrid::new((1, -2, 1)).is_err());
        assert!(VoxelGrid::new((1, 1, 1)).is_ok());
    }

    #[test]
    fn test_index_matches_scan_order() {
        let grid = VoxelGrid::new((3, 2, 4)).unwrap();
        assert_eq!(grid.index_of(0, 0, 0), 0);
        assert_eq!(grid.index_of(1, 0, 0), 1);
        assert_eq!(grid.index_of(0, 0, 1), 3);
        assert_eq!(grid.index_of(0, 1, 0), 12);
        for i in 0..grid.volume() {
            let (x, y, z) = grid.coords_of(i);
            assert_eq!(grid.index_of(x, y, z), i);
        }
    }

    #[test]
    fn test_set_and_get() {
        let mut grid = VoxelGrid::new((2, 2, 2)).unwrap();
        assert!(grid.set(1, 0, 1, 7));
        assert!(!grid.set(2, 0, 0, 7));
        assert_eq!(grid.get(1, 0, 1), Some(7));
        assert_eq!(grid.get(0, 0, 0), Some(0));
        assert_eq!(grid.get(0, 2, 0), None);
        assert_eq!(grid.count_non_air(), 1);
    }

    #[test]
    fn test_from_cells_checks_length() {
        assert!(VoxelGrid::from_cells((2, 1, 1), vec![1]).is_err());
        assert!(VoxelGrid::from_cells((2, 1, 1), vec![1, 2]).is_ok());
    }
}
