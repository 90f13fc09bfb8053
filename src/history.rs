//! Undo stacks for block breaking and whole-schematic transforms.

use log::debug;
use std::collections::VecDeque;

use crate::error::{LitematicError, Result};
use crate::region::Region;
use crate::schematic::Litematic;

pub const MAX_EDIT_HISTORY: usize = 50;
pub const MAX_TRANSFORM_HISTORY: usize = 5;

const MAGIC: &[u8; 4] = b"LTSN";

/// A voxel cleared by [`EditHistory::break_block`] and what it held before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokenBlock {
    pub position: (usize, usize, usize),
    pub palette_index: usize,
}

/// Undo stack for single-block breaks. Once full, the oldest entry is dropped.
#[derive(Debug, Clone)]
pub struct EditHistory {
    entries: VecDeque<BrokenBlock>,
    capacity: usize,
}

impl Default for EditHistory {
    fn default() -> Self {
        EditHistory::with_capacity(MAX_EDIT_HISTORY)
    }
}

impl EditHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        EditHistory {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Break the block at `(x, y, z)` and remember it. Returns `false` when the
    /// position is outside the region or already air.
    pub fn break_block(&mut self, region: &mut Region, x: usize, y: usize, z: usize) -> bool {
        match region.break_block(x, y, z) {
            Some(0) | None => false,
            Some(palette_index) => {
                self.record(BrokenBlock {
                    position: (x, y, z),
                    palette_index,
                });
                true
            }
        }
    }

    pub fn record(&mut self, entry: BrokenBlock) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Restore the most recently broken block.
    pub fn undo(&mut self, region: &mut Region) -> Option<BrokenBlock> {
        let entry = self.entries.pop_back()?;
        let (x, y, z) = entry.position;
        if !region.grid.set(x, y, z, entry.palette_index) {
            debug!("Undo target ({}, {}, {}) no longer in region", x, y, z);
        }
        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Undo stack of whole-schematic snapshots taken before each transform.
#[derive(Debug, Clone)]
pub struct TransformHistory {
    snapshots: VecDeque<Vec<u8>>,
    capacity: usize,
}

impl Default for TransformHistory {
    fn default() -> Self {
        TransformHistory::with_capacity(MAX_TRANSFORM_HISTORY)
    }
}

impl TransformHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        TransformHistory {
            snapshots: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn save(&mut self, litematic: &Litematic) -> Result<()> {
        if self.capacity == 0 {
            return Ok(());
        }
        let snapshot = to_snapshot(litematic)?;
        if self.snapshots.len() == self.capacity {
            self.snapshots.pop_front();
        }
        debug!("Saved transform snapshot ({} bytes)", snapshot.len());
        self.snapshots.push_back(snapshot);
        Ok(())
    }

    /// The schematic as it was before the latest saved transform.
    pub fn undo(&mut self) -> Result<Option<Litematic>> {
        match self.snapshots.pop_back() {
            Some(snapshot) => Ok(Some(from_snapshot(&snapshot)?)),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}

pub fn to_snapshot(litematic: &Litematic) -> Result<Vec<u8>> {
    let payload = bincode::serialize(litematic)?;
    let mut buf = Vec::with_capacity(MAGIC.len() + payload.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub fn from_snapshot(data: &[u8]) -> Result<Litematic> {
    let payload = data.strip_prefix(MAGIC.as_slice()).ok_or_else(|| {
        LitematicError::UnsupportedFormat("invalid snapshot magic bytes".to_string())
    })?;
    Ok(bincode::deserialize(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BlockState;

    fn region() -> Region {
        let mut region = Region::new("r".to_string(), (0, 0, 0), (4, 4, 4)).unwrap();
        for x in 0..4 {
            for z in 0..4 {
                region.set_block(x, 0, z, &BlockState::new("minecraft:stone"));
            }
        }
        region.set_block(1, 1, 1, &BlockState::new("minecraft:glass"));
        region
    }

    #[test]
    fn test_break_and_undo() {
        let mut region = region();
        let mut history = EditHistory::new();

        assert!(history.break_block(&mut region, 1, 1, 1));
        assert!(!history.break_block(&mut region, 1, 1, 1));
        assert!(!history.break_block(&mut region, 9, 0, 0));
        assert_eq!(history.len(), 1);
        assert!(region.get_block(1, 1, 1).unwrap().is_air());

        let entry = history.undo(&mut region).unwrap();
        assert_eq!(entry.position, (1, 1, 1));
        assert_eq!(region.get_block(1, 1, 1).unwrap().name, "minecraft:glass");
        assert!(history.undo(&mut region).is_none());
    }

    #[test]
    fn test_edit_history_drops_oldest() {
        let mut region = Region::new("r".to_string(), (0, 0, 0), (60, 1, 1)).unwrap();
        let stone = BlockState::new("minecraft:stone");
        for x in 0..60 {
            region.set_block(x, 0, 0, &stone);
        }
        let mut history = EditHistory::new();
        for x in 0..60 {
            history.break_block(&mut region, x, 0, 0);
        }
        assert_eq!(history.len(), MAX_EDIT_HISTORY);

        while history.undo(&mut region).is_some() {}
        assert_eq!(region.count_non_air_blocks(), MAX_EDIT_HISTORY);
        assert!(region.get_block(9, 0, 0).unwrap().is_air());
        assert!(!region.get_block(10, 0, 0).unwrap().is_air());
    }

    #[test]
    fn test_transform_undo_restores_snapshot() {
        let mut litematic = Litematic::new("t").with_region(region());
        let original = litematic.clone();
        let mut history = TransformHistory::new();

        history.save(&litematic).unwrap();
        litematic.regions[0].rotate_y_90().unwrap();
        history.save(&litematic).unwrap();
        litematic.regions[0].flip_x().unwrap();

        history.undo().unwrap();
        let restored = history.undo().unwrap().unwrap();
        assert_eq!(restored, original);
        assert_eq!(
            restored.regions[0].palette.index_of(&BlockState::new("minecraft:glass")),
            original.regions[0].palette.index_of(&BlockState::new("minecraft:glass"))
        );
        assert!(history.undo().unwrap().is_none());
    }

    #[test]
    fn test_transform_history_capacity() {
        let litematic = Litematic::new("t").with_region(region());
        let mut history = TransformHistory::new();
        for _ in 0..8 {
            history.save(&litematic).unwrap();
        }
        assert_eq!(history.len(), MAX_TRANSFORM_HISTORY);
    }

    #[test]
    fn test_bad_snapshot_magic() {
        assert!(from_snapshot(b"XXXXdata").is_err());
    }
}
