use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::block_state::BlockState;

/// Ordered block palette. Index 0 is always air.
#[derive(Debug, Clone)]
pub struct Palette {
    states: Vec<BlockState>,
    index: FxHashMap<BlockState, usize>,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Palette {
    fn eq(&self, other: &Self) -> bool {
        self.states == other.states
    }
}

impl Serialize for Palette {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.states.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Palette {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let states = Vec::<BlockState>::deserialize(deserializer)?;
        Ok(Palette::from_states(states))
    }
}

impl Palette {
    pub fn new() -> Self {
        let mut palette = Palette {
            states: Vec::new(),
            index: FxHashMap::default(),
        };
        palette.get_or_insert(&BlockState::air());
        palette
    }

    /// Adopt a palette read from a file. Order and indices are kept as-is so the
    /// stored block data stays valid; an empty list becomes the air-only palette.
    pub fn from_states(states: Vec<BlockState>) -> Self {
        if states.is_empty() {
            return Palette::new();
        }
        let mut palette = Palette {
            states,
            index: FxHashMap::default(),
        };
        palette.rebuild_index();
        palette
    }

    pub(crate) fn rebuild_index(&mut self) {
        self.index = FxHashMap::default();
        self.index.reserve(self.states.len());
        for (i, state) in self.states.iter().enumerate() {
            // First occurrence wins when a file carries duplicate entries.
            self.index.entry(state.clone()).or_insert(i);
        }
    }

    pub fn get_or_insert(&mut self, block: &BlockState) -> usize {
        match self.index.get(block) {
            Some(&index) => index,
            None => {
                let index = self.states.len();
                self.states.push(block.clone());
                self.index.insert(block.clone(), index);
                index
            }
        }
    }

    pub fn index_of(&self, block: &BlockState) -> Option<usize> {
        self.index.get(block).copied()
    }

    pub fn get(&self, index: usize) -> Option<&BlockState> {
        self.states.get(index)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockState> {
        self.states.iter()
    }

    pub fn as_slice(&self) -> &[BlockState] {
        &self.states
    }

    /// Bits per packed entry for this palette.
    pub fn bits_per_entry(&self) -> u32 {
        crate::bitfield::bits_for_len(self.states.len())
    }
}
