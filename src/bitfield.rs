//! Litematic block-state bit array.
//!
//! Each voxel's palette index occupies `nbits` bits. Entries are packed
//! back to back, least significant bit first, into consecutive 64-bit words;
//! an entry may straddle two words. Entries follow the y → z → x scan order of
//! [`VoxelGrid`].

use log::debug;
use serde_json::Value;

use crate::error::{LitematicError, Result};
use crate::voxel_grid::VoxelGrid;

/// `max(2, ceil(log2(len)))`, the litematic entry width for a palette of `len`.
pub fn bits_for_len(len: usize) -> u32 {
    if len <= 1 {
        return 2;
    }
    std::cmp::max(usize::BITS - (len - 1).leading_zeros(), 2)
}

/// Entry width for a palette, rejecting an empty palette.
pub fn bits_for_palette(palette_len: usize) -> Result<u32> {
    if palette_len == 0 {
        return Err(LitematicError::MalformedPackedData(
            "palette is empty, cannot size packed entries".to_string(),
        ));
    }
    Ok(bits_for_len(palette_len))
}

/// Number of 64-bit words needed for `entries` values of `nbits` each.
pub fn packed_len(entries: usize, nbits: u32) -> usize {
    (entries * nbits as usize + 63) / 64
}

fn check_nbits(nbits: u32) -> Result<()> {
    if nbits == 0 || nbits >= 64 {
        return Err(LitematicError::MalformedPackedData(format!(
            "unsupported entry width of {} bits",
            nbits
        )));
    }
    Ok(())
}

/// Unpack `words` into a grid of `size`.
///
/// Words past the end of `words` read as zero: files in the wild are sometimes
/// one word short of `packed_len`.
pub fn decode(words: &[u64], nbits: u32, size: (i32, i32, i32)) -> Result<VoxelGrid> {
    check_nbits(nbits)?;
    let mut grid = VoxelGrid::new(size)?;
    let mask = (1u64 << nbits) - 1;
    let nbits = nbits as usize;
    let word_at = |i: usize| words.get(i).copied().unwrap_or(0);

    if words.len() < packed_len(grid.volume(), nbits as u32) {
        debug!(
            "Packed array holds {} words, {} expected; padding with zeros",
            words.len(),
            packed_len(grid.volume(), nbits as u32)
        );
    }

    for (index, cell) in grid.cells_mut().iter_mut().enumerate() {
        let bit_index = index * nbits;
        let word_index = bit_index / 64;
        let offset = bit_index % 64;

        let mut value = word_at(word_index) >> offset;
        if offset + nbits > 64 {
            value |= word_at(word_index + 1) << (64 - offset);
        }
        *cell = (value & mask) as usize;
    }

    Ok(grid)
}

/// Pack `grid` for a palette of `palette_len` entries. Values wider than the
/// entry width are truncated to it.
pub fn encode(grid: &VoxelGrid, palette_len: usize) -> Result<Vec<u64>> {
    let nbits = bits_for_palette(palette_len)?;
    check_nbits(nbits)?;
    let mask = (1u64 << nbits) - 1;
    let nbits = nbits as usize;

    let mut words = vec![0u64; packed_len(grid.volume(), nbits as u32)];

    if 64 % nbits == 0 {
        // Entries never cross a word boundary
        let per_word = 64 / nbits;
        for (chunk_index, chunk) in grid.cells().chunks(per_word).enumerate() {
            let mut packed = 0u64;
            for (i, &value) in chunk.iter().enumerate() {
                packed |= (value as u64 & mask) << (i * nbits);
            }
            words[chunk_index] = packed;
        }
        return Ok(words);
    }

    for (index, &cell) in grid.cells().iter().enumerate() {
        let bit_index = index * nbits;
        let start = bit_index / 64;
        let end = (bit_index + nbits - 1) / 64;
        let offset = bit_index % 64;
        let value = cell as u64 & mask;

        words[start] |= value << offset;
        if start != end {
            words[end] |= value >> (64 - offset);
        }
    }

    Ok(words)
}

/// Reinterpret an NBT long array as unsigned words.
pub fn words_from_longs(longs: &[i64]) -> Vec<u64> {
    longs.iter().map(|&l| l as u64).collect()
}

/// Reinterpret unsigned words as an NBT long array.
pub fn words_to_longs(words: &[u64]) -> Vec<i64> {
    words.iter().map(|&w| w as i64).collect()
}

/// The shapes a packed block-state array arrives in.
#[derive(Debug, Clone, Copy)]
pub enum PackedWords<'a> {
    /// Signed 64-bit words, as stored in an NBT long array.
    Longs(&'a [i64]),
    /// One `[high, low]` pair of 32-bit halves per word.
    Pairs(&'a [[u32; 2]]),
    /// Alternating halves, `[low, high, low, high, ...]`. A missing trailing
    /// half is zero.
    FlatHalves(&'a [u32]),
}

impl PackedWords<'_> {
    pub fn to_words(&self) -> Vec<u64> {
        match *self {
            PackedWords::Longs(longs) => words_from_longs(longs),
            PackedWords::Pairs(pairs) => pairs
                .iter()
                .map(|&[high, low]| join_halves(high, low))
                .collect(),
            PackedWords::FlatHalves(flat) => flat
                .chunks(2)
                .map(|pair| {
                    let low = pair[0];
                    let high = pair.get(1).copied().unwrap_or(0);
                    join_halves(high, low)
                })
                .collect(),
        }
    }

    /// Normalise a JSON array of halves into words, detecting whether it is
    /// paired (`[[high, low], ...]`) or flat (`[low, high, ...]`).
    pub fn from_json(value: &Value) -> Result<Vec<u64>> {
        let items = value.as_array().ok_or_else(|| {
            LitematicError::MalformedPackedData("block states must be an array".to_string())
        })?;

        match items.first() {
            None => Ok(Vec::new()),
            Some(Value::Array(_)) => {
                let pairs = items
                    .iter()
                    .map(|item| {
                        let pair = item.as_array().ok_or_else(|| {
                            LitematicError::MalformedPackedData(
                                "mixed paired and flat block states".to_string(),
                            )
                        })?;
                        let half = |i: usize| pair.get(i).map(json_half).unwrap_or(Ok(0));
                        Ok([half(0)?, half(1)?])
                    })
                    .collect::<Result<Vec<[u32; 2]>>>()?;
                Ok(PackedWords::Pairs(&pairs).to_words())
            }
            Some(_) => {
                debug!("Detected flat long array, normalizing to word pairs");
                let flat = items.iter().map(json_half).collect::<Result<Vec<u32>>>()?;
                Ok(PackedWords::FlatHalves(&flat).to_words())
            }
        }
    }
}

#[inline(always)]
fn join_halves(high: u32, low: u32) -> u64 {
    ((high as u64) << 32) | low as u64
}

/// JSON numbers for 32-bit halves may be signed (JS bitwise results) or unsigned.
fn json_half(value: &Value) -> Result<u32> {
    value
        .as_i64()
        .map(|n| n as u32)
        .or_else(|| value.as_u64().map(|n| n as u32))
        .ok_or_else(|| {
            LitematicError::MalformedPackedData(format!("not a 32-bit integer: {}", value))
        })
}
