//! Rebuild a schematic from `/setblock` and `/fill` command text.

use log::debug;
use smol_str::SmolStr;

use crate::block_state::{namespaced, BlockState};
use crate::error::{LitematicError, Result};
use crate::region::Region;
use crate::schematic::Litematic;

const SETBLOCK: &str = "/setblock";
const FILL: &str = "/fill";

/// Largest bounding box, in voxels, that command text may describe.
pub const MAX_PARSED_VOLUME: u64 = 1 << 25;

#[derive(Debug, Clone, PartialEq)]
enum Placement {
    Block((i32, i32, i32), BlockState),
    Box((i32, i32, i32), (i32, i32, i32), BlockState),
}

impl Placement {
    fn bounds(&self) -> ((i32, i32, i32), (i32, i32, i32)) {
        match self {
            Placement::Block(p, _) => (*p, *p),
            Placement::Box(a, b, _) => (
                (a.0.min(b.0), a.1.min(b.1), a.2.min(b.2)),
                (a.0.max(b.0), a.1.max(b.1), a.2.max(b.2)),
            ),
        }
    }

    fn block(&self) -> &BlockState {
        match self {
            Placement::Block(_, block) | Placement::Box(_, _, block) => block,
        }
    }
}

/// Parse every `/setblock x y z block[props]` and then every
/// `/fill x1 y1 z1 x2 y2 z2 block[props]` found anywhere in `text`.
///
/// The region is sized to the bounding box of all placements and positioned
/// at its minimum corner. Later placements overwrite earlier ones, so fills
/// win over setblocks at the same position.
pub fn parse_commands(text: &str) -> Result<Litematic> {
    let mut placements = Vec::new();
    placements.extend(scan(text, SETBLOCK).filter_map(|rest| {
        let (pos, rest) = take_coords(rest)?;
        let (block, _) = take_block(rest)?;
        Some(Placement::Block(pos, block))
    }));
    placements.extend(scan(text, FILL).filter_map(|rest| {
        let (from, rest) = take_coords(rest)?;
        let (to, rest) = take_coords(rest)?;
        let (block, _) = take_block(rest)?;
        Some(Placement::Box(from, to, block))
    }));

    if placements.is_empty() {
        return Err(LitematicError::NoCommands);
    }
    debug!("Parsed {} placement commands", placements.len());

    let (mut min, mut max) = placements[0].bounds();
    for placement in &placements[1..] {
        let (lo, hi) = placement.bounds();
        min = (min.0.min(lo.0), min.1.min(lo.1), min.2.min(lo.2));
        max = (max.0.max(hi.0), max.1.max(hi.1), max.2.max(hi.2));
    }
    let size = bounding_size(min, max)?;

    let mut region = Region::new("Unnamed".to_string(), min, size)?;
    for placement in &placements {
        let index = region.palette.get_or_insert(placement.block());
        let (lo, hi) = placement.bounds();
        for x in lo.0..=hi.0 {
            for y in lo.1..=hi.1 {
                for z in lo.2..=hi.2 {
                    region.grid.set(
                        (x - min.0) as usize,
                        (y - min.1) as usize,
                        (z - min.2) as usize,
                        index,
                    );
                }
            }
        }
    }

    Ok(Litematic::new("Commands").with_region(region))
}

/// Extent of the inclusive box `min..=max`, rejecting boxes larger than
/// [`MAX_PARSED_VOLUME`].
fn bounding_size(min: (i32, i32, i32), max: (i32, i32, i32)) -> Result<(i32, i32, i32)> {
    let span = |lo: i32, hi: i32| i64::from(hi) - i64::from(lo) + 1;
    let (w, h, d) = (span(min.0, max.0), span(min.1, max.1), span(min.2, max.2));
    let volume = (w as u64)
        .checked_mul(h as u64)
        .and_then(|v| v.checked_mul(d as u64))
        .unwrap_or(u64::MAX);
    if volume > MAX_PARSED_VOLUME {
        return Err(LitematicError::SelectionTooLarge(volume, MAX_PARSED_VOLUME));
    }
    // Each span is at most the capped volume, so it fits in i32
    Ok((w as i32, h as i32, d as i32))
}

/// The text following each occurrence of `keyword` that is followed by whitespace.
fn scan<'a>(text: &'a str, keyword: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    text.match_indices(keyword)
        .map(move |(i, _)| &text[i + keyword.len()..])
        .filter(|rest| rest.starts_with(char::is_whitespace))
}

/// Whitespace, then an optionally negative decimal integer.
fn take_int(s: &str) -> Option<(i32, &str)> {
    let trimmed = s.trim_start();
    if trimmed.len() == s.len() {
        return None;
    }
    let digits_start = usize::from(trimmed.starts_with('-'));
    let end = trimmed[digits_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(trimmed.len(), |i| i + digits_start);
    if end == digits_start {
        return None;
    }
    let value = trimmed[..end].parse().ok()?;
    Some((value, &trimmed[end..]))
}

fn take_coords(s: &str) -> Option<((i32, i32, i32), &str)> {
    let (x, s) = take_int(s)?;
    let (y, s) = take_int(s)?;
    let (z, s) = take_int(s)?;
    Some(((x, y, z), s))
}

/// Whitespace, a `[\w:]+` block name, then an optional `[k=v,...]` list.
fn take_block(s: &str) -> Option<(BlockState, &str)> {
    let trimmed = s.trim_start();
    if trimmed.len() == s.len() {
        return None;
    }
    let end = trimmed
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == ':'))
        .unwrap_or(trimmed.len());
    if end == 0 {
        return None;
    }
    let mut block = BlockState::new(namespaced(
        trimmed[..end]
            .strip_prefix("minecraft:")
            .unwrap_or(&trimmed[..end]),
    ));
    let mut rest = &trimmed[end..];

    if let Some(props) = rest.strip_prefix('[') {
        if let Some(close) = props.find(']') {
            for part in props[..close].split(',') {
                let mut kv = part.split('=');
                if let (Some(key), Some(value)) = (kv.next(), kv.next()) {
                    if !key.is_empty() && !value.is_empty() {
                        block.set_property(SmolStr::new(key.trim()), SmolStr::new(value.trim()));
                    }
                }
            }
            rest = &props[close + 1..];
        }
    }
    Some((block, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_int() {
        assert_eq!(take_int(" 12 x"), Some((12, " x")));
        assert_eq!(take_int("  -7"), Some((-7, "")));
        assert_eq!(take_int("12"), None);
        assert_eq!(take_int(" -"), None);
        assert_eq!(take_int(" ~1"), None);
    }

    #[test]
    fn test_take_block_with_properties() {
        let (block, rest) = take_block(" oak_stairs[facing=east, half=top] next").unwrap();
        assert_eq!(block.name, "minecraft:oak_stairs");
        assert_eq!(block.get_property("facing").map(|s| s.as_str()), Some("east"));
        assert_eq!(block.get_property("half").map(|s| s.as_str()), Some("top"));
        assert_eq!(rest, " next");
    }

    #[test]
    fn test_parse_setblock_and_fill() {
        let text = "/fill 10 64 10 12 64 11 minecraft:stone\n\
                    /setblock 9 65 10 minecraft:oak_log[axis=x]\n\
                    say hello\n";
        let litematic = parse_commands(text).unwrap();
        let region = &litematic.regions[0];

        assert_eq!(region.position, (9, 64, 10));
        assert_eq!(region.get_dimensions(), (4, 2, 2));
        assert_eq!(region.count_non_air_blocks(), 7);
        // setblocks are read first, so they take the lower palette indices
        assert_eq!(region.palette.get(1).unwrap().name, "minecraft:oak_log");
        assert_eq!(region.get_block(0, 1, 0).unwrap().name, "minecraft:oak_log");
        assert_eq!(region.get_block(3, 0, 1).unwrap().name, "minecraft:stone");
        assert!(region.get_block(0, 0, 0).unwrap().is_air());
    }

    #[test]
    fn test_fill_corners_in_any_order_and_negative_coords() {
        let litematic = parse_commands("/fill 1 -1 1 -1 -1 -1 glass").unwrap();
        let region = &litematic.regions[0];
        assert_eq!(region.position, (-1, -1, -1));
        assert_eq!(region.get_dimensions(), (3, 1, 3));
        assert_eq!(region.count_non_air_blocks(), 9);
    }

    #[test]
    fn test_fill_overwrites_setblock() {
        let text = "/setblock 0 0 0 dirt /fill 0 0 0 1 0 0 stone";
        let litematic = parse_commands(text).unwrap();
        let region = &litematic.regions[0];
        assert_eq!(region.get_block(0, 0, 0).unwrap().name, "minecraft:stone");
    }

    #[test]
    fn test_extreme_coordinates_do_not_overflow() {
        let litematic = parse_commands("/setblock 2147483647 0 0 stone\n/setblock 2147483646 0 0 dirt")
            .unwrap();
        let region = &litematic.regions[0];
        assert_eq!(region.position, (2147483646, 0, 0));
        assert_eq!(region.get_dimensions(), (2, 1, 1));
        assert_eq!(region.get_block(1, 0, 0).unwrap().name, "minecraft:stone");

        assert!(parse_commands("/setblock 2147483647 0 0 stone\n/setblock -1 0 0 stone").is_err());
        assert!(matches!(
            parse_commands("/setblock 2147483647 0 0 stone\n/setblock -2147483648 0 0 stone"),
            Err(LitematicError::SelectionTooLarge(4294967296, MAX_PARSED_VOLUME))
        ));
    }

    #[test]
    fn test_oversized_fill_is_rejected() {
        let text = "/fill -30000000 0 -30000000 30000000 0 30000000 stone";
        assert!(matches!(
            parse_commands(text),
            Err(LitematicError::SelectionTooLarge(_, _))
        ));
        assert!(parse_commands("/fill 0 0 0 255 255 255 stone").is_ok());
    }

    #[test]
    fn test_no_commands_is_an_error() {
        assert!(matches!(
            parse_commands("nothing here /setblock ~ ~ ~ stone"),
            Err(LitematicError::NoCommands)
        ));
    }

    #[test]
    fn test_generated_commands_parse_back() {
        use crate::commands::{fill_commands, to_script, CommandOptions};

        let mut region = Region::new("r".to_string(), (0, 0, 0), (3, 2, 2)).unwrap();
        let stairs = BlockState::new("minecraft:oak_stairs").with_property("facing", "south");
        for x in 0..3 {
            region.set_block(x, 0, 0, &stairs);
            region.set_block(x, 0, 1, &stairs);
        }
        region.set_block(2, 1, 1, &BlockState::new("minecraft:glass"));

        let script = to_script(&fill_commands(&region, &CommandOptions::default()));
        let parsed = parse_commands(&script).unwrap();
        let parsed = &parsed.regions[0];
        assert_eq!(parsed.get_dimensions(), (3, 2, 2));
        for ((x, y, z), _) in region.grid.iter() {
            assert_eq!(parsed.get_block(x, y, z), region.get_block(x, y, z));
        }
    }
}
