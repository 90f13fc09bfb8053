use flate2::read::GzDecoder;
use log::debug;
use quartz_nbt::io::Flavor;
use quartz_nbt::{NbtCompound, NbtList, NbtTag};
use serde_json::Value;
use smol_str::SmolStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::bitfield::{self, PackedWords};
use crate::block_state::BlockState;
use crate::error::{LitematicError, Result};
use crate::formats::manager::{SchematicExporter, SchematicImporter};
use crate::palette::Palette;
use crate::region::{abs_size, Region};
use crate::schematic::{Litematic, Metadata};

/// Default compression level for litematic serialization.
const DEFAULT_COMPRESSION: flate2::Compression = flate2::Compression::new(3);

fn read_root(data: &[u8]) -> Result<NbtCompound> {
    // Stream-decompress directly into NBT parser (no intermediate buffer)
    let reader = std::io::BufReader::with_capacity(1 << 20, data);
    let mut gz = GzDecoder::new(reader);
    let (root, _) = quartz_nbt::io::read_nbt(&mut gz, Flavor::Uncompressed)?;
    Ok(root)
}

pub fn is_litematic(data: &[u8]) -> bool {
    let root = match read_root(data) {
        Ok(root) => root,
        Err(_) => return false,
    };

    root.get::<_, i32>("Version").is_ok()
        && root.get::<_, &NbtCompound>("Metadata").is_ok()
        && root.get::<_, &NbtCompound>("Regions").is_ok()
}

pub fn from_litematic(data: &[u8]) -> Result<Litematic> {
    let root = read_root(data)?;
    from_litematic_nbt(&root)
}

pub fn from_litematic_nbt(root: &NbtCompound) -> Result<Litematic> {
    let mut litematic = Litematic {
        version: root.get::<_, i32>("Version")?,
        sub_version: root.get::<_, i32>("SubVersion").ok(),
        ..Litematic::default()
    };
    if let Ok(data_version) = root.get::<_, i32>("MinecraftDataVersion") {
        litematic.minecraft_data_version = data_version;
    }
    if let Ok(metadata) = root.get::<_, &NbtCompound>("Metadata") {
        litematic.metadata = parse_metadata(metadata);
    }

    let regions = root.get::<_, &NbtCompound>("Regions")?;
    // Sorted so multi-region files load in a stable order
    let mut names: Vec<&String> = regions.inner().keys().collect();
    names.sort();
    for name in names {
        if let Ok(region_nbt) = regions.get::<_, &NbtCompound>(name.as_str()) {
            litematic.add_region(region_from_nbt(name, region_nbt)?);
        }
    }

    debug!(
        "Loaded litematic v{} with {} region(s)",
        litematic.version,
        litematic.regions.len()
    );
    Ok(litematic)
}

fn parse_metadata(metadata: &NbtCompound) -> Metadata {
    // Empty strings are how absent text fields are written
    let text = |key: &str| {
        metadata
            .get::<_, &str>(key)
            .ok()
            .filter(|s| !s.is_empty())
            .map(String::from)
    };
    Metadata {
        name: text("Name"),
        author: text("Author"),
        description: text("Description"),
        time_created: metadata.get::<_, i64>("TimeCreated").ok(),
        time_modified: metadata.get::<_, i64>("TimeModified").ok(),
    }
}

fn get_xyz(compound: &NbtCompound, key: &str) -> Result<(i32, i32, i32)> {
    let xyz = compound.get::<_, &NbtCompound>(key)?;
    Ok((
        xyz.get::<_, i32>("x")?,
        xyz.get::<_, i32>("y")?,
        xyz.get::<_, i32>("z")?,
    ))
}

fn xyz_compound((x, y, z): (i32, i32, i32)) -> NbtCompound {
    let mut compound = NbtCompound::new();
    compound.insert("x", NbtTag::Int(x));
    compound.insert("y", NbtTag::Int(y));
    compound.insert("z", NbtTag::Int(z));
    compound
}

/// Decode one entry of the `Regions` compound.
pub fn region_from_nbt(name: &str, region_nbt: &NbtCompound) -> Result<Region> {
    let position = get_xyz(region_nbt, "Position")?;
    let size = get_xyz(region_nbt, "Size")?;

    let palette_list = region_nbt.get::<_, &NbtList>("BlockStatePalette")?;
    let mut states = Vec::with_capacity(palette_list.len());
    for tag in palette_list.iter() {
        if let NbtTag::Compound(compound) = tag {
            states.push(BlockState::from_nbt(compound)?);
        }
    }

    let block_states = region_nbt.get::<_, &[i64]>("BlockStates")?;
    Region::from_packed(
        name.to_string(),
        position,
        size,
        Palette::from_states(states),
        PackedWords::Longs(block_states),
    )
}

/// Encode a region as an entry of the `Regions` compound.
pub fn region_to_nbt(region: &Region) -> Result<NbtCompound> {
    let mut region_nbt = NbtCompound::new();
    region_nbt.insert("Position", NbtTag::Compound(xyz_compound(region.position)));
    region_nbt.insert("Size", NbtTag::Compound(xyz_compound(region.size)));

    let palette = NbtList::from(
        region
            .palette
            .iter()
            .map(BlockState::to_nbt)
            .collect::<Vec<NbtTag>>(),
    );
    region_nbt.insert("BlockStatePalette", NbtTag::List(palette));
    region_nbt.insert(
        "BlockStates",
        NbtTag::LongArray(region.packed_block_states()?),
    );

    region_nbt.insert("Entities", NbtTag::List(NbtList::new()));
    region_nbt.insert("TileEntities", NbtTag::List(NbtList::new()));
    region_nbt.insert("PendingBlockTicks", NbtTag::List(NbtList::new()));
    region_nbt.insert("PendingFluidTicks", NbtTag::List(NbtList::new()));
    Ok(region_nbt)
}

/// Build a region from the JSON a JavaScript NBT reader produces:
/// `{"name", "position": [x,y,z], "width", "height", "depth",
/// "palette": [{"Name", "Properties"}], "blockStates": [...]}`.
/// `blockStates` may be paired or flat 32-bit halves.
pub fn region_from_json(value: &Value) -> Result<Region> {
    let field = |key: &str| {
        value
            .get(key)
            .ok_or_else(|| LitematicError::MissingField(key.to_string()))
    };
    let int = |key: &str| -> Result<i32> {
        field(key)?
            .as_i64()
            .map(|n| n as i32)
            .ok_or_else(|| LitematicError::MissingField(format!("{} must be an integer", key)))
    };

    let size = (int("width")?, int("height")?, int("depth")?);
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("Unnamed")
        .to_string();
    let position = match value.get("position") {
        Some(pos) => serde_json::from_value(pos.clone())?,
        None => (0, 0, 0),
    };

    let entries = field("palette")?
        .as_array()
        .ok_or_else(|| LitematicError::MissingField("palette must be an array".to_string()))?;
    let mut states = Vec::with_capacity(entries.len());
    for entry in entries {
        let block_name = entry
            .get("Name")
            .and_then(Value::as_str)
            .ok_or_else(|| LitematicError::MissingField("palette entry Name".to_string()))?;
        let mut block = BlockState::new(block_name);
        if let Some(props) = entry.get("Properties").and_then(Value::as_object) {
            for (key, value) in props {
                if let Some(value) = value.as_str() {
                    block.set_property(SmolStr::new(key), SmolStr::new(value));
                }
            }
        }
        states.push(block);
    }

    let palette = Palette::from_states(states);
    let words = PackedWords::from_json(field("blockStates")?)?;
    let nbits = bitfield::bits_for_palette(palette.len())?;
    let grid = bitfield::decode(&words, nbits, abs_size(size))?;
    Ok(Region::from_parts(name, position, size, palette, grid))
}

pub fn to_litematic(litematic: &Litematic) -> Result<Vec<u8>> {
    to_litematic_with_compression(litematic, DEFAULT_COMPRESSION)
}

pub fn to_litematic_with_compression(
    litematic: &Litematic,
    compression: flate2::Compression,
) -> Result<Vec<u8>> {
    let root = to_litematic_nbt(litematic)?;

    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), compression);
    quartz_nbt::io::write_nbt(&mut encoder, None, &root, Flavor::Uncompressed)?;
    Ok(encoder.finish()?)
}

pub fn to_litematic_nbt(litematic: &Litematic) -> Result<NbtCompound> {
    let mut root = NbtCompound::new();
    root.insert("Version", NbtTag::Int(litematic.version));
    if let Some(sub_version) = litematic.sub_version {
        root.insert("SubVersion", NbtTag::Int(sub_version));
    }
    root.insert(
        "MinecraftDataVersion",
        NbtTag::Int(litematic.minecraft_data_version),
    );
    root.insert("Metadata", NbtTag::Compound(create_metadata(litematic)));

    let mut regions = NbtCompound::new();
    for region in &litematic.regions {
        regions.insert(region.name.clone(), NbtTag::Compound(region_to_nbt(region)?));
    }
    root.insert("Regions", NbtTag::Compound(regions));
    Ok(root)
}

fn create_metadata(litematic: &Litematic) -> NbtCompound {
    let meta = &litematic.metadata;
    let mut metadata = NbtCompound::new();
    metadata.insert("Name", NbtTag::String(meta.name.clone().unwrap_or_default()));
    metadata.insert(
        "Author",
        NbtTag::String(meta.author.clone().unwrap_or_default()),
    );
    metadata.insert(
        "Description",
        NbtTag::String(meta.description.clone().unwrap_or_default()),
    );

    let now = meta.time_created.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    });
    metadata.insert("TimeCreated", NbtTag::Long(now));
    metadata.insert("TimeModified", NbtTag::Long(meta.time_modified.unwrap_or(now)));

    metadata.insert(
        "EnclosingSize",
        NbtTag::Compound(xyz_compound(enclosing_size(&litematic.regions))),
    );
    metadata.insert("TotalVolume", NbtTag::Int(litematic.total_volume() as i32));
    metadata.insert("TotalBlocks", NbtTag::Int(litematic.total_blocks() as i32));
    metadata.insert("RegionCount", NbtTag::Int(litematic.regions.len() as i32));
    metadata
}

/// Extent of the box enclosing every region. A negative size component means
/// the region extends from its position towards negative coordinates.
fn enclosing_size(regions: &[Region]) -> (i32, i32, i32) {
    fn span(pos: i32, size: i32) -> (i32, i32) {
        if size >= 0 {
            (pos, pos + size - 1)
        } else {
            (pos + size + 1, pos)
        }
    }

    let mut bounds: Option<((i32, i32, i32), (i32, i32, i32))> = None;
    for region in regions {
        let (x0, x1) = span(region.position.0, region.size.0);
        let (y0, y1) = span(region.position.1, region.size.1);
        let (z0, z1) = span(region.position.2, region.size.2);
        bounds = Some(match bounds {
            None => ((x0, y0, z0), (x1, y1, z1)),
            Some((lo, hi)) => (
                (lo.0.min(x0), lo.1.min(y0), lo.2.min(z0)),
                (hi.0.max(x1), hi.1.max(y1), hi.2.max(z1)),
            ),
        });
    }
    match bounds {
        Some((lo, hi)) => (hi.0 - lo.0 + 1, hi.1 - lo.1 + 1, hi.2 - lo.2 + 1),
        None => (0, 0, 0),
    }
}

pub struct LitematicFormat;

impl SchematicImporter for LitematicFormat {
    fn name(&self) -> String {
        "litematic".to_string()
    }

    fn detect(&self, data: &[u8]) -> bool {
        is_litematic(data)
    }

    fn read(&self, data: &[u8]) -> Result<Litematic> {
        from_litematic(data)
    }
}

impl SchematicExporter for LitematicFormat {
    fn name(&self) -> String {
        "litematic".to_string()
    }

    fn extensions(&self) -> Vec<String> {
        vec!["litematic".to_string()]
    }

    fn write(&self, litematic: &Litematic, _settings: Option<&str>) -> Result<Vec<u8>> {
        to_litematic(litematic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Litematic {
        let mut litematic = Litematic::new("Test Schematic");
        litematic.metadata.author = Some("Tester".to_string());
        litematic.metadata.time_created = Some(1000);
        litematic.metadata.time_modified = Some(2000);

        let mut region = Region::new("Main".to_string(), (0, 0, 0), (3, 3, 3)).unwrap();
        for x in 0..3 {
            for y in 0..3 {
                for z in 0..3 {
                    let block = match (x + y + z) % 3 {
                        0 => BlockState::new("minecraft:stone"),
                        1 => BlockState::new("minecraft:dirt"),
                        _ => BlockState::new("minecraft:oak_stairs")
                            .with_property("facing", "east")
                            .with_property("half", "top"),
                    };
                    region.set_block(x, y, z, &block);
                }
            }
        }
        litematic.add_region(region);
        litematic
    }

    #[test]
    fn test_litematic_roundtrip() {
        let original = sample();
        let bytes = to_litematic(&original).unwrap();
        assert!(is_litematic(&bytes));

        let loaded = from_litematic(&bytes).unwrap();
        assert_eq!(loaded.metadata, original.metadata);
        assert_eq!(loaded.regions, original.regions);
        assert_eq!(loaded.version, 6);
    }

    #[test]
    fn test_metadata_totals() {
        let root = to_litematic_nbt(&sample()).unwrap();
        let metadata = root.get::<_, &NbtCompound>("Metadata").unwrap();
        assert_eq!(metadata.get::<_, i32>("TotalVolume").unwrap(), 27);
        assert_eq!(metadata.get::<_, i32>("TotalBlocks").unwrap(), 27);
        assert_eq!(metadata.get::<_, i32>("RegionCount").unwrap(), 1);
        assert_eq!(get_xyz(metadata, "EnclosingSize").unwrap(), (3, 3, 3));
    }

    #[test]
    fn test_negative_region_size_is_preserved() {
        let mut region = Region::new("Neg".to_string(), (4, 0, 4), (-2, 1, -2)).unwrap();
        region.set_block(1, 0, 1, &BlockState::new("minecraft:glass"));
        let nbt = region_to_nbt(&region).unwrap();
        let restored = region_from_nbt("Neg", &nbt).unwrap();
        assert_eq!(restored, region);
        assert_eq!(enclosing_size(&[region]), (2, 1, 2));
    }

    #[test]
    fn test_missing_block_states_is_an_error() {
        let mut nbt = region_to_nbt(&sample().regions[0]).unwrap();
        nbt.inner_mut().remove("BlockStates");
        assert!(matches!(
            region_from_nbt("Main", &nbt),
            Err(LitematicError::MissingField(_))
        ));
    }

    #[test]
    fn test_is_litematic_rejects_garbage() {
        assert!(!is_litematic(b"not gzip"));
    }

    #[test]
    fn test_region_from_json_flat_and_paired() {
        // Palette of 5 -> 3 bits: [3, 4] packs to 0x23 in the low half
        let palette = json!([
            {"Name": "minecraft:air"},
            {"Name": "minecraft:stone"},
            {"Name": "minecraft:dirt"},
            {"Name": "minecraft:glass"},
            {"Name": "minecraft:oak_log", "Properties": {"axis": "z"}}
        ]);
        let flat = json!({
            "width": 2, "height": 1, "depth": 1,
            "palette": palette,
            "blockStates": [0x23, 0]
        });
        let paired = json!({
            "width": 2, "height": 1, "depth": 1,
            "palette": palette,
            "blockStates": [[0, 0x23]]
        });

        for value in [flat, paired] {
            let region = region_from_json(&value).unwrap();
            assert_eq!(region.get_block(0, 0, 0).unwrap().name, "minecraft:glass");
            let log = region.get_block(1, 0, 0).unwrap();
            assert_eq!(log.name, "minecraft:oak_log");
            assert_eq!(log.get_property("axis").map(|s| s.as_str()), Some("z"));
        }
    }

    #[test]
    fn test_region_from_json_requires_dimensions() {
        let value = json!({"height": 1, "depth": 1, "palette": [], "blockStates": []});
        assert!(matches!(
            region_from_json(&value),
            Err(LitematicError::MissingField(_))
        ));
    }
}
