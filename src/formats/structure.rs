//! Vanilla structure-block NBT (`.nbt`).

use flate2::read::GzDecoder;
use log::debug;
use quartz_nbt::io::Flavor;
use quartz_nbt::{NbtCompound, NbtList, NbtTag};

use crate::block_state::BlockState;
use crate::error::{LitematicError, Result};
use crate::formats::manager::{SchematicExporter, SchematicImporter};
use crate::palette::Palette;
use crate::region::Region;
use crate::schematic::Litematic;

pub const STRUCTURE_DATA_VERSION: i32 = 2586;

fn int_list(values: [i32; 3]) -> NbtTag {
    NbtTag::List(NbtList::from(
        values.iter().map(|&v| NbtTag::Int(v)).collect::<Vec<NbtTag>>(),
    ))
}

fn read_int_triple(compound: &NbtCompound, key: &str) -> Result<(i32, i32, i32)> {
    let list = compound.get::<_, &NbtList>(key)?;
    let mut values = [0i32; 3];
    for (i, value) in values.iter_mut().enumerate() {
        *value = match list.get::<i32>(i) {
            Ok(v) => v,
            Err(_) => return Err(LitematicError::MissingField(format!("{}[{}]", key, i))),
        };
    }
    Ok((values[0], values[1], values[2]))
}

/// The primary region as a structure compound. Palette names are written
/// namespaced and `blocks` lists every non-air voxel in y → z → x order.
pub fn to_structure_nbt(litematic: &Litematic) -> Result<NbtCompound> {
    let region = litematic
        .primary_region()
        .ok_or_else(|| LitematicError::MissingField("Regions".to_string()))?;
    let (width, height, depth) = region.get_dimensions();

    let palette = NbtList::from(
        region
            .palette
            .iter()
            .map(BlockState::to_nbt)
            .collect::<Vec<NbtTag>>(),
    );

    // Grid cells are already stored y -> z -> x
    let blocks = NbtList::from(
        region
            .grid
            .iter()
            .filter(|&(_, index)| index > 0)
            .map(|((x, y, z), index)| {
                let mut entry = NbtCompound::new();
                entry.insert("pos", int_list([x as i32, y as i32, z as i32]));
                entry.insert("state", NbtTag::Int(index as i32));
                NbtTag::Compound(entry)
            })
            .collect::<Vec<NbtTag>>(),
    );

    let mut root = NbtCompound::new();
    root.insert("DataVersion", NbtTag::Int(STRUCTURE_DATA_VERSION));
    root.insert(
        "size",
        int_list([width as i32, height as i32, depth as i32]),
    );
    root.insert("palette", NbtTag::List(palette));
    root.insert("blocks", NbtTag::List(blocks));
    root.insert("entities", NbtTag::List(NbtList::new()));
    Ok(root)
}

pub fn to_structure(litematic: &Litematic) -> Result<Vec<u8>> {
    let root = to_structure_nbt(litematic)?;
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    quartz_nbt::io::write_nbt(&mut encoder, None, &root, Flavor::Uncompressed)?;
    Ok(encoder.finish()?)
}

pub fn from_structure_nbt(root: &NbtCompound) -> Result<Litematic> {
    let size = read_int_triple(root, "size")?;

    // Structure palettes carry no air entry at 0; remap into ours
    let mut palette = Palette::new();
    let mut remap = Vec::new();
    for tag in root.get::<_, &NbtList>("palette")?.iter() {
        if let NbtTag::Compound(compound) = tag {
            let state = BlockState::from_nbt(compound)?;
            remap.push(if state.is_air() { 0 } else { palette.get_or_insert(&state) });
        }
    }

    let mut region = Region::new("Unnamed".to_string(), (0, 0, 0), size)?;
    region.palette = palette;
    for tag in root.get::<_, &NbtList>("blocks")?.iter() {
        if let NbtTag::Compound(entry) = tag {
            let (x, y, z) = read_int_triple(entry, "pos")?;
            let state = entry.get::<_, i32>("state")?;
            if x < 0 || y < 0 || z < 0 {
                continue;
            }
            match usize::try_from(state).ok().and_then(|s| remap.get(s)) {
                Some(&index) => {
                    region.grid.set(x as usize, y as usize, z as usize, index);
                }
                None => debug!("Skipping block with unknown palette state {}", state),
            }
        }
    }

    let mut litematic = Litematic::new("Structure").with_region(region);
    if let Ok(data_version) = root.get::<_, i32>("DataVersion") {
        litematic.minecraft_data_version = data_version;
    }
    Ok(litematic)
}

pub fn from_structure(data: &[u8]) -> Result<Litematic> {
    let mut gz = GzDecoder::new(data);
    let (root, _) = quartz_nbt::io::read_nbt(&mut gz, Flavor::Uncompressed)?;
    from_structure_nbt(&root)
}

pub fn is_structure(data: &[u8]) -> bool {
    let mut gz = GzDecoder::new(data);
    match quartz_nbt::io::read_nbt(&mut gz, Flavor::Uncompressed) {
        Ok((root, _)) => {
            root.get::<_, &NbtList>("size").is_ok()
                && root.get::<_, &NbtList>("palette").is_ok()
                && root.get::<_, &NbtList>("blocks").is_ok()
        }
        Err(_) => false,
    }
}

pub struct StructureFormat;

impl SchematicImporter for StructureFormat {
    fn name(&self) -> String {
        "structure".to_string()
    }

    fn detect(&self, data: &[u8]) -> bool {
        is_structure(data)
    }

    fn read(&self, data: &[u8]) -> Result<Litematic> {
        from_structure(data)
    }
}

impl SchematicExporter for StructureFormat {
    fn name(&self) -> String {
        "structure".to_string()
    }

    fn extensions(&self) -> Vec<String> {
        vec!["nbt".to_string()]
    }

    fn write(&self, litematic: &Litematic, _settings: Option<&str>) -> Result<Vec<u8>> {
        to_structure(litematic)
    }
}
