//! Litematic schematic tooling: the packed block-state codec, greedy cuboid
//! compression of voxel grids, and `/fill` command export.

pub mod bitfield;
pub mod block_state;
pub mod command_parser;
pub mod commands;
pub mod error;
pub mod formats;
pub mod history;
pub mod mesh;
pub mod palette;
pub mod region;
pub mod schematic;
pub mod transform;
pub mod voxel_grid;

pub use bitfield::{decode, encode, PackedWords};
pub use block_state::BlockState;
pub use command_parser::parse_commands;
pub use commands::{Command, CommandOptions};
pub use error::{LitematicError, Result};
pub use formats::manager::{get_manager, FormatManager, SchematicExporter, SchematicImporter};
pub use history::{EditHistory, TransformHistory};
pub use mesh::{compress, Cuboid, CuboidMesher};
pub use palette::Palette;
pub use region::Region;
pub use schematic::{Litematic, Metadata};
pub use transform::{PaletteTransformCache, TransformKind};
pub use voxel_grid::VoxelGrid;
