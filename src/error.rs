//! Error types shared across the crate.

use thiserror::Error;

/// Result type alias using [`LitematicError`].
pub type Result<T> = std::result::Result<T, LitematicError>;

#[derive(Error, Debug)]
pub enum LitematicError {
    /// Packed block-state data or region dimensions cannot be decoded.
    #[error("Malformed packed data: {0}")]
    MalformedPackedData(String),

    /// A required NBT tag is absent or has the wrong type.
    #[error("Missing or mistyped field: {0}")]
    MissingField(String),

    #[error("NBT error: {0}")]
    Nbt(#[from] quartz_nbt::io::NbtIoError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),

    /// Command text contained no `/setblock` or `/fill` commands.
    #[error("No valid /setblock or /fill commands found in the input")]
    NoCommands,

    /// Parsed commands span more voxels than a region may hold.
    #[error("Selection of {0} blocks exceeds the limit of {1}")]
    SelectionTooLarge(u64, u64),

    /// A filter removed every block from a region.
    #[error("No blocks to export after filtering")]
    EmptySelection,

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl From<quartz_nbt::NbtReprError> for LitematicError {
    fn from(err: quartz_nbt::NbtReprError) -> Self {
        LitematicError::MissingField(err.to_string())
    }
}
