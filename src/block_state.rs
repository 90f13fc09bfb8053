use quartz_nbt::{NbtCompound, NbtTag};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{LitematicError, Result};

pub const AIR: &str = "minecraft:air";
const NAMESPACE: &str = "minecraft:";

/// A block type plus its state properties.
///
/// Properties keep the order they were read in, which is the order used when
/// formatting, but equality and hashing treat them as an unordered mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockState {
    pub name: SmolStr,
    pub properties: Vec<(SmolStr, SmolStr)>,
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        self.write_properties(f)
    }
}

impl PartialEq for BlockState {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.properties.len() == other.properties.len()
            && self
                .properties
                .iter()
                .all(|(k, v)| other.get_property(k) == Some(v))
    }
}

impl Eq for BlockState {}

impl Hash for BlockState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        let mut sorted: Vec<&(SmolStr, SmolStr)> = self.properties.iter().collect();
        sorted.sort();
        for (k, v) in sorted {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl BlockState {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        BlockState {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    pub fn air() -> Self {
        BlockState::new(AIR)
    }

    pub fn get_name(&self) -> &str {
        self.name.as_str()
    }

    pub fn is_air(&self) -> bool {
        self.name == AIR || self.name == "air"
    }

    /// Name without the `minecraft:` namespace, lower-cased. Used when matching
    /// blocks by name regardless of how the file spelled them.
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// Name with the `minecraft:` namespace enforced.
    pub fn namespaced_name(&self) -> String {
        namespaced(&self.name)
    }

    /// `minecraft:<name>[k=v,...]`, the form accepted by `/setblock` and `/fill`.
    pub fn command_string(&self) -> String {
        let mut out = self.namespaced_name();
        if !self.properties.is_empty() {
            let props: Vec<String> = self
                .properties
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            out.push('[');
            out.push_str(&props.join(","));
            out.push(']');
        }
        out
    }

    pub fn with_property(mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn with_properties(mut self, properties: Vec<(SmolStr, SmolStr)>) -> Self {
        self.properties = properties;
        self
    }

    pub fn set_property(&mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) {
        let key = key.into();
        let value = value.into();
        for (k, v) in &mut self.properties {
            if *k == key {
                *v = value;
                return;
            }
        }
        self.properties.push((key, value));
    }

    pub fn get_property(&self, key: &str) -> Option<&SmolStr> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    fn write_properties(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.properties.is_empty() {
            write!(f, "[")?;
            for (i, (key, value)) in self.properties.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}={}", key, value)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }

    pub fn to_nbt(&self) -> NbtTag {
        let mut compound = NbtCompound::new();
        compound.insert("Name", self.namespaced_name());

        if !self.properties.is_empty() {
            let mut properties = NbtCompound::new();
            for (key, value) in &self.properties {
                properties.insert(key.to_string(), value.to_string());
            }
            compound.insert("Properties", properties);
        }

        NbtTag::Compound(compound)
    }

    pub fn from_nbt(compound: &NbtCompound) -> Result<Self> {
        let name: SmolStr = compound
            .get::<_, &String>("Name")
            .map_err(|e| LitematicError::MissingField(format!("palette entry Name: {}", e)))?
            .into();

        let mut properties = Vec::new();
        if let Ok(props) = compound.get::<_, &NbtCompound>("Properties") {
            for (key, value) in props.inner() {
                if let NbtTag::String(value_str) = value {
                    properties.push((key.into(), value_str.into()));
                }
            }
        }

        Ok(BlockState { name, properties })
    }
}

pub(crate) fn normalize_name(name: &str) -> String {
    name.strip_prefix(NAMESPACE).unwrap_or(name).to_lowercase()
}

pub(crate) fn namespaced(name: &str) -> String {
    if name.starts_with(NAMESPACE) {
        name.to_string()
    } else {
        format!("{}{}", NAMESPACE, name)
    }
}

#[cfg(test)]
mod tests {
    use super::BlockState;
    use std::collections::HashSet;

    #[test]
    fn test_block_state_creation() {
        let block = BlockState::new("minecraft:stone").with_property("variant", "granite");

        assert_eq!(block.name, "minecraft:stone");
        assert_eq!(
            block.get_property("variant").map(|s| s.as_str()),
            Some("granite")
        );
    }

    #[test]
    fn test_property_order_does_not_affect_equality() {
        let a = BlockState::new("minecraft:oak_stairs")
            .with_property("facing", "north")
            .with_property("half", "bottom");
        let b = BlockState::new("minecraft:oak_stairs")
            .with_property("half", "bottom")
            .with_property("facing", "north");

        assert_eq!(a, b);
        let set: HashSet<BlockState> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_different_properties_are_distinct() {
        let north = BlockState::new("minecraft:furnace").with_property("facing", "north");
        let south = BlockState::new("minecraft:furnace").with_property("facing", "south");
        assert_ne!(north, south);
    }

    #[test]
    fn test_command_string_adds_namespace_and_keeps_order() {
        let block = BlockState::new("oak_log")
            .with_property("axis", "x")
            .with_property("waterlogged", "false");
        assert_eq!(
            block.command_string(),
            "minecraft:oak_log[axis=x,waterlogged=false]"
        );
        assert_eq!(BlockState::new("stone").command_string(), "minecraft:stone");
    }

    #[test]
    fn test_nbt_roundtrip() {
        let block = BlockState::new("minecraft:lantern").with_property("hanging", "true");
        let tag = block.to_nbt();
        let compound = match tag {
            quartz_nbt::NbtTag::Compound(c) => c,
            _ => panic!("expected compound"),
        };
        assert_eq!(BlockState::from_nbt(&compound).unwrap(), block);
    }
}
