use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::commands::{self, Command, CommandOptions};
use crate::region::Region;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub name: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub time_created: Option<i64>,
    pub time_modified: Option<i64>,
}

/// A loaded schematic: metadata plus one or more regions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Litematic {
    pub metadata: Metadata,
    pub version: i32,
    pub sub_version: Option<i32>,
    pub minecraft_data_version: i32,
    pub regions: Vec<Region>,
}

impl Default for Litematic {
    fn default() -> Self {
        Litematic {
            metadata: Metadata::default(),
            version: 6,
            sub_version: Some(1),
            minecraft_data_version: 2586,
            regions: Vec::new(),
        }
    }
}

impl Litematic {
    pub fn new(name: impl Into<String>) -> Self {
        let mut litematic = Litematic::default();
        litematic.metadata.name = Some(name.into());
        litematic
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.regions.push(region);
        self
    }

    pub fn add_region(&mut self, region: Region) {
        self.regions.push(region);
    }

    pub fn get_region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn get_region_mut(&mut self, name: &str) -> Option<&mut Region> {
        self.regions.iter_mut().find(|r| r.name == name)
    }

    /// The first region, which every editing operation of the viewer targets.
    pub fn primary_region(&self) -> Option<&Region> {
        self.regions.first()
    }

    pub fn primary_region_mut(&mut self) -> Option<&mut Region> {
        self.regions.first_mut()
    }

    pub fn total_volume(&self) -> usize {
        self.regions.iter().map(Region::volume).sum()
    }

    pub fn total_blocks(&self) -> usize {
        self.regions.iter().map(Region::count_non_air_blocks).sum()
    }

    /// Combined material list across all regions.
    pub fn material_list(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for region in &self.regions {
            region.add_materials(&mut counts);
        }
        counts
    }

    /// Replace a block in every region; returns the total voxels changed.
    pub fn replace_block(&mut self, target: &str, replacement: &str) -> usize {
        self.regions
            .iter_mut()
            .map(|r| r.replace_block(target, replacement))
            .sum()
    }

    /// Per-region options with `options.origin` at the schematic's minimum
    /// corner, so regions keep their layout relative to each other.
    fn region_options(&self, options: &CommandOptions) -> Vec<CommandOptions> {
        let corners: Vec<_> = self.regions.iter().map(Region::min_corner).collect();
        let Some(min) = corners.iter().copied().reduce(|a, b| {
            (a.0.min(b.0), a.1.min(b.1), a.2.min(b.2))
        }) else {
            return Vec::new();
        };
        corners
            .into_iter()
            .map(|c| options.shifted((c.0 - min.0, c.1 - min.1, c.2 - min.2)))
            .collect()
    }

    /// `/fill` and `/setblock` commands for every region, regions in order.
    /// Regions are compressed in parallel.
    pub fn fill_commands(&self, options: &CommandOptions) -> Vec<Command> {
        self.regions
            .par_iter()
            .zip(self.region_options(options))
            .map(|(region, options)| commands::fill_commands(region, &options))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }

    /// One `/setblock` per non-air voxel, regions in order.
    pub fn setblock_commands(&self, options: &CommandOptions) -> Vec<Command> {
        self.regions
            .iter()
            .zip(self.region_options(options))
            .flat_map(|(region, options)| commands::setblock_commands(region, &options))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BlockState;

    fn region(name: &str, block: &str) -> Region {
        let mut region = Region::new(name.to_string(), (0, 0, 0), (2, 1, 1)).unwrap();
        region.set_block(0, 0, 0, &BlockState::new(block));
        region.set_block(1, 0, 0, &BlockState::new(block));
        region
    }

    #[test]
    fn test_totals_and_materials_span_regions() {
        let litematic = Litematic::new("multi")
            .with_region(region("a", "minecraft:stone"))
            .with_region(region("b", "minecraft:dirt"));

        assert_eq!(litematic.total_volume(), 4);
        assert_eq!(litematic.total_blocks(), 4);
        let materials = litematic.material_list();
        assert_eq!(materials.get("minecraft:stone"), Some(&2));
        assert_eq!(materials.get("minecraft:dirt"), Some(&2));
        assert_eq!(litematic.get_region("b").unwrap().name, "b");
    }

    #[test]
    fn test_fill_commands_keep_region_order() {
        let litematic = Litematic::new("multi")
            .with_region(region("a", "minecraft:stone"))
            .with_region(region("b", "minecraft:dirt"));
        let commands: Vec<String> = litematic
            .fill_commands(&CommandOptions::default())
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            commands,
            vec![
                "/fill 0 0 0 1 0 0 minecraft:stone",
                "/fill 0 0 0 1 0 0 minecraft:dirt"
            ]
        );
    }

    #[test]
    fn test_region_offsets_follow_lowest_corner() {
        let mut low = region("low", "minecraft:stone");
        low.position = (-4, 2, 0);
        // Negative X size: the grid starts at x = 5 + (-2) + 1 = 4
        let mut high = Region::new("high".to_string(), (5, 0, 3), (-2, 1, 1)).unwrap();
        high.set_block(0, 0, 0, &BlockState::new("minecraft:dirt"));
        let litematic = Litematic::new("multi").with_region(low).with_region(high);

        let commands: Vec<String> = litematic
            .setblock_commands(&CommandOptions::with_origin((100, 64, 100)))
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            commands,
            vec![
                "/setblock 100 66 100 minecraft:stone",
                "/setblock 101 66 100 minecraft:stone",
                "/setblock 108 64 103 minecraft:dirt"
            ]
        );
    }

    #[test]
    fn test_replace_across_regions() {
        let mut litematic = Litematic::new("multi")
            .with_region(region("a", "minecraft:stone"))
            .with_region(region("b", "minecraft:stone"));
        assert_eq!(litematic.replace_block("stone", "glass"), 4);
        assert_eq!(litematic.material_list().get("minecraft:glass"), Some(&4));
    }
}
