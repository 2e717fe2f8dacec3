//! JSON game configuration loading.
//!
//! The file format mirrors the classic camelCase layout: process-wide
//! defaults at the top level, a `lootGeneratorConfig` block, and a `maps`
//! array whose entries carry roads, buildings, offices, and loot types.
//! Parsing and validation both happen here so the world only ever sees maps
//! it can simulate.

use std::fs;
use std::path::Path;
use std::time::Duration;

use loot_hounds_core::{
    Building, LootKind, Map, MapId, Office, OfficeId, Offset, Point, Rectangle, Road, Size,
};
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_DOG_SPEED: f64 = 1.0;
const DEFAULT_BAG_CAPACITY: usize = 3;
const DEFAULT_RETIREMENT_SECS: f64 = 60.0;

/// Reasons a configuration file is rejected at load time.
#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    /// The file could not be read from disk.
    #[error("could not read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid JSON for the expected layout.
    #[error("could not parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// A map declares an empty road network.
    #[error("map `{map}` declares no roads")]
    NoRoads {
        /// Identifier of the offending map.
        map: String,
    },
    /// A road entry names neither an `x1` nor a `y1` end coordinate.
    #[error("map `{map}` has a road with neither `x1` nor `y1`")]
    RoadWithoutEnd {
        /// Identifier of the offending map.
        map: String,
    },
    /// A duration-valued field is negative or not finite.
    #[error("`{field}` must be a non-negative finite number of seconds, got {value}")]
    InvalidDuration {
        /// Name of the offending field.
        field: &'static str,
        /// Value the file carried.
        value: f64,
    },
}

/// Fully validated game configuration, ready to build a world from.
#[derive(Debug)]
pub(crate) struct GameConfig {
    pub(crate) maps: Vec<Map>,
    pub(crate) default_dog_speed: f64,
    pub(crate) default_bag_capacity: usize,
    pub(crate) retirement_threshold: Duration,
    pub(crate) loot_interval: Duration,
    pub(crate) loot_probability: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    #[serde(default = "default_dog_speed")]
    default_dog_speed: f64,
    #[serde(default = "default_bag_capacity")]
    default_bag_capacity: usize,
    #[serde(default = "default_retirement_time")]
    dog_retirement_time: f64,
    loot_generator_config: LootGeneratorConfig,
    maps: Vec<MapConfig>,
}

#[derive(Debug, Deserialize)]
struct LootGeneratorConfig {
    period: f64,
    probability: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapConfig {
    id: String,
    name: String,
    dog_speed: Option<f64>,
    bag_capacity: Option<usize>,
    roads: Vec<RoadConfig>,
    #[serde(default)]
    buildings: Vec<BuildingConfig>,
    #[serde(default)]
    offices: Vec<OfficeConfig>,
    #[serde(default)]
    loot_types: Vec<LootTypeConfig>,
}

#[derive(Debug, Deserialize)]
struct RoadConfig {
    x0: i32,
    y0: i32,
    x1: Option<i32>,
    y1: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct BuildingConfig {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfficeConfig {
    id: String,
    x: i32,
    y: i32,
    offset_x: i32,
    offset_y: i32,
}

#[derive(Debug, Deserialize)]
struct LootTypeConfig {
    name: String,
    #[serde(default)]
    value: u32,
}

fn default_dog_speed() -> f64 {
    DEFAULT_DOG_SPEED
}

fn default_bag_capacity() -> usize {
    DEFAULT_BAG_CAPACITY
}

fn default_retirement_time() -> f64 {
    DEFAULT_RETIREMENT_SECS
}

/// Loads and validates the configuration file at `path`.
pub(crate) fn load(path: &Path) -> Result<GameConfig, ConfigError> {
    parse(&fs::read_to_string(path)?)
}

/// Parses and validates configuration text.
pub(crate) fn parse(text: &str) -> Result<GameConfig, ConfigError> {
    let file: ConfigFile = serde_json::from_str(text)?;

    let retirement_threshold = seconds("dogRetirementTime", file.dog_retirement_time)?;
    let loot_interval = seconds("lootGeneratorConfig.period", file.loot_generator_config.period)?;

    let mut maps = Vec::with_capacity(file.maps.len());
    for map_config in file.maps {
        maps.push(build_map(map_config)?);
    }

    Ok(GameConfig {
        maps,
        default_dog_speed: file.default_dog_speed,
        default_bag_capacity: file.default_bag_capacity,
        retirement_threshold,
        loot_interval,
        loot_probability: file.loot_generator_config.probability,
    })
}

fn seconds(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::InvalidDuration { field, value });
    }
    Ok(Duration::from_secs_f64(value))
}

fn build_map(config: MapConfig) -> Result<Map, ConfigError> {
    let MapConfig {
        id,
        name,
        dog_speed,
        bag_capacity,
        roads,
        buildings,
        offices,
        loot_types,
    } = config;

    if roads.is_empty() {
        return Err(ConfigError::NoRoads { map: id });
    }

    let kinds = loot_types
        .into_iter()
        .map(|kind| LootKind::new(kind.name, kind.value))
        .collect();
    let mut map = Map::new(MapId::new(&id), name, kinds);

    for road in roads {
        let start = Point::new(road.x0, road.y0);
        match (road.x1, road.y1) {
            (Some(x1), _) => map.add_road(Road::horizontal(start, x1)),
            (None, Some(y1)) => map.add_road(Road::vertical(start, y1)),
            (None, None) => return Err(ConfigError::RoadWithoutEnd { map: id }),
        }
    }

    for building in buildings {
        map.add_building(Building::new(Rectangle::new(
            Point::new(building.x, building.y),
            Size::new(building.w, building.h),
        )));
    }

    for office in offices {
        map.add_office(Office::new(
            OfficeId::new(office.id),
            Point::new(office.x, office.y),
            Offset::new(office.offset_x, office.offset_y),
        ));
    }

    if let Some(speed) = dog_speed {
        map.set_dog_speed(speed);
    }
    if let Some(capacity) = bag_capacity {
        map.set_bag_capacity(capacity);
    }

    Ok(map)
}
