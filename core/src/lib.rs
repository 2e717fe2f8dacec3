#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Loot Hounds engine.
//!
//! This crate defines the surface that connects adapters, the authoritative
//! world, and pure systems: identifier newtypes, the static map/geometry
//! model, and the [`Command`]/[`Event`] pair. Adapters submit [`Command`]
//! values describing desired mutations, the world executes them via its
//! `apply` entry point, and then broadcasts [`Event`] values for adapters to
//! react to deterministically.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Half-width of the drivable corridor around a road centerline.
pub const ROAD_HALF_WIDTH: f64 = 0.4;

/// Tolerance under which two positions are considered the same point.
pub const POSITION_EPSILON: f64 = 1e-5;

/// Identifier of a map, unique across the game.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapId(String);

impl MapId {
    /// Creates a new map identifier from the provided string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Retrieves the textual representation of the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a dog, unique within its session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DogId(u32);

impl DogId {
    /// Creates a new dog identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a loot item, unique within its session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LootId(u32);

impl LootId {
    /// Creates a new loot identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of an office (deposit base) within a map.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OfficeId(String);

impl OfficeId {
    /// Creates a new office identifier from the provided string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Retrieves the textual representation of the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Continuous location on a map, measured in road units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    x: f64,
    y: f64,
}

impl Position {
    /// Creates a new position from its coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate.
    #[must_use]
    pub const fn x(&self) -> f64 {
        self.x
    }

    /// Vertical coordinate.
    #[must_use]
    pub const fn y(&self) -> f64 {
        self.y
    }

    /// Reports whether both coordinates lie within [`POSITION_EPSILON`] of
    /// the other position. Simulation logic compares exact computed values;
    /// this tolerant form exists for bucketing and assertions.
    #[must_use]
    pub fn approx_eq(&self, other: Position) -> bool {
        (self.x - other.x).abs() < POSITION_EPSILON && (self.y - other.y).abs() < POSITION_EPSILON
    }

    /// Position reached after travelling at `velocity` for `seconds`.
    #[must_use]
    pub fn advanced_by(&self, velocity: Velocity, seconds: f64) -> Position {
        Position::new(
            self.x + velocity.dx() * seconds,
            self.y + velocity.dy() * seconds,
        )
    }
}

/// Rate of travel along both axes, in road units per second.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    dx: f64,
    dy: f64,
}

impl Velocity {
    /// Creates a new velocity from its components.
    #[must_use]
    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// The velocity of a dog that is standing still.
    #[must_use]
    pub const fn zero() -> Self {
        Self { dx: 0.0, dy: 0.0 }
    }

    /// Horizontal component.
    #[must_use]
    pub const fn dx(&self) -> f64 {
        self.dx
    }

    /// Vertical component.
    #[must_use]
    pub const fn dy(&self) -> f64 {
        self.dy
    }

    /// Reports whether both components are exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

/// Cardinal facings available to a dog.
///
/// North points toward decreasing `y`, matching the screen-space convention
/// of the map format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Facing toward decreasing `y`.
    North,
    /// Facing toward increasing `y`.
    South,
    /// Facing toward decreasing `x`.
    West,
    /// Facing toward increasing `x`.
    East,
}

impl Direction {
    /// Velocity of a dog facing this direction at the provided speed.
    #[must_use]
    pub fn velocity(self, speed: f64) -> Velocity {
        match self {
            Self::North => Velocity::new(0.0, -speed),
            Self::South => Velocity::new(0.0, speed),
            Self::West => Velocity::new(-speed, 0.0),
            Self::East => Velocity::new(speed, 0.0),
        }
    }
}

/// Discrete map coordinate used by the static geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Point {
    x: i32,
    y: i32,
}

impl Point {
    /// Creates a new discrete point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical coordinate.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// The continuous position at this point.
    #[must_use]
    pub fn position(&self) -> Position {
        Position::new(f64::from(self.x), f64::from(self.y))
    }
}

/// Width and height of a rectangle, in whole road units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    width: i32,
    height: i32,
}

impl Size {
    /// Creates a new size descriptor with explicit dimensions.
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Width of the rectangle.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Height of the rectangle.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }
}

/// Axis-aligned rectangle anchored at its upper-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rectangle {
    position: Point,
    size: Size,
}

impl Rectangle {
    /// Constructs a rectangle from an anchor point and size.
    #[must_use]
    pub const fn new(position: Point, size: Size) -> Self {
        Self { position, size }
    }

    /// Upper-left corner of the rectangle.
    #[must_use]
    pub const fn position(&self) -> Point {
        self.position
    }

    /// Dimensions of the rectangle.
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }
}

/// Displacement between an office anchor and its decoration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Offset {
    dx: i32,
    dy: i32,
}

impl Offset {
    /// Creates a new offset from its components.
    #[must_use]
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// Horizontal displacement.
    #[must_use]
    pub const fn dx(&self) -> i32 {
        self.dx
    }

    /// Vertical displacement.
    #[must_use]
    pub const fn dy(&self) -> i32 {
        self.dy
    }
}

/// Axis-aligned road segment with a drivable corridor around its centerline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Road {
    start: Point,
    end: Point,
}

impl Road {
    /// Creates a horizontal road from `start` to the provided end abscissa.
    #[must_use]
    pub const fn horizontal(start: Point, end_x: i32) -> Self {
        Self {
            start,
            end: Point::new(end_x, start.y),
        }
    }

    /// Creates a vertical road from `start` to the provided end ordinate.
    #[must_use]
    pub const fn vertical(start: Point, end_y: i32) -> Self {
        Self {
            start,
            end: Point::new(start.x, end_y),
        }
    }

    /// Reports whether the road runs along the horizontal axis.
    #[must_use]
    pub const fn is_horizontal(&self) -> bool {
        self.start.y == self.end.y
    }

    /// Reports whether the road runs along the vertical axis.
    #[must_use]
    pub const fn is_vertical(&self) -> bool {
        self.start.x == self.end.x
    }

    /// First endpoint of the centerline.
    #[must_use]
    pub const fn start(&self) -> Point {
        self.start
    }

    /// Second endpoint of the centerline.
    #[must_use]
    pub const fn end(&self) -> Point {
        self.end
    }

    /// Reports whether the position lies within this road's corridor.
    ///
    /// The corridor extends [`ROAD_HALF_WIDTH`] beyond the centerline on
    /// every side, padded by floating-point epsilon so a dog clamped onto
    /// the boundary still counts as on the road.
    #[must_use]
    pub fn covers(&self, position: Position) -> bool {
        let epsilon = f64::EPSILON;
        if self.is_horizontal() {
            let road_y = f64::from(self.start.y);
            if (position.y() - road_y).abs() > ROAD_HALF_WIDTH + epsilon {
                return false;
            }
            let x1 = f64::from(self.start.x);
            let x2 = f64::from(self.end.x);
            let min_x = x1.min(x2) - ROAD_HALF_WIDTH - epsilon;
            let max_x = x1.max(x2) + ROAD_HALF_WIDTH + epsilon;
            position.x() >= min_x && position.x() <= max_x
        } else {
            let road_x = f64::from(self.start.x);
            if (position.x() - road_x).abs() > ROAD_HALF_WIDTH + epsilon {
                return false;
            }
            let y1 = f64::from(self.start.y);
            let y2 = f64::from(self.end.y);
            let min_y = y1.min(y2) - ROAD_HALF_WIDTH - epsilon;
            let max_y = y1.max(y2) + ROAD_HALF_WIDTH + epsilon;
            position.y() >= min_y && position.y() <= max_y
        }
    }
}

/// Static obstacle rendered on a map.
///
/// Buildings do not constrain movement; the corridor test alone decides
/// where dogs may drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Building {
    bounds: Rectangle,
}

impl Building {
    /// Creates a new building covering the provided bounds.
    #[must_use]
    pub const fn new(bounds: Rectangle) -> Self {
        Self { bounds }
    }

    /// Region of the map occupied by the building.
    #[must_use]
    pub const fn bounds(&self) -> Rectangle {
        self.bounds
    }
}

/// Deposit base where a dog exchanges its bag contents for score.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Office {
    id: OfficeId,
    position: Point,
    offset: Offset,
}

impl Office {
    /// Creates a new office at the provided location.
    #[must_use]
    pub const fn new(id: OfficeId, position: Point, offset: Offset) -> Self {
        Self {
            id,
            position,
            offset,
        }
    }

    /// Identifier of the office within its map.
    #[must_use]
    pub const fn id(&self) -> &OfficeId {
        &self.id
    }

    /// Location of the office on the road network.
    #[must_use]
    pub const fn position(&self) -> Point {
        self.position
    }

    /// Rendering displacement of the office decoration.
    #[must_use]
    pub const fn offset(&self) -> Offset {
        self.offset
    }
}

/// Kind of loot a map can spawn, carrying its deposit value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LootKind {
    name: String,
    value: u32,
}

impl LootKind {
    /// Creates a new loot kind with the provided name and deposit value.
    #[must_use]
    pub fn new(name: impl Into<String>, value: u32) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Human-readable name of the kind.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Points awarded when an item of this kind is deposited.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.value
    }
}

/// Immutable description of one playable map.
///
/// Maps are assembled once by the config loader and never mutated during a
/// run. The loader is responsible for rejecting maps without roads and for
/// deduplicating office ids.
#[derive(Clone, Debug, PartialEq)]
pub struct Map {
    id: MapId,
    name: String,
    roads: Vec<Road>,
    buildings: Vec<Building>,
    offices: Vec<Office>,
    loot_kinds: Vec<LootKind>,
    dog_speed: Option<f64>,
    bag_capacity: Option<usize>,
}

impl Map {
    /// Creates an empty map with the provided identity and spawnable kinds.
    #[must_use]
    pub fn new(id: MapId, name: impl Into<String>, loot_kinds: Vec<LootKind>) -> Self {
        Self {
            id,
            name: name.into(),
            roads: Vec::new(),
            buildings: Vec::new(),
            offices: Vec::new(),
            loot_kinds,
            dog_speed: None,
            bag_capacity: None,
        }
    }

    /// Identifier of the map.
    #[must_use]
    pub const fn id(&self) -> &MapId {
        &self.id
    }

    /// Display name of the map.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Roads making up the drivable network, in load order.
    #[must_use]
    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    /// Static buildings, in load order.
    #[must_use]
    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    /// Deposit offices, in load order.
    #[must_use]
    pub fn offices(&self) -> &[Office] {
        &self.offices
    }

    /// Loot kinds this map can spawn; spawn indices refer into this slice.
    #[must_use]
    pub fn loot_kinds(&self) -> &[LootKind] {
        &self.loot_kinds
    }

    /// Per-map dog speed override, if configured.
    #[must_use]
    pub const fn dog_speed(&self) -> Option<f64> {
        self.dog_speed
    }

    /// Per-map bag capacity override, if configured.
    #[must_use]
    pub const fn bag_capacity(&self) -> Option<usize> {
        self.bag_capacity
    }

    /// Appends a road to the network.
    pub fn add_road(&mut self, road: Road) {
        self.roads.push(road);
    }

    /// Appends a building.
    pub fn add_building(&mut self, building: Building) {
        self.buildings.push(building);
    }

    /// Appends a deposit office.
    pub fn add_office(&mut self, office: Office) {
        self.offices.push(office);
    }

    /// Overrides the default dog speed for this map.
    pub fn set_dog_speed(&mut self, speed: f64) {
        self.dog_speed = Some(speed);
    }

    /// Overrides the default bag capacity for this map.
    pub fn set_bag_capacity(&mut self, capacity: usize) {
        self.bag_capacity = Some(capacity);
    }

    /// Reports whether the position lies within any road's corridor.
    #[must_use]
    pub fn is_on_road(&self, position: Position) -> bool {
        self.roads.iter().any(|road| road.covers(position))
    }

    /// Points awarded for depositing one item of the provided kind.
    ///
    /// Unknown kinds score zero; the orchestrator only stores kinds drawn
    /// from this map, so a miss indicates a stale snapshot rather than a
    /// condition worth aborting a tick over.
    #[must_use]
    pub fn loot_value(&self, kind: usize) -> u32 {
        self.loot_kinds.get(kind).map_or(0, LootKind::value)
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Admits a new dog into the session of the provided map.
    JoinGame {
        /// Map whose session the dog joins.
        map: MapId,
        /// Display name of the dog.
        name: String,
    },
    /// Points a dog in a direction, or stops it when `direction` is `None`.
    SetDogDirection {
        /// Map whose session owns the dog.
        map: MapId,
        /// Identifier of the dog to steer.
        dog: DogId,
        /// New facing, or `None` to stand still.
        direction: Option<Direction>,
    },
    /// Advances every session's simulation by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
}

/// Reasons a join request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JoinError {
    /// No map with the requested identifier is loaded.
    UnknownMap,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a dog joined a session.
    DogJoined {
        /// Map whose session admitted the dog.
        map: MapId,
        /// Identifier assigned to the dog by the session.
        dog: DogId,
        /// Spawn position of the dog.
        position: Position,
    },
    /// Reports that a join request was rejected.
    JoinRejected {
        /// Map requested by the join.
        map: MapId,
        /// Display name supplied with the request.
        name: String,
        /// Specific reason the join failed.
        reason: JoinError,
    },
    /// Confirms that a loot item appeared on the road network.
    LootSpawned {
        /// Map whose session spawned the item.
        map: MapId,
        /// Identifier assigned to the item by the session.
        loot: LootId,
        /// Index into the map's loot kinds.
        kind: usize,
        /// Location of the item.
        position: Position,
    },
    /// Confirms that a dog picked up a loot item.
    LootGathered {
        /// Map whose session owns both parties.
        map: MapId,
        /// Dog that picked the item up.
        dog: DogId,
        /// Item that left the road network.
        loot: LootId,
    },
    /// Confirms that a dog emptied its bag at an office.
    BagDeposited {
        /// Map whose session owns the dog.
        map: MapId,
        /// Dog that deposited.
        dog: DogId,
        /// Points added to the dog's score by the deposit.
        points: u32,
    },
    /// Announces that a dog was retired for inactivity and removed.
    DogRetired {
        /// Map whose session owned the dog.
        map: MapId,
        /// Identifier the dog held within the session.
        dog: DogId,
        /// Display name of the dog.
        name: String,
        /// Final score at retirement.
        score: u32,
        /// Total time the dog spent in the game.
        play_time: Duration,
    },
}
