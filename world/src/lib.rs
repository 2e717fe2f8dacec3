#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative game state management for Loot Hounds.
//!
//! The world owns every map session and the dogs and loot within them.
//! Adapters mutate it exclusively through [`apply`] and read it through the
//! [`query`] module; the per-tick orchestration lives in the private `tick`
//! module and the snapshot representation in [`snapshot`].

use std::collections::BTreeMap;
use std::time::Duration;

use loot_hounds_core::{
    Command, Direction, DogId, Event, JoinError, LootId, Map, MapId, Position, Velocity,
};
use loot_hounds_system_spawning::LootPolicy;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::debug;

pub mod snapshot;
mod tick;

/// Error signalling an attempt to add an item to a bag that is at capacity.
///
/// The orchestrator checks [`Bag::is_full`] before every add, so observing
/// this error indicates a logic bug in the caller rather than a recoverable
/// runtime condition.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("bag is full at capacity {capacity}")]
pub struct BagFull {
    capacity: usize,
}

/// Bag carried by a dog, mapping loot slots to the kind stored there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bag {
    capacity: usize,
    items: BTreeMap<u32, usize>,
}

impl Bag {
    /// Creates an empty bag with the provided capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: BTreeMap::new(),
        }
    }

    /// Maximum number of items the bag can hold.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slot-to-kind mapping of the items currently held.
    #[must_use]
    pub const fn items(&self) -> &BTreeMap<u32, usize> {
        &self.items
    }

    /// Reports whether another item would exceed the capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Stores a loot kind under the provided slot.
    ///
    /// Fails without mutating the bag when it is already at capacity.
    pub fn add(&mut self, slot: u32, kind: usize) -> Result<(), BagFull> {
        if self.is_full() {
            return Err(BagFull {
                capacity: self.capacity,
            });
        }
        let _ = self.items.insert(slot, kind);
        Ok(())
    }

    /// Removes every item from the bag.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[derive(Clone, Debug)]
struct Dog {
    name: String,
    position: Position,
    velocity: Velocity,
    direction: Direction,
    bag: Bag,
    score: u32,
    play_time: Duration,
    inactive_time: Duration,
}

impl Dog {
    fn new(name: String, bag_capacity: usize, position: Position) -> Self {
        Self {
            name,
            position,
            velocity: Velocity::zero(),
            direction: Direction::North,
            bag: Bag::new(bag_capacity),
            score: 0,
            play_time: Duration::ZERO,
            inactive_time: Duration::ZERO,
        }
    }
}

#[derive(Clone, Debug)]
struct Loot {
    kind: usize,
    position: Position,
}

#[derive(Debug)]
struct Session {
    map_index: usize,
    dogs: BTreeMap<DogId, Dog>,
    loots: BTreeMap<LootId, Loot>,
    next_dog: u32,
    next_loot: u32,
}

impl Session {
    fn new(map_index: usize) -> Self {
        Self {
            map_index,
            dogs: BTreeMap::new(),
            loots: BTreeMap::new(),
            next_dog: 0,
            next_loot: 0,
        }
    }

    fn add_dog(&mut self, name: String, bag_capacity: usize, position: Position) -> DogId {
        let id = DogId::new(self.next_dog);
        self.next_dog = self.next_dog.saturating_add(1);
        let _ = self.dogs.insert(id, Dog::new(name, bag_capacity, position));
        id
    }

    fn add_loot(&mut self, kind: usize, position: Position) -> LootId {
        let id = LootId::new(self.next_loot);
        self.next_loot = self.next_loot.saturating_add(1);
        let _ = self.loots.insert(id, Loot { kind, position });
        id
    }
}

/// Settings the world needs beyond the loaded map set.
#[derive(Clone, Copy, Debug)]
pub struct Settings {
    default_dog_speed: f64,
    default_bag_capacity: usize,
    retirement_threshold: Duration,
    randomize_spawn_points: bool,
    rng_seed: u64,
}

impl Settings {
    /// Creates a new settings bundle.
    #[must_use]
    pub const fn new(
        default_dog_speed: f64,
        default_bag_capacity: usize,
        retirement_threshold: Duration,
        randomize_spawn_points: bool,
        rng_seed: u64,
    ) -> Self {
        Self {
            default_dog_speed,
            default_bag_capacity,
            retirement_threshold,
            randomize_spawn_points,
            rng_seed,
        }
    }
}

/// Represents the authoritative Loot Hounds world state.
#[derive(Debug)]
pub struct World {
    maps: Vec<Map>,
    map_index: BTreeMap<MapId, usize>,
    sessions: BTreeMap<MapId, Session>,
    settings: Settings,
    policy: Box<dyn LootPolicy>,
    rng: ChaCha8Rng,
}

impl World {
    /// Creates a new world over the provided immutable map set.
    ///
    /// The map set and settings come from the config loader; the policy is
    /// shared across every session the world will ever create. Maps with
    /// duplicate ids keep the first occurrence.
    #[must_use]
    pub fn new(maps: Vec<Map>, settings: Settings, policy: Box<dyn LootPolicy>) -> Self {
        let mut map_index = BTreeMap::new();
        for (index, map) in maps.iter().enumerate() {
            let _ = map_index.entry(map.id().clone()).or_insert(index);
        }
        Self {
            maps,
            map_index,
            sessions: BTreeMap::new(),
            settings,
            policy,
            rng: ChaCha8Rng::seed_from_u64(settings.rng_seed),
        }
    }

    fn effective_dog_speed(&self, map: &Map) -> f64 {
        map.dog_speed().unwrap_or(self.settings.default_dog_speed)
    }

    fn effective_bag_capacity(&self, map: &Map) -> usize {
        map.bag_capacity()
            .unwrap_or(self.settings.default_bag_capacity)
    }

    fn join_game(&mut self, map_id: MapId, name: String, out_events: &mut Vec<Event>) {
        let Some(&index) = self.map_index.get(&map_id) else {
            debug!(map = map_id.as_str(), name, "join rejected: unknown map");
            out_events.push(Event::JoinRejected {
                map: map_id,
                name,
                reason: JoinError::UnknownMap,
            });
            return;
        };

        let map = &self.maps[index];
        let bag_capacity = self.effective_bag_capacity(map);
        let position = if self.settings.randomize_spawn_points {
            random_position_on_roads(map, &mut self.rng)
        } else {
            map.roads()
                .first()
                .map_or(Position::new(0.0, 0.0), |road| road.start().position())
        };

        let session = self
            .sessions
            .entry(map_id.clone())
            .or_insert_with(|| Session::new(index));
        let dog = session.add_dog(name, bag_capacity, position);
        debug!(map = map_id.as_str(), dog = dog.get(), "dog joined");
        out_events.push(Event::DogJoined {
            map: map_id,
            dog,
            position,
        });
    }

    fn set_dog_direction(&mut self, map_id: &MapId, dog_id: DogId, direction: Option<Direction>) {
        let Some(&index) = self.map_index.get(map_id) else {
            return;
        };
        let speed = self.effective_dog_speed(&self.maps[index]);
        let Some(dog) = self
            .sessions
            .get_mut(map_id)
            .and_then(|session| session.dogs.get_mut(&dog_id))
        else {
            debug!(map = map_id.as_str(), dog = dog_id.get(), "steer ignored: no such dog");
            return;
        };

        match direction {
            Some(direction) => {
                dog.direction = direction;
                dog.velocity = direction.velocity(speed);
            }
            None => dog.velocity = Velocity::zero(),
        }
        // A steering request counts as activity even when it stops the dog.
        dog.inactive_time = Duration::ZERO;
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::JoinGame { map, name } => world.join_game(map, name, out_events),
        Command::SetDogDirection {
            map,
            dog,
            direction,
        } => world.set_dog_direction(&map, dog, direction),
        Command::Tick { dt } => tick::run(world, dt, out_events),
    }
}

/// Uniformly random position on the centerline of a uniformly random road.
///
/// Maps without roads fall back to the origin; the config loader rejects
/// them before a world is ever built around one.
fn random_position_on_roads(map: &Map, rng: &mut ChaCha8Rng) -> Position {
    let roads = map.roads();
    let Some(road) = roads.get(rng.gen_range(0..roads.len().max(1))) else {
        return Position::new(0.0, 0.0);
    };

    if road.is_horizontal() {
        let x1 = f64::from(road.start().x());
        let x2 = f64::from(road.end().x());
        Position::new(
            rng.gen_range(x1.min(x2)..=x1.max(x2)),
            f64::from(road.start().y()),
        )
    } else {
        let y1 = f64::from(road.start().y());
        let y2 = f64::from(road.end().y());
        Position::new(
            f64::from(road.start().x()),
            rng.gen_range(y1.min(y2)..=y1.max(y2)),
        )
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::{Session, World};
    use loot_hounds_core::{Direction, DogId, LootId, Map, MapId, Position, Velocity};
    use std::time::Duration;

    /// Loaded maps, in config order.
    #[must_use]
    pub fn maps(world: &World) -> &[Map] {
        &world.maps
    }

    /// Looks a map up by id.
    #[must_use]
    pub fn map<'a>(world: &'a World, id: &MapId) -> Option<&'a Map> {
        world
            .map_index
            .get(id)
            .map(|&index| &world.maps[index])
    }

    /// Ids of the maps that currently have an active session.
    #[must_use]
    pub fn active_maps(world: &World) -> Vec<MapId> {
        world.sessions.keys().cloned().collect()
    }

    /// Captures a read-only view of the dogs in the provided map's session.
    ///
    /// A map without a session yields an empty view.
    #[must_use]
    pub fn dog_view(world: &World, map: &MapId) -> DogView {
        let snapshots = world.sessions.get(map).map_or_else(Vec::new, |session| {
            session
                .dogs
                .iter()
                .map(|(id, dog)| DogSnapshot {
                    id: *id,
                    name: dog.name.clone(),
                    position: dog.position,
                    velocity: dog.velocity,
                    direction: dog.direction,
                    bag_capacity: dog.bag.capacity(),
                    bag_items: dog.bag.items().iter().map(|(&slot, &kind)| (slot, kind)).collect(),
                    score: dog.score,
                    play_time: dog.play_time,
                    inactive_time: dog.inactive_time,
                })
                .collect()
        });
        DogView { snapshots }
    }

    /// Captures a read-only view of the loot in the provided map's session.
    #[must_use]
    pub fn loot_view(world: &World, map: &MapId) -> LootView {
        let snapshots = world.sessions.get(map).map_or_else(Vec::new, |session| {
            session
                .loots
                .iter()
                .map(|(id, loot)| LootSnapshot {
                    id: *id,
                    kind: loot.kind,
                    position: loot.position,
                })
                .collect()
        });
        LootView { snapshots }
    }

    /// Number of loot items currently in the provided map's session.
    #[must_use]
    pub fn loot_count(world: &World, map: &MapId) -> usize {
        world
            .sessions
            .get(map)
            .map_or(0, |session: &Session| session.loots.len())
    }

    /// Read-only snapshot describing all dogs within one session.
    #[derive(Clone, Debug)]
    pub struct DogView {
        snapshots: Vec<DogSnapshot>,
    }

    impl DogView {
        /// Iterator over the captured dog snapshots in ascending id order.
        pub fn iter(&self) -> impl Iterator<Item = &DogSnapshot> {
            self.snapshots.iter()
        }

        /// Consumes the view, yielding the underlying snapshots.
        #[must_use]
        pub fn into_vec(self) -> Vec<DogSnapshot> {
            self.snapshots
        }
    }

    /// Immutable representation of a single dog's state used for queries.
    #[derive(Clone, Debug, PartialEq)]
    pub struct DogSnapshot {
        /// Identifier of the dog within its session.
        pub id: DogId,
        /// Display name of the dog.
        pub name: String,
        /// Current position.
        pub position: Position,
        /// Current velocity.
        pub velocity: Velocity,
        /// Current facing.
        pub direction: Direction,
        /// Capacity of the dog's bag.
        pub bag_capacity: usize,
        /// Slot/kind pairs currently held in the bag, in slot order.
        pub bag_items: Vec<(u32, usize)>,
        /// Accumulated score.
        pub score: u32,
        /// Total time spent actively playing.
        pub play_time: Duration,
        /// Time accumulated toward retirement.
        pub inactive_time: Duration,
    }

    /// Read-only snapshot describing all loot within one session.
    #[derive(Clone, Debug)]
    pub struct LootView {
        snapshots: Vec<LootSnapshot>,
    }

    impl LootView {
        /// Iterator over the captured loot snapshots in ascending id order.
        pub fn iter(&self) -> impl Iterator<Item = &LootSnapshot> {
            self.snapshots.iter()
        }

        /// Consumes the view, yielding the underlying snapshots.
        #[must_use]
        pub fn into_vec(self) -> Vec<LootSnapshot> {
            self.snapshots
        }
    }

    /// Immutable representation of a single loot item used for queries.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct LootSnapshot {
        /// Identifier of the item within its session.
        pub id: LootId,
        /// Index into the map's loot kinds.
        pub kind: usize,
        /// Location of the item.
        pub position: Position,
    }
}
