//! Snapshot representations of the world state.
//!
//! Each entity has exactly one representation struct with one encode and one
//! decode path, composed bottom-up (loot → dog → session → world) along the
//! ownership graph. Restoring always reconstructs top-down against the
//! already-loaded map registry and fails loudly when a referenced map no
//! longer resolves; adapters serialize the reprs with `serde` however they
//! store state.

use std::collections::BTreeMap;
use std::time::Duration;

use loot_hounds_core::{Direction, MapId, Position, Velocity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Bag, Dog, Loot, LootId, Session, World};

/// Reasons restoring a snapshot may fail against the loaded map set.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RestoreError {
    /// The snapshot references a map that is no longer loaded.
    #[error("snapshot references unknown map `{}`", map.as_str())]
    UnknownMap {
        /// Identifier the snapshot carried.
        map: MapId,
    },
    /// A dog's bag held more items than its recorded capacity allows.
    #[error("dog {dog} carries {held} items in a bag of capacity {capacity}")]
    BagOverflow {
        /// Identifier the dog held within its session.
        dog: u32,
        /// Number of items recorded in the snapshot.
        held: usize,
        /// Recorded bag capacity.
        capacity: usize,
    },
}

/// Serialized form of a [`Bag`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagRepr {
    pub(crate) capacity: usize,
    pub(crate) items: BTreeMap<u32, usize>,
}

impl BagRepr {
    fn capture(bag: &Bag) -> Self {
        Self {
            capacity: bag.capacity(),
            items: bag.items().clone(),
        }
    }

    fn restore(&self, dog: u32) -> Result<Bag, RestoreError> {
        if self.items.len() > self.capacity {
            return Err(RestoreError::BagOverflow {
                dog,
                held: self.items.len(),
                capacity: self.capacity,
            });
        }
        Ok(Bag {
            capacity: self.capacity,
            items: self.items.clone(),
        })
    }
}

/// Serialized form of a dog, keyed by its in-session id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DogRepr {
    pub(crate) id: u32,
    pub(crate) name: String,
    pub(crate) position: Position,
    pub(crate) velocity: Velocity,
    pub(crate) direction: Direction,
    pub(crate) bag: BagRepr,
    pub(crate) score: u32,
    pub(crate) play_time_ms: u64,
    pub(crate) inactive_time_ms: u64,
}

impl DogRepr {
    fn capture(id: u32, dog: &Dog) -> Self {
        Self {
            id,
            name: dog.name.clone(),
            position: dog.position,
            velocity: dog.velocity,
            direction: dog.direction,
            bag: BagRepr::capture(&dog.bag),
            score: dog.score,
            play_time_ms: whole_millis(dog.play_time),
            inactive_time_ms: whole_millis(dog.inactive_time),
        }
    }

    fn restore(&self) -> Result<Dog, RestoreError> {
        Ok(Dog {
            name: self.name.clone(),
            position: self.position,
            velocity: self.velocity,
            direction: self.direction,
            bag: self.bag.restore(self.id)?,
            score: self.score,
            play_time: Duration::from_millis(self.play_time_ms),
            inactive_time: Duration::from_millis(self.inactive_time_ms),
        })
    }
}

/// Serialized form of a loot item, keyed by its in-session id.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LootRepr {
    pub(crate) id: u32,
    pub(crate) kind: usize,
    pub(crate) position: Position,
}

impl LootRepr {
    fn capture(id: u32, loot: &Loot) -> Self {
        Self {
            id,
            kind: loot.kind,
            position: loot.position,
        }
    }
}

/// Serialized form of one map session, including its id counters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRepr {
    pub(crate) map: MapId,
    pub(crate) next_dog: u32,
    pub(crate) next_loot: u32,
    pub(crate) dogs: Vec<DogRepr>,
    pub(crate) loots: Vec<LootRepr>,
}

/// Serialized form of every active session in the world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldRepr {
    pub(crate) sessions: Vec<SessionRepr>,
}

/// Captures a snapshot of every session, its entities, and its id counters.
#[must_use]
pub fn capture(world: &World) -> WorldRepr {
    let sessions = world
        .sessions
        .iter()
        .map(|(map_id, session)| SessionRepr {
            map: map_id.clone(),
            next_dog: session.next_dog,
            next_loot: session.next_loot,
            dogs: session
                .dogs
                .iter()
                .map(|(id, dog)| DogRepr::capture(id.get(), dog))
                .collect(),
            loots: session
                .loots
                .iter()
                .map(|(id, loot)| LootRepr::capture(id.get(), loot))
                .collect(),
        })
        .collect();
    WorldRepr { sessions }
}

/// Replaces the world's sessions with the snapshot's contents.
///
/// Maps are resolved against the world's already-loaded registry; an
/// unresolvable map or an over-capacity bag aborts the restore with the
/// world's sessions untouched.
pub fn restore(world: &mut World, repr: WorldRepr) -> Result<(), RestoreError> {
    let mut sessions = BTreeMap::new();

    for session_repr in repr.sessions {
        let Some(&map_index) = world.map_index.get(&session_repr.map) else {
            return Err(RestoreError::UnknownMap {
                map: session_repr.map,
            });
        };

        let mut session = Session::new(map_index);
        session.next_dog = session_repr.next_dog;
        session.next_loot = session_repr.next_loot;
        for dog_repr in &session_repr.dogs {
            let _ = session
                .dogs
                .insert(crate::DogId::new(dog_repr.id), dog_repr.restore()?);
        }
        for loot_repr in &session_repr.loots {
            let _ = session.loots.insert(
                LootId::new(loot_repr.id),
                Loot {
                    kind: loot_repr.kind,
                    position: loot_repr.position,
                },
            );
        }
        let _ = sessions.insert(session_repr.map, session);
    }

    world.sessions = sessions;
    Ok(())
}

fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{apply, query, Settings, World};
    use loot_hounds_core::{Command, DogId, LootKind, Map, Point, Road};
    use loot_hounds_system_spawning::{LootGenerator, LootPolicy};

    fn town_map() -> Map {
        let mut map = Map::new(
            MapId::new("town"),
            "Town",
            vec![LootKind::new("key", 10), LootKind::new("wallet", 30)],
        );
        map.add_road(Road::horizontal(Point::new(0, 0), 10));
        map.add_road(Road::vertical(Point::new(5, 0), 6));
        map
    }

    fn generator() -> Box<dyn LootPolicy> {
        Box::new(LootGenerator::new(Duration::from_secs(1), 1.0))
    }

    fn settings() -> Settings {
        Settings::new(2.0, 3, Duration::from_secs(60), true, 11)
    }

    fn populated_world() -> World {
        let mut world = World::new(vec![town_map()], settings(), generator());
        let mut events = Vec::new();
        for name in ["Rex", "Toto", "Laika"] {
            apply(
                &mut world,
                Command::JoinGame {
                    map: MapId::new("town"),
                    name: name.to_owned(),
                },
                &mut events,
            );
        }
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(2),
            },
            &mut events,
        );
        world
    }

    #[test]
    fn capture_round_trips_through_a_fresh_world() {
        let world = populated_world();
        let repr = capture(&world);
        assert!(!repr.sessions.is_empty());
        assert!(!repr.sessions[0].dogs.is_empty());
        assert!(!repr.sessions[0].loots.is_empty());

        let mut restored = World::new(vec![town_map()], settings(), generator());
        restore(&mut restored, repr.clone()).expect("snapshot restores");

        assert_eq!(capture(&restored), repr);
        let town = MapId::new("town");
        assert_eq!(
            query::dog_view(&world, &town).into_vec(),
            query::dog_view(&restored, &town).into_vec()
        );
        assert_eq!(
            query::loot_view(&world, &town).into_vec(),
            query::loot_view(&restored, &town).into_vec()
        );
    }

    #[test]
    fn restored_counters_keep_new_ids_monotonic() {
        let world = populated_world();
        let repr = capture(&world);

        let mut restored = World::new(vec![town_map()], settings(), generator());
        restore(&mut restored, repr).expect("snapshot restores");

        let mut events = Vec::new();
        apply(
            &mut restored,
            Command::JoinGame {
                map: MapId::new("town"),
                name: "Newcomer".to_owned(),
            },
            &mut events,
        );
        match events.last() {
            Some(loot_hounds_core::Event::DogJoined { dog, .. }) => {
                assert_eq!(*dog, DogId::new(3), "ids continue past the snapshot");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn restore_fails_loudly_for_an_unknown_map() {
        let world = populated_world();
        let mut repr = capture(&world);
        repr.sessions[0].map = MapId::new("demolished");

        let mut restored = World::new(vec![town_map()], settings(), generator());
        let error = restore(&mut restored, repr).expect_err("unknown map must fail");
        assert_eq!(
            error,
            RestoreError::UnknownMap {
                map: MapId::new("demolished")
            }
        );
        assert!(query::active_maps(&restored).is_empty());
    }

    #[test]
    fn restore_rejects_an_overfull_bag() {
        let world = populated_world();
        let mut repr = capture(&world);
        let dog = &mut repr.sessions[0].dogs[0];
        dog.bag.capacity = 1;
        dog.bag.items = std::collections::BTreeMap::from([(0, 0), (1, 1)]);

        let mut restored = World::new(vec![town_map()], settings(), generator());
        let error = restore(&mut restored, repr).expect_err("overfull bag must fail");
        assert!(matches!(error, RestoreError::BagOverflow { held: 2, .. }));
    }

    #[test]
    fn world_repr_survives_json_round_trip() {
        let world = populated_world();
        let repr = capture(&world);

        let encoded = serde_json::to_string(&repr).expect("serializes");
        let decoded: WorldRepr = serde_json::from_str(&encoded).expect("deserializes");
        assert_eq!(decoded, repr);
    }
}
