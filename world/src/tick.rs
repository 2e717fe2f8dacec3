//! Per-tick orchestration for every active session.
//!
//! Each tick runs the same fixed order: spawn loot, move every dog, detect
//! captures, apply deposits and pickups in capture-time order, then settle
//! the activity clocks and retire dogs that idled past the threshold. Event
//! order is observable — it decides contested pickups — so sessions are
//! visited in map-id order and dogs in ascending id order.

use std::collections::HashSet;
use std::time::Duration;

use loot_hounds_core::{DogId, Event, LootId, Map, MapId};
use loot_hounds_system_gathering::{find_gather_events, Gatherer, Item};
use loot_hounds_system_movement as movement;
use loot_hounds_system_spawning::LootPolicy;
use rand_chacha::ChaCha8Rng;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::{random_position_on_roads, Session, World};

const DOG_WIDTH: f64 = 0.6;
const OFFICE_WIDTH: f64 = 0.5;
const LOOT_WIDTH: f64 = 0.0;

/// Item id shared by every office; loot item ids are offset past it.
const DEPOSIT_ID: u64 = 0;

pub(crate) fn run(world: &mut World, dt: Duration, out_events: &mut Vec<Event>) {
    out_events.push(Event::TimeAdvanced { dt });

    let World {
        maps,
        sessions,
        settings,
        policy,
        rng,
        ..
    } = world;

    for (map_id, session) in sessions.iter_mut() {
        let map = &maps[session.map_index];
        spawn_loot(map_id, map, session, policy.as_mut(), rng, dt, out_events);
        let standing = move_and_gather(map_id, map, session, dt, out_events);
        settle_clocks(
            map_id,
            session,
            &standing,
            settings.retirement_threshold,
            dt,
            out_events,
        );
    }
}

fn spawn_loot(
    map_id: &MapId,
    map: &Map,
    session: &mut Session,
    policy: &mut dyn LootPolicy,
    rng: &mut ChaCha8Rng,
    dt: Duration,
    out_events: &mut Vec<Event>,
) {
    let looters = session.dogs.len();
    let requested = policy.generate(dt, session.loots.len(), looters);
    if requested > looters {
        // Policy contract violation; clamp rather than abort the tick.
        warn!(requested, looters, "spawn policy exceeded the looter bound");
    }

    let count = requested.min(looters);
    if count == 0 || map.loot_kinds().is_empty() || map.roads().is_empty() {
        return;
    }

    for _ in 0..count {
        let kind = rng.gen_range(0..map.loot_kinds().len());
        let position = random_position_on_roads(map, rng);
        let loot = session.add_loot(kind, position);
        debug!(map = map_id.as_str(), loot = loot.get(), kind, "loot spawned");
        out_events.push(Event::LootSpawned {
            map: map_id.clone(),
            loot,
            kind,
            position,
        });
    }
}

fn move_and_gather(
    map_id: &MapId,
    map: &Map,
    session: &mut Session,
    dt: Duration,
    out_events: &mut Vec<Event>,
) -> HashSet<DogId> {
    let mut items = Vec::with_capacity(session.loots.len() + map.offices().len());
    for (id, loot) in &session.loots {
        items.push(Item {
            position: loot.position,
            width: LOOT_WIDTH / 2.0,
            id: u64::from(id.get()) + 1,
        });
    }
    for office in map.offices() {
        items.push(Item {
            position: office.position().position(),
            width: OFFICE_WIDTH / 2.0,
            id: DEPOSIT_ID,
        });
    }

    let mut gatherers = Vec::with_capacity(session.dogs.len());
    let mut standing = HashSet::new();
    for (id, dog) in session.dogs.iter_mut() {
        let start = dog.position;
        let before = dog.velocity;
        let step = movement::resolve(map, dog.position, dog.velocity, dt);
        dog.position = step.position;
        dog.velocity = step.velocity;
        gatherers.push(Gatherer {
            start,
            end: step.position,
            width: DOG_WIDTH / 2.0,
            id: u64::from(id.get()),
        });

        // A dog stopped by a wall this tick had nonzero pre-move velocity
        // and must not count as idle.
        if before.is_zero() && step.velocity.is_zero() {
            let _ = standing.insert(*id);
        }
    }

    let mut taken: HashSet<u64> = HashSet::new();
    for event in find_gather_events(&items, &gatherers) {
        let Ok(dog_raw) = u32::try_from(event.gatherer) else {
            continue;
        };
        let dog_id = DogId::new(dog_raw);
        let Some(dog) = session.dogs.get_mut(&dog_id) else {
            continue;
        };

        if event.item == DEPOSIT_ID {
            if dog.bag.items().is_empty() {
                continue;
            }
            let points = dog
                .bag
                .items()
                .values()
                .map(|&kind| map.loot_value(kind))
                .sum::<u32>();
            dog.score = dog.score.saturating_add(points);
            dog.bag.clear();
            debug!(map = map_id.as_str(), dog = dog_id.get(), points, "bag deposited");
            out_events.push(Event::BagDeposited {
                map: map_id.clone(),
                dog: dog_id,
                points,
            });
        } else if !taken.contains(&event.item) {
            if dog.bag.is_full() {
                continue;
            }
            let Ok(loot_raw) = u32::try_from(event.item - 1) else {
                continue;
            };
            let loot_id = LootId::new(loot_raw);
            let Some(loot) = session.loots.remove(&loot_id) else {
                continue;
            };
            match dog.bag.add(loot_id.get(), loot.kind) {
                Ok(()) => {
                    let _ = taken.insert(event.item);
                    debug!(
                        map = map_id.as_str(),
                        dog = dog_id.get(),
                        loot = loot_id.get(),
                        "loot gathered"
                    );
                    out_events.push(Event::LootGathered {
                        map: map_id.clone(),
                        dog: dog_id,
                        loot: loot_id,
                    });
                }
                Err(error) => debug_assert!(false, "bag overflow despite is_full check: {error}"),
            }
        }
    }

    standing
}

fn settle_clocks(
    map_id: &MapId,
    session: &mut Session,
    standing: &HashSet<DogId>,
    retirement_threshold: Duration,
    dt: Duration,
    out_events: &mut Vec<Event>,
) {
    let ids: Vec<DogId> = session.dogs.keys().copied().collect();
    for id in ids {
        let Some(dog) = session.dogs.get_mut(&id) else {
            continue;
        };

        if standing.contains(&id) {
            dog.inactive_time = dog.inactive_time.saturating_add(dt);
        } else {
            dog.play_time = dog.play_time.saturating_add(dt);
            dog.inactive_time = Duration::ZERO;
        }

        if dog.inactive_time >= retirement_threshold {
            if let Some(dog) = session.dogs.remove(&id) {
                info!(
                    map = map_id.as_str(),
                    dog = id.get(),
                    name = dog.name.as_str(),
                    score = dog.score,
                    "dog retired"
                );
                out_events.push(Event::DogRetired {
                    map: map_id.clone(),
                    dog: id,
                    name: dog.name,
                    score: dog.score,
                    play_time: dog.play_time,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{self, BagRepr, DogRepr, LootRepr, SessionRepr, WorldRepr};
    use crate::{apply, query, Settings, World};
    use loot_hounds_core::{Command, Direction, LootKind, Map, Point, Position, Road, Velocity};
    use std::collections::{BTreeMap, VecDeque};

    #[derive(Debug)]
    struct Scripted(VecDeque<usize>);

    impl Scripted {
        fn of(counts: &[usize]) -> Box<Self> {
            Box::new(Self(counts.iter().copied().collect()))
        }
    }

    impl LootPolicy for Scripted {
        fn generate(&mut self, _: Duration, _: usize, _: usize) -> usize {
            self.0.pop_front().unwrap_or(0)
        }
    }

    fn town_map() -> Map {
        let mut map = Map::new(MapId::new("town"), "Town", vec![LootKind::new("key", 10)]);
        map.add_road(Road::horizontal(Point::new(0, 0), 10));
        map
    }

    fn settings(retirement_secs: u64) -> Settings {
        Settings::new(1.0, 3, Duration::from_secs(retirement_secs), false, 7)
    }

    fn town() -> MapId {
        MapId::new("town")
    }

    fn join(world: &mut World, name: &str) {
        let mut events = Vec::new();
        apply(
            world,
            Command::JoinGame {
                map: town(),
                name: name.to_owned(),
            },
            &mut events,
        );
    }

    fn steer(world: &mut World, dog: u32, direction: Option<Direction>) {
        let mut events = Vec::new();
        apply(
            world,
            Command::SetDogDirection {
                map: town(),
                dog: DogId::new(dog),
                direction,
            },
            &mut events,
        );
    }

    fn tick(world: &mut World, dt: Duration) -> Vec<Event> {
        let mut events = Vec::new();
        apply(world, Command::Tick { dt }, &mut events);
        events
    }

    fn dog_repr(id: u32, position: Position) -> DogRepr {
        DogRepr {
            id,
            name: format!("dog-{id}"),
            position,
            velocity: Velocity::zero(),
            direction: Direction::North,
            bag: BagRepr {
                capacity: 3,
                items: BTreeMap::new(),
            },
            score: 0,
            play_time_ms: 0,
            inactive_time_ms: 0,
        }
    }

    fn staged_world(map: Map, dogs: Vec<DogRepr>, loots: Vec<LootRepr>) -> World {
        let next_dog = dogs.iter().map(|dog| dog.id + 1).max().unwrap_or(0);
        let next_loot = loots.iter().map(|loot| loot.id + 1).max().unwrap_or(0);
        let mut world = World::new(vec![map], settings(60), Scripted::of(&[]));
        snapshot::restore(
            &mut world,
            WorldRepr {
                sessions: vec![SessionRepr {
                    map: town(),
                    next_dog,
                    next_loot,
                    dogs,
                    loots,
                }],
            },
        )
        .expect("staged snapshot restores");
        world
    }

    #[test]
    fn spawned_loot_is_clamped_to_the_looter_count() {
        let mut world = World::new(vec![town_map()], settings(60), Scripted::of(&[5]));
        join(&mut world, "Rex");
        join(&mut world, "Toto");

        let events = tick(&mut world, Duration::from_secs(1));

        let spawned = events
            .iter()
            .filter(|event| matches!(event, Event::LootSpawned { .. }))
            .count();
        assert_eq!(spawned, 2, "a misbehaving policy is clamped defensively");
        assert_eq!(query::loot_count(&world, &town()), 2);
    }

    #[test]
    fn empty_session_never_spawns() {
        let mut world = World::new(vec![town_map()], settings(60), Scripted::of(&[4, 4]));
        join(&mut world, "Rex");
        // Session exists but the dog retires out of it first.
        steer(&mut world, 0, Some(Direction::East));
        let _ = tick(&mut world, Duration::from_secs(1));

        let mut world_without_dogs = World::new(vec![town_map()], settings(60), Scripted::of(&[4]));
        let _ = tick(&mut world_without_dogs, Duration::from_secs(1));
        assert_eq!(query::loot_count(&world_without_dogs, &town()), 0);
    }

    #[test]
    fn crossing_dog_gathers_loot_on_its_path() {
        let mut world = staged_world(
            town_map(),
            vec![dog_repr(0, Position::new(0.0, 0.0))],
            vec![LootRepr {
                id: 0,
                kind: 0,
                position: Position::new(4.0, 0.0),
            }],
        );
        steer(&mut world, 0, Some(Direction::East));

        let events = tick(&mut world, Duration::from_secs(20));

        assert!(events.iter().any(|event| matches!(
            event,
            Event::LootGathered { dog, loot, .. }
                if *dog == DogId::new(0) && *loot == LootId::new(0)
        )));
        assert_eq!(query::loot_count(&world, &town()), 0);
        let dogs = query::dog_view(&world, &town()).into_vec();
        assert_eq!(dogs[0].bag_items, vec![(0, 0)]);
    }

    #[test]
    fn pickup_then_deposit_scores_the_bag_in_path_order() {
        let mut map = town_map();
        map.add_office(loot_hounds_core::Office::new(
            loot_hounds_core::OfficeId::new("o1"),
            Point::new(8, 0),
            loot_hounds_core::Offset::new(0, 0),
        ));
        let mut world = staged_world(
            map,
            vec![dog_repr(0, Position::new(0.0, 0.0))],
            vec![LootRepr {
                id: 0,
                kind: 0,
                position: Position::new(3.0, 0.0),
            }],
        );
        steer(&mut world, 0, Some(Direction::East));

        let events = tick(&mut world, Duration::from_secs(20));

        let gathered = events
            .iter()
            .position(|event| matches!(event, Event::LootGathered { .. }));
        let deposited = events
            .iter()
            .position(|event| matches!(event, Event::BagDeposited { points, .. } if *points == 10));
        assert!(gathered.is_some());
        assert!(deposited.is_some());
        assert!(gathered < deposited, "pickup precedes the office on the path");

        let dogs = query::dog_view(&world, &town()).into_vec();
        assert_eq!(dogs[0].score, 10);
        assert!(dogs[0].bag_items.is_empty());
    }

    #[test]
    fn empty_bag_deposits_nothing_on_a_second_pass() {
        let mut map = town_map();
        map.add_office(loot_hounds_core::Office::new(
            loot_hounds_core::OfficeId::new("o1"),
            Point::new(5, 0),
            loot_hounds_core::Offset::new(0, 0),
        ));
        let mut dog = dog_repr(0, Position::new(0.0, 0.0));
        dog.bag = BagRepr {
            capacity: 3,
            items: BTreeMap::from([(0, 0)]),
        };
        let mut world = staged_world(map, vec![dog], Vec::new());
        steer(&mut world, 0, Some(Direction::East));

        let events = tick(&mut world, Duration::from_secs(20));
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::BagDeposited { points, .. } if *points == 10)));

        steer(&mut world, 0, Some(Direction::West));
        let events = tick(&mut world, Duration::from_secs(20));
        assert!(
            !events
                .iter()
                .any(|event| matches!(event, Event::BagDeposited { .. })),
            "an empty bag deposits nothing"
        );
    }

    #[test]
    fn contested_loot_goes_to_the_gatherer_that_reaches_it_first() {
        let mut world = staged_world(
            town_map(),
            vec![
                dog_repr(0, Position::new(0.0, 0.0)),
                dog_repr(1, Position::new(1.0, 0.0)),
            ],
            vec![LootRepr {
                id: 0,
                kind: 0,
                position: Position::new(5.0, 0.0),
            }],
        );
        steer(&mut world, 0, Some(Direction::East));
        steer(&mut world, 1, Some(Direction::East));

        let events = tick(&mut world, Duration::from_secs(20));

        let winners: Vec<DogId> = events
            .iter()
            .filter_map(|event| match event {
                Event::LootGathered { dog, .. } => Some(*dog),
                _ => None,
            })
            .collect();
        // Dog 1 starts closer to the item, so its capture time along its own
        // segment is smaller and it wins the contested pickup.
        assert_eq!(winners, vec![DogId::new(1)]);

        let dogs = query::dog_view(&world, &town()).into_vec();
        assert!(dogs[0].bag_items.is_empty());
        assert_eq!(dogs[1].bag_items.len(), 1);
    }

    #[test]
    fn full_bag_leaves_loot_for_later_ticks() {
        let mut dog = dog_repr(0, Position::new(0.0, 0.0));
        dog.bag = BagRepr {
            capacity: 1,
            items: BTreeMap::from([(9, 0)]),
        };
        let mut world = staged_world(
            town_map(),
            vec![dog],
            vec![LootRepr {
                id: 0,
                kind: 0,
                position: Position::new(5.0, 0.0),
            }],
        );
        steer(&mut world, 0, Some(Direction::East));

        let events = tick(&mut world, Duration::from_secs(20));

        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::LootGathered { .. })));
        assert_eq!(query::loot_count(&world, &town()), 1);
    }

    #[test]
    fn standing_dog_accumulates_inactive_time_only() {
        let mut world = World::new(vec![town_map()], settings(60), Scripted::of(&[]));
        join(&mut world, "Rex");

        let _ = tick(&mut world, Duration::from_secs(25));

        let dogs = query::dog_view(&world, &town()).into_vec();
        assert_eq!(dogs[0].inactive_time, Duration::from_secs(25));
        assert_eq!(dogs[0].play_time, Duration::ZERO);
    }

    #[test]
    fn wall_stopped_dog_is_not_idle_that_tick() {
        let mut world = World::new(vec![town_map()], settings(60), Scripted::of(&[]));
        join(&mut world, "Rex");
        steer(&mut world, 0, Some(Direction::East));

        let _ = tick(&mut world, Duration::from_secs(30));

        let dogs = query::dog_view(&world, &town()).into_vec();
        assert!(dogs[0].velocity.is_zero(), "clamped by the road end");
        assert_eq!(dogs[0].inactive_time, Duration::ZERO);
        assert_eq!(dogs[0].play_time, Duration::from_secs(30));

        // From the next tick on the dog stands still and the idle clock runs.
        let _ = tick(&mut world, Duration::from_secs(5));
        let dogs = query::dog_view(&world, &town()).into_vec();
        assert_eq!(dogs[0].inactive_time, Duration::from_secs(5));
    }

    #[test]
    fn dog_idle_past_the_threshold_is_retired_exactly_once() {
        let mut world = World::new(vec![town_map()], settings(60), Scripted::of(&[]));
        join(&mut world, "Rex");

        let first = tick(&mut world, Duration::from_secs(30));
        assert!(!first
            .iter()
            .any(|event| matches!(event, Event::DogRetired { .. })));

        let second = tick(&mut world, Duration::from_secs(30));
        let retirements: Vec<&Event> = second
            .iter()
            .filter(|event| matches!(event, Event::DogRetired { .. }))
            .collect();
        assert_eq!(retirements.len(), 1);
        match retirements[0] {
            Event::DogRetired {
                dog,
                name,
                score,
                play_time,
                ..
            } => {
                assert_eq!(*dog, DogId::new(0));
                assert_eq!(name, "Rex");
                assert_eq!(*score, 0);
                assert_eq!(*play_time, Duration::ZERO);
            }
            _ => unreachable!(),
        }
        assert!(query::dog_view(&world, &town()).into_vec().is_empty());

        let third = tick(&mut world, Duration::from_secs(30));
        assert!(!third
            .iter()
            .any(|event| matches!(event, Event::DogRetired { .. })));
    }

    #[test]
    fn steering_resets_the_idle_clock() {
        let mut world = World::new(vec![town_map()], settings(60), Scripted::of(&[]));
        join(&mut world, "Rex");

        let _ = tick(&mut world, Duration::from_secs(59));
        steer(&mut world, 0, None);
        let _ = tick(&mut world, Duration::from_secs(2));

        let dogs = query::dog_view(&world, &town()).into_vec();
        assert_eq!(dogs.len(), 1, "the steering request postponed retirement");
        assert_eq!(dogs[0].inactive_time, Duration::from_secs(2));
    }
}
