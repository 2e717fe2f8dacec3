#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless server harness for Loot Hounds.
//!
//! Loads the JSON game configuration, optionally restores a saved state,
//! seeds dogs into sessions, and then drives the world with fixed-period
//! ticks. World events drained after each tick feed the leaderboard and the
//! player registry; the world itself never blocks on either.

mod config;
mod leaderboard;
mod players;
mod state;

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use loot_hounds_core::{Command, Direction, Event, MapId};
use loot_hounds_system_spawning::LootGenerator;
use loot_hounds_world::{apply, Settings, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::leaderboard::{Leaderboard, RetiredDog};
use crate::players::PlayerRegistry;

/// Simulated time per tick when no period is configured.
const DEFAULT_TICK_MS: u64 = 50;

#[derive(Debug, Parser)]
#[command(author, version, about = "Loot Hounds headless game server", long_about = None)]
struct Args {
    /// Path to the JSON game configuration.
    #[arg(short = 'c', long, value_name = "file")]
    config_file: PathBuf,

    /// Milliseconds of simulated and wall-clock time per tick; without it
    /// ticks advance by the default delta and run back-to-back.
    #[arg(short = 't', long, value_name = "milliseconds")]
    tick_period: Option<u64>,

    /// Number of ticks to run before exiting; 0 runs until interrupted.
    #[arg(long, default_value_t = 0)]
    ticks: u64,

    /// Seeds a dog into a session, formatted as `name@map`; repeatable.
    #[arg(long, value_name = "name@map")]
    join: Vec<String>,

    /// Steer every registered dog onto a fresh random heading this often,
    /// measured in ticks.
    #[arg(long, value_name = "ticks")]
    wander_period: Option<u64>,

    /// Spawn joining dogs at random road positions instead of the first
    /// road's start.
    #[arg(long, default_value_t = false)]
    randomize_spawn_points: bool,

    /// Path of the state file to restore at startup and save during the run.
    #[arg(short = 's', long, value_name = "file")]
    state_file: Option<PathBuf>,

    /// Save the state file every this many ticks; without it the state is
    /// saved only at exit.
    #[arg(short = 'p', long, value_name = "ticks")]
    save_state_period: Option<u64>,

    /// Seed for every random source; without it one is drawn from OS
    /// entropy.
    #[arg(long)]
    rng_seed: Option<u64>,
}

fn main() -> Result<()> {
    init_tracing();
    run(Args::parse())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn run(args: Args) -> Result<()> {
    let game = config::load(&args.config_file)
        .with_context(|| format!("loading config from {}", args.config_file.display()))?;
    let seed = args.rng_seed.unwrap_or_else(rand::random);
    info!(seed, maps = game.maps.len(), "configuration loaded");

    let mut policy_rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
    let policy = LootGenerator::with_random_source(
        game.loot_interval,
        game.loot_probability,
        Box::new(move || policy_rng.gen()),
    );
    let settings = Settings::new(
        game.default_dog_speed,
        game.default_bag_capacity,
        game.retirement_threshold,
        args.randomize_spawn_points,
        seed,
    );
    let mut world = World::new(game.maps, settings, Box::new(policy));
    let mut registry = PlayerRegistry::new(seed.wrapping_add(2));
    let mut leaderboard = Leaderboard::new();

    if let Some(path) = &args.state_file {
        if let Some(saved) = state::load(path)? {
            state::restore(saved, &mut world, &mut registry)
                .with_context(|| format!("restoring state file {}", path.display()))?;
            info!(file = %path.display(), "state restored");
        }
    }

    let mut events = Vec::new();
    for request in &args.join {
        join_dog(request, &mut world, &mut registry, &mut events)?;
    }
    drain(&mut events, &mut registry, &mut leaderboard);

    let dt = Duration::from_millis(args.tick_period.unwrap_or(DEFAULT_TICK_MS));
    let mut wander_rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(3));
    let mut tick = 0_u64;
    while args.ticks == 0 || tick < args.ticks {
        tick += 1;

        if let Some(period) = args.wander_period {
            if period > 0 && tick % period == 0 {
                wander(&mut world, &registry, &mut wander_rng, &mut events);
            }
        }

        apply(&mut world, Command::Tick { dt }, &mut events);
        drain(&mut events, &mut registry, &mut leaderboard);

        if let (Some(path), Some(period)) = (&args.state_file, args.save_state_period) {
            if period > 0 && tick % period == 0 {
                state::save(path, &world, &registry)?;
            }
        }

        if let Some(sleep_ms) = args.tick_period {
            thread::sleep(Duration::from_millis(sleep_ms));
        }
    }

    if let Some(path) = &args.state_file {
        state::save(path, &world, &registry)?;
        info!(file = %path.display(), "state saved");
    }
    report(&leaderboard)
}

fn join_dog(
    request: &str,
    world: &mut World,
    registry: &mut PlayerRegistry,
    events: &mut Vec<Event>,
) -> Result<()> {
    let (name, map) = request
        .split_once('@')
        .with_context(|| format!("join request `{request}` is not in name@map form"))?;

    apply(
        world,
        Command::JoinGame {
            map: MapId::new(map),
            name: name.to_owned(),
        },
        events,
    );

    match events.last() {
        Some(Event::DogJoined { map, dog, .. }) => {
            let token = registry.register(map.clone(), *dog, name.to_owned());
            info!(
                map = map.as_str(),
                dog = dog.get(),
                name,
                token = token.as_str(),
                "dog joined"
            );
            Ok(())
        }
        Some(Event::JoinRejected { reason, .. }) => bail!("join `{request}` rejected: {reason:?}"),
        other => bail!("join `{request}` produced no decision, saw {other:?}"),
    }
}

/// Applies leaderboard and registry side effects from the drained events.
fn drain(events: &mut Vec<Event>, registry: &mut PlayerRegistry, leaderboard: &mut Leaderboard) {
    for event in events.drain(..) {
        match event {
            Event::DogRetired {
                map,
                dog,
                name,
                score,
                play_time,
            } => {
                if let Some(token) = registry.token_for(&map, dog).map(str::to_owned) {
                    let _ = registry.remove(&token);
                }
                info!(
                    map = map.as_str(),
                    dog = dog.get(),
                    name = name.as_str(),
                    score,
                    "dog retired"
                );
                leaderboard.save(RetiredDog {
                    name,
                    score,
                    play_time,
                });
            }
            Event::BagDeposited { map, dog, points } => {
                info!(map = map.as_str(), dog = dog.get(), points, "bag deposited");
            }
            _ => {}
        }
    }
}

/// Points every registered dog in a random direction, or stops it.
fn wander(
    world: &mut World,
    registry: &PlayerRegistry,
    rng: &mut ChaCha8Rng,
    events: &mut Vec<Event>,
) {
    for token in registry.tokens() {
        let Some(player) = registry.player(&token) else {
            continue;
        };
        let direction = match rng.gen_range(0..5_u8) {
            0 => Some(Direction::North),
            1 => Some(Direction::South),
            2 => Some(Direction::East),
            3 => Some(Direction::West),
            _ => None,
        };
        apply(
            world,
            Command::SetDogDirection {
                map: player.map.clone(),
                dog: player.dog,
                direction,
            },
            events,
        );
    }
}

fn report(leaderboard: &Leaderboard) -> Result<()> {
    for (place, record) in leaderboard.records(0, 10)?.iter().enumerate() {
        info!(
            place = place + 1,
            name = record.name.as_str(),
            score = record.score,
            play_time_ms = u64::try_from(record.play_time.as_millis()).unwrap_or(u64::MAX),
            "final standings"
        );
    }
    Ok(())
}
