//! State-file persistence for the server harness.
//!
//! The file stores the world snapshot next to the player registry. A missing
//! file is a fresh start; a present but unreadable one aborts startup. Saves
//! go through a sibling temp file and a rename, so a crash mid-write leaves
//! the previous state intact.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use loot_hounds_core::{DogId, MapId};
use loot_hounds_world::{query, snapshot, World};
use serde::{Deserialize, Serialize};

use crate::players::{PlayerRef, PlayerRegistry};

/// On-disk form of one registry entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct PlayerRecord {
    token: String,
    map: MapId,
    dog: u32,
    name: String,
}

/// On-disk form of the whole server: world sessions plus the registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct ServerState {
    world: snapshot::WorldRepr,
    players: Vec<PlayerRecord>,
}

/// Reads the state file, or `None` when there is nothing to restore.
pub(crate) fn load(path: &Path) -> Result<Option<ServerState>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(error) => {
            return Err(error).with_context(|| format!("reading state file {}", path.display()))
        }
    };
    let state = serde_json::from_str(&text)
        .with_context(|| format!("parsing state file {}", path.display()))?;
    Ok(Some(state))
}

/// Writes the current world and registry to the state file.
pub(crate) fn save(path: &Path, world: &World, registry: &PlayerRegistry) -> Result<()> {
    let text =
        serde_json::to_string_pretty(&capture(world, registry)).context("serializing state")?;
    let temp = path.with_extension("tmp");
    fs::write(&temp, text).with_context(|| format!("writing state file {}", temp.display()))?;
    fs::rename(&temp, path)
        .with_context(|| format!("replacing state file {}", path.display()))?;
    Ok(())
}

fn capture(world: &World, registry: &PlayerRegistry) -> ServerState {
    ServerState {
        world: snapshot::capture(world),
        players: registry
            .entries()
            .map(|(token, player)| PlayerRecord {
                token: token.to_owned(),
                map: player.map.clone(),
                dog: player.dog.get(),
                name: player.name.clone(),
            })
            .collect(),
    }
}

/// Rebuilds the world's sessions and the registry from a loaded state.
///
/// The world snapshot resolves maps against the loaded registry; on top of
/// that, every player record must reference a dog that survived the restore.
pub(crate) fn restore(
    state: ServerState,
    world: &mut World,
    registry: &mut PlayerRegistry,
) -> Result<()> {
    snapshot::restore(world, state.world).context("restoring world snapshot")?;

    for record in state.players {
        let dog = DogId::new(record.dog);
        let known = query::dog_view(world, &record.map)
            .iter()
            .any(|snapshot| snapshot.id == dog);
        if !known {
            bail!(
                "state file references dog {} on map `{}`, which no longer resolves",
                record.dog,
                record.map.as_str()
            );
        }
        registry.register_with_token(
            record.token,
            PlayerRef {
                map: record.map,
                dog,
                name: record.name,
            },
        );
    }
    Ok(())
}
