//! Player registry mapping authentication tokens to dogs.
//!
//! The registry owns no dogs. Each entry holds a `(map, dog)` reference into
//! the world plus the display name, keyed by a 32-character lowercase hex
//! token drawn from a seeded generator.

use std::collections::BTreeMap;

use loot_hounds_core::{DogId, MapId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Reference a token resolves to; the world keeps ownership of the dog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PlayerRef {
    pub(crate) map: MapId,
    pub(crate) dog: DogId,
    pub(crate) name: String,
}

/// Token-keyed registry of every player known to this process.
#[derive(Debug)]
pub(crate) struct PlayerRegistry {
    players: BTreeMap<String, PlayerRef>,
    rng: ChaCha8Rng,
}

impl PlayerRegistry {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            players: BTreeMap::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Registers a freshly joined dog and returns its authentication token.
    pub(crate) fn register(&mut self, map: MapId, dog: DogId, name: String) -> String {
        let token = loop {
            let candidate = self.generate_token();
            if !self.players.contains_key(&candidate) {
                break candidate;
            }
        };
        let _ = self
            .players
            .insert(token.clone(), PlayerRef { map, dog, name });
        token
    }

    /// Re-registers a player under the token a previous run assigned.
    pub(crate) fn register_with_token(&mut self, token: String, player: PlayerRef) {
        let _ = self.players.insert(token, player);
    }

    /// Resolves a token to the player holding it.
    pub(crate) fn player(&self, token: &str) -> Option<&PlayerRef> {
        self.players.get(token)
    }

    /// Token held by the player steering the provided dog, if any.
    pub(crate) fn token_for(&self, map: &MapId, dog: DogId) -> Option<&str> {
        self.players
            .iter()
            .find(|(_, player)| player.map == *map && player.dog == dog)
            .map(|(token, _)| token.as_str())
    }

    /// Drops the player holding the provided token.
    pub(crate) fn remove(&mut self, token: &str) -> Option<PlayerRef> {
        self.players.remove(token)
    }

    /// Tokens currently registered, in stable order.
    pub(crate) fn tokens(&self) -> Vec<String> {
        self.players.keys().cloned().collect()
    }

    /// Every registry entry, in token order.
    pub(crate) fn entries(&self) -> impl Iterator<Item = (&str, &PlayerRef)> {
        self.players
            .iter()
            .map(|(token, player)| (token.as_str(), player))
    }

    fn generate_token(&mut self) -> String {
        let part1: u64 = self.rng.gen();
        let part2: u64 = self.rng.gen();
        format!("{part1:016x}{part2:016x}")
    }
}
