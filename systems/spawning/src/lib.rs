#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Loot spawn policy deciding how many items appear per tick.
//!
//! The orchestrator only relies on the [`LootPolicy`] contract — the count
//! never exceeds the looter count and no time elapsed means no spawn — so
//! tests can substitute a scripted double. [`LootGenerator`] is the default
//! implementation: the longer a session goes without a spawn, the closer the
//! per-call yield creeps toward the current loot shortage.

use std::fmt;
use std::time::Duration;

/// Source of uniform draws in `[0, 1]` injected into the generator.
///
/// The default source always returns `1.0`, which makes the generator fully
/// deterministic: useful for tests and for servers that prefer a predictable
/// spawn rhythm.
pub type RandomSource = Box<dyn FnMut() -> f64 + Send>;

/// Policy deciding how much loot a session spawns after elapsed time.
pub trait LootPolicy: fmt::Debug + Send {
    /// Number of items to spawn after `delta` has elapsed, given the current
    /// item count and the number of potential looters.
    ///
    /// Implementations must never return more than `looter_count`, and must
    /// return zero when no time has accumulated.
    fn generate(&mut self, delta: Duration, loot_count: usize, looter_count: usize) -> usize;
}

/// Default spawn policy driven by elapsed time and a per-interval chance.
pub struct LootGenerator {
    base_interval: Duration,
    probability: f64,
    time_without_loot: Duration,
    random: RandomSource,
}

impl LootGenerator {
    /// Creates a generator with the deterministic default random source.
    #[must_use]
    pub fn new(base_interval: Duration, probability: f64) -> Self {
        Self::with_random_source(base_interval, probability, Box::new(|| 1.0))
    }

    /// Creates a generator drawing from the provided random source.
    #[must_use]
    pub fn with_random_source(
        base_interval: Duration,
        probability: f64,
        random: RandomSource,
    ) -> Self {
        Self {
            base_interval,
            probability,
            time_without_loot: Duration::ZERO,
            random,
        }
    }
}

impl LootPolicy for LootGenerator {
    fn generate(&mut self, delta: Duration, loot_count: usize, looter_count: usize) -> usize {
        if self.base_interval.is_zero() {
            return 0;
        }

        self.time_without_loot = self.time_without_loot.saturating_add(delta);

        let shortage = looter_count.saturating_sub(loot_count);
        let ratio = self.time_without_loot.as_secs_f64() / self.base_interval.as_secs_f64();
        let chance =
            ((1.0 - (1.0 - self.probability).powf(ratio)) * (self.random)()).clamp(0.0, 1.0);
        let generated = (shortage as f64 * chance).round() as usize;

        if generated > 0 {
            self.time_without_loot = Duration::ZERO;
        }
        generated
    }
}

impl fmt::Debug for LootGenerator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LootGenerator")
            .field("base_interval", &self.base_interval)
            .field("probability", &self.probability)
            .field("time_without_loot", &self.time_without_loot)
            .finish_non_exhaustive()
    }
}
