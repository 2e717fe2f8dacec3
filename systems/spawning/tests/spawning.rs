use std::time::Duration;

use loot_hounds_system_spawning::{LootGenerator, LootPolicy};

#[test]
fn fresh_generator_spawns_nothing_without_elapsed_time() {
    let mut generator = LootGenerator::new(Duration::from_secs(1), 1.0);
    assert_eq!(generator.generate(Duration::ZERO, 0, 5), 0);
    assert_eq!(generator.generate(Duration::ZERO, 3, 1), 0);
}

#[test]
fn yield_never_exceeds_the_looter_count() {
    let mut generator = LootGenerator::new(Duration::from_millis(100), 1.0);

    for looters in 0..6 {
        let generated = generator.generate(Duration::from_secs(30), 0, looters);
        assert!(generated <= looters, "{generated} > {looters}");
    }
}

#[test]
fn full_probability_fills_the_shortage_after_one_interval() {
    let mut generator = LootGenerator::new(Duration::from_secs(1), 1.0);
    assert_eq!(generator.generate(Duration::from_secs(1), 1, 4), 3);
}

#[test]
fn existing_loot_reduces_the_shortage_to_zero() {
    let mut generator = LootGenerator::new(Duration::from_secs(1), 1.0);
    assert_eq!(generator.generate(Duration::from_secs(5), 7, 3), 0);
}

#[test]
fn time_accumulates_across_calls_and_resets_on_spawn() {
    let mut generator = LootGenerator::new(Duration::from_secs(1), 0.5);

    let first = generator.generate(Duration::from_millis(500), 0, 1);
    assert_eq!(first, 0, "half an interval at p=0.5 rounds to nothing");

    let second = generator.generate(Duration::from_millis(500), 0, 1);
    assert_eq!(second, 1, "a full interval at p=0.5 rounds up to one");

    let third = generator.generate(Duration::ZERO, 0, 1);
    assert_eq!(third, 0, "the accumulator resets after a spawn");
}

#[test]
fn zero_random_draw_suppresses_spawning() {
    let mut generator = LootGenerator::with_random_source(
        Duration::from_secs(1),
        1.0,
        Box::new(|| 0.0),
    );
    assert_eq!(generator.generate(Duration::from_secs(60), 0, 8), 0);
}

#[test]
fn scripted_double_satisfies_the_policy_contract() {
    #[derive(Debug)]
    struct Scripted(usize);

    impl LootPolicy for Scripted {
        fn generate(&mut self, _: Duration, _: usize, _: usize) -> usize {
            self.0
        }
    }

    let mut policy: Box<dyn LootPolicy> = Box::new(Scripted(2));
    assert_eq!(policy.generate(Duration::from_secs(1), 0, 4), 2);
}
