//! Property-based tests for core invariants: non-negative weight, monotonic
//! timestamps, Hebbian symmetry, hot/cold disjointness, and pinned-record
//! stability under arbitrary sequences of recall/distill/forget.

use std::collections::HashMap;

use proptest::prelude::*;
use synapse_core::config::EngineConfig;
use synapse_core::store::SynapseStore;

fn term_strategy() -> impl Strategy<Value = String> {
    "[a-z]{3,8}"
}

fn file_strategy() -> impl Strategy<Value = String> {
    (2000u32..2030, 1u32..13, 1u32..28).prop_map(|(y, m, d)| format!("{y:04}-{m:02}-{d:02}.md"))
}

proptest! {
    /// Every hot record's invariants hold after an arbitrary batch of
    /// observations, independent of term/file content.
    #[test]
    fn reinforce_on_observation_preserves_record_invariants(
        terms in proptest::collection::vec(term_strategy(), 1..20),
        file in file_strategy(),
    ) {
        let mut store = SynapseStore::default();
        for term in &terms {
            store.reinforce_on_observation(term, &file, false, 1.0);
        }
        for record in store.hot.values() {
            prop_assert!(record.satisfies_invariants());
        }
    }

    /// Hebbian links are always mirrored with equal strength, for any
    /// co-occurrence grouping.
    #[test]
    fn hebbian_links_always_symmetric(
        terms in proptest::collection::vec(term_strategy(), 2..10),
        file in file_strategy(),
    ) {
        let mut store = SynapseStore::default();
        let mut map = HashMap::new();
        map.insert(file, terms);
        store.build_hebbian_links(&map);

        for (key, record) in &store.hot {
            for (partner, strength) in &record.synapses {
                let mirrored = store.hot.get(partner).and_then(|p| p.synapses.get(key));
                prop_assert_eq!(mirrored, Some(strength));
            }
        }
    }

    /// After LTD, no key appears in both hot and cold, and every demoted
    /// concept's original_weight is non-negative.
    #[test]
    fn ltd_preserves_hot_cold_disjointness(
        terms in proptest::collection::vec(term_strategy(), 1..15),
        file in file_strategy(),
        decay_rate in 0.1f64..0.99,
    ) {
        let mut store = SynapseStore::default();
        for term in &terms {
            store.reinforce_on_observation(term, &file, false, 0.3);
        }
        let mut config = EngineConfig::default();
        config.ltd.decay_rate = decay_rate;
        store.apply_ltd(&config);

        for key in store.hot.keys() {
            prop_assert!(!store.cold.contains_key(key));
        }
        for latent in store.cold.values() {
            prop_assert!(latent.original_weight >= 0.0);
        }
    }

    /// Disjointness must also hold across a demote-then-reobserve cycle: a
    /// concept demoted to cold by LTD and then seen again in a later log
    /// must end up solely in hot, never duplicated into both stores.
    #[test]
    fn demoting_then_reobserving_preserves_disjointness(
        terms in proptest::collection::vec(term_strategy(), 1..15),
        file_a in file_strategy(),
        file_b in file_strategy(),
    ) {
        let mut store = SynapseStore::default();
        for term in &terms {
            store.reinforce_on_observation(term, &file_a, false, 0.3);
        }
        let mut config = EngineConfig::default();
        config.ltd.decay_rate = 0.1;
        config.ltd.forget_threshold = 0.5;
        store.apply_ltd(&config);

        for term in &terms {
            store.reinforce_on_observation(term, &file_b, false, 0.3);
        }

        for key in store.hot.keys() {
            prop_assert!(!store.cold.contains_key(key));
        }
        for key in store.cold.keys() {
            prop_assert!(!store.hot.contains_key(key));
        }
    }

    /// A pinned record's weight never drops below its value at pin time,
    /// regardless of how many LTD passes run afterward.
    #[test]
    fn pinned_weight_never_decreases_under_ltd(
        passes in 1usize..10,
        decay_rate in 0.1f64..0.99,
    ) {
        let mut store = SynapseStore::default();
        store.pin("always", "keep this");
        let pinned_weight = store.hot["always"].weight;

        let mut config = EngineConfig::default();
        config.ltd.decay_rate = decay_rate;
        for _ in 0..passes {
            store.apply_ltd(&config);
        }

        prop_assert!(store.hot.contains_key("always"));
        prop_assert!(store.hot["always"].weight >= pinned_weight);
        prop_assert!(store.hot["always"].pinned);
    }

    /// Recall reinforcement strictly increases weight and recall_count, and
    /// never touches first_seen, for any number of repeated recalls.
    #[test]
    fn recall_reinforcement_is_monotonic(
        recalls in 1usize..20,
    ) {
        let mut store = SynapseStore::default();
        store.reinforce_on_observation("memory", "a.md", false, 1.0);
        let first_seen = store.hot["memory"].first_seen;
        let mut last_weight = store.hot["memory"].weight;

        for i in 0..recalls {
            store.reinforce_on_recall("memory");
            let record = &store.hot["memory"];
            prop_assert!(record.weight > last_weight);
            prop_assert_eq!(record.recall_count, (i + 1) as u64);
            prop_assert_eq!(record.first_seen, first_seen);
            last_weight = record.weight;
        }
    }
}
