//! Property tests for the KeySet invariants of spec.md §8.
//!
//! Mirrors the teacher's `tests/storage/mvcc_invariants.rs` style: proptest
//! generates arbitrary input sequences and asserts invariants that must
//! hold "for all inputs", rather than a fixed example table.

use kdb_core::{Key, KeySet};
use proptest::prelude::*;

fn arb_name_part() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,4}"
}

fn arb_key_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set(arb_name_part(), 1..8)
        .prop_map(|set| set.into_iter().map(|p| format!("user:/{p}")).collect())
}

proptest! {
    /// Invariant 1 & 2: iteration order is the canonical order, independent
    /// of insertion order, and duplicates collapse to one entry.
    #[test]
    fn append_then_iterate_is_sorted_and_deduplicated(names in arb_key_names()) {
        let mut ks = KeySet::new();
        for name in &names {
            ks.append(Key::new(name).unwrap()).unwrap();
        }
        let collected: Vec<String> = ks.iter().map(|k| k.name().to_string()).collect();
        let mut expected: Vec<String> = names.clone();
        expected.sort();
        expected.dedup();
        prop_assert_eq!(collected, expected);
    }

    /// Invariant 2 restated: any permutation of the same key names produces
    /// the same final iteration order.
    #[test]
    fn permutation_invariance(names in arb_key_names(), seed in 0u64..1000) {
        let mut shuffled = names.clone();
        // deterministic pseudo-shuffle from the seed, no external RNG crate
        let len = shuffled.len();
        if len > 1 {
            for i in 0..len {
                let j = ((seed as usize).wrapping_add(i * 2654435761)) % len;
                shuffled.swap(i, j);
            }
        }
        let mut a = KeySet::new();
        for name in &names {
            a.append(Key::new(name).unwrap()).unwrap();
        }
        let mut b = KeySet::new();
        for name in &shuffled {
            b.append(Key::new(name).unwrap()).unwrap();
        }
        let a_names: Vec<String> = a.iter().map(|k| k.name().to_string()).collect();
        let b_names: Vec<String> = b.iter().map(|k| k.name().to_string()).collect();
        prop_assert_eq!(a_names, b_names);
    }

    /// Invariant 3: cut(S, p) unions back with the remainder to the
    /// original multiset, and both halves stay canonically ordered.
    #[test]
    fn cut_partitions_without_losing_keys(names in arb_key_names()) {
        let mut ks = KeySet::new();
        for name in &names {
            ks.append(Key::new(name).unwrap()).unwrap();
        }
        let total_before = ks.len();
        let prefix_name = names[0].clone();
        let prefix = Key::new(&prefix_name).unwrap();
        let cut = ks.cut(&prefix);

        let cut_sorted: Vec<String> = cut.iter().map(|k| k.name().to_string()).collect();
        let mut cut_expected = cut_sorted.clone();
        cut_expected.sort();
        prop_assert_eq!(&cut_sorted, &cut_expected);

        let rest_sorted: Vec<String> = ks.iter().map(|k| k.name().to_string()).collect();
        let mut rest_expected = rest_sorted.clone();
        rest_expected.sort();
        prop_assert_eq!(&rest_sorted, &rest_expected);

        prop_assert_eq!(cut.len() + ks.len(), total_before);
    }
}

/// S1 — permutation invariance, literal scenario from spec.md §8.
#[test]
fn s1_permutation_invariance_literal() {
    use itertools_like_permutations::permutations3;
    let names = ["user:/s/1", "user:/s/2", "user:/s/3"];
    for ordering in permutations3(names) {
        let mut ks = KeySet::new();
        for name in ordering {
            ks.append(Key::new(name).unwrap()).unwrap();
        }
        let got: Vec<String> = ks.iter().map(|k| k.name().to_string()).collect();
        assert_eq!(got, vec!["user:/s/1", "user:/s/2", "user:/s/3"]);
    }
}

/// S2 — cut returns the exact subtree, literal scenario from spec.md §8.
#[test]
fn s2_cut_returns_subtree_literal() {
    let mut ks = KeySet::new();
    for name in ["user:/a", "user:/a/b", "user:/a/b/c", "user:/d"] {
        ks.append(Key::new(name).unwrap()).unwrap();
    }
    let cut = ks.cut(&Key::new("user:/a").unwrap());
    let cut_names: Vec<String> = cut.iter().map(|k| k.name().to_string()).collect();
    assert_eq!(cut_names, vec!["user:/a", "user:/a/b", "user:/a/b/c"]);
    let remaining: Vec<String> = ks.iter().map(|k| k.name().to_string()).collect();
    assert_eq!(remaining, vec!["user:/d"]);
}

/// Small inline replacement for a permutations crate: there are exactly 6
/// orderings of 3 fixed elements and we only ever need that one arity, so a
/// tiny local helper keeps this test self-contained.
mod itertools_like_permutations {
    pub fn permutations3<T: Copy>(items: [T; 3]) -> Vec<[T; 3]> {
        let [a, b, c] = items;
        vec![
            [a, b, c],
            [a, c, b],
            [b, a, c],
            [b, c, a],
            [c, a, b],
            [c, b, a],
        ]
    }
}
