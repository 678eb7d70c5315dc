//! Model-based tests: random action sequences run against the trie and a
//! flat reference model side by side, with structural invariants checked
//! after every batch.

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;
use proptest_derive::Arbitrary;

use crate::leaf::Leaf;
use crate::path::Path;
use crate::trie::{Trie, TrieConfig};

const VALUES: [&str; 3] = ["a", "b", "c"];

/// A small random attribute set: keys 1..=5, values from a 3-letter pool.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct QPath(Vec<(u32, &'static str)>);

impl QPath {
    fn to_path(&self) -> Path {
        Path::from_pairs(self.0.iter().map(|&(k, v)| (k, v)))
    }
}

impl Arbitrary for QPath {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop::collection::vec((1u32..=5, prop::sample::select(&VALUES[..])), 0..4)
            .prop_map(|mut pairs| {
                pairs.sort_by_key(|&(k, _)| k);
                pairs.dedup_by_key(|&mut (k, _)| k);
                QPath(pairs)
            })
            .boxed()
    }
}

#[derive(Arbitrary, Debug, Clone)]
enum Action {
    Insert(QPath, u8),
    Delete(QPath, u8),
    LookupStrict(QPath),
    LookupGreedy(QPath),
}

/// Reference model: sorted attribute set → multiset of values.
#[derive(Default)]
struct Model {
    map: BTreeMap<QPath, Vec<u64>>,
}

impl Model {
    fn insert(&mut self, p: &QPath, v: u64) {
        self.map.entry(p.clone()).or_default().push(v);
    }

    fn delete(&mut self, p: &QPath, v: u64) -> bool {
        let Some(values) = self.map.get_mut(p) else {
            return false;
        };
        let Some(i) = values.iter().position(|&x| x == v) else {
            return false;
        };
        values.remove(i);
        if values.is_empty() {
            self.map.remove(p);
        }
        true
    }

    fn strict(&self, p: &QPath) -> Vec<u64> {
        let mut out = self.map.get(p).cloned().unwrap_or_default();
        out.sort_unstable();
        out
    }

    // Greedy delivery: every record whose attribute set, restricted to the
    // query's keys, agrees with the query.
    fn greedy(&self, q: &QPath) -> Vec<u64> {
        let mut out = Vec::new();
        for (path, values) in &self.map {
            let agrees = path.0.iter().all(|&(k, v)| {
                match q.0.iter().find(|&&(qk, _)| qk == k) {
                    None => true,
                    Some(&(_, qv)) => qv == v,
                }
            });
            if agrees {
                out.extend_from_slice(values);
            }
        }
        out.sort_unstable();
        out
    }
}

struct Harness {
    trie: Trie,
    model: Model,
}

impl Harness {
    fn new(node_order: Vec<u32>) -> Self {
        Harness {
            trie: Trie::with_config(TrieConfig {
                node_order,
                // Small capacity so promotions happen inside short runs.
                payload_array_capacity: 3,
                btree_degree: 2,
            }),
            model: Model::default(),
        }
    }

    fn strict(&self, p: &QPath) -> Vec<u64> {
        let mut out = Vec::new();
        self.trie.lookup_strict(&p.to_path(), |v| {
            out.push(v);
            true
        });
        out.sort_unstable();
        out
    }

    fn greedy(&self, p: &QPath) -> Vec<u64> {
        let mut out = Vec::new();
        self.trie.lookup_greedy(&p.to_path(), |v| {
            out.push(v);
            true
        });
        out.sort_unstable();
        out
    }

    fn execute(&mut self, action: Action) {
        match action {
            Action::Insert(p, v) => {
                self.trie.insert(&p.to_path(), v as u64);
                self.model.insert(&p, v as u64);
            }
            Action::Delete(p, v) => {
                let got = self.trie.delete(&p.to_path(), v as u64);
                let want = self.model.delete(&p, v as u64);
                assert_eq!(got, want, "delete {p:?} {v}");
            }
            Action::LookupStrict(p) => {
                assert_eq!(self.strict(&p), self.model.strict(&p), "strict {p:?}");
            }
            Action::LookupGreedy(p) => {
                assert_eq!(self.greedy(&p), self.model.greedy(&p), "greedy {p:?}");
            }
        }
    }

    // Structural invariants: forward/backward references agree, child keys
    // are strictly sorted, node values index the leaves they map to, and no
    // prunable leaf survives outside the root.
    fn check_invariants(&self) {
        fn check(leaf: &Arc<Leaf>, is_root: bool) {
            assert!(
                is_root || !leaf.empty(),
                "empty leaf left behind below the root"
            );
            let children = {
                let mut out = Vec::new();
                leaf.ascend_children(&mut |n| {
                    out.push(Arc::clone(n));
                    true
                });
                out
            };
            let mut prev_key = None;
            for node in children {
                if let Some(p) = prev_key {
                    assert!(node.key() > p, "child keys out of order");
                }
                prev_key = Some(node.key());
                let back = node.parent().expect("attached node has a parent");
                assert!(Arc::ptr_eq(&back, leaf), "node back-reference broken");
                node.ascend_leaves(&mut |value, child| {
                    assert_eq!(child.value(), value, "leaf indexed under wrong value");
                    let back = child.parent().expect("attached leaf has a parent");
                    assert!(Arc::ptr_eq(&back, &node), "leaf back-reference broken");
                    true
                });
                for (_, child) in node.snapshot_leaves() {
                    check(&child, false);
                }
            }
        }
        check(self.trie.root(), true);
    }

    fn check_against_model(&self) {
        for (p, _) in self.model.map.iter() {
            assert_eq!(self.strict(p), self.model.strict(p), "final strict {p:?}");
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn trie_matches_model(
        node_order in prop::sample::subsequence(vec![1u32, 2, 3, 4, 5], 0..=3),
        actions in prop::collection::vec(any::<Action>(), 1..64),
    ) {
        let mut h = Harness::new(node_order);
        for action in actions {
            h.execute(action);
        }
        h.check_invariants();
        h.check_against_model();
    }

    #[test]
    fn query_order_never_matters(
        p in any::<QPath>(),
        v in any::<u8>(),
    ) {
        let h = {
            let mut h = Harness::new(vec![]);
            h.execute(Action::Insert(p.clone(), v));
            h
        };
        // Feed the same pairs in reversed order; the sorted Path and the
        // key-addressed traversal make the permutation invisible.
        let mut reversed = p.0.clone();
        reversed.reverse();
        let q = Path::from_pairs(reversed.iter().map(|&(k, val)| (k, val)));
        let mut out = Vec::new();
        h.trie.lookup_strict(&q, |x| { out.push(x); true });
        prop_assert_eq!(out, vec![v as u64]);
    }
}
