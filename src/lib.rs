//! # facetrie
//!
//! A reorderable multi-attribute radix trie: an in-memory, thread-safe
//! index from sets of (attribute key → attribute value) pairs to multisets
//! of record ids.
//!
//! Unlike a conventional trie, a path here is an *unordered* attribute
//! assignment: queries address attributes by key, never by position, so the
//! tree is free to lay shared attributes out near the root and deduplicate
//! subtrees. The [`reorder`] module exploits that freedom after the fact;
//! [`TrieConfig::node_order`] declares it up front.
//!
//! ## Example
//!
//! ```rust
//! use facetrie::{Path, Trie, Wildcard};
//!
//! let trie = Trie::new();
//! trie.insert(&Path::from_pairs([(1u32, "alice"), (2u32, "example.com")]), 100);
//! trie.insert(&Path::from_pairs([(2u32, "example.com")]), 101);
//!
//! // Everything at exactly {1: alice, 2: example.com}:
//! let mut hits = vec![];
//! trie.lookup_strict(
//!     &Path::from_pairs([(2u32, "example.com"), (1u32, "alice")]),
//!     |v| {
//!         hits.push(v);
//!         true
//!     },
//! );
//! assert_eq!(hits, vec![100]);
//!
//! // Capture attribute 1 wherever it appears under {2: example.com}:
//! trie.select_greedy(
//!     &Path::from_pairs([(2u32, "example.com")]),
//!     &Wildcard::new([1]),
//!     |wc, v| {
//!         println!("{v} with 1 = {:?}", wc.get(1));
//!         true
//!     },
//! );
//! ```
//!
//! ## Concurrency
//!
//! Parallel readers run alongside writers: lookups take only read locks,
//! and insertion probes read-only first, upgrading per leaf. There is no
//! global snapshot across nodes; callers needing one must serialise
//! externally. Iterator callbacks must not mutate the trie mid-iteration.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod heap;
pub mod insert;
pub mod leaf;
pub mod lookup;
pub mod node;
pub mod path;
pub mod payload;
pub mod reorder;
pub mod trie;
pub mod walk;

mod node_array;

#[cfg(test)]
mod proptests;

pub use heap::NodeHeap;
pub use insert::{IndexNodeFn, Inserter};
pub use leaf::Leaf;
pub use lookup::{LookupStrategy, Wildcard};
pub use node::Node;
pub use path::{Pair, Path, PathBuilder, MAX_PATH_SIZE};
pub use payload::{Payload, DEFAULT_ARRAY_CAPACITY, DEFAULT_BTREE_DEGREE};
pub use reorder::{compress, sift_up};
pub use trie::{Trie, TrieConfig};
pub use walk::{dig, walk, Inspector, ItemCounter, Visitor};
