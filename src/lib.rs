// Copyright 2026 the Bramble Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --heading-base-level=0

//! Bramble: a dynamic 2D R-tree for axis-aligned rectangles.
//!
//! Bramble is a reusable building block for spatial queries over many
//! rectangles: map features, UI boxes, collision proxies, annotations.
//!
//! - Insert items one at a time, or bulk-[`load`][RTree::load] them into a
//!   tightly packed tree.
//! - Query by intersection rectangle with [`search`][RTree::search] (or the
//!   allocation-free [`visit_rect`][RTree::visit_rect]), and test existence
//!   with [`collides`][RTree::collides].
//! - Remove items again with [`remove`][RTree::remove]; emptied nodes are
//!   condensed away.
//! - Exchange whole trees as deep-copied [`Snapshot`]s.
//!
//! Items are any type implementing [`Bounded`], which maps an item to its
//! [`Aabb`]. The tree is an in-memory, single-writer structure: it performs
//! no I/O, holds no locks, and is `no_std` (`alloc` only).
//!
//! # Example
//!
//! ```rust
//! use bramble::{Aabb, Bounded, RTree};
//!
//! struct Town {
//!     name: &'static str,
//!     x: f64,
//!     y: f64,
//! }
//!
//! impl Bounded for Town {
//!     fn bbox(&self) -> Aabb {
//!         Aabb::new(self.x, self.y, self.x, self.y)
//!     }
//! }
//!
//! let mut index = RTree::default();
//! index.load([
//!     Town { name: "Ailsworth", x: 12.0, y: 4.5 },
//!     Town { name: "Barnwell", x: 3.5, y: 8.0 },
//!     Town { name: "Cotterstock", x: 11.0, y: 7.0 },
//!     Town { name: "Duddington", x: 1.0, y: 1.0 },
//! ]);
//!
//! let names: Vec<&str> = index
//!     .search(Aabb::new(10.0, 4.0, 13.0, 8.0))
//!     .iter()
//!     .map(|town| town.name)
//!     .collect();
//! assert_eq!(names.len(), 2);
//! assert!(names.contains(&"Ailsworth") && names.contains(&"Cotterstock"));
//! ```
//!
//! Plain rectangles implement [`Bounded`] themselves, so an `RTree<Aabb>`
//! needs no wrapper type.
//!
//! ## Incremental vs bulk loading
//!
//! [`insert`][RTree::insert] keeps the tree balanced with the usual R-tree
//! heuristics: the insertion path picks the child needing the least area
//! enlargement, and overflowing nodes are split along the axis with the
//! smallest total margin, at the index with the least overlap. Bulk
//! [`load`][RTree::load] instead packs items into tiles with partial
//! selection, which is both faster than repeated insertion and produces a
//! tree with less node overlap. The two compose: loading into a non-empty
//! tree merges the packed subtree at the right depth, and further inserts
//! keep working.
//!
//! ## Features
//!
//! - `serde`: derives `Serialize`/`Deserialize` for [`Aabb`], [`Snapshot`],
//!   and [`SnapshotChildren`], making snapshots the interchange format.
//!
//! ### Float semantics
//!
//! Coordinates are `f64` and must be finite; `±∞` is reserved for the empty
//! sentinel [`Aabb::EMPTY`] and NaN is unsupported. Debug builds assert
//! finiteness on insertion.

#![no_std]

extern crate alloc;

mod select;
mod snapshot;
mod split;
mod tree;
mod types;
mod util;

pub use snapshot::{Snapshot, SnapshotChildren};
pub use tree::RTree;
pub use types::{Aabb, Bounded};
