// Copyright 2026 the Bramble Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Self-contained tree snapshots.
//!
//! A [`Snapshot`] is a deep copy of a (sub)tree: an owned recursive record of
//! heights, bounding rectangles, and either items or child snapshots. It
//! shares no storage with the live tree, so mutating the tree after taking a
//! snapshot never changes the snapshot, and adopting a snapshot never aliases
//! the source.
//!
//! With the `serde` feature enabled, snapshots (and [`Aabb`]) derive
//! `Serialize`/`Deserialize`, which makes them the crate's interchange
//! format.

use alloc::vec::Vec;

use crate::types::Aabb;

/// A deep-copied image of one tree node and everything below it.
///
/// Produced by [`RTree::to_snapshot`][crate::RTree::to_snapshot] and consumed
/// by [`RTree::from_snapshot`][crate::RTree::from_snapshot]. A snapshot is
/// trusted on adoption: the tree does not re-validate heights, bounding
/// rectangles, or branching factors, and a hand-built snapshot that violates
/// them yields a tree whose queries are unreliable (though still memory
/// safe).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot<T> {
    /// Height of this node; leaves have height 1.
    pub height: usize,
    /// Union of the rectangles of everything below this node.
    pub bbox: Aabb,
    /// The node's children: items for a leaf, snapshots otherwise.
    pub children: SnapshotChildren<T>,
}

/// Children of a [`Snapshot`] node.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SnapshotChildren<T> {
    /// Leaf children: the stored items themselves.
    Items(Vec<T>),
    /// Internal children: one snapshot per child node.
    Nodes(Vec<Snapshot<T>>),
}

impl<T> Snapshot<T> {
    /// Whether this snapshot node is a leaf.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.children, SnapshotChildren::Items(_))
    }

    /// Number of items stored below this node.
    pub fn item_count(&self) -> usize {
        match &self.children {
            SnapshotChildren::Items(items) => items.len(),
            SnapshotChildren::Nodes(nodes) => nodes.iter().map(Self::item_count).sum(),
        }
    }
}
