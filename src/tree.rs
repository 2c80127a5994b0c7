// Copyright 2026 the Bramble Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree core: storage, insertion, bulk loading, queries, and removal.

use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;
use core::mem;

use smallvec::SmallVec;

use crate::select::multi_select;
use crate::snapshot::{Snapshot, SnapshotChildren};
use crate::split::plan_split;
use crate::types::{Aabb, Bounded};
use crate::util::{ilog_ceil, isqrt_ceil};

/// Branching cap used by [`RTree::default`].
const DEFAULT_MAX_ENTRIES: usize = 9;

/// Per-operation stack of node slots, bounded by the tree height.
type Path = SmallVec<[usize; 8]>;

/// A dynamic 2D R-tree over items with axis-aligned bounding rectangles.
///
/// The tree supports incremental [`insert`][Self::insert], packed bulk
/// [`load`][Self::load], intersection [`search`][Self::search], existence
/// testing with [`collides`][Self::collides], and [`remove`][Self::remove]
/// with path condensation. Items are any type implementing [`Bounded`]; the
/// tree holds them by value and hands out references during queries.
///
/// Nodes live in a slot arena owned by the tree; child links are slot ids.
/// Every node caches the union of its children's rectangles, so queries
/// prune whole subtrees with one rectangle test.
///
/// ```rust
/// use bramble::{Aabb, RTree};
///
/// let mut tree = RTree::default();
/// tree.insert(Aabb::new(0.0, 0.0, 10.0, 10.0));
/// tree.insert(Aabb::new(20.0, 20.0, 30.0, 30.0));
///
/// assert_eq!(tree.search(Aabb::new(5.0, 5.0, 15.0, 15.0)).len(), 1);
/// assert!(tree.collides(Aabb::new(25.0, 25.0, 26.0, 26.0)));
/// ```
pub struct RTree<T> {
    nodes: Vec<Node<T>>,
    free: Vec<usize>,
    root: usize,
    max_entries: usize,
    min_entries: usize,
    len: usize,
}

struct Node<T> {
    bbox: Aabb,
    height: usize,
    children: Children<T>,
}

/// A node holds either items (leaf, height 1) or child node slots.
enum Children<T> {
    Items(Vec<T>),
    Nodes(Vec<usize>),
}

/// What `insert_entry` places: a fresh item or an existing subtree.
enum Entry<T> {
    Item(T),
    Node(usize),
}

impl<T> Node<T> {
    /// An empty leaf, also used as the placeholder in released slots.
    fn detached() -> Self {
        Self {
            bbox: Aabb::EMPTY,
            height: 1,
            children: Children::Items(Vec::new()),
        }
    }
}

impl<T: Bounded> RTree<T> {
    /// Create an empty tree.
    ///
    /// `max_entries` is the branching cap per node; values below 4 are
    /// raised to 4. The minimum fill of a non-root node is
    /// `max(2, ⌈0.4 · max_entries⌉)`.
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.max(4);
        let min_entries = (max_entries * 2).div_ceil(5).max(2);
        let mut tree = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: 0,
            max_entries,
            min_entries,
            len: 0,
        };
        tree.root = tree.alloc_node(Node::detached());
        tree
    }

    /// Number of items in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the tree; an empty tree has height 1.
    #[inline]
    pub fn height(&self) -> usize {
        self.nodes[self.root].height
    }

    /// Bounding rectangle of the whole tree.
    ///
    /// An empty tree reports [`Aabb::EMPTY`].
    #[inline]
    pub fn envelope(&self) -> Aabb {
        self.nodes[self.root].bbox
    }

    /// Insert one item.
    pub fn insert(&mut self, item: T) {
        debug_assert!(item.bbox().is_finite(), "item bounds must be finite");
        let level = self.nodes[self.root].height - 1;
        self.insert_entry(Entry::Item(item), level);
        self.len += 1;
    }

    /// Insert many items at once.
    ///
    /// Below `min_entries` items this falls back to one-by-one insertion.
    /// Otherwise the items are packed into a balanced subtree bottom-up
    /// (sorted into x-stripes, then y-tiles, recursively) and the subtree is
    /// merged with the existing tree. Bulk loading produces a tree with much
    /// less node overlap than the same items inserted individually.
    pub fn load<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        let items: Vec<T> = items.into_iter().collect();
        debug_assert!(
            items.iter().all(|item| item.bbox().is_finite()),
            "item bounds must be finite"
        );
        if items.is_empty() {
            return;
        }
        if items.len() < self.min_entries {
            for item in items {
                self.insert(item);
            }
            return;
        }

        self.len += items.len();
        let built = self.build_tree(items);
        let root = self.root;

        if self.children_len(root) == 0 {
            // The tree was empty: adopt the built subtree outright.
            self.release(root);
            self.root = built;
        } else if self.nodes[root].height == self.nodes[built].height {
            self.split_root(root, built);
        } else {
            // The taller of the two becomes the root; the shorter is
            // inserted into it at the depth where heights line up.
            let (tall, short) = if self.nodes[root].height >= self.nodes[built].height {
                (root, built)
            } else {
                (built, root)
            };
            self.root = tall;
            let level = self.nodes[tall].height - self.nodes[short].height - 1;
            self.insert_entry(Entry::Node(short), level);
        }
    }

    /// Collect references to every item whose rectangle intersects `query`.
    ///
    /// Intervals are closed: touching edges count as intersection. The
    /// result order is unspecified.
    pub fn search(&self, query: Aabb) -> Vec<&T> {
        let mut out = Vec::new();
        self.visit_rect(query, |item| out.push(item));
        out
    }

    /// Visit every item whose rectangle intersects `query` without
    /// allocating result storage. [`search`][Self::search] collects this.
    pub fn visit_rect<'a, F>(&'a self, query: Aabb, mut f: F)
    where
        F: FnMut(&'a T),
    {
        if !query.intersects(&self.nodes[self.root].bbox) {
            return;
        }
        let mut stack: Vec<usize> = vec![self.root];
        while let Some(id) = stack.pop() {
            match &self.nodes[id].children {
                Children::Items(items) => {
                    for item in items {
                        if query.intersects(&item.bbox()) {
                            f(item);
                        }
                    }
                }
                Children::Nodes(ids) => {
                    for &child in ids {
                        let child_bbox = &self.nodes[child].bbox;
                        if query.intersects(child_bbox) {
                            if query.contains(child_bbox) {
                                // Fully covered subtree: every item below
                                // intersects, skip the per-item tests.
                                self.collect_all(child, &mut f);
                            } else {
                                stack.push(child);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Whether any item's rectangle intersects `query`.
    ///
    /// Stops at the first hit; a subtree whose bounds are fully covered by
    /// `query` answers without being traversed.
    pub fn collides(&self, query: Aabb) -> bool {
        if !query.intersects(&self.nodes[self.root].bbox) {
            return false;
        }
        let mut stack: Vec<usize> = vec![self.root];
        while let Some(id) = stack.pop() {
            match &self.nodes[id].children {
                Children::Items(items) => {
                    if items.iter().any(|item| query.intersects(&item.bbox())) {
                        return true;
                    }
                }
                Children::Nodes(ids) => {
                    for &child in ids {
                        let child_bbox = &self.nodes[child].bbox;
                        if query.intersects(child_bbox) {
                            if query.contains(child_bbox) {
                                return true;
                            }
                            stack.push(child);
                        }
                    }
                }
            }
        }
        false
    }

    /// Collect references to every item, in unspecified order.
    pub fn all(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_all(self.root, &mut |item| out.push(item));
        out
    }

    /// Remove one item equal to `item`, returning it.
    ///
    /// Removes the first occurrence found; duplicates stay. Returns `None`
    /// (and leaves the tree untouched) if no occurrence exists.
    pub fn remove(&mut self, item: &T) -> Option<T>
    where
        T: PartialEq,
    {
        self.remove_with(item, |candidate, item| candidate == item)
    }

    /// Remove one item matching `item` under a caller-supplied equality
    /// predicate, returning it.
    ///
    /// The predicate receives a stored candidate first and `item` second.
    /// The descent is guided by `item.bbox()`, so the predicate only ever
    /// sees candidates from leaves whose ancestors all contain that
    /// rectangle.
    pub fn remove_with<F>(&mut self, item: &T, eq: F) -> Option<T>
    where
        F: Fn(&T, &T) -> bool,
    {
        let bbox = item.bbox();
        let mut node = Some(self.root);
        let mut parent: Option<usize> = None;
        let mut child_index = 0;
        let mut going_up = false;
        let mut path = Path::new();
        let mut indexes: SmallVec<[usize; 8]> = SmallVec::new();

        loop {
            let current = match node {
                Some(id) => id,
                None => {
                    // Subtree exhausted: resume at the parent's next child.
                    let Some(finished) = path.pop() else { break };
                    parent = path.last().copied();
                    child_index = indexes.pop().expect("path and index stacks out of sync");
                    going_up = true;
                    finished
                }
            };

            if let Children::Items(items) = &mut self.nodes[current].children {
                if let Some(at) = items.iter().position(|candidate| eq(candidate, item)) {
                    let removed = items.remove(at);
                    self.len -= 1;
                    path.push(current);
                    self.condense(&path);
                    return Some(removed);
                }
            }

            let descend = !going_up
                && matches!(self.nodes[current].children, Children::Nodes(_))
                && self.nodes[current].bbox.contains(&bbox);

            if descend {
                path.push(current);
                indexes.push(child_index);
                child_index = 0;
                parent = Some(current);
                let Children::Nodes(ids) = &self.nodes[current].children else {
                    unreachable!("descend target must be an internal node");
                };
                node = ids.first().copied();
            } else if let Some(p) = parent {
                child_index += 1;
                let Children::Nodes(siblings) = &self.nodes[p].children else {
                    unreachable!("removal path parent must be an internal node");
                };
                node = siblings.get(child_index).copied();
                going_up = false;
            } else {
                node = None;
            }
        }
        None
    }

    /// Drop every item and reset to an empty tree of height 1.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.len = 0;
        self.root = self.alloc_node(Node::detached());
    }

    /// Deep-copy the tree into a self-contained [`Snapshot`].
    ///
    /// Later mutation of the tree does not affect the snapshot.
    pub fn to_snapshot(&self) -> Snapshot<T>
    where
        T: Clone,
    {
        self.export(self.root)
    }

    /// Build a tree that adopts `snapshot` as its root.
    ///
    /// The snapshot is trusted: heights, bounding rectangles, and branching
    /// factors are not re-validated. Feed back only snapshots produced by
    /// [`to_snapshot`][Self::to_snapshot] or built to the same rules.
    pub fn from_snapshot(max_entries: usize, snapshot: Snapshot<T>) -> Self {
        let mut tree = Self::new(max_entries);
        tree.nodes.clear();
        tree.free.clear();
        tree.root = tree.import(snapshot);
        tree
    }

    // --- insertion path ---

    fn insert_entry(&mut self, entry: Entry<T>, level: usize) {
        let bbox = match &entry {
            Entry::Item(item) => item.bbox(),
            Entry::Node(id) => self.nodes[*id].bbox,
        };

        let mut path = Path::new();
        let target = self.choose_subtree(&bbox, level, &mut path);

        match (entry, &mut self.nodes[target].children) {
            (Entry::Item(item), Children::Items(items)) => items.push(item),
            (Entry::Node(id), Children::Nodes(ids)) => ids.push(id),
            _ => unreachable!("insertion target does not match the entry kind"),
        }
        self.nodes[target].bbox.extend(&bbox);

        // Split upward while nodes overflow, then widen the remaining
        // ancestors (splitting recomputes bounds, so split levels need no
        // widening).
        let mut level = level;
        let grown_to = loop {
            if self.children_len(path[level]) <= self.max_entries {
                break Some(level);
            }
            self.split(&path, level);
            if level == 0 {
                break None;
            }
            level -= 1;
        };

        if let Some(top) = grown_to {
            for &ancestor in &path[..=top] {
                self.nodes[ancestor].bbox.extend(&bbox);
            }
        }
    }

    /// Descend from the root to the node at `level` (or the first leaf)
    /// best suited to take `bbox`, recording the walk in `path`.
    ///
    /// At each step the child needing the least area enlargement wins; ties
    /// go to the child with the smaller area, first match winning.
    fn choose_subtree(&self, bbox: &Aabb, level: usize, path: &mut Path) -> usize {
        let mut node = self.root;
        loop {
            path.push(node);
            let ids = match &self.nodes[node].children {
                Children::Items(_) => break,
                Children::Nodes(ids) => {
                    if path.len() - 1 == level {
                        break;
                    }
                    ids
                }
            };

            let mut best = None;
            let mut min_enlargement = f64::INFINITY;
            let mut min_area = f64::INFINITY;
            for &child in ids {
                let area = self.nodes[child].bbox.area();
                let enlargement = bbox.enlarged_area(&self.nodes[child].bbox) - area;
                if enlargement < min_enlargement {
                    min_enlargement = enlargement;
                    min_area = min_area.min(area);
                    best = Some(child);
                } else if enlargement == min_enlargement && area < min_area {
                    min_area = area;
                    best = Some(child);
                }
            }
            node = best.unwrap_or(ids[0]);
        }
        node
    }

    // --- splitting ---

    /// Split the overflowing node at `path[level]`, attaching the new
    /// sibling to the parent or growing a new root.
    fn split(&mut self, path: &[usize], level: usize) {
        let id = path[level];
        let min_entries = self.min_entries;
        let height = self.nodes[id].height;

        let taken = mem::replace(&mut self.nodes[id].children, Children::Items(Vec::new()));
        let (kept, spilled) = match taken {
            Children::Items(mut items) => {
                let at = plan_split(&mut items, min_entries, |item: &T| item.bbox());
                let spill = items.split_off(at);
                (Children::Items(items), Children::Items(spill))
            }
            Children::Nodes(mut ids) => {
                let nodes = &self.nodes;
                let at = plan_split(&mut ids, min_entries, |child: &usize| nodes[*child].bbox);
                let spill = ids.split_off(at);
                (Children::Nodes(ids), Children::Nodes(spill))
            }
        };
        self.nodes[id].children = kept;

        let sibling = self.alloc_node(Node {
            bbox: Aabb::EMPTY,
            height,
            children: spilled,
        });
        self.calc_bbox(id);
        self.calc_bbox(sibling);

        if level > 0 {
            let parent = path[level - 1];
            let Children::Nodes(ids) = &mut self.nodes[parent].children else {
                unreachable!("split parent must be an internal node");
            };
            ids.push(sibling);
        } else {
            self.split_root(id, sibling);
        }
    }

    /// Replace the root with a new internal node over `first` and `second`.
    fn split_root(&mut self, first: usize, second: usize) {
        let height = self.nodes[first].height + 1;
        let root = self.alloc_node(Node {
            bbox: Aabb::EMPTY,
            height,
            children: Children::Nodes(vec![first, second]),
        });
        self.calc_bbox(root);
        self.root = root;
    }

    // --- bulk build ---

    fn build_tree(&mut self, items: Vec<T>) -> usize {
        let count = items.len();
        if count <= self.max_entries {
            return self.build_node(items, 1, self.max_entries);
        }
        let height = ilog_ceil(count, self.max_entries);
        let root_fanout = count.div_ceil(self.max_entries.pow(height as u32 - 1));
        self.build_node(items, height, root_fanout)
    }

    /// Pack `items` into a balanced subtree of the given height, with at
    /// most `fanout` children on this node.
    fn build_node(&mut self, mut items: Vec<T>, height: usize, fanout: usize) -> usize {
        if items.len() <= self.max_entries {
            let mut bbox = Aabb::EMPTY;
            for item in &items {
                bbox.extend(&item.bbox());
            }
            return self.alloc_node(Node {
                bbox,
                height: 1,
                children: Children::Items(items),
            });
        }

        // Tile the items: contiguous x-stripes, each cut into y-tiles that
        // become the child subtrees. Partial selection establishes the tile
        // boundaries without sorting inside them.
        let per_tile = items.len().div_ceil(fanout);
        let per_stripe = per_tile * isqrt_ceil(fanout);

        multi_select(&mut items, per_stripe, &compare_min_x);

        let mut children = Vec::new();
        for mut stripe in chunks(items, per_stripe) {
            multi_select(&mut stripe, per_tile, &compare_min_y);
            for tile in chunks(stripe, per_tile) {
                children.push(self.build_node(tile, height - 1, self.max_entries));
            }
        }

        let id = self.alloc_node(Node {
            bbox: Aabb::EMPTY,
            height,
            children: Children::Nodes(children),
        });
        self.calc_bbox(id);
        id
    }

    // --- removal support ---

    /// Walk the removal path from leaf to root, detaching emptied nodes and
    /// refreshing the bounds of the rest.
    fn condense(&mut self, path: &[usize]) {
        for position in (0..path.len()).rev() {
            let id = path[position];
            if self.children_len(id) == 0 {
                if position > 0 {
                    let parent = path[position - 1];
                    let Children::Nodes(ids) = &mut self.nodes[parent].children else {
                        unreachable!("condense parent must be an internal node");
                    };
                    if let Some(at) = ids.iter().position(|&child| child == id) {
                        ids.remove(at);
                    }
                    self.release(id);
                } else {
                    self.clear();
                }
            } else {
                self.calc_bbox(id);
            }
        }
    }

    // --- traversal and snapshots ---

    /// Feed every item under `start` to `f`, depth first.
    fn collect_all<'a, F>(&'a self, start: usize, f: &mut F)
    where
        F: FnMut(&'a T),
    {
        let mut stack: Vec<usize> = vec![start];
        while let Some(id) = stack.pop() {
            match &self.nodes[id].children {
                Children::Items(items) => {
                    for item in items {
                        f(item);
                    }
                }
                Children::Nodes(ids) => stack.extend_from_slice(ids),
            }
        }
    }

    fn export(&self, id: usize) -> Snapshot<T>
    where
        T: Clone,
    {
        let node = &self.nodes[id];
        let children = match &node.children {
            Children::Items(items) => SnapshotChildren::Items(items.clone()),
            Children::Nodes(ids) => {
                SnapshotChildren::Nodes(ids.iter().map(|&child| self.export(child)).collect())
            }
        };
        Snapshot {
            height: node.height,
            bbox: node.bbox,
            children,
        }
    }

    fn import(&mut self, snapshot: Snapshot<T>) -> usize {
        let Snapshot {
            height,
            bbox,
            children,
        } = snapshot;
        let children = match children {
            SnapshotChildren::Items(items) => {
                self.len += items.len();
                Children::Items(items)
            }
            SnapshotChildren::Nodes(nodes) => Children::Nodes(
                nodes
                    .into_iter()
                    .map(|child| self.import(child))
                    .collect(),
            ),
        };
        self.alloc_node(Node {
            bbox,
            height,
            children,
        })
    }

    // --- arena ---

    fn alloc_node(&mut self, node: Node<T>) -> usize {
        if let Some(slot) = self.free.pop() {
            self.nodes[slot] = node;
            slot
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    fn release(&mut self, id: usize) {
        self.nodes[id] = Node::detached();
        self.free.push(id);
    }

    fn children_len(&self, id: usize) -> usize {
        match &self.nodes[id].children {
            Children::Items(items) => items.len(),
            Children::Nodes(ids) => ids.len(),
        }
    }

    /// Recompute a node's bounds from scratch as the union of its children.
    fn calc_bbox(&mut self, id: usize) {
        let bbox = match &self.nodes[id].children {
            Children::Items(items) => {
                let mut bbox = Aabb::EMPTY;
                for item in items {
                    bbox.extend(&item.bbox());
                }
                bbox
            }
            Children::Nodes(ids) => {
                let mut bbox = Aabb::EMPTY;
                for &child in ids {
                    bbox.extend(&self.nodes[child].bbox);
                }
                bbox
            }
        };
        self.nodes[id].bbox = bbox;
    }
}

impl<T: Bounded> Default for RTree<T> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl<T> fmt::Debug for RTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTree")
            .field("len", &self.len)
            .field("height", &self.nodes[self.root].height)
            .field("max_entries", &self.max_entries)
            .field("min_entries", &self.min_entries)
            .field("nodes_total", &self.nodes.len())
            .field("nodes_free", &self.free.len())
            .finish_non_exhaustive()
    }
}

fn compare_min_x<T: Bounded>(a: &T, b: &T) -> Ordering {
    a.bbox().min_x.total_cmp(&b.bbox().min_x)
}

fn compare_min_y<T: Bounded>(a: &T, b: &T) -> Ordering {
    a.bbox().min_y.total_cmp(&b.bbox().min_y)
}

/// Cut an owned vector into consecutive chunks of `size` elements; the last
/// chunk may be shorter.
fn chunks<T>(mut items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    debug_assert!(size > 0, "chunk size must be positive");
    let mut out = Vec::with_capacity(items.len().div_ceil(size));
    while items.len() > size {
        let rest = items.split_off(size);
        out.push(mem::replace(&mut items, rest));
    }
    out.push(items);
    out
}

#[cfg(test)]
mod tests {
    use super::{Children, RTree};
    use crate::snapshot::{Snapshot, SnapshotChildren};
    use crate::types::{Aabb, Bounded};
    use alloc::vec;
    use alloc::vec::Vec;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    impl<T: Bounded> RTree<T> {
        /// Recompute everything the tree caches and compare. `check_fill`
        /// additionally asserts the minimum fill, which removals are allowed
        /// to violate.
        fn assert_invariants(&self, check_fill: bool) {
            let (height, _, count) = self.check_node(self.root, true, check_fill);
            assert_eq!(height, self.nodes[self.root].height);
            assert_eq!(count, self.len);
        }

        fn check_node(&self, id: usize, is_root: bool, check_fill: bool) -> (usize, Aabb, usize) {
            let node = &self.nodes[id];
            if !is_root {
                let len = self.children_len(id);
                assert!(len >= 1, "non-root nodes are never empty");
                assert!(len <= self.max_entries);
                if check_fill {
                    assert!(len >= self.min_entries);
                }
            }
            match &node.children {
                Children::Items(items) => {
                    assert_eq!(node.height, 1, "leaves have height 1");
                    let mut bbox = Aabb::EMPTY;
                    for item in items {
                        bbox.extend(&item.bbox());
                    }
                    assert_eq!(bbox, node.bbox);
                    (1, bbox, items.len())
                }
                Children::Nodes(ids) => {
                    assert!(node.height > 1, "internal nodes have height > 1");
                    let mut bbox = Aabb::EMPTY;
                    let mut count = 0;
                    for &child in ids {
                        let (child_height, child_bbox, child_count) =
                            self.check_node(child, false, check_fill);
                        assert_eq!(child_height, node.height - 1);
                        bbox.extend(&child_bbox);
                        count += child_count;
                    }
                    assert_eq!(bbox, node.bbox);
                    (node.height, bbox, count)
                }
            }
        }
    }

    fn boxes(coords: &[[f64; 4]]) -> Vec<Aabb> {
        coords
            .iter()
            .map(|&[min_x, min_y, max_x, max_y]| Aabb::new(min_x, min_y, max_x, max_y))
            .collect()
    }

    fn random_boxes(rng: &mut StdRng, count: usize) -> Vec<Aabb> {
        (0..count)
            .map(|_| {
                let x = rng.gen_range(-100.0..100.0);
                let y = rng.gen_range(-100.0..100.0);
                let w = rng.gen_range(0.0..10.0);
                let h = rng.gen_range(0.0..10.0);
                Aabb::new(x, y, x + w, y + h)
            })
            .collect()
    }

    #[test]
    fn construction_floors_parameters() {
        let tree: RTree<Aabb> = RTree::new(0);
        assert_eq!(tree.max_entries, 4);
        assert_eq!(tree.min_entries, 2);

        let tree: RTree<Aabb> = RTree::default();
        assert_eq!(tree.max_entries, 9);
        assert_eq!(tree.min_entries, 4);
    }

    #[test]
    fn empty_tree_behaves() {
        let mut tree: RTree<Aabb> = RTree::new(4);
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.envelope(), Aabb::EMPTY);
        assert!(tree.search(Aabb::new(0., 0., 100., 100.)).is_empty());
        assert!(!tree.collides(Aabb::new(0., 0., 100., 100.)));
        assert!(tree.all().is_empty());
        assert_eq!(tree.remove(&Aabb::new(0., 0., 1., 1.)), None);
        tree.assert_invariants(true);
    }

    #[test]
    fn fifth_insert_splits_the_root() {
        let mut tree = RTree::new(4);
        let items = boxes(&[
            [0., 0., 1., 1.],
            [2., 2., 3., 3.],
            [4., 4., 5., 5.],
            [6., 6., 7., 7.],
        ]);
        for item in items {
            tree.insert(item);
            assert_eq!(tree.height(), 1);
        }

        tree.insert(Aabb::new(8., 8., 9., 9.));
        assert_eq!(tree.height(), 2);
        assert_eq!(tree.children_len(tree.root), 2);
        assert_eq!(tree.all().len(), 5);
        tree.assert_invariants(true);
    }

    #[test]
    fn insert_keeps_invariants_at_scale() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut tree = RTree::new(9);
        for (i, item) in random_boxes(&mut rng, 300).into_iter().enumerate() {
            tree.insert(item);
            if i % 37 == 0 {
                tree.assert_invariants(true);
            }
        }
        assert_eq!(tree.len(), 300);
        tree.assert_invariants(true);
    }

    #[test]
    fn bulk_load_packs_a_balanced_tree() {
        let mut tree = RTree::new(4);
        tree.load(boxes(&[
            [0., 0., 1., 1.],
            [2., 2., 3., 3.],
            [4., 4., 5., 5.],
            [6., 6., 7., 7.],
            [8., 8., 9., 9.],
            [10., 10., 11., 11.],
        ]));
        assert_eq!(tree.len(), 6);
        assert_eq!(tree.height(), 2);
        tree.assert_invariants(true);

        let mut found: Vec<Aabb> = tree
            .search(Aabb::new(3., 3., 8., 8.))
            .into_iter()
            .copied()
            .collect();
        found.sort_by(|a, b| a.min_x.total_cmp(&b.min_x));
        assert_eq!(
            found,
            boxes(&[
                [2., 2., 3., 3.],
                [4., 4., 5., 5.],
                [6., 6., 7., 7.],
                [8., 8., 9., 9.],
            ])
        );
    }

    #[test]
    fn bulk_load_at_scale() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut tree = RTree::new(9);
        tree.load(random_boxes(&mut rng, 1000));
        assert_eq!(tree.len(), 1000);
        tree.assert_invariants(false);
    }

    #[test]
    fn load_merges_into_existing_tree() {
        let mut rng = StdRng::seed_from_u64(3);

        // Small tree, then a much larger batch: the built subtree is taller
        // and becomes the root.
        let mut tree = RTree::new(9);
        tree.load(random_boxes(&mut rng, 20));
        tree.load(random_boxes(&mut rng, 500));
        assert_eq!(tree.len(), 520);
        tree.assert_invariants(false);

        // The reverse: a shorter built subtree is inserted into the root.
        let mut tree = RTree::new(9);
        tree.load(random_boxes(&mut rng, 500));
        tree.load(random_boxes(&mut rng, 20));
        assert_eq!(tree.len(), 520);
        tree.assert_invariants(false);

        // Equal heights split the root.
        let mut tree = RTree::new(9);
        tree.load(random_boxes(&mut rng, 100));
        let before = tree.height();
        tree.load(random_boxes(&mut rng, 100));
        assert_eq!(tree.len(), 200);
        assert_eq!(tree.height(), before + 1);
        tree.assert_invariants(false);
    }

    #[test]
    fn load_below_minimum_falls_back_to_insert() {
        let mut tree = RTree::new(9);
        tree.load(boxes(&[[0., 0., 1., 1.], [2., 2., 3., 3.]]));
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.height(), 1);
        tree.assert_invariants(true);

        tree.load(Vec::new());
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn insert_after_load_keeps_invariants() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut tree = RTree::new(4);
        tree.load(random_boxes(&mut rng, 60));
        for item in random_boxes(&mut rng, 60) {
            tree.insert(item);
            tree.assert_invariants(false);
        }
        assert_eq!(tree.len(), 120);
    }

    #[test]
    fn search_covers_contained_subtrees() {
        let mut rng = StdRng::seed_from_u64(5);
        let items = random_boxes(&mut rng, 200);
        let mut tree = RTree::new(9);
        tree.load(items.clone());

        // A query covering everything returns everything, through the
        // covered-subtree fast path.
        let everything = Aabb::new(-200., -200., 200., 200.);
        assert_eq!(tree.search(everything).len(), items.len());
        assert!(tree.collides(everything));
    }

    #[test]
    fn remove_returns_the_item_and_condenses() {
        let mut tree = RTree::new(4);
        let items = boxes(&[
            [0., 0., 1., 1.],
            [2., 2., 3., 3.],
            [4., 4., 5., 5.],
            [6., 6., 7., 7.],
            [8., 8., 9., 9.],
            [10., 10., 11., 11.],
        ]);
        tree.load(items.clone());

        assert_eq!(tree.remove(&items[2]), Some(items[2]));
        assert_eq!(tree.len(), 5);
        assert!(!tree.search(Aabb::new(3., 3., 8., 8.)).contains(&&items[2]));
        tree.assert_invariants(false);

        assert_eq!(tree.remove(&Aabb::new(50., 50., 60., 60.)), None);
        assert_eq!(tree.len(), 5);

        for item in &items {
            tree.remove(item);
        }
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.envelope(), Aabb::EMPTY);
        tree.assert_invariants(true);
    }

    #[test]
    fn remove_takes_exactly_one_duplicate() {
        let mut tree = RTree::new(4);
        let dup = Aabb::new(5., 5., 6., 6.);
        tree.load(vec![dup; 7]);
        assert_eq!(tree.len(), 7);

        assert_eq!(tree.remove(&dup), Some(dup));
        assert_eq!(tree.len(), 6);
        assert_eq!(tree.all().len(), 6);
        tree.assert_invariants(false);
    }

    #[test]
    fn remove_backtracks_across_overlapping_siblings() {
        // Both internal subtrees contain the item's rectangle, but the item
        // lives under the second; removal must ascend out of the first and
        // try its sibling at the same level.
        let target = Aabb::new(2., 2., 3., 3.);
        let snapshot = Snapshot {
            height: 3,
            bbox: Aabb::new(0., 0., 10., 10.),
            children: SnapshotChildren::Nodes(vec![
                Snapshot {
                    height: 2,
                    bbox: Aabb::new(0., 0., 10., 10.),
                    children: SnapshotChildren::Nodes(vec![Snapshot {
                        height: 1,
                        bbox: Aabb::new(0., 0., 10., 10.),
                        children: SnapshotChildren::Items(vec![
                            Aabb::new(0., 0., 10., 10.),
                            Aabb::new(1., 1., 4., 4.),
                        ]),
                    }]),
                },
                Snapshot {
                    height: 2,
                    bbox: Aabb::new(0., 0., 8., 8.),
                    children: SnapshotChildren::Nodes(vec![Snapshot {
                        height: 1,
                        bbox: Aabb::new(0., 0., 8., 8.),
                        children: SnapshotChildren::Items(vec![
                            Aabb::new(0., 0., 8., 8.),
                            target,
                        ]),
                    }]),
                },
            ]),
        };
        let mut tree = RTree::from_snapshot(4, snapshot);
        assert_eq!(tree.len(), 4);

        assert_eq!(tree.remove(&target), Some(target));
        assert_eq!(tree.len(), 3);
        assert!(tree.all().iter().all(|&&item| item != target));
        tree.assert_invariants(false);
    }

    #[test]
    fn remove_with_custom_equality() {
        struct Labeled {
            name: &'static str,
            rect: Aabb,
        }
        impl Bounded for Labeled {
            fn bbox(&self) -> Aabb {
                self.rect
            }
        }

        let rect = Aabb::new(0., 0., 1., 1.);
        let mut tree = RTree::new(4);
        tree.insert(Labeled { name: "a", rect });
        tree.insert(Labeled { name: "b", rect });

        let probe = Labeled { name: "b", rect };
        let removed = tree.remove_with(&probe, |candidate, probe| candidate.name == probe.name);
        assert_eq!(removed.map(|item| item.name), Some("b"));
        assert_eq!(tree.all().len(), 1);
        assert_eq!(tree.all()[0].name, "a");
    }

    #[test]
    fn clear_resets_everything() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut tree = RTree::new(9);
        tree.load(random_boxes(&mut rng, 100));
        tree.clear();

        assert!(tree.is_empty());
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.envelope(), Aabb::EMPTY);
        tree.assert_invariants(true);

        tree.insert(Aabb::new(0., 0., 1., 1.));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn snapshot_round_trip_preserves_queries() {
        let mut rng = StdRng::seed_from_u64(7);
        let items = random_boxes(&mut rng, 150);
        let mut tree = RTree::new(9);
        tree.load(items);

        let snapshot = tree.to_snapshot();
        assert_eq!(snapshot.item_count(), tree.len());

        let restored: RTree<Aabb> = RTree::from_snapshot(9, snapshot);
        assert_eq!(restored.len(), tree.len());
        restored.assert_invariants(false);

        for _ in 0..20 {
            let query = {
                let x = rng.gen_range(-120.0..100.0);
                let y = rng.gen_range(-120.0..100.0);
                Aabb::new(x, y, x + 30., y + 30.)
            };
            let mut a: Vec<Aabb> = tree.search(query).into_iter().copied().collect();
            let mut b: Vec<Aabb> = restored.search(query).into_iter().copied().collect();
            a.sort_by(|p, q| p.min_x.total_cmp(&q.min_x).then(p.min_y.total_cmp(&q.min_y)));
            b.sort_by(|p, q| p.min_x.total_cmp(&q.min_x).then(p.min_y.total_cmp(&q.min_y)));
            assert_eq!(a, b);
        }
    }

    #[test]
    fn snapshots_are_independent_of_the_tree() {
        let mut tree = RTree::new(4);
        tree.load(boxes(&[[0., 0., 1., 1.], [2., 2., 3., 3.], [4., 4., 5., 5.]]));

        let snapshot = tree.to_snapshot();
        let count_before = snapshot.item_count();

        tree.insert(Aabb::new(50., 50., 60., 60.));
        tree.remove(&Aabb::new(0., 0., 1., 1.));

        assert_eq!(snapshot.item_count(), count_before);
        let restored: RTree<Aabb> = RTree::from_snapshot(4, snapshot);
        assert_eq!(restored.len(), 3);
        assert!(restored.collides(Aabb::new(0., 0., 1., 1.)));
        assert!(!restored.collides(Aabb::new(50., 50., 60., 60.)));
    }
}
