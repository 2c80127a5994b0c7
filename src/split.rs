// Copyright 2026 the Bramble Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Split planning for overflowing nodes.
//!
//! When a node exceeds its branching cap, its children are redistributed
//! over the node and a new sibling. The plan is computed in two passes over
//! the child rectangles:
//!
//! 1. **Axis choice** — for each axis, sort the children by that axis's
//!    minimum and sum the half-perimeters of every admissible prefix/suffix
//!    split, sweeping a running union box outward from both ends. The axis
//!    with the smaller total wins and the children stay sorted by it.
//! 2. **Index choice** — along the winning axis, pick the split position
//!    with the least overlap between the two resulting boxes, breaking ties
//!    by the smaller combined area.
//!
//! The functions are generic over a `rect_of` accessor so that leaf children
//! (items) and internal children (node ids) share one implementation.

use crate::types::Aabb;

/// Sort `children` by the better split axis and return the index at which to
/// split them. `min_entries` children at least stay on each side.
pub(crate) fn plan_split<C>(
    children: &mut [C],
    min_entries: usize,
    rect_of: impl Fn(&C) -> Aabb + Copy,
) -> usize {
    choose_split_axis(children, min_entries, rect_of);
    choose_split_index(children, min_entries, rect_of)
}

/// Union of the rectangles of `children[start..end]`.
pub(crate) fn dist_bbox<C>(
    children: &[C],
    start: usize,
    end: usize,
    rect_of: impl Fn(&C) -> Aabb,
) -> Aabb {
    let mut bbox = Aabb::EMPTY;
    for child in &children[start..end] {
        bbox.extend(&rect_of(child));
    }
    bbox
}

fn choose_split_axis<C>(children: &mut [C], min_entries: usize, rect_of: impl Fn(&C) -> Aabb + Copy) {
    let margin_x = all_dist_margin(children, min_entries, rect_of, |r| r.min_x);
    let margin_y = all_dist_margin(children, min_entries, rect_of, |r| r.min_y);

    // The y pass left the children sorted by `min_y`; re-sort only if the x
    // axis produced the smaller total.
    if margin_x < margin_y {
        children.sort_unstable_by(|a, b| rect_of(a).min_x.total_cmp(&rect_of(b).min_x));
    }
}

/// Total half-perimeter over all admissible distributions along one axis.
/// Sorts `children` by that axis as a side effect.
fn all_dist_margin<C>(
    children: &mut [C],
    min_entries: usize,
    rect_of: impl Fn(&C) -> Aabb + Copy,
    axis_min: impl Fn(&Aabb) -> f64,
) -> f64 {
    children.sort_unstable_by(|a, b| axis_min(&rect_of(a)).total_cmp(&axis_min(&rect_of(b))));

    let total = children.len();
    let mut left = dist_bbox(children, 0, min_entries, rect_of);
    let mut right = dist_bbox(children, total - min_entries, total, rect_of);
    let mut margin = left.margin() + right.margin();

    for child in &children[min_entries..total - min_entries] {
        left.extend(&rect_of(child));
        margin += left.margin();
    }
    for child in children[min_entries..total - min_entries].iter().rev() {
        right.extend(&rect_of(child));
        margin += right.margin();
    }

    margin
}

fn choose_split_index<C>(
    children: &[C],
    min_entries: usize,
    rect_of: impl Fn(&C) -> Aabb + Copy,
) -> usize {
    let total = children.len();
    let mut best = None;
    let mut min_overlap = f64::INFINITY;
    let mut min_area = f64::INFINITY;

    for index in min_entries..=total - min_entries {
        let first = dist_bbox(children, 0, index, rect_of);
        let second = dist_bbox(children, index, total, rect_of);

        let overlap = first.intersection_area(&second);
        let area = first.area() + second.area();

        if overlap < min_overlap {
            min_overlap = overlap;
            best = Some(index);
            min_area = min_area.min(area);
        } else if overlap == min_overlap && area < min_area {
            min_area = area;
            best = Some(index);
        }
    }

    best.unwrap_or(total - min_entries)
}
