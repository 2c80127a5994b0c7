// Copyright 2026 the Bramble Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic partial selection: `quickselect` and `multi_select`.
//!
//! These are the ordering primitives behind bulk loading. Neither sorts its
//! input fully; both only move enough elements to establish the requested
//! partition boundaries, which is what makes packed tree construction run in
//! `O(n log n)` without paying for a total order that is then thrown away.

use alloc::vec;
use core::cmp::Ordering;

/// Partition `arr` into contiguous blocks of `block` elements (the final
/// block may be smaller) such that every element of an earlier block
/// compares less than or equal to every element of a later block. The order
/// inside each block is unspecified.
pub(crate) fn multi_select<T, F>(arr: &mut [T], block: usize, cmp: &F)
where
    F: Fn(&T, &T) -> Ordering,
{
    debug_assert!(block > 0, "block size must be positive");
    if arr.is_empty() {
        return;
    }

    let mut stack = vec![0, arr.len() - 1];
    while let (Some(right), Some(left)) = (stack.pop(), stack.pop()) {
        if right - left <= block {
            continue;
        }

        // Select the block boundary closest to the middle of the range, then
        // recurse into both halves.
        let mid = left + (right - left).div_ceil(2 * block) * block;
        quickselect(arr, mid, left, right, cmp);
        stack.extend_from_slice(&[left, mid, mid, right]);
    }
}

/// Reorder the subrange `[left, right]` of `arr` in place so that `arr[k]`
/// holds the element that would sit at index `k` under a full sort by `cmp`,
/// everything in `[left, k)` compares less than or equal to it, and
/// everything in `(k, right]` compares greater than or equal to it. The
/// order inside the two partitions is unspecified.
pub(crate) fn quickselect<T, F>(arr: &mut [T], k: usize, mut left: usize, mut right: usize, cmp: &F)
where
    F: Fn(&T, &T) -> Ordering,
{
    debug_assert!(
        left <= k && k <= right && right < arr.len(),
        "selection range out of bounds"
    );
    while right > left {
        if right - left > 600 {
            // Narrow the working range by selecting within a sample first.
            // Constants are the published Floyd–Rivest ones.
            let n = (right - left + 1) as f64;
            let m = (k - left + 1) as f64;
            let z = libm::log(n);
            let s = 0.5 * libm::exp(2.0 * z / 3.0);
            let sign = if m - n / 2.0 < 0.0 { -1.0 } else { 1.0 };
            let sd = 0.5 * libm::sqrt(z * s * (n - s) / n) * sign;
            let lo = libm::floor(k as f64 - m * s / n + sd);
            let hi = libm::floor(k as f64 + (n - m) * s / n + sd);
            let new_left = if lo > left as f64 { lo as usize } else { left };
            let new_right = if hi < right as f64 { hi as usize } else { right };
            quickselect(arr, k, new_left, new_right, cmp);
        }

        // Hoare partition around the value initially at `k`. The pivot is
        // compared through its current slot, whose position is updated at
        // every swap, so no copy of the element is needed.
        let mut pivot = k;
        let mut i = left;
        let mut j = right;

        swap_tracking(arr, &mut pivot, left, k);
        if cmp(&arr[right], &arr[pivot]) == Ordering::Greater {
            swap_tracking(arr, &mut pivot, left, right);
        }

        while i < j {
            swap_tracking(arr, &mut pivot, i, j);
            i += 1;
            j -= 1;
            while cmp(&arr[i], &arr[pivot]) == Ordering::Less {
                i += 1;
            }
            while cmp(&arr[j], &arr[pivot]) == Ordering::Greater {
                j -= 1;
            }
        }

        if cmp(&arr[left], &arr[pivot]) == Ordering::Equal {
            swap_tracking(arr, &mut pivot, left, j);
        } else {
            j += 1;
            swap_tracking(arr, &mut pivot, j, right);
        }

        if j <= k {
            left = j + 1;
        }
        if k <= j {
            if j == 0 {
                break;
            }
            right = j - 1;
        }
    }
}

#[inline]
fn swap_tracking<T>(arr: &mut [T], tracked: &mut usize, a: usize, b: usize) {
    arr.swap(a, b);
    if *tracked == a {
        *tracked = b;
    } else if *tracked == b {
        *tracked = a;
    }
}
