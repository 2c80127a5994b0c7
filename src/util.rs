// Copyright 2026 the Bramble Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Small integer helpers for the bulk-load geometry.

/// Returns the square root of the number, rounded up.
#[inline]
pub(crate) const fn isqrt_ceil(num: usize) -> usize {
    let s = num.isqrt();

    // This multiplication cannot overflow because `s` is the rounded-down square root of `num`,
    // i.e., `s * s` is guaranteed to be less than or equal to `num`.
    if s * s < num { s + 1 } else { s }
}

/// Returns the logarithm of `num` in `base`, rounded up: the smallest `h`
/// with `base.pow(h) >= num`.
#[inline]
pub(crate) const fn ilog_ceil(num: usize, base: usize) -> usize {
    debug_assert!(num >= 1 && base >= 2);
    let floor = num.ilog(base) as usize;

    // `ilog` rounds down, so the floor is exact only at exact powers.
    if base.pow(floor as u32) == num {
        floor
    } else {
        floor + 1
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn isqrt_ceil() {
        assert_eq!(super::isqrt_ceil(255), 16);
        assert_eq!(super::isqrt_ceil(256), 16);
        assert_eq!(super::isqrt_ceil(257), 17);
    }

    #[test]
    fn ilog_ceil() {
        assert_eq!(super::ilog_ceil(1, 9), 0);
        assert_eq!(super::ilog_ceil(9, 9), 1);
        assert_eq!(super::ilog_ceil(10, 9), 2);
        assert_eq!(super::ilog_ceil(81, 9), 2);
        assert_eq!(super::ilog_ceil(82, 9), 3);
        assert_eq!(super::ilog_ceil(5, 4), 2);
        assert_eq!(super::ilog_ceil(16, 4), 2);
        assert_eq!(super::ilog_ceil(17, 4), 3);
    }
}
