// Copyright 2025 Lars Brubaker
// License: MIT
//
// Thread ordering for scan conversion.
//
// Two threads sharing a current X are ordered by their sub-scanline
// position (the X-error fraction xe/denom) and then by gradient, so that
// the one crossing the next scanline further left sorts first. All of it
// in 32-bit arithmetic: fractions are compared through a tiered scheme
// that never forms a 64-bit intermediate.
//
// Sorting is an insertion pass for tiny arrays and a recursive quicksort
// with a median-of-three pivot otherwise, over the composite key
// (start y, current x, comparator).

use crate::thread::Thread;

/// Both denominators below this bound make n1*d2 and n2*d1 provably fit in
/// i32: 46340 = floor(sqrt(2^31)), and numerators are < denominators.
const SAFE_CROSS: i32 = 46_340;

/// Compare n1/d1 against n2/d2 where 0 <= n < d, without 64-bit math.
/// Returns -1, 0 or +1.
fn cmp_frac(n1: i32, d1: i32, n2: i32, d2: i32) -> i32 {
    debug_assert!(d1 > 0 && d2 > 0 && n1 >= 0 && n2 >= 0 && n1 < d1 && n2 < d2);
    if n1 == n2 && d1 == d2 {
        return 0;
    }
    if n1 == 0 && n2 == 0 {
        return 0;
    }
    // Tier 1: when one denominator dominates and the numerator delta agrees
    // in sign, the answer follows without any multiplication.
    if n1 >= n2 && d1 <= d2 {
        return 1;
    }
    if n1 <= n2 && d1 >= d2 {
        return -1;
    }
    // Tier 2: safe cross multiplication.
    if d1 < SAFE_CROSS && d2 < SAFE_CROSS {
        let lhs = n1 * d2;
        let rhs = n2 * d1;
        return (lhs > rhs) as i32 - (lhs < rhs) as i32;
    }
    // Tier 3: denominators too large to multiply; compare components
    // directly. Consistent under operand swap, if not exact.
    if n1 != n2 {
        (n1 > n2) as i32 - (n1 < n2) as i32
    } else {
        (d2 > d1) as i32 - (d2 < d1) as i32
    }
}

/// Total order on two threads at a shared current X: sub-scanline position
/// first, then gradient (integer step, then fractional step).
///
/// Horizontal threads (zero denominator) take a fixed position: before any
/// non-horizontal thread, and tied with each other. The policy is
/// self-consistent rather than numerically meaningful; downstream output
/// depends on it staying exactly this way.
pub fn compare_threads(a: &Thread, b: &Thread) -> i32 {
    match (a.denom == 0, b.denom == 0) {
        (true, true) => return 0,
        (true, false) => return -1,
        (false, true) => return 1,
        (false, false) => {}
    }
    let c = cmp_frac(a.xe, a.denom, b.xe, b.denom);
    if c != 0 {
        return c;
    }
    if a.si != b.si {
        return if a.si > b.si { 1 } else { -1 };
    }
    cmp_frac(a.sf, a.denom, b.sf, b.denom)
}

/// Composite sort key used after a preset: threads already reached by the
/// clip line share its Y; the rest order by their own start.
fn key_cmp(threads: &[Thread], i: u32, j: u32, y1clip: i32) -> i32 {
    let a = &threads[i as usize];
    let b = &threads[j as usize];
    let ya = if a.ended { i32::MIN } else { a.y1.max(y1clip) };
    let yb = if b.ended { i32::MIN } else { b.y1.max(y1clip) };
    if ya != yb {
        return if ya > yb { 1 } else { -1 };
    }
    if a.cx != b.cx {
        return if a.cx > b.cx { 1 } else { -1 };
    }
    compare_threads(a, b)
}

const INSERTION_CUTOFF: usize = 4;

fn insertion(threads: &[Thread], order: &mut [u32], y1clip: i32) {
    for i in 1..order.len() {
        let v = order[i];
        let mut j = i;
        while j > 0 && key_cmp(threads, order[j - 1], v, y1clip) > 0 {
            order[j] = order[j - 1];
            j -= 1;
        }
        order[j] = v;
    }
}

fn quicksort(threads: &[Thread], order: &mut [u32], y1clip: i32) {
    let n = order.len();
    if n <= INSERTION_CUTOFF {
        insertion(threads, order, y1clip);
        return;
    }
    // Median-of-three pivot, parked at the end.
    let mid = n / 2;
    if key_cmp(threads, order[0], order[mid], y1clip) > 0 {
        order.swap(0, mid);
    }
    if key_cmp(threads, order[0], order[n - 1], y1clip) > 0 {
        order.swap(0, n - 1);
    }
    if key_cmp(threads, order[mid], order[n - 1], y1clip) > 0 {
        order.swap(mid, n - 1);
    }
    order.swap(mid, n - 1);
    let pivot = order[n - 1];
    let mut store = 0;
    for i in 0..n - 1 {
        if key_cmp(threads, order[i], pivot, y1clip) <= 0 {
            order.swap(i, store);
            store += 1;
        }
    }
    order.swap(store, n - 1);
    let (lo, hi) = order.split_at_mut(store);
    quicksort(threads, lo, y1clip);
    quicksort(threads, &mut hi[1..], y1clip);
}

/// Sort the order array by (y1, x, gradient).
pub fn sort_order(threads: &[Thread], order: &mut [u32], y1clip: i32) {
    if order.len() <= INSERTION_CUTOFF {
        insertion(threads, order, y1clip);
    } else {
        quicksort(threads, order, y1clip);
    }
}
