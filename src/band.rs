// Copyright 2025 Lars Brubaker
// License: MIT
//
// Band cursor engine: positions a FillAggregate's threads on a clip line
// and keeps the order array partitioned as the consumer moves the line
// down the page.
//
// preset does the full job (rewind, seek, sort, partition); repair is the
// cheap forward-only correction used when a band is reused at a lower
// clip line. Repair moves threads between partitions but deliberately
// does not re-sort inside the active window; the consumer merges by key
// as it scans.

use log::trace;
use smallvec::SmallVec;

use crate::compare::sort_order;
use crate::fill::FillAggregate;

/// Position every thread on the aggregate's clip line and rebuild the
/// order array. Safe to call again at the same clip line.
pub fn preset(fill: &mut FillAggregate) {
    let y = fill.y1clip;
    for t in fill.threads.iter_mut() {
        t.rewind();
        t.seek(y);
    }
    sort_order(&fill.threads, &mut fill.order, y);

    let n = fill.order.len();
    let mut fa = 0;
    while fa < n && fill.threads[fill.order[fa] as usize].ended {
        fa += 1;
    }
    let mut fp = fa;
    while fp < n && fill.threads[fill.order[fp] as usize].y1 <= y {
        fp += 1;
    }
    fill.first_active = fa;
    fill.first_pending = fp;
    fill.nexty = y;
    trace!(
        "preset at y={}: {} finished, {} active, {} pending",
        y,
        fa,
        fp - fa,
        n - fp
    );
}

/// Move the clip line down to `y` without a full preset: advance every
/// active thread and every pending thread that becomes ready, then
/// re-partition the order array stably. A no-op when `y` is the current
/// clip line.
pub fn repair(fill: &mut FillAggregate, y: i32) {
    debug_assert!(y >= fill.y1clip, "repair only moves the clip line down");
    if y == fill.y1clip {
        return;
    }

    let n = fill.order.len();
    for k in fill.first_active..n {
        let t = &mut fill.threads[fill.order[k] as usize];
        if !t.ended && t.y1 <= y {
            t.advance_to(y);
        }
    }

    // Stable three-way partition of the unfinished tail, distributed back
    // from one scratch copy; inline storage covers typical fills.
    let scratch: SmallVec<[u32; 32]> = SmallVec::from_slice(&fill.order[fill.first_active..]);
    let mut k = fill.first_active;
    for &i in &scratch {
        if fill.threads[i as usize].ended {
            fill.order[k] = i;
            k += 1;
        }
    }
    fill.first_active = k;
    for &i in &scratch {
        let t = &fill.threads[i as usize];
        if !t.ended && t.y1 <= y {
            fill.order[k] = i;
            k += 1;
        }
    }
    fill.first_pending = k;
    for &i in &scratch {
        let t = &fill.threads[i as usize];
        if !t.ended && t.y1 > y {
            fill.order[k] = i;
            k += 1;
        }
    }
    debug_assert!(k == n);
    fill.y1clip = y;
    fill.nexty = y;
}
