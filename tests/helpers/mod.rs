// Copyright 2025 Lars Brubaker
// Shared test utilities for scanfill tests.

#![allow(dead_code)]

use scanfill::{FillAggregate, FillBuilder, HeapArena, IRect, ScanRule, DEFAULT_SIZE_HINT};

pub fn wide_clip() -> IRect {
    IRect::new(-100_000, -100_000, 100_000, 100_000)
}

/// Build a fill from closed contours, panicking on the degenerate paths
/// the tests do not mean to hit.
pub fn build_fill(rule: ScanRule, clip: IRect, contours: &[&[(i32, i32)]]) -> FillAggregate {
    let mut b = FillBuilder::new(rule, clip);
    for c in contours {
        b.add_contour(c);
    }
    let mut arena = HeapArena::new(1 << 22);
    b.build(&mut arena, DEFAULT_SIZE_HINT)
        .expect("arena was sized generously")
        .expect("contours produced no fill")
}

/// NonZero spans at the aggregate's current clip line, as half-open
/// (x_start, x_end) pairs read off the active window.
pub fn nonzero_spans(fill: &FillAggregate) -> Vec<(i32, i32)> {
    let mut crossings: Vec<(i32, i32)> = fill
        .thread_window()
        .iter()
        .map(|&i| {
            let t = &fill.threads[i as usize];
            (t.cx, t.orient as i32)
        })
        .collect();
    crossings.sort();

    let mut spans = Vec::new();
    let mut winding = 0;
    let mut start = 0;
    for (x, o) in crossings {
        if winding == 0 {
            start = x;
        }
        winding += o;
        if winding == 0 && x > start {
            spans.push((start, x));
        }
    }
    spans
}
