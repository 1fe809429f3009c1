// Copyright 2025 Lars Brubaker
// License: MIT
//
// Integer device-space geometry primitives shared by the whole crate:
// points, rectangles, the per-build clip box, and the clip side-flag set.
//
// Coordinates are device-space integers, pre-rounded by the caller and
// expected to stay within +/-2^30 (see COORD_LIMIT). Y grows downward.

use bitflags::bitflags;

/// Callers must pre-clip coordinates to this magnitude; segment deltas may
/// then span up to 2^31 without overflowing i32 arithmetic.
pub const COORD_LIMIT: i32 = 1 << 30;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct IPoint {
    pub x: i32,
    pub y: i32,
}

impl IPoint {
    #[inline]
    pub fn new(x: i32, y: i32) -> Self {
        IPoint { x, y }
    }
}

/// Closed integer rectangle; x1 <= x2 and y1 <= y2 when normalized.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl IRect {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        IRect { x1, y1, x2, y2 }
    }

    /// An inverted rectangle used as the seed for bounding-box accumulation.
    pub fn empty() -> Self {
        IRect {
            x1: i32::MAX,
            y1: i32::MAX,
            x2: i32::MIN,
            y2: i32::MIN,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x1 > self.x2 || self.y1 > self.y2
    }

    #[inline]
    pub fn add_point(&mut self, x: i32, y: i32) {
        self.x1 = self.x1.min(x);
        self.y1 = self.y1.min(y);
        self.x2 = self.x2.max(x);
        self.y2 = self.y2.max(y);
    }

    #[inline]
    pub fn intersects(&self, other: &IRect) -> bool {
        self.x1 <= other.x2 && other.x1 <= self.x2 && self.y1 <= other.y2 && other.y1 <= self.y2
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }
}

/// The clip box a fill is built against. Threaded explicitly through every
/// build; there is no process-wide clip state.
pub type ClipBox = IRect;

bitflags! {
    /// Which clip-box sides have affected a build. TOP/BOTTOM/RIGHT record
    /// dropped segments; LEFT records segments retained for crossing-count
    /// correctness but lying entirely left of the clip box.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct ClipSides: u8 {
        const LEFT = 1;
        const RIGHT = 2;
        const TOP = 4;
        const BOTTOM = 8;
    }
}

impl ClipSides {
    /// Sides that disqualify quad packing and participate in total-clip-out
    /// detection.
    pub const DROPPED: ClipSides = ClipSides::RIGHT
        .union(ClipSides::TOP)
        .union(ClipSides::BOTTOM);
}

/// Classify one segment against the clip box: `Some(side)` if the segment
/// lies entirely outside on a dropping side, `None` if it must be kept.
pub fn seg_outside(clip: &ClipBox, x1: i32, y1: i32, x2: i32, y2: i32) -> Option<ClipSides> {
    if y1 < clip.y1 && y2 < clip.y1 {
        Some(ClipSides::TOP)
    } else if y1 > clip.y2 && y2 > clip.y2 {
        Some(ClipSides::BOTTOM)
    } else if x1 > clip.x2 && x2 > clip.x2 {
        Some(ClipSides::RIGHT)
    } else {
        None
    }
}

/// True when the segment lies entirely left of the clip box. Such segments
/// are kept (they flip the crossing parity of visible pixels) but flagged.
#[inline]
pub fn seg_left_of(clip: &ClipBox, x1: i32, x2: i32) -> bool {
    x1 < clip.x1 && x2 < clip.x1
}
