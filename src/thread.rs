// Copyright 2025 Lars Brubaker
// License: MIT
//
// Thread: one Y-monotonic edge-chain with incremental stepping state.
//
// A thread stores its first segment explicitly and every further vertex as
// a delta in its chain. Canonical threads run from smaller Y to larger Y;
// `orient` remembers the direction the path originally drew the chain in
// (+1 down, -1 up), which is what winding-rule consumers count.
//
// The DDA fields describe the thread's current segment while a band cursor
// walks it: x advances by the integer gradient each scanline, with the
// fractional remainder accumulated in an error term (plain Bresenham,
// compare agg's cell/line interpolators).

use crate::delta::DeltaChain;
use crate::geom::IPoint;
use smallvec::SmallVec;

#[derive(Debug, Clone)]
pub struct Thread {
    // First segment, fixed at construction.
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    /// +1 if the path drew this chain downward, -1 if upward.
    pub orient: i8,
    pub delta: DeltaChain,

    // DDA state, (re)derived by preset/repair.
    /// X at the current scanline.
    pub cx: i32,
    /// Current scanline.
    pub cy: i32,
    /// End point of the current segment.
    pub ex: i32,
    pub ey: i32,
    /// Current segment dy (the gradient denominator).
    pub denom: i32,
    /// Integer gradient: floor(dx / denom).
    pub si: i32,
    /// Fractional gradient numerator, in 0..denom.
    pub sf: i32,
    /// X error accumulator, in 0..denom.
    pub xe: i32,
    /// Scanlines remaining in the current segment.
    pub ncount: i32,
    /// Set once every segment has been consumed.
    pub ended: bool,
}

/// Cache identity is the geometry: endpoints, orientation, delta bytes.
/// Cursor state is transient and excluded.
impl PartialEq for Thread {
    fn eq(&self, other: &Self) -> bool {
        self.x1 == other.x1
            && self.y1 == other.y1
            && self.x2 == other.x2
            && self.y2 == other.y2
            && self.orient == other.orient
            && self.delta == other.delta
    }
}
impl Eq for Thread {}

impl Thread {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32, orient: i8, delta: DeltaChain) -> Self {
        Thread {
            x1,
            y1,
            x2,
            y2,
            orient,
            delta,
            cx: x1,
            cy: y1,
            ex: x2,
            ey: y2,
            denom: 0,
            si: 0,
            sf: 0,
            xe: 0,
            ncount: 0,
            ended: false,
        }
    }

    /// A degenerate thread never left its starting point.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.x1 == self.x2 && self.y1 == self.y2 && self.delta.is_empty()
    }

    /// Decode the full vertex list: first-segment endpoints plus every
    /// chain continuation.
    pub fn points(&mut self) -> SmallVec<[IPoint; 8]> {
        let mut pts = SmallVec::new();
        pts.push(IPoint::new(self.x1, self.y1));
        pts.push(IPoint::new(self.x2, self.y2));
        let (mut x, mut y) = (self.x2, self.y2);
        self.delta.reset();
        while self.delta.get(&mut x, &mut y) {
            pts.push(IPoint::new(x, y));
        }
        pts
    }

    /// Rewind the cursor to the top of the thread: chain cursor at the
    /// start, DDA on the first segment.
    pub fn rewind(&mut self) {
        self.delta.reset();
        self.ended = false;
        self.set_segment(self.x1, self.y1, self.x2, self.y2);
    }

    /// Load the DDA with one segment. Canonical segments have dy >= 0.
    pub fn set_segment(&mut self, sx: i32, sy: i32, ex: i32, ey: i32) {
        let dy = ey - sy;
        debug_assert!(dy >= 0, "canonical thread segment runs downward");
        self.cx = sx;
        self.cy = sy;
        self.ex = ex;
        self.ey = ey;
        self.denom = dy;
        if dy > 0 {
            let dx = ex - sx;
            self.si = dx.div_euclid(dy);
            self.sf = dx.rem_euclid(dy);
        } else {
            self.si = 0;
            self.sf = 0;
        }
        self.xe = 0;
        self.ncount = dy;
    }

    /// Pull the next segment out of the chain. False when exhausted.
    pub fn advance_segment(&mut self) -> bool {
        let (mut x, mut y) = (self.ex, self.ey);
        if !self.delta.get(&mut x, &mut y) {
            self.ended = true;
            return false;
        }
        let (sx, sy) = (self.ex, self.ey);
        self.set_segment(sx, sy, x, y);
        true
    }

    /// Advance one scanline within the current segment.
    #[inline]
    pub fn step(&mut self) {
        debug_assert!(self.ncount > 0);
        self.cx += self.si;
        self.xe += self.sf;
        if self.xe >= self.denom {
            self.xe -= self.denom;
            self.cx += 1;
        }
        self.cy += 1;
        self.ncount -= 1;
    }

    /// Advance `k` scanlines within the current segment in closed form.
    /// Equivalent to calling `step` k times.
    pub fn step_by(&mut self, k: i32) {
        debug_assert!(k >= 0 && k <= self.ncount);
        if k == 0 {
            return;
        }
        let d = self.denom as i64;
        let adv = self.xe as i64 + k as i64 * self.sf as i64;
        self.cx += k * self.si + (adv / d) as i32;
        self.xe = (adv % d) as i32;
        self.cy += k;
        self.ncount -= k;
    }

    /// Position the cursor at clip line `y`: consume segments wholly above
    /// it, then step partway into the one that spans it. Leaves the thread
    /// untouched below `y` when it starts at or after `y`. Sets `ended`
    /// when the whole thread lies above `y`.
    pub fn seek(&mut self, y: i32) {
        while self.ey <= y {
            if !self.advance_segment() {
                return;
            }
        }
        if self.cy < y {
            let k = y - self.cy;
            debug_assert!(k <= self.ncount);
            self.step_by(k);
        }
    }

    /// Advance forward to clip line `y` from the current cursor position.
    /// Forward-only companion to `seek` used by repair.
    pub fn advance_to(&mut self, y: i32) {
        debug_assert!(!self.ended);
        while self.cy + self.ncount <= y {
            // Finish this segment and move on.
            if !self.advance_segment() {
                return;
            }
        }
        let k = y - self.cy;
        if k > 0 {
            self.step_by(k);
        }
    }

    /// Total bytes this thread accounts for in its aggregate's arena
    /// charge: the struct itself plus its trailing delta bytes.
    pub fn byte_size(&self) -> usize {
        std::mem::size_of::<Thread>() + self.delta.bytes().len()
    }
}
