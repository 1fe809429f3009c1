// Copyright 2025 Lars Brubaker
// License: MIT
//
// Streaming construction of a FillAggregate from path commands. The
// builder consumes move_to/line_to/close legs one at a time, carves the
// outline into Y-monotonic threads, and hands the finished set to an
// arena in a single build() call.
//
// Two mechanisms keep the common cases cheap:
//   - a leading-point queue buffers each subpath until its first vertical
//     direction reversal, so the orientation of the opening run is known
//     before any thread is committed;
//   - horizontal legs at the ends of a run are never stored (the leading
//     ones just move the pen, the trailing ones are popped at close), so
//     an axis-aligned rectangle compiles to two empty-chain threads.

use log::{debug, trace};
use smallvec::SmallVec;

use crate::arena::Arena;
use crate::delta::DeltaChain;
use crate::fill::{FillAggregate, FillError, ScanRule};
use crate::geom::{seg_left_of, seg_outside, ClipBox, ClipSides, IPoint, IRect, COORD_LIMIT};
use crate::thread::Thread;

/// Builds never ask the arena for less than this; when halving retries
/// reach the floor and still fail, the build reports OutOfMemory.
pub const ARENA_FLOOR: usize = 1 << 12;

/// Size hint for callers with no better estimate.
pub const DEFAULT_SIZE_HINT: usize = 1 << 16;

/// Leading-point queue capacity; a subpath prefix longer than this is
/// replayed early even without a reversal.
const QUEUE_MAX: usize = 256;

const NIL: u32 = u32::MAX;

/// A thread under construction, chained through `next` in close order.
#[derive(Debug)]
struct PendingThread {
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    /// As-drawn vertical direction; 0 only for a tentative placeholder
    /// opened by a zero-length leg.
    dir: i8,
    delta: DeltaChain,
    next: u32,
}

impl PendingThread {
    fn tentative(&self) -> bool {
        self.dir == 0
    }
}

pub struct FillBuilder {
    rule: ScanRule,
    clip: ClipBox,
    clipped: ClipSides,
    pending: Vec<PendingThread>,
    head: u32,
    tail: u32,
    /// Index of the thread currently accepting legs, NIL when none.
    open: u32,
    in_path: bool,
    start: IPoint,
    cur: IPoint,
    queue: SmallVec<[IPoint; 16]>,
    queue_active: bool,
    qdir: i8,
}

impl FillBuilder {
    pub fn new(rule: ScanRule, clip: ClipBox) -> Self {
        FillBuilder {
            rule,
            clip,
            clipped: ClipSides::empty(),
            pending: Vec::new(),
            head: NIL,
            tail: NIL,
            open: NIL,
            in_path: false,
            start: IPoint::new(0, 0),
            cur: IPoint::new(0, 0),
            queue: SmallVec::new(),
            queue_active: false,
            qdir: 0,
        }
    }

    pub fn move_to(&mut self, x: i32, y: i32) {
        debug_assert!(x.abs() < COORD_LIMIT && y.abs() < COORD_LIMIT);
        if self.in_path {
            self.close();
        }
        let p = IPoint::new(x, y);
        self.in_path = true;
        self.start = p;
        self.cur = p;
        self.queue.clear();
        self.queue.push(p);
        self.queue_active = true;
        self.qdir = 0;
    }

    pub fn line_to(&mut self, x: i32, y: i32) {
        debug_assert!(x.abs() < COORD_LIMIT && y.abs() < COORD_LIMIT);
        if !self.in_path {
            self.move_to(x, y);
            return;
        }
        let p = IPoint::new(x, y);
        if !self.queue_active {
            self.seg_to(p);
            return;
        }
        let last = *self.queue.last().unwrap();
        let s = (p.y - last.y).signum() as i8;
        if s != 0 && self.qdir != 0 && s != self.qdir {
            // First reversal: the opening run's orientation is settled.
            self.replay_queue();
            self.seg_to(p);
            return;
        }
        if s != 0 {
            self.qdir = s;
        }
        self.queue.push(p);
        self.cur = p;
        if self.queue.len() >= QUEUE_MAX {
            self.replay_queue();
        }
    }

    /// Close the current subpath: flush the queue, draw the closing leg
    /// back to the subpath start, and close the open thread.
    pub fn close(&mut self) {
        if !self.in_path {
            return;
        }
        if self.queue_active {
            self.replay_queue();
        }
        if self.cur != self.start {
            self.seg_to(self.start);
        }
        self.close_thread();
        self.in_path = false;
    }

    /// Convenience wrapper: one closed subpath from a point slice.
    pub fn add_contour(&mut self, pts: &[(i32, i32)]) {
        let mut it = pts.iter();
        if let Some(&(x, y)) = it.next() {
            self.move_to(x, y);
            for &(x, y) in it {
                self.line_to(x, y);
            }
            self.close();
        }
    }

    fn replay_queue(&mut self) {
        self.queue_active = false;
        let pts = std::mem::take(&mut self.queue);
        self.cur = pts[0];
        for &p in &pts[1..] {
            self.seg_to(p);
        }
    }

    /// Feed one leg of the outline into the thread machine.
    fn seg_to(&mut self, p: IPoint) {
        let q = self.cur;
        self.cur = p;
        let dx = p.x - q.x;
        let dy = p.y - q.y;

        if dx == 0 && dy == 0 {
            // A zero-length leg splits the run. Leave a tentative thread
            // behind; the next real leg overwrites it, and if none follows
            // it finalizes degenerate and is skipped.
            if self.open != NIL && self.pending[self.open as usize].tentative() {
                return;
            }
            self.close_thread();
            self.open_thread(q, p, 0);
            return;
        }

        if let Some(side) = seg_outside(&self.clip, q.x, q.y, p.x, p.y) {
            self.clipped |= side;
            self.close_thread();
            return;
        }
        if seg_left_of(&self.clip, q.x, p.x) {
            self.clipped |= ClipSides::LEFT;
        }

        let s = (dy.signum()) as i8;
        if self.open == NIL {
            if s == 0 {
                // Horizontal with no thread underway: pen move only.
                return;
            }
            self.open_thread(q, p, s);
            return;
        }

        let t = &mut self.pending[self.open as usize];
        if t.tentative() {
            if s == 0 {
                return;
            }
            t.x1 = q.x;
            t.y1 = q.y;
            t.x2 = p.x;
            t.y2 = p.y;
            t.dir = s;
            return;
        }

        if s == 0 {
            // Interior horizontal: stored, unless the chain cannot take it,
            // in which case it degrades to a pen move past a thread split.
            if DeltaChain::too_big(dx, 0) || t.delta.is_full() {
                self.close_thread();
                return;
            }
            t.delta.store(dx, 0);
            return;
        }

        if s != t.dir || DeltaChain::too_big(dx, dy) || t.delta.is_full() {
            self.close_thread();
            self.open_thread(q, p, s);
            return;
        }
        t.delta.store(dx, dy);
    }

    fn open_thread(&mut self, q: IPoint, p: IPoint, dir: i8) {
        debug_assert!(self.open == NIL);
        self.open = self.pending.len() as u32;
        self.pending.push(PendingThread {
            x1: q.x,
            y1: q.y,
            x2: p.x,
            y2: p.y,
            dir,
            delta: DeltaChain::new(),
            next: NIL,
        });
    }

    /// Finish the open thread: trim trailing horizontals, canonicalize
    /// upward runs to top-down order, and link it into the close chain.
    fn close_thread(&mut self) {
        if self.open == NIL {
            return;
        }
        let idx = self.open;
        self.open = NIL;
        let t = &mut self.pending[idx as usize];

        while t.delta.len() > 0 {
            let (_, dy) = t.delta.read(t.delta.len() - 1);
            if dy != 0 {
                break;
            }
            t.delta.pop();
        }

        if t.dir < 0 {
            let mut pts: SmallVec<[IPoint; 8]> = SmallVec::new();
            pts.push(IPoint::new(t.x1, t.y1));
            pts.push(IPoint::new(t.x2, t.y2));
            let (mut x, mut y) = (t.x2, t.y2);
            for i in 0..t.delta.len() {
                let (dx, dy) = t.delta.read(i);
                x += dx;
                y += dy;
                pts.push(IPoint::new(x, y));
            }
            pts.reverse();
            t.x1 = pts[0].x;
            t.y1 = pts[0].y;
            t.x2 = pts[1].x;
            t.y2 = pts[1].y;
            let mut rebuilt = DeltaChain::new();
            for w in pts.windows(2).skip(1) {
                rebuilt.store(w[1].x - w[0].x, w[1].y - w[0].y);
            }
            t.delta = rebuilt;
        }

        trace!(
            "thread closed: ({},{})-({},{}) dir {} +{} deltas",
            t.x1,
            t.y1,
            t.x2,
            t.y2,
            t.dir,
            t.delta.len()
        );

        if self.head == NIL {
            self.head = idx;
        } else {
            self.pending[self.tail as usize].next = idx;
        }
        self.tail = idx;
    }

    /// Finalize: close any open subpath, drop degenerate threads, compact
    /// every chain, compute bounds, and charge the result against `arena`.
    ///
    /// Returns Ok(None) for a fill with no renderable content (empty,
    /// fully clipped above/below/right). Geometry left of the clip box is
    /// kept because it still drives winding at the clip's left edge.
    pub fn build(
        mut self,
        arena: &mut dyn Arena,
        size_hint: usize,
    ) -> Result<Option<FillAggregate>, FillError> {
        self.close();

        let mut threads: Vec<Thread> = Vec::new();
        let mut idx = self.head;
        while idx != NIL {
            let pt = &mut self.pending[idx as usize];
            idx = pt.next;
            if pt.x1 == pt.x2 && pt.y1 == pt.y2 && pt.delta.is_empty() {
                continue;
            }
            let orient = if pt.dir < 0 { -1 } else { 1 };
            let mut th = Thread::new(
                pt.x1,
                pt.y1,
                pt.x2,
                pt.y2,
                orient,
                std::mem::take(&mut pt.delta),
            );
            th.delta.compact();
            threads.push(th);
        }
        if threads.is_empty() {
            return Ok(None);
        }

        let mut bbox = IRect::empty();
        for t in threads.iter_mut() {
            for p in t.points() {
                bbox.add_point(p.x, p.y);
            }
        }
        if bbox.y2 < self.clip.y1 || bbox.y1 > self.clip.y2 || bbox.x1 > self.clip.x2 {
            return Ok(None);
        }

        let need = std::mem::size_of::<FillAggregate>()
            + 4 * threads.len()
            + threads.iter().map(Thread::byte_size).sum::<usize>();
        let floor = need.max(ARENA_FLOOR);
        let mut hint = size_hint.max(floor);
        while arena.begin(hint).is_err() {
            if hint == floor {
                return Err(FillError::OutOfMemory);
            }
            hint = (hint / 2).max(floor);
            debug!("fill arena begin failed, retrying with {} bytes", hint);
        }
        let header = std::mem::size_of::<FillAggregate>() + 4 * threads.len();
        if arena.next(header).is_err() {
            arena.abort();
            return Err(FillError::OutOfMemory);
        }
        for t in &threads {
            if arena.next(t.byte_size()).is_err() {
                arena.abort();
                return Err(FillError::OutOfMemory);
            }
        }
        arena.shrink(need);
        arena.commit();

        let n = threads.len();
        let y1clip = self.clip.y1.max(bbox.y1);
        debug!("fill built: {} threads, bbox {:?}", n, bbox);
        Ok(Some(FillAggregate {
            rule: self.rule,
            bbox,
            clipped: self.clipped,
            nexty: y1clip,
            y1clip,
            threads,
            order: (0..n as u32).collect(),
            first_active: 0,
            first_pending: 0,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::HeapArena;

    fn wide_clip() -> ClipBox {
        IRect::new(-10_000, -10_000, 10_000, 10_000)
    }

    fn build(b: FillBuilder) -> FillAggregate {
        let mut arena = HeapArena::new(1 << 20);
        b.build(&mut arena, DEFAULT_SIZE_HINT).unwrap().unwrap()
    }

    #[test]
    fn unit_square_compiles_to_two_bare_threads() {
        let mut b = FillBuilder::new(ScanRule::NonZero, wide_clip());
        b.add_contour(&[(0, 0), (1, 0), (1, 1), (0, 1)]);
        let fill = build(b);

        assert_eq!(fill.thread_count(), 2);
        let a = &fill.threads[0];
        assert_eq!((a.x1, a.y1, a.x2, a.y2, a.orient), (1, 0, 1, 1, 1));
        assert!(a.delta.is_empty());
        let c = &fill.threads[1];
        assert_eq!((c.x1, c.y1, c.x2, c.y2, c.orient), (0, 0, 0, 1, -1));
        assert!(c.delta.is_empty());
        assert_eq!(fill.bbox, IRect::new(0, 0, 1, 1));
    }

    #[test]
    fn triangle_splits_at_the_apex() {
        let mut b = FillBuilder::new(ScanRule::Odd, wide_clip());
        b.add_contour(&[(0, 0), (10, 0), (5, 8)]);
        let fill = build(b);

        assert_eq!(fill.thread_count(), 2);
        let down = &fill.threads[0];
        assert_eq!((down.x1, down.y1, down.x2, down.y2), (10, 0, 5, 8));
        assert_eq!(down.orient, 1);
        let up = &fill.threads[1];
        assert_eq!((up.x1, up.y1, up.x2, up.y2), (0, 0, 5, 8));
        assert_eq!(up.orient, -1);
    }

    #[test]
    fn reversal_after_queue_replay() {
        let mut b = FillBuilder::new(ScanRule::NonZero, wide_clip());
        b.move_to(0, 0);
        b.line_to(0, 5);
        b.line_to(4, 2); // reversal triggers the replay
        b.close();
        let mut fill = build(b);

        assert_eq!(fill.thread_count(), 2);
        assert_eq!(
            (fill.threads[0].x1, fill.threads[0].y1, fill.threads[0].y2),
            (0, 0, 5)
        );
        // The upward tail (0,5)->(4,2)->(0,0) canonicalizes to top-down.
        assert_eq!(fill.threads[1].orient, -1);
        let pts = fill.threads[1].points();
        assert_eq!(pts.first().map(|p| (p.x, p.y)), Some((0, 0)));
        assert_eq!(pts.last().map(|p| (p.x, p.y)), Some((0, 5)));
    }

    #[test]
    fn zero_length_leg_splits_the_run() {
        let mut b = FillBuilder::new(ScanRule::NonZero, wide_clip());
        b.move_to(0, 0);
        b.line_to(0, 5);
        b.line_to(0, 5);
        b.line_to(3, 9);
        b.close();
        let fill = build(b);

        assert_eq!(fill.thread_count(), 3);
        assert_eq!((fill.threads[0].y1, fill.threads[0].y2), (0, 5));
        assert_eq!((fill.threads[1].y1, fill.threads[1].y2), (5, 9));
        assert_eq!(fill.threads[2].orient, -1);
    }

    #[test]
    fn interior_horizontals_stay_trailing_ones_go() {
        let mut b = FillBuilder::new(ScanRule::NonZero, wide_clip());
        // Down-staircase with a horizontal in the middle and one at the end.
        b.move_to(0, 0);
        b.line_to(0, 3);
        b.line_to(4, 3);
        b.line_to(4, 7);
        b.line_to(9, 7);
        b.close(); // closing leg (9,7)->(0,0) goes up, splitting first
        let fill = build(b);

        let stair = &fill.threads[0];
        assert_eq!(stair.delta.len(), 2); // (4,0) kept, trailing (5,0) popped
        assert_eq!(stair.delta.read(0), (4, 0));
        assert_eq!((stair.x2, stair.y2), (0, 3));
    }

    #[test]
    fn segments_above_the_clip_are_dropped_and_flagged() {
        let clip = IRect::new(0, 0, 10, 10);
        let mut b = FillBuilder::new(ScanRule::NonZero, clip);
        b.add_contour(&[(2, 2), (2, -5), (6, -5), (6, 2)]);
        let fill = build(b);

        assert!(fill.clipped.contains(ClipSides::TOP));
        // The two crossing legs survive; the leg at y = -5 does not.
        assert_eq!(fill.thread_count(), 2);
        assert!(fill.threads.iter().all(|t| t.y1.max(t.y2) >= clip.y1));
        assert_eq!(fill.y1clip, 0);
    }

    #[test]
    fn left_of_clip_geometry_is_kept_for_winding() {
        let clip = IRect::new(0, 0, 10, 10);
        let mut b = FillBuilder::new(ScanRule::NonZero, clip);
        b.add_contour(&[(-8, 1), (-4, 1), (-4, 6), (-8, 6)]);
        let fill = build(b);

        assert!(fill.clipped.contains(ClipSides::LEFT));
        assert_eq!(fill.thread_count(), 2);
    }

    #[test]
    fn fully_clipped_out_builds_to_none() {
        let clip = IRect::new(0, 0, 10, 10);
        let mut arena = HeapArena::new(1 << 16);

        let mut b = FillBuilder::new(ScanRule::NonZero, clip);
        b.add_contour(&[(2, 20), (6, 20), (6, 28)]);
        assert_eq!(b.build(&mut arena, DEFAULT_SIZE_HINT).unwrap(), None);

        let empty = FillBuilder::new(ScanRule::NonZero, clip);
        assert_eq!(empty.build(&mut arena, DEFAULT_SIZE_HINT).unwrap(), None);
    }

    #[test]
    fn long_monotone_run_splits_on_chain_capacity() {
        let mut b = FillBuilder::new(ScanRule::NonZero, wide_clip());
        b.move_to(0, 0);
        for y in 1..=300 {
            b.line_to(0, y);
        }
        b.close();
        let mut fill = build(b);

        // 255-delta capacity plus the first segment covers 256 legs; the
        // remaining 44 start a second thread, the closing leg a third.
        assert_eq!(fill.thread_count(), 3);
        assert_eq!(fill.threads[0].y1, 0);
        assert_eq!(fill.threads[0].points().last().unwrap().y, 256);
        assert_eq!(fill.threads[1].y1, 256);
        assert_eq!(fill.threads[1].points().last().unwrap().y, 300);
        assert_eq!((fill.threads[2].y1, fill.threads[2].y2), (0, 300));
        assert_eq!(fill.threads[2].orient, -1);
        assert_eq!(fill.threads[0].orient, 1);
    }

    #[test]
    fn oversized_delta_splits_the_thread() {
        let mut b = FillBuilder::new(
            ScanRule::NonZero,
            IRect::new(-100_000, -100_000, 100_000, 100_000),
        );
        b.move_to(0, 0);
        b.line_to(1, 10);
        b.line_to(2, 50_000); // exceeds the 16-bit delta range
        b.close();
        let fill = build(b);

        assert_eq!(fill.thread_count(), 3);
        assert_eq!((fill.threads[0].y1, fill.threads[0].y2), (0, 10));
        assert_eq!((fill.threads[1].y1, fill.threads[1].y2), (10, 50_000));
    }

    #[test]
    fn arena_exhaustion_reports_out_of_memory() {
        let mut b = FillBuilder::new(ScanRule::NonZero, wide_clip());
        b.add_contour(&[(0, 0), (10, 0), (10, 10), (0, 10)]);
        let mut tiny = HeapArena::new(64);
        assert_eq!(
            b.build(&mut tiny, DEFAULT_SIZE_HINT),
            Err(FillError::OutOfMemory)
        );
    }

    #[test]
    fn oversized_hint_halves_until_it_fits() {
        let mut b = FillBuilder::new(ScanRule::NonZero, wide_clip());
        b.add_contour(&[(0, 0), (10, 0), (10, 10), (0, 10)]);
        let mut arena = HeapArena::new(ARENA_FLOOR + 128);
        let fill = b.build(&mut arena, 1 << 24).unwrap().unwrap();
        assert_eq!(arena.committed(), fill.byte_size());
    }
}
