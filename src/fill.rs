// Copyright 2025 Lars Brubaker
// License: MIT
//
// FillAggregate: the whole-polygon scan-conversion representation a build
// produces and a rasterizer consumes band by band.
//
// The aggregate owns its threads; the order array carries u32 indices into
// them and is the thing preset sorts and the partitions slide over:
//   [0, first_active)        threads already consumed (finished)
//   [first_active, first_pending)  the active window for the current band
//   [first_pending, ..)      threads not yet reached by the clip line

use crate::arena::Arena;
use crate::geom::{ClipSides, IRect};
use crate::thread::Thread;
use thiserror::Error;

/// The only failure a build surfaces; everything else resolves internally
/// (thread splits) or degenerates to a null result.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum FillError {
    /// The arena stayed exhausted after halving retries down to the floor.
    #[error("fill arena exhausted")]
    OutOfMemory,
}

/// Scan rule a fill is rendered with. The first four (discriminants 0..=3)
/// fit the quad record's 2-bit rule field.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScanRule {
    Odd,
    NonZero,
    Positive,
    Negative,
    AbsGeqTwo,
}

impl ScanRule {
    #[inline]
    pub fn index(self) -> u8 {
        match self {
            ScanRule::Odd => 0,
            ScanRule::NonZero => 1,
            ScanRule::Positive => 2,
            ScanRule::Negative => 3,
            ScanRule::AbsGeqTwo => 4,
        }
    }

    pub fn from_index(i: u8) -> ScanRule {
        match i {
            0 => ScanRule::Odd,
            1 => ScanRule::NonZero,
            2 => ScanRule::Positive,
            3 => ScanRule::Negative,
            _ => ScanRule::AbsGeqTwo,
        }
    }

    /// Whether the rule fits the quad record's 2-bit field.
    #[inline]
    pub fn quad_packable(self) -> bool {
        self.index() < 4
    }
}

#[derive(Debug, Clone)]
pub struct FillAggregate {
    pub rule: ScanRule,
    /// Conservative device-space bounds from decoding every chain once.
    pub bbox: IRect,
    /// Clip sides that affected construction.
    pub clipped: ClipSides,
    /// Next scanline the band cursor will hand out.
    pub nexty: i32,
    /// Clip line the cursor is preset to.
    pub y1clip: i32,
    pub threads: Vec<Thread>,
    pub order: Vec<u32>,
    pub first_active: usize,
    pub first_pending: usize,
}

/// Cache identity: scan rule plus the structural content of every thread
/// (endpoints, orientation, delta bytes). Cursor state is excluded.
impl PartialEq for FillAggregate {
    fn eq(&self, other: &Self) -> bool {
        self.rule == other.rule && self.threads == other.threads
    }
}
impl Eq for FillAggregate {}

impl FillAggregate {
    /// Bytes this aggregate charges against an arena: header, order array,
    /// threads and their delta bytes.
    pub fn byte_size(&self) -> usize {
        std::mem::size_of::<FillAggregate>()
            + 4 * self.threads.len()
            + self.threads.iter().map(Thread::byte_size).sum::<usize>()
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Order indices of the active window for the current band.
    pub fn thread_window(&self) -> &[u32] {
        &self.order[self.first_active..self.first_pending]
    }

    /// True once every thread has moved to the finished partition.
    pub fn is_exhausted(&self) -> bool {
        self.first_active == self.order.len()
    }

    /// Copy this aggregate (which may be a stack-resident composite) into
    /// one fresh arena allocation. The copy's cursor is reset so another
    /// consumer can preset it independently.
    pub fn duplicate(&self, arena: &mut dyn Arena) -> Result<FillAggregate, FillError> {
        let size = self.byte_size();
        if arena.begin(size).is_err() {
            return Err(FillError::OutOfMemory);
        }
        if arena.next(size).is_err() {
            arena.abort();
            return Err(FillError::OutOfMemory);
        }
        arena.commit();
        let mut copy = self.clone();
        copy.order = (0..copy.threads.len() as u32).collect();
        copy.first_active = 0;
        copy.first_pending = 0;
        copy.nexty = copy.y1clip;
        Ok(copy)
    }

    /// Append another aggregate's threads onto this one's unused tail.
    /// The receiver must have been sized for the combined thread count;
    /// growing here would break the single-allocation contract.
    pub fn append_from(&mut self, other: &FillAggregate) {
        debug_assert!(
            self.threads.len() + other.threads.len() <= self.threads.capacity(),
            "append target was not pre-sized"
        );
        let base = self.threads.len() as u32;
        self.threads.extend(other.threads.iter().cloned());
        self.order.extend(other.order.iter().map(|&i| base + i));
        self.bbox.add_point(other.bbox.x1, other.bbox.y1);
        self.bbox.add_point(other.bbox.x2, other.bbox.y2);
        self.clipped |= other.clipped;
        self.y1clip = self.y1clip.min(other.y1clip);
        self.nexty = self.y1clip;
        self.first_active = 0;
        self.first_pending = 0;
    }

    /// FNV-1a over thread endpoints, the hash the content-addressable fill
    /// cache keys on.
    pub fn endpoint_hash(&self) -> u64 {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x100_0000_01b3;
        let mut h = OFFSET;
        let mut mix = |v: i32| {
            for b in v.to_le_bytes() {
                h ^= b as u64;
                h = h.wrapping_mul(PRIME);
            }
        };
        for t in &self.threads {
            mix(t.x1);
            mix(t.y1);
            mix(t.x2);
            mix(t.y2);
        }
        h
    }
}
