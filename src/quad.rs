// Copyright 2025 Lars Brubaker
// License: MIT
//
// Packed quad records: a whole fill of at most four corners compressed
// into one u32, so trivial fills (rectangles, lines, simple quads) can
// live in a cache line instead of a full aggregate.
//
// Word layout, low to high:
//   [0..2)   scan rule index (Odd/NonZero/Positive/Negative)
//   [2..4)   iy2: first point index at bbox bottom, 0 marks height 0
//   [4..6)   ix1: first point index at bbox left
//   [6..8)   ix2: first index other than ix1 at bbox right; (ix1,ix2) is
//            (0,3) when the bbox width is 0
//   [8..32)  four 6-bit ordinate fields: the two free Xs in point order,
//            then the two free Ys in point order. Each field is a 5-bit
//            magnitude plus a direction bit: 0 measures up from the low
//            bbox edge, 1 measures down from the high edge.
//
// Decoding needs the fill's bbox; the cache stores it next to the word.

use smallvec::SmallVec;

use crate::fill::{FillAggregate, ScanRule};
use crate::geom::{ClipSides, IPoint, IRect};

const ORD_DIR: u32 = 0x20;
const ORD_MAG: u32 = 0x1F;

/// Shape signature: everything in the word except the rule bits.
const fn pack_sig(iy2: u32, ix1: u32, ix2: u32, ords: [u32; 4]) -> u32 {
    iy2 | ix1 << 2 | ix2 << 4 | ords[0] << 6 | ords[1] << 12 | ords[2] << 18 | ords[3] << 24
}

const SIG_POINT: u32 = pack_sig(0, 0, 3, [0, 0, 0, 0]);
const SIG_LINE_H: u32 = pack_sig(0, 0, 1, [ORD_DIR, ORD_DIR, 0, 0]);
const SIG_LINE_V: u32 = pack_sig(1, 0, 3, [0, 0, ORD_DIR, ORD_DIR]);
const SIG_LINE_DOWN_RIGHT: u32 = pack_sig(1, 0, 1, [ORD_DIR, ORD_DIR, ORD_DIR, ORD_DIR]);
const SIG_LINE_DOWN_LEFT: u32 = pack_sig(1, 1, 0, [0, 0, ORD_DIR, ORD_DIR]);
const SIG_RECT_CW: u32 = pack_sig(2, 0, 1, [ORD_DIR, 0, 0, ORD_DIR]);
const SIG_RECT_CCW: u32 = pack_sig(1, 0, 2, [0, ORD_DIR, ORD_DIR, 0]);

/// The eight axis-aligned right triangles: four hypotenuse orientations,
/// each in both windings.
const SIG_TRIANGLES: [u32; 8] = [
    pack_sig(2, 0, 1, [ORD_DIR, ORD_DIR, 0, ORD_DIR]),
    pack_sig(1, 0, 1, [ORD_DIR, ORD_DIR, 0, 0]),
    pack_sig(2, 0, 1, [0, 0, 0, ORD_DIR]),
    pack_sig(1, 0, 2, [0, ORD_DIR, 0, 0]),
    pack_sig(1, 0, 1, [0, 0, ORD_DIR, ORD_DIR]),
    pack_sig(1, 0, 2, [0, ORD_DIR, ORD_DIR, ORD_DIR]),
    pack_sig(1, 2, 0, [ORD_DIR, 0, ORD_DIR, ORD_DIR]),
    pack_sig(1, 1, 0, [ORD_DIR, ORD_DIR, ORD_DIR, ORD_DIR]),
];

/// One whole fill in 32 bits.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct QuadRecord(pub u32);

impl QuadRecord {
    #[inline]
    pub fn word(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn rule(self) -> ScanRule {
        ScanRule::from_index((self.0 & 0x3) as u8)
    }

    #[inline]
    fn sig(self) -> u32 {
        self.0 >> 2
    }

    pub fn is_point(self) -> bool {
        self.sig() == SIG_POINT
    }

    pub fn is_line(self) -> bool {
        matches!(
            self.sig(),
            SIG_LINE_H | SIG_LINE_V | SIG_LINE_DOWN_RIGHT | SIG_LINE_DOWN_LEFT
        )
    }

    pub fn is_triangle(self) -> bool {
        SIG_TRIANGLES.contains(&self.sig())
    }

    pub fn is_rect(self) -> bool {
        matches!(self.sig(), SIG_RECT_CW | SIG_RECT_CCW)
    }

    /// Reconstruct the corner list against the fill's bbox. Returns the
    /// padded four points and the real corner count.
    pub fn to_points(self, bbox: &IRect) -> ([IPoint; 4], usize) {
        let word = self.0;
        let iy2 = (word >> 2 & 0x3) as usize;
        let ix1 = (word >> 4 & 0x3) as usize;
        let ix2 = (word >> 6 & 0x3) as usize;
        let ords = [
            word >> 8 & 0x3F,
            word >> 14 & 0x3F,
            word >> 20 & 0x3F,
            word >> 26 & 0x3F,
        ];
        let flat_x = bbox.x1 == bbox.x2;
        let flat_y = bbox.y1 == bbox.y2;

        let mut pts = [IPoint::new(0, 0); 4];
        let mut xo = 0;
        let mut yo = 2;
        for (i, p) in pts.iter_mut().enumerate() {
            p.x = if flat_x {
                bbox.x1
            } else if i == ix1 {
                bbox.x1
            } else if i == ix2 {
                bbox.x2
            } else {
                let o = ords[xo];
                xo += 1;
                decode_ord(o, bbox.x1, bbox.x2)
            };
            p.y = if flat_y {
                bbox.y1
            } else if i == 0 {
                bbox.y1
            } else if i == iy2 {
                bbox.y2
            } else {
                let o = ords[yo];
                yo += 1;
                decode_ord(o, bbox.y1, bbox.y2)
            };
        }

        let mut n = 4;
        while n > 1 && pts[n - 1] == pts[n - 2] {
            n -= 1;
        }
        (pts, n)
    }
}

#[inline]
fn decode_ord(o: u32, lo: i32, hi: i32) -> i32 {
    let m = (o & ORD_MAG) as i32;
    if o & ORD_DIR != 0 {
        hi - m
    } else {
        lo + m
    }
}

#[inline]
fn encode_ord(v: i32, lo: i32, hi: i32) -> Option<u32> {
    if lo == hi {
        return Some(0);
    }
    if v == hi {
        return Some(ORD_DIR);
    }
    if v - lo <= ORD_MAG as i32 {
        return Some((v - lo) as u32);
    }
    if hi - v <= ORD_MAG as i32 {
        return Some(ORD_DIR | (hi - v) as u32);
    }
    None
}

/// Try to compress a whole fill into one quad record. Fails (None) when
/// the fill has more than four corners, was clipped on a dropping side,
/// uses a rule outside the 2-bit field, or has a corner too far from the
/// bbox edges for the 5-bit magnitudes.
pub fn encode(fill: &mut FillAggregate) -> Option<QuadRecord> {
    if !fill.rule.quad_packable() {
        return None;
    }
    if fill.clipped.intersects(ClipSides::DROPPED) {
        return None;
    }

    // Reconstruct the drawn outline: threads in construction order, each
    // in the direction the path drew it, junction duplicates elided.
    let mut pts: SmallVec<[IPoint; 8]> = SmallVec::new();
    for t in fill.threads.iter_mut() {
        let mut tp = t.points();
        if t.orient < 0 {
            tp.reverse();
        }
        for p in tp {
            if pts.last() == Some(&p) {
                continue;
            }
            if pts.len() >= 6 {
                return None;
            }
            pts.push(p);
        }
    }
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    if pts.is_empty() || pts.len() > 4 {
        return None;
    }

    // Canonical order: rotate the topmost-leftmost corner to the front,
    // pad with trailing duplicates.
    let first = (0..pts.len())
        .min_by_key(|&i| (pts[i].y, pts[i].x))
        .unwrap_or(0);
    pts.rotate_left(first);
    while pts.len() < 4 {
        pts.push(*pts.last().unwrap());
    }

    let bbox = &fill.bbox;
    debug_assert!(pts[0].y == bbox.y1);

    let iy2 = if bbox.y1 == bbox.y2 {
        0
    } else {
        (1..4).find(|&i| pts[i].y == bbox.y2)?
    };
    let (ix1, ix2) = if bbox.x1 == bbox.x2 {
        (0, 3)
    } else {
        let ix1 = (0..4).find(|&i| pts[i].x == bbox.x1)?;
        let ix2 = (0..4).find(|&i| i != ix1 && pts[i].x == bbox.x2)?;
        (ix1, ix2)
    };

    let mut ords = [0u32; 4];
    let mut slot = 0;
    for (i, p) in pts.iter().enumerate() {
        if i != ix1 && i != ix2 {
            ords[slot] = encode_ord(p.x, bbox.x1, bbox.x2)?;
            slot += 1;
        }
    }
    debug_assert!(slot == 2);
    // A flat Y axis pins nothing beyond point 0 (iy2 holds the reserved
    // value 0), so the free-Y slots stay zero; the decoder never reads
    // them on that branch.
    if bbox.y1 != bbox.y2 {
        for (i, p) in pts.iter().enumerate() {
            if i != 0 && i != iy2 {
                ords[slot] = encode_ord(p.y, bbox.y1, bbox.y2)?;
                slot += 1;
            }
        }
        debug_assert!(slot == 4);
    }

    let word = fill.rule.index() as u32
        | (iy2 as u32) << 2
        | (ix1 as u32) << 4
        | (ix2 as u32) << 6
        | pack_sig(0, 0, 0, ords) << 2;
    Some(QuadRecord(word))
}
