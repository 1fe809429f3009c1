// Copyright 2025 Lars Brubaker
// License: MIT
//
// DeltaChain: the variable-width delta-compressed continuation-vertex list
// owned by each thread.
//
// A chain holds up to 255 (dx, dy) pairs. During construction it uses the
// raw 16-bit layout and supports random access; once a thread is finished
// the chain is compacted to the narrowest of three fixed widths and becomes
// a read-only, re-iterable stream.
//
// Unit layout, shared by all widths: dy occupies the low half of the unit,
// dx the high half. dx always decodes by arithmetic shift (sign extension).
//   width 16: u32 LE unit, dy = low 16 bits as i16, dx = high 16 bits
//   width  8: u16 LE unit, dy = low byte unsigned (0..=255), dx = high byte
//   width  4: u8 unit,     dy = low nibble unsigned (0..=15), dx = high nibble
// The 4- and 8-bit widths are only selected after canonicalization, when
// every dy is non-negative; the 16-bit dy keeps its sign for the brief
// construction window where chains may still run upward.

/// Hard cap on entries per chain; a full chain forces a thread split.
pub const CHAIN_MAX: usize = 255;

/// Largest delta magnitude the raw 16-bit layout can hold.
pub const DELTA_LIMIT: i32 = 0x7FFF;

#[derive(Debug, Clone)]
pub struct DeltaChain {
    count: u16,
    cursor: u16,
    /// Bits per ordinate: 4, 8 or 16.
    width: u8,
    data: Vec<u8>,
}

/// Structural equality covers the stored deltas, not the read cursor.
impl PartialEq for DeltaChain {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count && self.width == other.width && self.data == other.data
    }
}
impl Eq for DeltaChain {}

impl Default for DeltaChain {
    fn default() -> Self {
        DeltaChain::new()
    }
}

impl DeltaChain {
    pub fn new() -> Self {
        DeltaChain {
            count: 0,
            cursor: 0,
            width: 16,
            data: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count as usize >= CHAIN_MAX
    }

    /// Bits per ordinate of the current layout.
    #[inline]
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Backing bytes (for arena accounting and structural hashing).
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// True when the pair cannot be stored even in the raw 16-bit layout;
    /// the builder answers by splitting the thread instead.
    #[inline]
    pub fn too_big(dx: i32, dy: i32) -> bool {
        dx.abs() > DELTA_LIMIT || dy.abs() > DELTA_LIMIT
    }

    /// Append a pair. Zero deltas and out-of-range deltas are invariant
    /// violations: the builder elides the former and splits on the latter.
    pub fn store(&mut self, dx: i32, dy: i32) {
        debug_assert!(self.width == 16, "store after compact");
        debug_assert!(!(dx == 0 && dy == 0), "(0,0) is not storable");
        debug_assert!(!Self::too_big(dx, dy), "delta exceeds raw range");
        debug_assert!(!self.is_full());
        let unit = (((dx as u32) & 0xFFFF) << 16) | ((dy as u32) & 0xFFFF);
        self.data.extend_from_slice(&unit.to_le_bytes());
        self.count += 1;
    }

    /// Random-access read; valid at any width but positions are only
    /// meaningful before the cursor-based iteration contract begins.
    pub fn read(&self, pos: usize) -> (i32, i32) {
        debug_assert!(pos < self.count as usize, "read past end of chain");
        self.decode(pos)
    }

    /// Random-access overwrite; only valid before compaction.
    pub fn write(&mut self, pos: usize, dx: i32, dy: i32) {
        debug_assert!(self.width == 16, "write after compact");
        debug_assert!(pos < self.count as usize);
        debug_assert!(!(dx == 0 && dy == 0));
        debug_assert!(!Self::too_big(dx, dy));
        let unit = (((dx as u32) & 0xFFFF) << 16) | ((dy as u32) & 0xFFFF);
        self.data[pos * 4..pos * 4 + 4].copy_from_slice(&unit.to_le_bytes());
    }

    /// Drop the last entry; only valid before compaction. Used by the
    /// builder to trim trailing horizontal legs at thread close.
    pub fn pop(&mut self) -> Option<(i32, i32)> {
        debug_assert!(self.width == 16, "pop after compact");
        if self.count == 0 {
            return None;
        }
        let last = self.decode(self.count as usize - 1);
        self.count -= 1;
        self.data.truncate(self.count as usize * 4);
        Some(last)
    }

    /// Rewind the read cursor.
    #[inline]
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Advance the cursor one entry, accumulating the delta into the
    /// caller's running point. Returns false at the end of the chain.
    pub fn get(&mut self, x: &mut i32, y: &mut i32) -> bool {
        if self.cursor >= self.count {
            return false;
        }
        let (dx, dy) = self.decode(self.cursor as usize);
        self.cursor += 1;
        *x += dx;
        *y += dy;
        true
    }

    fn decode(&self, pos: usize) -> (i32, i32) {
        match self.width {
            4 => {
                let b = self.data[pos];
                (((b as i8) >> 4) as i32, (b & 0x0F) as i32)
            }
            8 => {
                let u = u16::from_le_bytes([self.data[pos * 2], self.data[pos * 2 + 1]]);
                (((u as i16) >> 8) as i32, (u & 0x00FF) as i32)
            }
            _ => {
                let u = u32::from_le_bytes([
                    self.data[pos * 4],
                    self.data[pos * 4 + 1],
                    self.data[pos * 4 + 2],
                    self.data[pos * 4 + 3],
                ]);
                (((u as i32) >> 16), ((u & 0xFFFF) as u16 as i16) as i32)
            }
        }
    }

    /// Re-pack the chain at the narrowest width that can represent every
    /// stored pair, shrinking the backing allocation. The chain is read-only
    /// (cursor iteration only) afterwards.
    ///
    /// Width selection reproduces the historical thresholds exactly:
    /// 4-bit iff every dy is in 0..=15 and |dx| <= 7; 8-bit iff every dy is
    /// in 0..=255 and |dx| <= 127; raw 16-bit otherwise.
    pub fn compact(&mut self) {
        debug_assert!(self.width == 16, "compact called twice");
        let n = self.count as usize;
        let mut fits4 = true;
        let mut fits8 = true;
        for pos in 0..n {
            let (dx, dy) = self.decode(pos);
            if !(0..=15).contains(&dy) || dx.abs() > 7 {
                fits4 = false;
            }
            if !(0..=255).contains(&dy) || dx.abs() > 127 {
                fits8 = false;
            }
            if !fits4 && !fits8 {
                break;
            }
        }
        if fits4 {
            // Forward re-pack is safe: each write lands before its read.
            for pos in 0..n {
                let (dx, dy) = self.decode16(pos);
                self.data[pos] = (((dx & 0x0F) as u8) << 4) | ((dy & 0x0F) as u8);
            }
            self.width = 4;
            self.data.truncate(n);
        } else if fits8 {
            for pos in 0..n {
                let (dx, dy) = self.decode16(pos);
                let u = (((dx as u16) & 0x00FF) << 8) | ((dy as u16) & 0x00FF);
                self.data[pos * 2..pos * 2 + 2].copy_from_slice(&u.to_le_bytes());
            }
            self.width = 8;
            self.data.truncate(n * 2);
        }
        self.data.shrink_to_fit();
        self.cursor = 0;
    }

    #[inline]
    fn decode16(&self, pos: usize) -> (i32, i32) {
        let u = u32::from_le_bytes([
            self.data[pos * 4],
            self.data[pos * 4 + 1],
            self.data[pos * 4 + 2],
            self.data[pos * 4 + 3],
        ]);
        (((u as i32) >> 16), ((u & 0xFFFF) as u16 as i16) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(chain: &mut DeltaChain, start: (i32, i32)) -> Vec<(i32, i32)> {
        chain.reset();
        let (mut x, mut y) = start;
        let mut out = Vec::new();
        while chain.get(&mut x, &mut y) {
            out.push((x, y));
        }
        out
    }

    #[test]
    fn raw_round_trip() {
        let deltas = [(3, 1), (-2, 0), (0, 5), (-7, 7), (1000, 30000)];
        let mut c = DeltaChain::new();
        for &(dx, dy) in &deltas {
            c.store(dx, dy);
        }
        assert_eq!(c.len(), 5);
        let mut acc = (0, 0);
        let expect: Vec<_> = deltas
            .iter()
            .map(|&(dx, dy)| {
                acc = (acc.0 + dx, acc.1 + dy);
                acc
            })
            .collect();
        assert_eq!(drain(&mut c, (0, 0)), expect);
        // Chains are re-iterable.
        assert_eq!(drain(&mut c, (0, 0)), expect);
    }

    #[test]
    fn negative_dy_survives_raw_layout() {
        let mut c = DeltaChain::new();
        c.store(5, -3);
        c.store(-5, -300);
        assert_eq!(c.read(0), (5, -3));
        assert_eq!(c.read(1), (-5, -300));
    }

    #[test]
    fn write_and_pop_before_compact() {
        let mut c = DeltaChain::new();
        c.store(1, 1);
        c.store(2, 2);
        c.store(3, 0);
        c.write(0, -4, 9);
        assert_eq!(c.read(0), (-4, 9));
        assert_eq!(c.pop(), Some((3, 0)));
        assert_eq!(c.len(), 2);
        assert_eq!(c.pop(), Some((2, 2)));
        assert_eq!(c.pop(), Some((-4, 9)));
        assert_eq!(c.pop(), None);
    }

    #[test]
    fn compact_selects_4_bit() {
        let mut c = DeltaChain::new();
        for _ in 0..300usize.min(CHAIN_MAX) {
            c.store(1, 1);
        }
        let raw_bytes = c.bytes().len();
        assert_eq!(raw_bytes, CHAIN_MAX * 4);
        c.compact();
        assert_eq!(c.width(), 4);
        assert_eq!(c.bytes().len(), CHAIN_MAX);
        assert!(c.bytes().len() < raw_bytes);
        // Bit-for-bit identical stream after compaction.
        let pts = drain(&mut c, (0, 0));
        assert_eq!(pts.len(), CHAIN_MAX);
        assert_eq!(pts[0], (1, 1));
        assert_eq!(pts[CHAIN_MAX - 1], (CHAIN_MAX as i32, CHAIN_MAX as i32));
    }

    #[test]
    fn compact_selects_8_bit() {
        let mut c = DeltaChain::new();
        c.store(-100, 200);
        c.store(127, 0);
        c.store(-7, 15); // would fit 4-bit alone
        c.compact();
        assert_eq!(c.width(), 8);
        assert_eq!(c.bytes().len(), 6);
        assert_eq!(drain(&mut c, (0, 0)), vec![(-100, 200), (27, 200), (20, 215)]);
    }

    #[test]
    fn compact_keeps_16_bit_for_wide_deltas() {
        let mut c = DeltaChain::new();
        c.store(1, 1);
        c.store(300, 2);
        c.compact();
        assert_eq!(c.width(), 16);
        assert_eq!(drain(&mut c, (0, 0)), vec![(1, 1), (301, 3)]);
    }

    #[test]
    fn compact_4_bit_boundaries() {
        // dy = 15 and dx = +/-7 are the last values that still fit 4 bits.
        let mut c = DeltaChain::new();
        c.store(7, 15);
        c.store(-7, 0);
        c.compact();
        assert_eq!(c.width(), 4);
        assert_eq!(drain(&mut c, (0, 0)), vec![(7, 15), (0, 15)]);

        // dx = -8 falls off the symmetric 4-bit range.
        let mut c = DeltaChain::new();
        c.store(-8, 1);
        c.compact();
        assert_eq!(c.width(), 8);

        // A single negative dy forces the raw layout.
        let mut c = DeltaChain::new();
        c.store(1, -1);
        c.compact();
        assert_eq!(c.width(), 16);
        assert_eq!(drain(&mut c, (0, 0)), vec![(1, -1)]);
    }

    #[test]
    fn full_after_255() {
        let mut c = DeltaChain::new();
        for _ in 0..CHAIN_MAX {
            assert!(!c.is_full());
            c.store(0, 1);
        }
        assert!(c.is_full());
    }

    #[test]
    #[should_panic(expected = "not storable")]
    fn zero_delta_asserts() {
        let mut c = DeltaChain::new();
        c.store(0, 0);
    }

    #[test]
    #[should_panic(expected = "raw range")]
    fn oversized_delta_asserts() {
        let mut c = DeltaChain::new();
        c.store(0x8000, 0);
    }

    #[test]
    fn too_big_boundary() {
        assert!(!DeltaChain::too_big(0x7FFF, -0x7FFF));
        assert!(DeltaChain::too_big(0x8000, 0));
        assert!(DeltaChain::too_big(0, -0x8000));
    }
}
