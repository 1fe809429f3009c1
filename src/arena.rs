// Copyright 2025 Lars Brubaker
// License: MIT
//
// The single-shot arena collaborator a fill build charges its memory
// against. The RIP supplies its own implementation over page memory; the
// crate ships a Vec-accounting HeapArena so builds run standalone and
// exhaustion paths stay testable.
//
// Protocol: begin(size_hint) opens a promise, next(nbytes) consumes from
// it, shrink(new_size) gives back the unused tail, then commit or abort.
// The top-level build halves its size hint and retries when begin fails
// (see builder::ARENA_FLOOR).

/// Raised by an arena that cannot honor a promise or an allocation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ArenaFull;

pub trait Arena {
    /// Open a promise of `size_hint` contiguous bytes.
    fn begin(&mut self, size_hint: usize) -> Result<(), ArenaFull>;
    /// Take `nbytes` from the open promise.
    fn next(&mut self, nbytes: usize) -> Result<(), ArenaFull>;
    /// Give back everything past `new_size` of the open promise.
    fn shrink(&mut self, new_size: usize);
    /// Keep what was taken; the promise is closed.
    fn commit(&mut self);
    /// Discard the promise entirely.
    fn abort(&mut self);
}

/// Byte-accounting arena with a fixed capacity.
#[derive(Debug)]
pub struct HeapArena {
    capacity: usize,
    committed: usize,
    /// (promised, used) while a promise is open.
    promise: Option<(usize, usize)>,
}

impl HeapArena {
    pub fn new(capacity: usize) -> Self {
        HeapArena {
            capacity,
            committed: 0,
            promise: None,
        }
    }

    pub fn committed(&self) -> usize {
        self.committed
    }

    pub fn available(&self) -> usize {
        self.capacity - self.committed
    }
}

impl Arena for HeapArena {
    fn begin(&mut self, size_hint: usize) -> Result<(), ArenaFull> {
        debug_assert!(self.promise.is_none(), "promise already open");
        if size_hint > self.available() {
            return Err(ArenaFull);
        }
        self.promise = Some((size_hint, 0));
        Ok(())
    }

    fn next(&mut self, nbytes: usize) -> Result<(), ArenaFull> {
        let (promised, used) = self.promise.expect("next outside a promise");
        if used + nbytes > promised {
            return Err(ArenaFull);
        }
        self.promise = Some((promised, used + nbytes));
        Ok(())
    }

    fn shrink(&mut self, new_size: usize) {
        if let Some((promised, used)) = self.promise {
            debug_assert!(used <= new_size && new_size <= promised);
            self.promise = Some((new_size, used));
        }
    }

    fn commit(&mut self) {
        if let Some((promised, _)) = self.promise.take() {
            self.committed += promised;
        }
    }

    fn abort(&mut self) {
        self.promise = None;
    }
}
