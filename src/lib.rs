// scanfill: integer scan-conversion fills as Y-monotonic edge threads
// Copyright 2025 Lars Brubaker
// License: MIT

pub mod arena;
pub mod band;
pub mod builder;
pub mod compare;
pub mod delta;
pub mod fill;
pub mod geom;
pub mod quad;
pub mod thread;

pub use arena::{Arena, ArenaFull, HeapArena};
pub use band::{preset, repair};
pub use builder::{FillBuilder, ARENA_FLOOR, DEFAULT_SIZE_HINT};
pub use fill::{FillAggregate, FillError, ScanRule};
pub use geom::{ClipBox, ClipSides, IPoint, IRect};
pub use quad::{encode as encode_quad, QuadRecord};
pub use thread::Thread;
