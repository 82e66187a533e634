//! # `likeindex` Core
//!
//! In-memory index answering SQL `LIKE` patterns over a changing set of
//! byte strings.
//!
//! Every indexed value is decomposed into per-byte bitmaps keyed by position
//! from the start and from the end, plus bitmaps keyed by length. A pattern
//! is answered with bitmap intersections and unions only; no stored value is
//! ever compared against the pattern.
//!
//! ## Features
//!
//! - **`%` and `_` wildcards**: exact, prefix, suffix, substring and
//!   multi-part patterns, each with its own strategy
//! - **CRUD**: inserts are incremental, deletes are tombstoned and purged
//!   in batches by threshold compaction, freed slots are reused
//! - **Pluggable bitmaps**: roaring (default) or dense word bitsets
//! - **Shared access**: `parking_lot` read/write wrapper and a handle registry
//!
//! ## Quick Start
//!
//! ```rust
//! use likeindex_core::{LikeIndex, RowLocation};
//!
//! let mut index = LikeIndex::new();
//! index.insert(RowLocation::new(0, 1), "cat")?;
//! index.insert(RowLocation::new(0, 2), "car")?;
//! index.insert(RowLocation::new(3, 1), "scar")?;
//!
//! // Results come back sorted by (block, offset).
//! let hits = index.match_pattern("%ar")?;
//! assert_eq!(hits, vec![RowLocation::new(0, 2), RowLocation::new(3, 1)]);
//!
//! index.delete_where(|loc| loc.block == 3);
//! assert_eq!(index.match_pattern("%ar")?.len(), 1);
//! # Ok::<(), likeindex_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
// =============================================================================
// STYLISTIC LINTS - Safe to allow globally (no bug risk)
// =============================================================================
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::must_use_candidate)]

pub mod bitmap;
pub mod concurrent;
pub mod config;
pub mod engine;
#[cfg(test)]
mod engine_tests;
pub mod error;
#[cfg(test)]
mod error_tests;
pub mod length;
pub mod pattern;
pub mod positional;
#[cfg(test)]
mod proptest_tests;
pub mod query;
pub mod registry;
pub mod source;
pub mod store;

pub use bitmap::{Bitmap, BitmapKind};
pub use concurrent::ConcurrentLikeIndex;
pub use config::{ConfigError, LikeIndexConfig};
pub use engine::{IndexStats, LikeIndex};
pub use error::{Error, Result};
pub use query::{QueryPlan, Strategy};
pub use registry::{IndexHandle, IndexRegistry};
pub use source::{RecordSource, RowLocation};
