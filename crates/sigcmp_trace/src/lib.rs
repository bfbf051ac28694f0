//! sigcmp Trace Container
//!
//! Decoder and reference encoder for BSIG signal traces. A trace is opened
//! once, its lane catalog parsed eagerly, and lane data materialized lazily
//! one window at a time.
//!
//! Two on-disk layouts are supported behind the same handle:
//! the legacy row-interleaved layout (version 1) and the block layout
//! (versions 2 and 3, with optional per-block zlib compression).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block;
pub mod catalog;
pub mod codec;
pub mod error;
pub mod file;
pub mod legacy;
pub mod values;
pub mod writer;

pub use catalog::{Catalog, LaneDescriptor, Storage};
pub use error::{TraceError, TraceResult};
pub use file::{OpenOptions, TraceFile};
pub use values::{Lane, LaneValues, Numeric};
pub use writer::{TraceWriter, WriterOptions};
