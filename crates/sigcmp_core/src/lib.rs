//! sigcmp Core Types
//!
//! Shared vocabulary for the trace decoder and the comparison engine.
//! This crate contains pure types and logic with no I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod interval;
pub mod kind;
pub mod path;
pub mod time;
pub mod version;

// Re-exports
pub use error::{CoreError, CoreResult};
pub use interval::{Interval, intervals};
pub use kind::ElementKind;
pub use path::{SEPARATOR, component_of, group_of, trailing_matches};
pub use time::SampleAxis;
pub use version::{FormatVersion, Layout};
