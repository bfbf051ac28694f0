//! Regression comparison of two signal traces.
//!
//! Lanes of a reference trace are matched by name against a second trace,
//! diffed sample by sample and rolled up into a signal → group → component
//! tree with a single pass/fail verdict.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod batch;
pub mod config;
pub mod diff;
pub mod error;
pub mod resolve;
pub mod session;

pub use aggregate::{
    Aggregator, ComponentResult, GroupResult, Ranked, ResultTree, SignalResult, aggregate,
    reporting_order,
};
pub use batch::{
    BatchConfig, BatchReport, PairFailure, PairOutcome, TestType, discover, pair_count, pair_name,
    pairs, recording_of, run_batch, run_batch_with,
};
pub use config::{CompareConfig, DEFAULT_TIME_AXIS};
pub use diff::{DivergenceVector, LaneDiff, diff};
pub use error::{CompareResult, DiffError, SessionError};
pub use resolve::{Resolver, resolve};
pub use session::{ComparisonSession, FirstDivergence, SessionResult, compare};
