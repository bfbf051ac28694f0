//! sigcmp Reports
//!
//! Report artifacts for comparison results: a JUnit XML document over a
//! whole batch, plus a component CSV and a JSON timeline per compared pair.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod component_csv;
pub mod error;
pub mod junit;
pub mod options;
pub mod timeline;

pub use component_csv::{ComponentRow, component_rows, write_component_csv};
pub use error::{ReportError, ReportResult};
pub use junit::{TestCase, TestSuite, write_junit};
pub use options::ReportOptions;
pub use timeline::{Task, TimelineRow, timeline, write_timeline};

use sigcmp_compare::BatchReport;
use std::path::{Path, PathBuf};

/// Write the CSV and timeline of every compared pair into `dir`
///
/// # Errors
///
/// Returns error if the directory cannot be created or a file cannot be written
pub fn write_pair_reports(
    dir: impl AsRef<Path>,
    report: &BatchReport,
    options: &ReportOptions,
) -> ReportResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for outcome in &report.outcomes {
        let csv = dir.join(format!("{}.csv", outcome.name));
        write_component_csv(&csv, &outcome.result, options)?;
        written.push(csv);
        written.extend(write_timeline(dir, &outcome.name, &outcome.result, options)?);
    }
    Ok(written)
}
