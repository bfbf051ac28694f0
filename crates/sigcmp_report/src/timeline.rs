//! Gantt-style JSON timeline of divergences.
//!
//! Components come first, each as a top-level row; groups follow as child
//! rows pointing at their component through `parent`.

use crate::component_csv::reported_components;
use crate::error::ReportResult;
use crate::options::ReportOptions;
use serde::{Deserialize, Serialize};
use sigcmp_compare::SessionResult;
use sigcmp_core::{Interval, SampleAxis};
use std::path::{Path, PathBuf};
use tracing::info;

/// Bar color of component tasks
pub const COMPONENT_COLOR: &str = "#F12232";

/// Bar color of group tasks
pub const GROUP_COLOR: &str = "#F1C232";

/// One divergence bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// `<row name>_<n>`, numbered from 1
    pub id: String,
    /// Bar color
    pub color: String,
    /// Start offset in microseconds
    pub from: i64,
    /// Stop offset in microseconds, inclusive
    pub to: i64,
    /// Start and stop in seconds
    pub tooltip_string: String,
}

/// One timeline row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineRow {
    /// Component id, or group name without its component
    pub name: String,
    /// Divergence bars
    pub tasks: Vec<Task>,
    /// Owning component of a group row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

fn tasks(name: &str, intervals: &[Interval], axis: &SampleAxis, color: &str) -> Vec<Task> {
    intervals
        .iter()
        .enumerate()
        .map(|(n, interval)| Task {
            id: format!("{name}_{}", n + 1),
            color: color.to_string(),
            from: axis.micros_at(interval.start),
            to: axis.micros_at(interval.stop),
            tooltip_string: format!(
                "{:.2} s - {:.2} s",
                axis.seconds_at(interval.start),
                axis.seconds_at(interval.stop)
            ),
        })
        .collect()
}

/// Build the timeline rows of one comparison
#[must_use]
pub fn timeline(result: &SessionResult, options: &ReportOptions) -> Vec<TimelineRow> {
    let none = Vec::new();
    let components = reported_components(result, options);
    let mut rows: Vec<TimelineRow> = components
        .iter()
        .map(|c| TimelineRow {
            name: c.id.clone(),
            tasks: tasks(
                &c.id,
                result.component_intervals.get(&c.id).unwrap_or(&none),
                &result.axis,
                COMPONENT_COLOR,
            ),
            parent: None,
        })
        .collect();

    let mut groups: Vec<_> = result
        .tree
        .groups
        .values()
        .filter(|g| !options.is_excluded(&g.id))
        .collect();
    groups.sort_by(|a, b| a.id.cmp(&b.id));

    for group in groups {
        let name = group
            .id
            .strip_prefix(group.component.as_str())
            .and_then(|rest| rest.strip_prefix(sigcmp_core::SEPARATOR))
            .unwrap_or(&group.id);
        rows.push(TimelineRow {
            name: name.to_string(),
            tasks: tasks(
                name,
                result.group_intervals.get(&group.id).unwrap_or(&none),
                &result.axis,
                GROUP_COLOR,
            ),
            parent: Some(group.component.clone()),
        });
    }
    rows
}

/// Write `<name>.json` and `<name>_pretty.json` into `dir`
///
/// # Errors
///
/// Returns error if encoding or writing fails
pub fn write_timeline(
    dir: impl AsRef<Path>,
    name: &str,
    result: &SessionResult,
    options: &ReportOptions,
) -> ReportResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let rows = timeline(result, options);

    let compact = dir.join(format!("{name}.json"));
    std::fs::write(&compact, serde_json::to_string(&rows)?)?;
    let pretty = dir.join(format!("{name}_pretty.json"));
    std::fs::write(&pretty, serde_json::to_string_pretty(&rows)?)?;

    info!(path = %compact.display(), "timeline written");
    Ok(vec![compact, pretty])
}
