//! Per-component divergence intervals as `;`-separated rows.

use crate::error::ReportResult;
use crate::options::ReportOptions;
use sigcmp_compare::{ComponentResult, SessionResult};
use std::io::Write;
use std::path::Path;

/// One contiguous divergence of one component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRow {
    /// Start time in microseconds from the first sample
    pub start: i64,
    /// Stop time in microseconds, inclusive
    pub stop: i64,
    /// Position of the component in name order
    pub index: usize,
    /// Component id
    pub component: String,
}

/// Components that belong in reports, sorted by id
pub(crate) fn reported_components<'a>(
    result: &'a SessionResult,
    options: &ReportOptions,
) -> Vec<&'a ComponentResult> {
    let mut components: Vec<&ComponentResult> = result
        .tree
        .components
        .values()
        .filter(|c| !options.is_excluded(&c.id))
        .filter(|c| !c.groups.iter().all(|g| options.is_excluded(g)))
        .collect();
    components.sort_by(|a, b| a.id.cmp(&b.id));
    components
}

/// Rows for every divergence interval, components in name order
#[must_use]
pub fn component_rows(result: &SessionResult, options: &ReportOptions) -> Vec<ComponentRow> {
    let mut rows = Vec::new();
    for (index, component) in reported_components(result, options).into_iter().enumerate() {
        let Some(intervals) = result.component_intervals.get(&component.id) else {
            continue;
        };
        for interval in intervals {
            rows.push(ComponentRow {
                start: result.axis.micros_at(interval.start),
                stop: result.axis.micros_at(interval.stop),
                index,
                component: component.id.clone(),
            });
        }
    }
    rows
}

/// Write rows without a header line
///
/// # Errors
///
/// Returns error if writing fails
pub fn write_rows<W: Write>(writer: W, rows: &[ComponentRow]) -> ReportResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_writer(writer);
    for row in rows {
        wtr.write_record([
            row.start.to_string(),
            row.stop.to_string(),
            row.index.to_string(),
            row.component.clone(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the component CSV of one comparison to `path`
///
/// # Errors
///
/// Returns error if the file cannot be created or written
pub fn write_component_csv(
    path: impl AsRef<Path>,
    result: &SessionResult,
    options: &ReportOptions,
) -> ReportResult<()> {
    let file = std::fs::File::create(path)?;
    write_rows(file, &component_rows(result, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_rows_sorted_and_timed() {
        let result = fixtures::result();
        let rows = component_rows(&result, &ReportOptions::default());
        let summary: Vec<(i64, i64, usize, &str)> = rows
            .iter()
            .map(|r| (r.start, r.stop, r.index, r.component.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (80_000, 120_000, 0, "Algo"),
                (280_000, 280_000, 0, "Algo"),
                (360_000, 360_000, 1, "Perc"),
            ]
        );
    }

    #[test]
    fn test_package_only_component_skipped() {
        let result = fixtures::result();
        let ids: Vec<&str> = reported_components(&result, &ReportOptions::default())
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(ids, vec!["Algo", "Perc"]);

        let everything = ReportOptions::default().with_excluded_segments(Vec::<String>::new());
        assert_eq!(reported_components(&result, &everything).len(), 3);
    }

    #[test]
    fn test_write_rows_format() {
        let mut out = Vec::new();
        write_rows(&mut out, &component_rows(&fixtures::result(), &ReportOptions::default())).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "80000;120000;0;Algo\n280000;280000;0;Algo\n360000;360000;1;Perc\n"
        );
    }

    #[test]
    fn test_write_component_csv_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("rec01.csv");
        write_component_csv(&path, &fixtures::result(), &ReportOptions::default()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 3);
    }
}
