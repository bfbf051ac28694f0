//! Batch comparison of many trace files.
//!
//! Files are grouped by recording: the part of the file name before the
//! test-type marker (`rec01_sil_sil_v1.bsig` belongs to `rec01`). Within a
//! recording every unordered pair of files is compared once.

use crate::config::CompareConfig;
use crate::error::{CompareResult, SessionError};
use crate::session::{ComparisonSession, SessionResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{error, info};

/// Kind of regression run, which decides the file-name marker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    /// Simulation against simulation
    #[default]
    SilSil,
    /// Recorded ECU output against simulation
    EdpSil,
}

impl TestType {
    /// File-name marker separating recording name and suffix
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::SilSil => "_sil_sil",
            Self::EdpSil => "_edp_sil",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.marker()[1..])
    }
}

impl FromStr for TestType {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sil_sil" => Ok(Self::SilSil),
            "edp_sil" => Ok(Self::EdpSil),
            other => Err(SessionError::Config {
                reason: format!("unknown test type '{other}', expected sil_sil or edp_sil"),
            }),
        }
    }
}

/// Batch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Marker used to group files into recordings
    pub test_type: TestType,
    /// File extension of trace files in a folder scan
    pub extension: String,
    /// Per-pair comparison options
    pub compare: CompareConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            test_type: TestType::default(),
            extension: "bsig".to_string(),
            compare: CompareConfig::default(),
        }
    }
}

impl BatchConfig {
    /// Set the test type
    #[must_use]
    pub fn with_test_type(mut self, test_type: TestType) -> Self {
        self.test_type = test_type;
        self
    }

    /// Set the comparison options
    #[must_use]
    pub fn with_compare(mut self, compare: CompareConfig) -> Self {
        self.compare = compare;
        self
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Recording a trace file belongs to
#[must_use]
pub fn recording_of(path: &Path, test_type: TestType) -> String {
    let name = file_name(path);
    match name.find(test_type.marker()) {
        Some(idx) => name[..idx].to_string(),
        None => name,
    }
}

fn suffix_of(path: &Path, test_type: TestType) -> Option<String> {
    let name = file_name(path);
    let stem = name.strip_suffix(".bsig")?;
    let idx = stem.find(test_type.marker())?;
    let suffix = &stem[idx + test_type.marker().len()..];
    (!suffix.is_empty()).then(|| suffix.to_string())
}

/// Report name of a compared pair: the recording plus both file suffixes, sorted
#[must_use]
pub fn pair_name(recording: &str, a: &Path, b: &Path, test_type: TestType) -> String {
    match (suffix_of(a, test_type), suffix_of(b, test_type)) {
        (Some(sa), Some(sb)) => {
            let mut parts = [sa, sb];
            parts.sort();
            format!("{recording}{}{}", parts[0], parts[1])
        }
        _ => recording.to_string(),
    }
}

/// Collect trace files from a folder and an explicit list, grouped by recording
///
/// # Errors
///
/// Returns error if the folder cannot be listed
pub fn discover(
    folder: Option<&Path>,
    explicit: &[PathBuf],
    config: &BatchConfig,
) -> CompareResult<IndexMap<String, Vec<PathBuf>>> {
    let mut files: Vec<PathBuf> = explicit.to_vec();
    if let Some(dir) = folder {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(dir)
            .map_err(|e| SessionError::Io(format!("{}: {e}", dir.display())))?
        {
            let path = entry?.path();
            if path.is_file() && file_name(&path).ends_with(&config.extension) {
                found.push(path);
            }
        }
        found.sort();
        files.extend(found);
    }

    let mut recordings: IndexMap<String, Vec<PathBuf>> = IndexMap::new();
    for file in files {
        let recording = recording_of(&file, config.test_type);
        let entry = recordings.entry(recording).or_default();
        if !entry.contains(&file) {
            entry.push(file);
        }
    }
    Ok(recordings)
}

/// Every unordered pair of distinct files
#[must_use]
pub fn pairs(files: &[PathBuf]) -> Vec<(PathBuf, PathBuf)> {
    let mut out = Vec::new();
    for (i, a) in files.iter().enumerate() {
        for b in &files[i + 1..] {
            out.push((a.clone(), b.clone()));
        }
    }
    out
}

/// A pair that compared successfully
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairOutcome {
    /// Recording the pair belongs to
    pub recording: String,
    /// Report name of the pair
    pub name: String,
    /// Reference trace
    pub reference: PathBuf,
    /// Compared trace
    pub compared: PathBuf,
    /// Comparison result
    pub result: SessionResult,
}

/// A pair that could not be compared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairFailure {
    /// Recording the pair belongs to
    pub recording: String,
    /// Reference trace
    pub reference: PathBuf,
    /// Compared trace
    pub compared: PathBuf,
    /// Why the comparison failed
    pub error: SessionError,
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Successful comparisons in run order
    pub outcomes: Vec<PairOutcome>,
    /// Pairs that failed to compare
    pub failures: Vec<PairFailure>,
}

impl BatchReport {
    /// Whether any comparison ran
    #[must_use]
    pub fn compared_any(&self) -> bool {
        !self.outcomes.is_empty()
    }

    /// Overall verdict: at least one comparison ran, none failed and all passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.compared_any() && self.failures.is_empty() && self.outcomes.iter().all(|o| o.result.passed)
    }

    /// Outcomes grouped by recording
    #[must_use]
    pub fn by_recording(&self) -> IndexMap<&str, Vec<&PairOutcome>> {
        let mut out: IndexMap<&str, Vec<&PairOutcome>> = IndexMap::new();
        for outcome in &self.outcomes {
            out.entry(outcome.recording.as_str()).or_default().push(outcome);
        }
        out
    }
}

fn compare_pair(a: &Path, b: &Path, config: &CompareConfig) -> CompareResult<SessionResult> {
    let mut session = ComparisonSession::open(a, b, config.clone())?;
    let result = session.run();
    session.close();
    result
}

/// Number of pairs a batch over `recordings` will compare
#[must_use]
pub fn pair_count(recordings: &IndexMap<String, Vec<PathBuf>>) -> usize {
    recordings
        .values()
        .map(|files| files.len() * files.len().saturating_sub(1) / 2)
        .sum()
}

/// Compare every pair within each recording, sequentially.
///
/// A failing pair is logged and recorded; the batch carries on with the
/// next one.
#[must_use]
pub fn run_batch(recordings: &IndexMap<String, Vec<PathBuf>>, config: &BatchConfig) -> BatchReport {
    run_batch_with(recordings, config, |_, _| {})
}

/// Like [`run_batch`], calling `on_pair` once each pair has been compared
pub fn run_batch_with<F>(
    recordings: &IndexMap<String, Vec<PathBuf>>,
    config: &BatchConfig,
    mut on_pair: F,
) -> BatchReport
where
    F: FnMut(&Path, &Path),
{
    let mut report = BatchReport::default();
    for (recording, files) in recordings {
        for (a, b) in pairs(files) {
            info!(reference = %a.display(), compared = %b.display(), "comparing pair");
            let outcome = compare_pair(&a, &b, &config.compare);
            on_pair(&a, &b);
            match outcome {
                Ok(result) => report.outcomes.push(PairOutcome {
                    recording: recording.clone(),
                    name: pair_name(recording, &a, &b, config.test_type),
                    reference: a,
                    compared: b,
                    result,
                }),
                Err(err) => {
                    error!(reference = %a.display(), compared = %b.display(), %err, "comparison failed");
                    report.failures.push(PairFailure {
                        recording: recording.clone(),
                        reference: a,
                        compared: b,
                        error: err,
                    });
                }
            }
        }
    }
    if !report.compared_any() {
        error!("no comparison took place");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigcmp_trace::{Lane, TraceWriter};
    use tempfile::TempDir;

    fn write_trace(path: &Path, samples: u64, value: u8) {
        let mut writer = TraceWriter::default();
        writer
            .add(Lane::scalar("MTS.Package.TimeStamp", (0..samples).collect::<Vec<_>>()).unwrap())
            .unwrap();
        writer
            .add(Lane::scalar("Algo.EM.Flag", vec![value; samples as usize]).unwrap())
            .unwrap();
        writer.write_file(path).unwrap();
    }

    #[test]
    fn test_recording_and_pair_names() {
        let a = Path::new("/data/rec01_sil_sil_v1.bsig");
        let b = Path::new("/data/rec01_sil_sil_base.bsig");
        assert_eq!(recording_of(a, TestType::SilSil), "rec01");
        assert_eq!(recording_of(a, TestType::EdpSil), "rec01_sil_sil_v1.bsig");
        assert_eq!(pair_name("rec01", a, b, TestType::SilSil), "rec01_base_v1");
        assert_eq!(
            pair_name("rec01", Path::new("rec01_sil_sil.bsig"), b, TestType::SilSil),
            "rec01"
        );
    }

    #[test]
    fn test_test_type_parse() {
        assert_eq!("sil_sil".parse::<TestType>().unwrap(), TestType::SilSil);
        assert_eq!("EDP_SIL".parse::<TestType>().unwrap(), TestType::EdpSil);
        assert!("hil".parse::<TestType>().is_err());
        assert_eq!(TestType::EdpSil.to_string(), "edp_sil");
    }

    #[test]
    fn test_pairs_unordered() {
        let files: Vec<PathBuf> = ["a", "b", "c"].iter().map(PathBuf::from).collect();
        let p = pairs(&files);
        assert_eq!(p.len(), 3);
        assert!(pairs(&files[..1]).is_empty());
    }

    #[test]
    fn test_discover_groups_by_recording() {
        let dir = TempDir::new().unwrap();
        for name in ["r1_sil_sil_a.bsig", "r1_sil_sil_b.bsig", "r2_sil_sil_a.bsig", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let extra = dir.path().join("r1_sil_sil_a.bsig");
        let groups = discover(Some(dir.path()), &[extra], &BatchConfig::default()).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["r1"].len(), 2);
        assert_eq!(groups["r2"].len(), 1);
    }

    #[test]
    fn test_discover_missing_folder() {
        let err = discover(Some(Path::new("/nonexistent/dir")), &[], &BatchConfig::default());
        assert!(matches!(err, Err(SessionError::Io(_))));
    }

    #[test]
    fn test_run_batch_mixed_outcomes() {
        let dir = TempDir::new().unwrap();
        write_trace(&dir.path().join("r1_sil_sil_a.bsig"), 20, 0);
        write_trace(&dir.path().join("r1_sil_sil_b.bsig"), 20, 1);
        write_trace(&dir.path().join("r2_sil_sil_a.bsig"), 20, 0);
        write_trace(&dir.path().join("r2_sil_sil_b.bsig"), 10, 0);
        write_trace(&dir.path().join("r3_sil_sil_a.bsig"), 5, 0);

        let config = BatchConfig::default();
        let groups = discover(Some(dir.path()), &[], &config).unwrap();
        let report = run_batch(&groups, &config);

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].name, "r1_a_b");
        assert!(!report.outcomes[0].result.passed);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].error,
            SessionError::IncomparableTraces { .. }
        ));
        assert!(!report.passed());
        assert_eq!(report.by_recording().len(), 1);
    }

    #[test]
    fn test_progress_callback() {
        let dir = TempDir::new().unwrap();
        for name in ["r1_sil_sil_a.bsig", "r1_sil_sil_b.bsig", "r1_sil_sil_c.bsig"] {
            write_trace(&dir.path().join(name), 8, 0);
        }
        let config = BatchConfig::default();
        let groups = discover(Some(dir.path()), &[], &config).unwrap();
        assert_eq!(pair_count(&groups), 3);

        let mut seen = 0;
        let report = run_batch_with(&groups, &config, |_, _| seen += 1);
        assert_eq!(seen, 3);
        assert!(report.passed());
    }

    #[test]
    fn test_empty_batch_fails() {
        let report = run_batch(&IndexMap::new(), &BatchConfig::default());
        assert!(!report.compared_any());
        assert!(!report.passed());
    }
}
