//! Comparison session over one pair of traces.
//!
//! A session checks that both traces share a sample axis, decides which
//! lanes to compare, then streams one lane pair at a time through the
//! differencer so at most two lanes are held in memory.

use crate::aggregate::{Aggregator, ResultTree, SignalResult};
use crate::config::CompareConfig;
use crate::diff::diff;
use crate::error::{CompareResult, SessionError};
use crate::resolve::{Resolver, resolve};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use sigcmp_core::{Interval, SampleAxis};
use sigcmp_trace::TraceFile;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Earliest sample where any compared lane diverges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstDivergence {
    /// Sample index
    pub index: usize,
    /// Relative time of that sample in microseconds
    pub micros: i64,
    /// Every signal diverging at that index
    pub signals: Vec<String>,
}

/// Everything a comparison produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    /// True when every component is equal
    pub passed: bool,
    /// Samples on the shared axis
    pub sample_count: usize,
    /// Signal, group and component results
    pub tree: ResultTree,
    /// Earliest divergence, absent when the traces match
    pub first_divergence: Option<FirstDivergence>,
    /// Divergent runs per group id
    pub group_intervals: IndexMap<String, Vec<Interval>>,
    /// Divergent runs per component id
    pub component_intervals: IndexMap<String, Vec<Interval>>,
    /// Names dropped because they had no counterpart
    pub unresolved: Vec<String>,
    /// Relative sample times
    pub axis: SampleAxis,
}

impl SessionResult {
    /// Number of signals compared
    #[must_use]
    pub fn compared(&self) -> usize {
        self.tree.signals.len()
    }
}

/// Lane pairs selected for comparison
#[derive(Debug, Default)]
struct Plan {
    pairs: Vec<(String, String)>,
    unresolved: Vec<String>,
}

fn plan<RA, RB>(a: &TraceFile<RA>, b: &TraceFile<RB>, config: &CompareConfig) -> Plan
where
    RA: Read + Seek,
    RB: Read + Seek,
{
    let mut plan = Plan::default();

    let reference: IndexSet<String> = match &config.allow_list {
        Some(allowed) => allowed
            .iter()
            .filter_map(|name| match resolve(name, a.catalog().names()) {
                Some(found) => Some(found.to_string()),
                None => {
                    warn!(signal = %name, "allow-listed signal not found in reference trace");
                    plan.unresolved.push(name.clone());
                    None
                }
            })
            .collect(),
        None => a.catalog().names().map(str::to_string).collect(),
    };

    let resolver = Resolver::new(b.catalog().names());
    for name in reference {
        if config.is_denied(&name) {
            debug!(signal = %name, "skipping deny-listed signal");
            continue;
        }
        if !config.compare_time_axis && name == config.time_axis {
            continue;
        }
        match resolver.resolve(&name) {
            Some(other) if config.is_denied(other) => {
                debug!(signal = %name, resolved = other, "skipping deny-listed counterpart");
            }
            Some(other) => {
                if other != name {
                    debug!(signal = %name, resolved = other, "resolved renamed signal");
                }
                plan.pairs.push((name, other.to_string()));
            }
            None => {
                warn!(signal = %name, "no matching signal in compared trace, dropping it");
                plan.unresolved.push(name);
            }
        }
    }
    plan
}

fn check_sample_counts<RA, RB>(
    a: &TraceFile<RA>,
    b: &TraceFile<RB>,
    config: &CompareConfig,
    pairs: &[(String, String)],
) -> CompareResult<usize>
where
    RA: Read + Seek,
    RB: Read + Seek,
{
    let axis_len = |trace_label: &str, count: Result<usize, _>| {
        count.map_err(|_| {
            SessionError::incomparable(format!(
                "time axis lane '{}' missing in {trace_label} trace",
                config.time_axis
            ))
        })
    };
    let len_a = axis_len("reference", a.sample_count(&config.time_axis))?;
    let len_b = axis_len("compared", b.sample_count(&config.time_axis))?;

    if len_a != len_b {
        return Err(SessionError::incomparable(format!(
            "different number of samples: {} has {len_a}, {} has {len_b}",
            a.source(),
            b.source()
        )));
    }
    if len_a == 0 {
        return Err(SessionError::incomparable(format!(
            "traces have 0 samples: {}, {}",
            a.source(),
            b.source()
        )));
    }

    for (name, other) in pairs {
        let count_a = a.sample_count(name)?;
        let count_b = b.sample_count(other)?;
        if count_a != len_a || count_b != len_a {
            return Err(SessionError::incomparable(format!(
                "lane '{name}' has {count_a} samples and '{other}' has {count_b}, axis has {len_a}"
            )));
        }
    }
    Ok(len_a)
}

/// Compare two open traces.
///
/// The time-axis lane must exist in both traces with the same, non-zero
/// sample count, and every selected lane pair must match it; otherwise the
/// session fails before any lane is diffed. Names without a counterpart are
/// dropped with a warning and listed in [`SessionResult::unresolved`].
///
/// # Errors
///
/// Returns `IncomparableTraces` when the precondition fails and propagates
/// decoder errors, which abort the whole session.
pub fn compare<RA, RB>(
    a: &mut TraceFile<RA>,
    b: &mut TraceFile<RB>,
    config: &CompareConfig,
) -> CompareResult<SessionResult>
where
    RA: Read + Seek,
    RB: Read + Seek,
{
    config.validate()?;
    let plan = plan(a, b, config);
    let sample_count = check_sample_counts(a, b, config, &plan.pairs)?;
    info!(
        reference = a.source(),
        compared = b.source(),
        signals = plan.pairs.len(),
        samples = sample_count,
        "comparing traces"
    );

    let axis = SampleAxis::from_timestamps(&a.materialize_all(&config.time_axis)?.leading_i64());

    let mut aggregator = Aggregator::new(sample_count);
    let mut first: Option<(usize, Vec<String>)> = None;
    for (name, other) in &plan.pairs {
        let lane_a = a.materialize_all(name)?;
        let lane_b = b.materialize_all(other)?;
        let lane_diff = diff(&lane_a, &lane_b)?;
        drop((lane_a, lane_b));

        if let Some(index) = lane_diff.collapsed.first() {
            let earlier = first.as_ref().is_none_or(|(min, _)| index < *min);
            if earlier {
                first = Some((index, vec![name.clone()]));
            } else if let Some((min, names)) = first.as_mut() {
                if index == *min {
                    names.push(name.clone());
                }
            }
        }
        aggregator.push(SignalResult::new(name, other, lane_diff));
    }

    let tree = aggregator.finish();
    for signal in tree.ordered_signals().into_iter().take_while(|s| !s.is_equal) {
        debug!(
            signal = %signal.name,
            index = ?signal.divergence().first(),
            count = signal.divergent_sample_count,
            "signal diverges"
        );
    }
    let first_divergence = first.map(|(index, signals)| FirstDivergence {
        index,
        micros: axis.micros_at(index),
        signals,
    });
    if let Some(fd) = &first_divergence {
        info!(
            index = fd.index,
            micros = fd.micros,
            signals = ?fd.signals,
            "first divergence"
        );
    }

    let group_intervals = tree
        .groups
        .iter()
        .map(|(id, g)| (id.clone(), g.divergence.intervals()))
        .collect();
    let component_intervals = tree
        .components
        .iter()
        .map(|(id, c)| (id.clone(), c.divergence.intervals()))
        .collect();

    let passed = tree.passed();
    info!(passed, compared = tree.signals.len(), unresolved = plan.unresolved.len(), "comparison done");

    Ok(SessionResult {
        passed,
        sample_count,
        tree,
        first_divergence,
        group_intervals,
        component_intervals,
        unresolved: plan.unresolved,
        axis,
    })
}

/// Owns both trace handles of one comparison
#[derive(Debug)]
pub struct ComparisonSession {
    reference: TraceFile<BufReader<File>>,
    compared: TraceFile<BufReader<File>>,
    config: CompareConfig,
    paths: (PathBuf, PathBuf),
}

impl ComparisonSession {
    /// Open both traces
    ///
    /// # Errors
    ///
    /// Returns `IncomparableTraces` if the files have different extensions
    /// and decoder errors if either cannot be opened
    pub fn open(
        reference: impl AsRef<Path>,
        compared: impl AsRef<Path>,
        config: CompareConfig,
    ) -> CompareResult<Self> {
        let (ra, rb) = (reference.as_ref(), compared.as_ref());
        if ra.extension() != rb.extension() {
            return Err(SessionError::incomparable(format!(
                "different file types: {}, {}",
                ra.display(),
                rb.display()
            )));
        }
        Ok(Self {
            reference: TraceFile::open_with(ra, config.open)?,
            compared: TraceFile::open_with(rb, config.open)?,
            config,
            paths: (ra.to_path_buf(), rb.to_path_buf()),
        })
    }

    /// Paths of the reference and compared traces
    #[must_use]
    pub fn paths(&self) -> (&Path, &Path) {
        (&self.paths.0, &self.paths.1)
    }

    /// Run the comparison
    ///
    /// # Errors
    ///
    /// See [`compare`]
    pub fn run(&mut self) -> CompareResult<SessionResult> {
        compare(&mut self.reference, &mut self.compared, &self.config)
    }

    /// Release both handles
    pub fn close(self) {
        self.reference.close();
        self.compared.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigcmp_trace::{Lane, OpenOptions, TraceWriter, WriterOptions};
    use std::io::Cursor;

    const AXIS: &str = "MTS.Package.TimeStamp";

    fn timestamps(n: u64) -> Lane {
        Lane::scalar(AXIS, (0..n).map(|i| 1_000_000 + i * 40_000).collect::<Vec<_>>()).unwrap()
    }

    fn build(lanes: Vec<Lane>) -> TraceFile<Cursor<Vec<u8>>> {
        let mut writer = TraceWriter::new(WriterOptions::default().with_compression(true));
        for lane in lanes {
            writer.add(lane).unwrap();
        }
        let bytes = writer.to_bytes().unwrap();
        TraceFile::from_reader(Cursor::new(bytes), OpenOptions::default()).unwrap()
    }

    fn objects(flip_at: Option<usize>) -> Lane {
        let mut values: Vec<f32> = (0..300).map(|i| i as f32).collect();
        if let Some(i) = flip_at {
            values[i * 3 + 1] += 1.0;
        }
        Lane::new("Algo.CAM.Objects", 3, values).unwrap()
    }

    fn speed() -> Lane {
        Lane::scalar("Algo.VDY.Speed", vec![13.5f64; 100]).unwrap()
    }

    #[test]
    fn test_identical_traces_pass() {
        let mut a = build(vec![timestamps(100), speed()]);
        let mut b = build(vec![timestamps(100), speed()]);
        let result = compare(&mut a, &mut b, &CompareConfig::default()).unwrap();

        assert!(result.passed);
        assert_eq!(result.sample_count, 100);
        assert!(result.first_divergence.is_none());
        assert!(result.tree.signals.values().all(|s| s.divergent_sample_count == 0));
        assert!(result.tree.components.values().all(|c| c.divergent_sample_count == 0));
        assert_eq!(result.axis.micros_at(1), 40_000);
    }

    #[test]
    fn test_array_flip_at_fifty() {
        let mut a = build(vec![timestamps(100), objects(None), speed()]);
        let mut b = build(vec![timestamps(100), objects(Some(50)), speed()]);
        let result = compare(&mut a, &mut b, &CompareConfig::default()).unwrap();

        assert!(!result.passed);
        let first = result.first_divergence.as_ref().unwrap();
        assert_eq!(first.index, 50);
        assert_eq!(first.micros, 50 * 40_000);
        assert_eq!(first.signals, vec!["Algo.CAM.Objects"]);

        assert_eq!(result.tree.signals["Algo.CAM.Objects"].divergent_sample_count, 1);
        assert_eq!(result.tree.groups["Algo.CAM"].divergent_sample_count, 1);
        assert_eq!(result.tree.components["Algo"].divergent_sample_count, 1);
        assert!(result.tree.groups["Algo.VDY"].is_equal);
        assert!(result.tree.components["MTS"].is_equal);
        assert_eq!(result.group_intervals["Algo.CAM"], vec![Interval::new(50, 50)]);
        assert_eq!(result.component_intervals["Algo"], vec![Interval::new(50, 50)]);
    }

    #[test]
    fn test_ties_at_first_divergence() {
        let mut a = build(vec![
            timestamps(10),
            Lane::scalar("A.x.one", vec![0u8; 10]).unwrap(),
            Lane::scalar("A.x.two", vec![0u8; 10]).unwrap(),
            Lane::scalar("B.y.three", vec![0u8; 10]).unwrap(),
        ]);
        let mut b = build(vec![
            timestamps(10),
            Lane::scalar("A.x.one", vec![0, 0, 0, 1, 0, 0, 0, 0, 0, 0u8]).unwrap(),
            Lane::scalar("A.x.two", vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 1u8]).unwrap(),
            Lane::scalar("B.y.three", vec![0, 0, 0, 1, 1, 0, 0, 0, 0, 0u8]).unwrap(),
        ]);
        let result = compare(&mut a, &mut b, &CompareConfig::default()).unwrap();
        let first = result.first_divergence.unwrap();
        assert_eq!(first.index, 3);
        assert_eq!(first.signals, vec!["A.x.one", "B.y.three"]);
    }

    #[test]
    fn test_differing_sample_counts_fail_fast() {
        let mut a = build(vec![timestamps(100), speed()]);
        let mut b = build(vec![timestamps(99), Lane::scalar("Algo.VDY.Speed", vec![1.0f64; 99]).unwrap()]);
        let err = compare(&mut a, &mut b, &CompareConfig::default()).unwrap_err();
        assert!(matches!(err, SessionError::IncomparableTraces { .. }));
    }

    #[test]
    fn test_lane_length_differs_from_axis() {
        let mut a = build(vec![timestamps(100), speed()]);
        let mut b = build(vec![timestamps(100), Lane::scalar("Algo.VDY.Speed", vec![1.0f64; 50]).unwrap()]);
        let err = compare(&mut a, &mut b, &CompareConfig::default()).unwrap_err();
        assert!(matches!(err, SessionError::IncomparableTraces { .. }));
    }

    #[test]
    fn test_missing_time_axis() {
        let mut a = build(vec![speed()]);
        let mut b = build(vec![speed()]);
        let err = compare(&mut a, &mut b, &CompareConfig::default()).unwrap_err();
        assert!(matches!(err, SessionError::IncomparableTraces { .. }));
    }

    #[test]
    fn test_empty_traces_are_incomparable() {
        let mut a = build(vec![timestamps(0)]);
        let mut b = build(vec![timestamps(0)]);
        assert!(compare(&mut a, &mut b, &CompareConfig::default()).is_err());
    }

    #[test]
    fn test_unresolved_and_renamed() {
        let mut a = build(vec![
            timestamps(10),
            Lane::scalar("Algo.CAM.Lane.Signal", vec![1i16; 10]).unwrap(),
            Lane::scalar("Algo.CAM.Only", vec![1i16; 10]).unwrap(),
        ]);
        let mut b = build(vec![
            timestamps(10),
            Lane::scalar("Algo2.CAM.Lane.Signal", vec![1i16; 10]).unwrap(),
        ]);
        let result = compare(&mut a, &mut b, &CompareConfig::default()).unwrap();
        assert!(result.passed);
        assert_eq!(result.unresolved, vec!["Algo.CAM.Only"]);
        assert_eq!(
            result.tree.signals["Algo.CAM.Lane.Signal"].resolved_name,
            "Algo2.CAM.Lane.Signal"
        );
    }

    #[test]
    fn test_deny_and_allow_lists() {
        let mut a = build(vec![timestamps(10), speed_n(10, 1.0), flag(10, 0)]);
        let mut b = build(vec![timestamps(10), speed_n(10, 2.0), flag(10, 1)]);

        let config = CompareConfig::default().with_deny_list(["Algo.VDY.Speed", "Algo.EM.Flag"]);
        let result = compare(&mut a, &mut b, &config).unwrap();
        assert!(result.passed);
        assert_eq!(result.compared(), 1);

        let config = CompareConfig::default().with_allow_list(["VDY.Speed", "Nope.Missing"]);
        let result = compare(&mut a, &mut b, &config).unwrap();
        assert!(!result.passed);
        assert_eq!(result.compared(), 1);
        assert!(result.tree.signals.contains_key("Algo.VDY.Speed"));
        assert_eq!(result.unresolved, vec!["Nope.Missing"]);

        let config = CompareConfig::default()
            .with_deny_list(["Algo.VDY.Speed", "Algo.EM.Flag"])
            .with_compare_time_axis(false);
        assert_eq!(compare(&mut a, &mut b, &config).unwrap().compared(), 0);
    }

    fn speed_n(n: usize, v: f64) -> Lane {
        Lane::scalar("Algo.VDY.Speed", vec![v; n]).unwrap()
    }

    fn flag(n: usize, v: u8) -> Lane {
        Lane::scalar("Algo.EM.Flag", vec![v; n]).unwrap()
    }

    #[test]
    fn test_corrupt_trace_aborts() {
        let mut writer = TraceWriter::new(WriterOptions::default().with_compression(true));
        writer.add(timestamps(10)).unwrap();
        writer.add(Lane::scalar("Algo.VDY.Speed", vec![1.0f64; 10]).unwrap()).unwrap();
        let good = writer.to_bytes().unwrap();
        let mut bad = good.clone();
        // zlib header of the time-axis block
        bad[11] ^= 0xFF;

        let mut a = TraceFile::from_reader(Cursor::new(good), OpenOptions::default()).unwrap();
        let mut b = TraceFile::from_reader(Cursor::new(bad), OpenOptions::default()).unwrap();
        let err = compare(&mut a, &mut b, &CompareConfig::default()).unwrap_err();
        assert!(matches!(err, SessionError::Trace(_)));
    }

    #[test]
    fn test_session_on_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let pa = dir.path().join("rec_sil_sil_a.bsig");
        let pb = dir.path().join("rec_sil_sil_b.bsig");
        for path in [&pa, &pb] {
            let mut writer = TraceWriter::default();
            writer.add(timestamps(20)).unwrap();
            writer.add(speed_n(20, 3.0)).unwrap();
            writer.write_file(path).unwrap();
        }

        let mut session = ComparisonSession::open(&pa, &pb, CompareConfig::default()).unwrap();
        assert_eq!(session.paths().0, pa.as_path());
        assert!(session.run().unwrap().passed);
        session.close();

        let other = dir.path().join("rec_sil_sil_b.csv");
        std::fs::copy(&pb, &other).unwrap();
        let err = ComparisonSession::open(&pa, &other, CompareConfig::default()).unwrap_err();
        assert!(matches!(err, SessionError::IncomparableTraces { .. }));
    }
}
