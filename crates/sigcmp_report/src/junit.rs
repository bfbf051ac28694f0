//! JUnit XML report.
//!
//! One `<testsuite>` per recording and one `<testcase>` per compared signal.
//! A diverging signal fails with the number of divergent samples; a pair
//! that could not be compared at all shows up as an `<error>` case.

use crate::error::ReportResult;
use crate::options::ReportOptions;
use chrono::{DateTime, Local};
use sigcmp_compare::BatchReport;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

/// Failure message of a diverging signal
pub const FAILURE_MESSAGE: &str = "Number of different frame";

/// Outcome of a single test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    /// No divergence
    Passed,
    /// Divergent samples found
    Failed {
        /// Number of divergent samples
        divergent: usize,
    },
    /// The pair could not be compared
    Error {
        /// Why the comparison failed
        reason: String,
    },
}

/// One `<testcase>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Signal name
    pub name: String,
    /// Group id of the signal
    pub classname: String,
    /// Outcome
    pub outcome: CaseOutcome,
}

/// One `<testsuite>`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestSuite {
    /// Recording name
    pub name: String,
    /// Cases sorted by name
    pub cases: Vec<TestCase>,
}

impl TestSuite {
    /// Number of failing cases
    #[must_use]
    pub fn failures(&self) -> usize {
        self.cases
            .iter()
            .filter(|c| matches!(c.outcome, CaseOutcome::Failed { .. }))
            .count()
    }

    /// Number of erroring cases
    #[must_use]
    pub fn errors(&self) -> usize {
        self.cases
            .iter()
            .filter(|c| matches!(c.outcome, CaseOutcome::Error { .. }))
            .count()
    }
}

/// Recording names in first-seen order over outcomes, then failures
fn ordered_recordings(report: &BatchReport) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    let all = report
        .outcomes
        .iter()
        .map(|o| o.recording.as_str())
        .chain(report.failures.iter().map(|f| f.recording.as_str()));
    for name in all {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Build one suite per recording
#[must_use]
pub fn suites(report: &BatchReport, options: &ReportOptions) -> Vec<TestSuite> {
    ordered_recordings(report)
        .into_iter()
        .map(|recording| {
            let mut cases = Vec::new();
            for outcome in report.outcomes.iter().filter(|o| o.recording == recording) {
                for signal in outcome.result.tree.signals.values() {
                    if options.is_excluded(&signal.name) {
                        continue;
                    }
                    cases.push(TestCase {
                        name: signal.name.clone(),
                        classname: signal.group.clone(),
                        outcome: if signal.is_equal {
                            CaseOutcome::Passed
                        } else {
                            CaseOutcome::Failed {
                                divergent: signal.divergent_sample_count,
                            }
                        },
                    });
                }
            }
            for failure in report.failures.iter().filter(|f| f.recording == recording) {
                cases.push(TestCase {
                    name: format!(
                        "{} vs {}",
                        failure.reference.display(),
                        failure.compared.display()
                    ),
                    classname: recording.to_string(),
                    outcome: CaseOutcome::Error {
                        reason: failure.error.to_string(),
                    },
                });
            }
            cases.sort_by(|a, b| a.name.cmp(&b.name));
            TestSuite {
                name: recording.to_string(),
                cases,
            }
        })
        .collect()
}

/// Name of whoever ran the comparison
#[must_use]
pub fn author() -> String {
    if std::env::var_os("JENKINS_HOME").is_some() {
        return "Jenkins".to_string();
    }
    std::env::var("USERNAME")
        .or_else(|_| std::env::var("USER"))
        .unwrap_or_else(|_| "Unknown User".to_string())
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if c.is_control() && !matches!(c, '\n' | '\r' | '\t') => {}
            c => out.push(c),
        }
    }
    out
}

/// Render the document
#[must_use]
pub fn render(
    suites: &[TestSuite],
    passed: bool,
    options: &ReportOptions,
    author: &str,
    date: DateTime<Local>,
) -> String {
    let tests: usize = suites.iter().map(|s| s.cases.len()).sum();
    let failures: usize = suites.iter().map(TestSuite::failures).sum();
    let errors: usize = suites.iter().map(TestSuite::errors).sum();

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    if let Some(sheet) = &options.stylesheet {
        let _ = writeln!(xml, "<?xml-stylesheet type='text/xsl' href='{}'?>", escape(sheet));
    }
    let _ = writeln!(
        xml,
        "<testsuites tests=\"{tests}\" failures=\"{failures}\" errors=\"{errors}\" skipped=\"0\">"
    );

    let date = date.format("%a %d. %B %Y, %H:%M").to_string();
    let verdict = if passed { "PASSED" } else { "FAILED" };
    xml.push_str("  <properties>\n");
    for (name, value) in [
        ("Checkpoint", options.checkpoint.as_str()),
        ("Test Result", verdict),
        ("Author", author),
        ("Date", date.as_str()),
    ] {
        let _ = writeln!(
            xml,
            "    <property name=\"{}\" value=\"{}\"/>",
            escape(name),
            escape(value)
        );
    }
    xml.push_str("  </properties>\n");

    for suite in suites {
        let _ = writeln!(
            xml,
            "  <testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"{}\" skipped=\"0\">",
            escape(&suite.name),
            suite.cases.len(),
            suite.failures(),
            suite.errors()
        );
        for case in &suite.cases {
            let open = format!(
                "    <testcase name=\"{}\" classname=\"{}\"",
                escape(&case.name),
                escape(&case.classname)
            );
            match &case.outcome {
                CaseOutcome::Passed => {
                    let _ = writeln!(xml, "{open}/>");
                }
                CaseOutcome::Failed { divergent } => {
                    let _ = writeln!(xml, "{open}>");
                    let _ = writeln!(
                        xml,
                        "      <failure type=\"failure\" message=\"{FAILURE_MESSAGE}\">{divergent}</failure>"
                    );
                    xml.push_str("    </testcase>\n");
                }
                CaseOutcome::Error { reason } => {
                    let _ = writeln!(xml, "{open}>");
                    let _ = writeln!(
                        xml,
                        "      <error type=\"error\" message=\"{}\"/>",
                        escape(reason)
                    );
                    xml.push_str("    </testcase>\n");
                }
            }
        }
        xml.push_str("  </testsuite>\n");
    }
    xml.push_str("</testsuites>\n");
    xml
}

/// Write the JUnit document for a batch
///
/// # Errors
///
/// Returns error if the file cannot be written
pub fn write_junit(path: impl AsRef<Path>, report: &BatchReport, options: &ReportOptions) -> ReportResult<()> {
    let path = path.as_ref();
    let xml = render(
        &suites(report, options),
        report.passed(),
        options,
        &author(),
        Local::now(),
    );
    std::fs::write(path, xml)?;
    info!(path = %path.display(), "JUnit report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use chrono::TimeZone;

    fn fixed_date() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap()
    }

    #[test]
    fn test_suites_skip_excluded_and_sort() {
        let report = fixtures::batch();
        let suites = suites(&report, &ReportOptions::default());
        assert_eq!(suites.len(), 1);
        let names: Vec<&str> = suites[0].cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Algo.CAM.Flag", "Algo.CAM.Other", "Algo.VDY.Speed", "Perc.EM.Count"]
        );
        assert_eq!(suites[0].failures(), 2);
        assert_eq!(suites[0].cases[0].classname, "Algo.CAM");
        assert_eq!(
            suites[0].cases[0].outcome,
            CaseOutcome::Failed { divergent: 3 }
        );
    }

    #[test]
    fn test_render_document() {
        let report = fixtures::batch();
        let options = ReportOptions::default().with_checkpoint("CP <1>");
        let xml = render(&suites(&report, &options), false, &options, "tester", fixed_date());

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<?xml-stylesheet type='text/xsl' href='silsil_junit.xslt'?>"));
        assert!(xml.contains("<testsuites tests=\"4\" failures=\"2\" errors=\"0\" skipped=\"0\">"));
        assert!(xml.contains("<property name=\"Checkpoint\" value=\"CP &lt;1&gt;\"/>"));
        assert!(xml.contains("<property name=\"Test Result\" value=\"FAILED\"/>"));
        assert!(xml.contains("<property name=\"Date\" value=\"Tue 05. March 2024, 14:07\"/>"));
        assert!(xml.contains("<testcase name=\"Algo.VDY.Speed\" classname=\"Algo.VDY\"/>"));
        assert!(xml.contains(
            "<failure type=\"failure\" message=\"Number of different frame\">3</failure>"
        ));
        assert!(!xml.contains("TimeStamp"));
    }

    #[test]
    fn test_render_without_stylesheet() {
        let options = ReportOptions::default().with_stylesheet(None);
        let xml = render(&[], true, &options, "tester", fixed_date());
        assert!(!xml.contains("xml-stylesheet"));
        assert!(xml.contains("value=\"PASSED\""));
        assert!(xml.contains("tests=\"0\""));
    }

    #[test]
    fn test_failed_pair_is_error_case() {
        let mut report = fixtures::batch();
        report.failures.push(sigcmp_compare::PairFailure {
            recording: "rec02".to_string(),
            reference: "rec02_sil_sil_a.bsig".into(),
            compared: "rec02_sil_sil_b.bsig".into(),
            error: sigcmp_compare::SessionError::incomparable("sample counts differ"),
        });
        let suites = suites(&report, &ReportOptions::default());
        assert_eq!(suites.len(), 2);
        assert_eq!(suites[1].errors(), 1);
        let xml = render(&suites, report.passed(), &ReportOptions::default(), "t", fixed_date());
        assert!(xml.contains("<error type=\"error\" message=\"incomparable traces: sample counts differ\"/>"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a&b<c>\"d'"), "a&amp;b&lt;c&gt;&quot;d&apos;");
        assert_eq!(escape("x\u{1}y"), "xy");
    }

    #[test]
    fn test_write_junit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("result.xml");
        write_junit(&path, &fixtures::batch(), &ReportOptions::default()).unwrap();
        let xml = std::fs::read_to_string(&path).unwrap();
        assert!(xml.contains("<testsuite name=\"rec01\""));
    }
}
