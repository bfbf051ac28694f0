//! Report options.

use serde::{Deserialize, Serialize};

/// Checkpoint label used when none is given
pub const NO_CHECKPOINT: &str = "No checkpoint specified!";

/// Stylesheet referenced from the JUnit document
pub const DEFAULT_STYLESHEET: &str = "silsil_junit.xslt";

/// Options shared by all report writers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    /// Software checkpoint the candidate build was made from
    pub checkpoint: String,
    /// `xml-stylesheet` target, omitted when `None`
    pub stylesheet: Option<String>,
    /// Ids containing any of these segments are left out of reports
    pub excluded_segments: Vec<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            checkpoint: NO_CHECKPOINT.to_string(),
            stylesheet: Some(DEFAULT_STYLESHEET.to_string()),
            excluded_segments: vec!["Package".to_string()],
        }
    }
}

impl ReportOptions {
    /// Set the checkpoint label
    #[must_use]
    pub fn with_checkpoint(mut self, checkpoint: impl Into<String>) -> Self {
        self.checkpoint = checkpoint.into();
        self
    }

    /// Set or clear the stylesheet
    #[must_use]
    pub fn with_stylesheet(mut self, stylesheet: Option<String>) -> Self {
        self.stylesheet = stylesheet;
        self
    }

    /// Set the excluded segments
    #[must_use]
    pub fn with_excluded_segments<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_segments = segments.into_iter().map(Into::into).collect();
        self
    }

    /// Whether a signal, group or component id is left out
    #[must_use]
    pub fn is_excluded(&self, id: &str) -> bool {
        id.split(sigcmp_core::SEPARATOR)
            .any(|segment| self.excluded_segments.iter().any(|e| e == segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excluded_by_segment() {
        let options = ReportOptions::default();
        assert!(options.is_excluded("MTS.Package.TimeStamp"));
        assert!(options.is_excluded("MTS.Package"));
        assert!(options.is_excluded("Package"));
        assert!(!options.is_excluded("MTS"));
        assert!(!options.is_excluded("Algo.PackageInfo.x"));
    }

    #[test]
    fn test_options_builder() {
        let options = ReportOptions::default()
            .with_checkpoint("AL_ALGO_01.02.03")
            .with_stylesheet(None)
            .with_excluded_segments(Vec::<String>::new());
        assert_eq!(options.checkpoint, "AL_ALGO_01.02.03");
        assert!(options.stylesheet.is_none());
        assert!(!options.is_excluded("MTS.Package"));
    }
}
