//! Comparison configuration.

use crate::error::{CompareResult, SessionError};
use serde::{Deserialize, Serialize};
use sigcmp_trace::OpenOptions;
use std::path::Path;

/// Lane holding the recording timestamps in microseconds
pub const DEFAULT_TIME_AXIS: &str = "MTS.Package.TimeStamp";

/// Options for a comparison session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Lane used as the shared sample-time axis
    pub time_axis: String,
    /// Whether the time-axis lane is itself diffed
    pub compare_time_axis: bool,
    /// Exact names never compared; checked against both traces' names
    pub deny_list: Vec<String>,
    /// If set, compare only these names instead of the whole reference catalog
    pub allow_list: Option<Vec<String>>,
    /// How trace files are opened
    pub open: OpenOptions,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            time_axis: DEFAULT_TIME_AXIS.to_string(),
            compare_time_axis: true,
            deny_list: Vec::new(),
            allow_list: None,
            open: OpenOptions::default(),
        }
    }
}

impl CompareConfig {
    /// Set the time-axis lane
    #[must_use]
    pub fn with_time_axis(mut self, lane: impl Into<String>) -> Self {
        self.time_axis = lane.into();
        self
    }

    /// Include or skip the time-axis lane in the diff
    #[must_use]
    pub fn with_compare_time_axis(mut self, enabled: bool) -> Self {
        self.compare_time_axis = enabled;
        self
    }

    /// Set the deny-list
    #[must_use]
    pub fn with_deny_list<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deny_list = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the allow-list
    #[must_use]
    pub fn with_allow_list<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_list = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Set the trace open options
    #[must_use]
    pub fn with_open_options(mut self, open: OpenOptions) -> Self {
        self.open = open;
        self
    }

    /// Whether a name is on the deny-list
    #[must_use]
    pub fn is_denied(&self, name: &str) -> bool {
        self.deny_list.iter().any(|d| d == name)
    }

    /// Check the configuration is usable
    ///
    /// # Errors
    ///
    /// Returns error if the time-axis lane name is empty
    pub fn validate(&self) -> CompareResult<()> {
        if self.time_axis.trim().is_empty() {
            return Err(SessionError::Config {
                reason: "time axis lane name is empty".to_string(),
            });
        }
        Ok(())
    }

    /// Parse from JSON; missing fields take their defaults
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed or the result is invalid
    pub fn from_json(json: &str) -> CompareResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| SessionError::Config {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> CompareResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| SessionError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }
}
