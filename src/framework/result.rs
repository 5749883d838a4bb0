//! The uniform result contract every analyzer returns (spec §4.1).

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Execution metadata attached to every `AnalysisResult`. Informational only —
/// equality on `AnalysisResult` ignores it (spec §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub analysis_time: f64,
    pub parameters: Value,
}

impl AnalysisMetadata {
    pub fn new(elapsed: Duration, parameters: Value) -> Self {
        Self {
            analysis_time: elapsed.as_secs_f64(),
            parameters,
        }
    }

    pub fn empty() -> Self {
        Self {
            analysis_time: 0.0,
            parameters: Value::Null,
        }
    }
}

/// The result of one `analyze()` call.
///
/// `success = false` never coexists with any `data` beyond what `summary` and
/// `errors` already carry (spec §7 propagation policy): check `success`
/// before trusting `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub success: bool,
    pub data: HashMap<String, Value>,
    pub summary: String,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub metadata: AnalysisMetadata,
}

impl AnalysisResult {
    pub fn success(data: HashMap<String, Value>, summary: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            summary: summary.into(),
            warnings: Vec::new(),
            errors: Vec::new(),
            metadata: AnalysisMetadata::empty(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        let message = error.into();
        Self {
            success: false,
            data: HashMap::new(),
            summary: message.clone(),
            warnings: Vec::new(),
            errors: vec![message],
            metadata: AnalysisMetadata::empty(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_metadata(mut self, metadata: AnalysisMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn get(&self, key: &str, default: Value) -> Value {
        self.data.get(key).cloned().unwrap_or(default)
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl PartialEq for AnalysisResult {
    fn eq(&self, other: &Self) -> bool {
        self.success == other.success && self.data == other.data
    }
}

impl From<&AnalysisResult> for bool {
    fn from(result: &AnalysisResult) -> bool {
        result.success
    }
}
