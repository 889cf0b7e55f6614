//! Batch job files: one template plus the records that fill it.
//!
//! ```yaml
//! template: "Hello, I'm {{name}}, please help me in {{subject}} task."
//! records:
//!   - { name: Alice, subject: Kotlin }
//!   - { name: Bob, subject: Rust }
//! ```

use crate::types::Record;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    pub template: String,
    #[serde(default)]
    pub records: Vec<Record>,
}

impl BatchJob {
    pub fn new(template: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            template: template.into(),
            records,
        }
    }

    /// Built-in demo job used when no job file is given.
    pub fn sample() -> Self {
        Self::new(
            "Hello, I'm {{name}}, please help me in {{subject}} task. I have {{time}} minutes to answer.",
            vec![
                Record::new().with("name", "Alice").with("subject", "Kotlin").with("time", 10),
                Record::new().with("name", "Bob").with("subject", "Rust").with("time", 20),
                Record::new().with("name", "Charlie").with("subject", "Go").with("time", 30),
            ],
        )
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Loads a job file; `.json` is parsed as JSON, anything else as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(
                format!("cannot read job file: {}", e),
                ErrorContext::new("job_loader").key(path.display().to_string()),
            )
        })?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let job = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_yaml_str(&content)?
        };
        tracing::debug!(path = %path.display(), records = job.records.len(), "loaded batch job");
        Ok(job)
    }
}
