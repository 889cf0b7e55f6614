use crate::batch::BatchError;
use crate::client::ClientError;
use crate::template::RenderError;
use std::fmt;
use thiserror::Error;

/// Where a configuration or loading failure came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Component that rejected the input, e.g. `job_loader`.
    pub origin: &'static str,
    /// Offending setting or file path.
    pub key: Option<String>,
    pub details: Option<String>,
}

impl ErrorContext {
    pub fn new(origin: &'static str) -> Self {
        Self {
            origin,
            key: None,
            details: None,
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.origin)?;
        if let Some(key) = &self.key {
            write!(f, " at {}", key)?;
        }
        if let Some(details) = &self.details {
            write!(f, ": {}", details)?;
        }
        Ok(())
    }
}

/// Unified error type for prompt generation and dispatch.
///
/// Component errors (`RenderError`, `ClientError`, `BatchError`) convert into this
/// type with `?`, so callers running a whole job only need to handle one error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("Configuration error: {message} ({context})")]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub fn configuration(message: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: message.into(),
            context,
        }
    }

    /// Context of a configuration failure; `None` for every other kind.
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }
}
