//! Error types for the Storage Planner
//!
//! Provides structured error types for every engine component: disk
//! enumeration, strategy configuration and the per-step failures raised
//! while a strategy is applied to the host.

use thiserror::Error;

/// Unified error type for the planner
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Discovery Errors
    // =========================================================================
    #[error("Disk enumeration failed: {0}")]
    Enumeration(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    // =========================================================================
    // Execution Errors
    // =========================================================================
    #[error("Required tool '{tool}' is not installed: {remediation}")]
    ToolUnavailable { tool: String, remediation: String },

    #[error("Step '{step}' failed: {output}")]
    StepFailure { step: String, output: String },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the caller should do with the rest of the run after an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Stop; nothing downstream can produce a meaningful result
    Abort,
    /// Record the failure and keep executing the remaining steps
    ContinueRun,
}

impl Error {
    /// Build a `ToolUnavailable` error with an install hint
    pub fn tool_unavailable(tool: impl Into<String>, remediation: impl Into<String>) -> Self {
        Error::ToolUnavailable {
            tool: tool.into(),
            remediation: remediation.into(),
        }
    }

    /// Build a `StepFailure` carrying raw tool output
    pub fn step_failure(step: impl Into<String>, output: impl Into<String>) -> Self {
        Error::StepFailure {
            step: step.into(),
            output: output.into(),
        }
    }

    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            // A failed step never takes the rest of the sequence down with it
            Error::ToolUnavailable { .. }
            | Error::StepFailure { .. }
            | Error::UnsupportedConfiguration(_)
            | Error::Io(_) => ErrorAction::ContinueRun,

            Error::Enumeration(_)
            | Error::Configuration(_)
            | Error::JsonParse(_)
            | Error::YamlParse(_) => ErrorAction::Abort,
        }
    }

    /// Check if this error ends the run
    pub fn is_fatal(&self) -> bool {
        matches!(self.action(), ErrorAction::Abort)
    }
}

/// Result type alias for the planner
pub type Result<T> = std::result::Result<T, Error>;
