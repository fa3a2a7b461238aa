//! Error types for rule normalization and analysis runs.
//!
//! Only conditions that prevent a report from being produced live here. A missing
//! calibration reference, an unlocatable target or an ambiguous match are not errors:
//! they surface as `info` verdicts or notes inside a verdict message.
use labelcheck_vision::VisionError;
use thiserror::Error;

/// A raw rule was malformed or incomplete. The whole batch is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rule '{rule}' is invalid: `{field}` {reason}")]
pub struct RuleValidationError {
    /// Rule id, or `#<position>` when the rule carried no id.
    pub rule: String,
    pub field: String,
    pub reason: String,
}

impl RuleValidationError {
    pub fn new(rule: impl Into<String>, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    InvalidRules(#[from] RuleValidationError),
    #[error("sensitivity must be between 0 and 100, got {0}")]
    InvalidSensitivity(i64),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("label collaborator failed: {0}")]
    Vision(#[from] VisionError),
    #[error("analysis was cancelled")]
    Cancelled,
    #[error("failed to start rule worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    #[error("rule evaluation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
