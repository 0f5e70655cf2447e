use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssessmentError {
    #[error("Malformed value for {parameter}: '{raw}'")]
    MalformedValue { parameter: String, raw: String },

    #[error("Missing parameter: {parameter} is not present in the snapshot")]
    MissingParameter { parameter: String },

    #[error("Invalid host profile: {0}")]
    InvalidHostProfile(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl AssessmentError {
    pub fn malformed(parameter: &str, raw: impl Into<String>) -> Self {
        Self::MalformedValue {
            parameter: parameter.to_string(),
            raw: raw.into(),
        }
    }

    /// True for errors that only concern one rule's input and must not abort a run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MalformedValue { .. } | Self::MissingParameter { .. }
        )
    }
}

