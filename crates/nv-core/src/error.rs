use thiserror::Error;

pub const LABEL_NOT_FOUND: &str = "NARRATION_LABEL_NOT_FOUND";
pub const NO_STEPS_REMAINING: &str = "NARRATION_NO_STEPS_REMAINING";
pub const NO_OPEN_LABEL_AT_END: &str = "NARRATION_NO_OPEN_LABEL_AT_END";
pub const STEP_FAILED: &str = "NARRATION_STEP_FAILED";
pub const GO_BACK_UNDERFLOW: &str = "NARRATION_GO_BACK_UNDERFLOW";
pub const DIFF_REPLAY_FAILED: &str = "NARRATION_DIFF_REPLAY_FAILED";
pub const CHOICE_INDEX: &str = "NARRATION_CHOICE_INDEX";
pub const RANDOM_RANGE: &str = "NARRATION_RANDOM_RANGE";
pub const SAVE_SCHEMA: &str = "NARRATION_SAVE_SCHEMA";
pub const SAVE_INVALID: &str = "NARRATION_SAVE_INVALID";
pub const COLLABORATOR_IMPORT: &str = "NARRATION_COLLABORATOR_IMPORT";
pub const HALTED: &str = "NARRATION_HALTED";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct NarrationError {
    pub code: String,
    pub message: String,
}

impl NarrationError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn label_not_found(label: &str) -> Self {
        Self::new(
            LABEL_NOT_FOUND,
            format!("Label \"{}\" is not registered.", label),
        )
    }

    pub fn step_failed(label: &str, step_index: usize, reason: impl std::fmt::Display) -> Self {
        Self::new(
            STEP_FAILED,
            format!(
                "Step {} of label \"{}\" failed: {}",
                step_index, label, reason
            ),
        )
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}
