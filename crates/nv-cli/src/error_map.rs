use std::fmt::Display;

use nv_core::NarrationError;
use serde_json::Value;

fn map_error(code: &'static str, error: impl Display) -> NarrationError {
    NarrationError::new(code, error.to_string())
}

/// JSON string literal for `text`; never fails.
pub(crate) fn json_string(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

pub(crate) fn emit_error(error: NarrationError) -> i32 {
    tracing::debug!(code = %error.code, "command failed");
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!("ERROR_MSG_JSON:{}", json_string(&error.message));
    1
}

pub(crate) fn map_play_io(error: std::io::Error) -> NarrationError {
    map_error("PLAY_IO", error)
}

pub(crate) fn map_cli_runtime(error: std::io::Error) -> NarrationError {
    map_error("CLI_RUNTIME", error)
}

pub(crate) fn map_cli_story_path(error: std::io::Error) -> NarrationError {
    map_error("CLI_STORY_PATH", error)
}

pub(crate) fn map_cli_story_read(error: std::io::Error) -> NarrationError {
    map_error("CLI_STORY_READ", error)
}

pub(crate) fn map_cli_story_invalid(error: serde_json::Error) -> NarrationError {
    map_error("CLI_STORY_INVALID", error)
}

pub(crate) fn map_cli_state_write(error: std::io::Error) -> NarrationError {
    map_error("CLI_STATE_WRITE", error)
}

pub(crate) fn map_cli_state_read(error: std::io::Error) -> NarrationError {
    map_error("CLI_STATE_READ", error)
}

pub(crate) fn map_cli_state_invalid(error: serde_json::Error) -> NarrationError {
    map_error("CLI_STATE_INVALID", error)
}

pub(crate) fn map_cli_output(error: serde_json::Error) -> NarrationError {
    map_error("CLI_OUTPUT", error)
}
