use nv_runtime::NarrationSave;
use serde::{Deserialize, Serialize};

pub(crate) const PLAYER_STATE_SCHEMA: &str = "narration-player-state.v1";

#[derive(Debug, Clone)]
pub(crate) struct LoadedStory {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) story_json: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlayerState {
    pub(crate) schema_version: String,
    pub(crate) story_id: String,
    pub(crate) save: NarrationSave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoundaryEvent {
    Line,
    Choices,
    Input,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BoundaryResult {
    pub(crate) event: BoundaryEvent,
    pub(crate) text: Option<String>,
    pub(crate) speaker: Option<String>,
    pub(crate) choices: Vec<(usize, String)>,
    pub(crate) input_default: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineCommandAction {
    NotHandled,
    Continue,
    RefreshBoundary,
    Quit,
}

pub(crate) struct LineCommandContext<'a> {
    pub(crate) state_file: &'a str,
    pub(crate) story: &'a LoadedStory,
}
