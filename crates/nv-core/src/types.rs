use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::diff::Change;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelId(String);

impl LabelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for LabelId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LabelId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for LabelId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&LabelId> for LabelId {
    fn from(value: &LabelId) -> Self {
        value.clone()
    }
}

/// Content fingerprint of a step, lower-case hex.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepHash(String);

impl StepHash {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedLabel {
    pub label: LabelId,
    pub current_step_index: usize,
}

/// Canonical state of the narration at one instant. History diffs are
/// computed between two of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStepData {
    pub path: String,
    pub storage: Value,
    pub canvas: Value,
    pub sound: Value,
    pub label_index: Option<usize>,
    pub opened_labels: Vec<OpenedLabel>,
}

impl Default for HistoryStepData {
    fn default() -> Self {
        Self {
            path: String::new(),
            storage: Value::Object(Map::new()),
            canvas: Value::Object(Map::new()),
            sound: Value::Object(Map::new()),
            label_index: None,
            opened_labels: Vec::new(),
        }
    }
}

impl HistoryStepData {
    pub fn to_value(&self) -> Value {
        json!({
            "path": self.path,
            "storage": self.storage,
            "canvas": self.canvas,
            "sound": self.sound,
            "labelIndex": self.label_index,
            "openedLabels": self.opened_labels,
        })
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Stack, path and label index equality, checked before diffing.
    pub fn same_position(&self, other: &Self) -> bool {
        self.path == other.path
            && self.label_index == other.label_index
            && self.opened_labels == other.opened_labels
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dialogue {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
}

impl Dialogue {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            character: None,
        }
    }

    pub fn with_character(text: impl Into<String>, character: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            character: Some(character.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChoiceTarget {
    Call { label: LabelId },
    Jump { label: LabelId },
    Close,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub text: String,
    pub target: ChoiceTarget,
    #[serde(default)]
    pub one_time: bool,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub props: Value,
}

impl ChoiceOption {
    pub fn call(text: impl Into<String>, label: impl Into<LabelId>) -> Self {
        Self {
            text: text.into(),
            target: ChoiceTarget::Call {
                label: label.into(),
            },
            one_time: false,
            props: Value::Null,
        }
    }

    pub fn jump(text: impl Into<String>, label: impl Into<LabelId>) -> Self {
        Self {
            text: text.into(),
            target: ChoiceTarget::Jump {
                label: label.into(),
            },
            one_time: false,
            props: Value::Null,
        }
    }

    pub fn close(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target: ChoiceTarget::Close,
            one_time: false,
            props: Value::Null,
        }
    }

    pub fn once(mut self) -> Self {
        self.one_time = true;
        self
    }
}

/// A pending option paired with its index in the menu as it was set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferedChoice {
    pub index: usize,
    pub option: ChoiceOption,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub diff: Vec<Change>,
    pub current_label: Option<LabelId>,
    pub step_hash: Option<StepHash>,
    pub index: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_step_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue: Option<Dialogue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<ChoiceOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_index_made: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceMade {
    pub label: LabelId,
    pub step_index: usize,
    pub choice_index: usize,
    pub step_hash: StepHash,
    pub made_times: u32,
}

impl ChoiceMade {
    pub fn matches(
        &self,
        label: &LabelId,
        step_index: usize,
        choice_index: usize,
        step_hash: &StepHash,
    ) -> bool {
        self.label == *label
            && self.step_index == step_index
            && self.choice_index == choice_index
            && self.step_hash == *step_hash
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelProgress {
    pub biggest_step: usize,
    pub open_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomDraw {
    Value(i64),
    Exhausted,
}

impl RandomDraw {
    pub fn value(self) -> Option<i64> {
        match self {
            Self::Value(value) => Some(value),
            Self::Exhausted => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NarrationState {
    Idle,
    Running,
    AwaitingChoice,
    AwaitingInput,
    Ended,
    Halted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptChoice {
    pub text: String,
    pub is_response: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue: Option<Dialogue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<TranscriptChoice>>,
    pub player_made_choice: bool,
    pub step_index: u64,
}
