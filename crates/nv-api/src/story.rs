//! JSON story documents: labels made of tagged step records.

use std::collections::BTreeSet;

use nv_core::{ChoiceOption, NarrationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STORY_INVALID: &str = "API_STORY_INVALID";
pub const STORY_DUPLICATE_LABEL: &str = "API_STORY_DUPLICATE_LABEL";
pub const STORY_UNKNOWN_LABEL: &str = "API_STORY_UNKNOWN_LABEL";
pub const STORY_CHOICE_TARGET: &str = "API_STORY_CHOICE_TARGET";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryDocument {
    pub labels: Vec<StoryLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryLabel {
    pub id: String,
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StepSpec {
    Say {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        character: Option<String>,
    },
    Choice {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
        options: Vec<ChoiceSpec>,
    },
    Input {
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<Value>,
    },
    Set {
        key: String,
        value: Value,
    },
    Call {
        label: String,
    },
    Jump {
        label: String,
    },
    #[serde(rename_all = "camelCase")]
    Random {
        key: String,
        min: i64,
        max: i64,
        #[serde(default)]
        once_only: bool,
    },
    Navigate {
        path: String,
    },
    Show {
        alias: String,
        element: Value,
    },
    Hide {
        alias: String,
    },
    PlaySound {
        channel: String,
        sound: Value,
    },
    StopSound {
        channel: String,
    },
    End,
}

/// One menu entry. Exactly one of `call`, `jump` or `close` picks the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceSpec {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jump: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub close: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub one_time: bool,
}

impl ChoiceSpec {
    pub fn to_option(&self) -> Result<ChoiceOption, NarrationError> {
        let option = match (&self.call, &self.jump, self.close) {
            (Some(label), None, false) => ChoiceOption::call(self.text.clone(), label.as_str()),
            (None, Some(label), false) => ChoiceOption::jump(self.text.clone(), label.as_str()),
            (None, None, true) => ChoiceOption::close(self.text.clone()),
            _ => {
                return Err(NarrationError::new(
                    STORY_CHOICE_TARGET,
                    format!(
                        "Choice \"{}\" needs exactly one of call, jump or close.",
                        self.text
                    ),
                ))
            }
        };
        Ok(if self.one_time { option.once() } else { option })
    }
}

pub fn parse_story(story_json: &str) -> Result<StoryDocument, NarrationError> {
    let document: StoryDocument = serde_json::from_str(story_json).map_err(|error| {
        tracing::error!(%error, "story document does not decode");
        NarrationError::new(STORY_INVALID, format!("Story document is invalid: {}", error))
    })?;
    validate_story(&document)?;
    Ok(document)
}

/// Label ids must be unique and every call, jump and choice target must
/// name a label of the same document.
pub fn validate_story(document: &StoryDocument) -> Result<(), NarrationError> {
    let mut ids = BTreeSet::new();
    for label in &document.labels {
        if !ids.insert(label.id.as_str()) {
            return Err(NarrationError::new(
                STORY_DUPLICATE_LABEL,
                format!("Label \"{}\" is declared twice.", label.id),
            ));
        }
    }

    let check = |owner: &str, target: &str| -> Result<(), NarrationError> {
        if ids.contains(target) {
            return Ok(());
        }
        Err(NarrationError::new(
            STORY_UNKNOWN_LABEL,
            format!("Label \"{}\" refers to unknown label \"{}\".", owner, target),
        ))
    };

    for label in &document.labels {
        for step in &label.steps {
            match step {
                StepSpec::Call { label: target } | StepSpec::Jump { label: target } => {
                    check(&label.id, target)?
                }
                StepSpec::Choice { options, .. } => {
                    for option in options {
                        option.to_option()?;
                        if let Some(target) = option.call.as_ref().or(option.jump.as_ref()) {
                            check(&label.id, target)?;
                        }
                    }
                }
                _ => {}
            }
        }
    }
    Ok(())
}
