use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use nv_core::{Dialogue, InputRequest, NarrationError, RandomDraw};
use nv_runtime::{Label, LabelRegistry, RandomOptions, Step, StepContext, StepOutcome, StepProps};
use regex::Regex;
use serde_json::Value;

use crate::story::{StepSpec, StoryDocument};

/// Name that `${...}` resolves to the last submitted input value.
pub const INPUT_PLACEHOLDER: &str = "input";

/// A story step. Its source text is the step record re-encoded as JSON, so
/// editing the record in the story file changes the step hash.
pub struct ScriptedStep {
    spec: StepSpec,
    source: String,
}

impl ScriptedStep {
    pub fn new(spec: StepSpec) -> Self {
        let source = serde_json::to_string(&spec).unwrap_or_else(|error| {
            tracing::warn!(%error, "step record does not encode, hashing its debug form");
            format!("{:?}", spec)
        });
        Self { spec, source }
    }

    pub fn spec(&self) -> &StepSpec {
        &self.spec
    }
}

#[async_trait(?Send)]
impl Step for ScriptedStep {
    fn source(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.source)
    }

    async fn run(
        &self,
        ctx: &mut StepContext<'_>,
        _props: &StepProps,
    ) -> Result<StepOutcome, NarrationError> {
        match &self.spec {
            StepSpec::Say { text, character } => {
                let text = interpolate(text, ctx);
                let dialogue = match character {
                    Some(character) => Dialogue::with_character(text, character.clone()),
                    None => Dialogue::new(text),
                };
                ctx.set_dialogue(Some(dialogue));
            }
            StepSpec::Choice { prompt, options } => {
                if let Some(prompt) = prompt {
                    let prompt = interpolate(prompt, ctx);
                    ctx.set_dialogue(Some(Dialogue::new(prompt)));
                }
                let options = options
                    .iter()
                    .map(|option| option.to_option())
                    .collect::<Result<Vec<_>, _>>()?;
                ctx.set_choice_menu_options(Some(options));
            }
            StepSpec::Input { prompt, default } => {
                let prompt = interpolate(prompt, ctx);
                ctx.set_dialogue(Some(Dialogue::new(prompt)));
                ctx.request_input(InputRequest {
                    kind: Some("text".to_string()),
                    default_value: default.clone(),
                });
            }
            StepSpec::Set { key, value } => ctx.storage_mut().set_variable(key, value.clone()),
            StepSpec::Call { label } => return Ok(StepOutcome::call(label.as_str())),
            StepSpec::Jump { label } => return Ok(StepOutcome::jump(label.as_str())),
            StepSpec::Random {
                key,
                min,
                max,
                once_only,
            } => {
                let options = RandomOptions {
                    once_only: *once_only,
                    nested_id: None,
                };
                match ctx.get_random_number(*min, *max, options)? {
                    RandomDraw::Value(value) => {
                        ctx.storage_mut().set_variable(key, Value::from(value))
                    }
                    RandomDraw::Exhausted => ctx.storage_mut().set_variable(key, Value::Null),
                }
            }
            StepSpec::Navigate { path } => ctx.navigate(path.clone()),
            StepSpec::Show { alias, element } => ctx.canvas_mut().show(alias, element.clone()),
            StepSpec::Hide { alias } => ctx.canvas_mut().remove(alias),
            StepSpec::PlaySound { channel, sound } => ctx.sound_mut().play(channel, sound.clone()),
            StepSpec::StopSound { channel } => ctx.sound_mut().stop(channel),
            StepSpec::End => return Ok(StepOutcome::CloseAllLabels),
        }
        Ok(StepOutcome::Continue)
    }
}

fn placeholder_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\$\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\}").expect("placeholder regex must compile")
    })
}

/// Replaces `${name}` with the storage variable `name`. Strings are inserted
/// bare, other values as JSON; unknown names are left untouched.
pub fn interpolate(text: &str, ctx: &StepContext<'_>) -> String {
    placeholder_regex()
        .replace_all(text, |captures: &regex::Captures<'_>| {
            let name = &captures[1];
            let value = match ctx.storage().get_variable(name) {
                Some(value) => Some(value),
                None if name == INPUT_PLACEHOLDER => ctx.input_value(),
                None => None,
            };
            match value {
                Some(Value::String(inner)) => inner,
                Some(other) => other.to_string(),
                None => captures[0].to_string(),
            }
        })
        .into_owned()
}

pub fn compile_story(document: &StoryDocument) -> LabelRegistry {
    document
        .labels
        .iter()
        .map(|label| {
            let steps = label
                .steps
                .iter()
                .cloned()
                .map(|spec| Arc::new(ScriptedStep::new(spec)) as Arc<dyn Step>)
                .collect();
            Label::new(label.id.as_str(), steps)
        })
        .collect()
}
