mod scripted;
mod story;

use nv_core::NarrationError;
use nv_runtime::{
    LabelRegistry, Narration, NarrationOptions, NarrationSave, StepOutcome,
};
use serde_json::Value;

pub use scripted::{compile_story, interpolate, ScriptedStep, INPUT_PLACEHOLDER};
pub use story::{
    parse_story, validate_story, ChoiceSpec, StepSpec, StoryDocument, StoryLabel,
    STORY_CHOICE_TARGET, STORY_DUPLICATE_LABEL, STORY_INVALID, STORY_UNKNOWN_LABEL,
};

pub const DEFAULT_ENTRY_LABEL: &str = "start";

#[derive(Debug, Clone, Default)]
pub struct CreateNarrationOptions {
    pub story_json: String,
    pub entry_label: Option<String>,
    pub random_seed: Option<u32>,
    pub history_limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ResumeNarrationOptions {
    pub story_json: String,
    pub save: NarrationSave,
    pub history_limit: Option<usize>,
}

pub fn compile_story_from_json(story_json: &str) -> Result<LabelRegistry, NarrationError> {
    let document = parse_story(story_json)?;
    Ok(compile_story(&document))
}

/// Builds a narration for the story and runs its entry label up to the first
/// step that settles.
pub async fn create_narration_from_json(
    options: CreateNarrationOptions,
) -> Result<Narration, NarrationError> {
    let labels = compile_story_from_json(&options.story_json)?;
    let entry_label = resolve_entry_label(&labels, options.entry_label)?;

    let mut narration = story_narration(labels, options.random_seed, options.history_limit);
    narration.call_label(entry_label, &Value::Null).await?;
    Ok(narration)
}

pub fn resume_narration_from_json(
    options: ResumeNarrationOptions,
) -> Result<Narration, NarrationError> {
    let labels = compile_story_from_json(&options.story_json)?;
    let mut narration = story_narration(labels, None, options.history_limit);
    narration.import_state(options.save)?;
    Ok(narration)
}

fn story_narration(
    labels: LabelRegistry,
    random_seed: Option<u32>,
    history_limit: Option<usize>,
) -> Narration {
    Narration::new(
        NarrationOptions {
            labels,
            random_seed,
            history_limit,
            ..NarrationOptions::default()
        }
        .with_game_end(|_ctx, _props| {
            tracing::debug!("story finished");
            StepOutcome::Continue
        }),
    )
}

fn resolve_entry_label(
    labels: &LabelRegistry,
    explicit: Option<String>,
) -> Result<String, NarrationError> {
    if let Some(entry) = explicit {
        if !labels.contains(&entry) {
            return Err(NarrationError::new(
                "API_ENTRY_LABEL_NOT_FOUND",
                format!("Entry label \"{}\" is not declared.", entry),
            ));
        }
        return Ok(entry);
    }

    if labels.contains(DEFAULT_ENTRY_LABEL) {
        return Ok(DEFAULT_ENTRY_LABEL.to_string());
    }

    Err(NarrationError::new(
        "API_ENTRY_START_NOT_FOUND",
        format!(
            "Expected a label with id \"{}\" as default entry.",
            DEFAULT_ENTRY_LABEL
        ),
    ))
}
