use std::path::Path;

use nv_api::{
    create_narration_from_json, resume_narration_from_json, CreateNarrationOptions,
    ResumeNarrationOptions,
};
use nv_core::NarrationError;
use nv_runtime::Narration;

use crate::{
    emit_boundary, load_player_state, load_story_by_ref, save_player_state, BoundaryResult,
    LoadedStory, PlayerState, PLAYER_STATE_SCHEMA,
};

pub(crate) async fn create_narration_for_story(
    story: &LoadedStory,
    entry_label: Option<String>,
    seed: Option<u32>,
) -> Result<Narration, NarrationError> {
    create_narration_from_json(CreateNarrationOptions {
        story_json: story.story_json.clone(),
        entry_label,
        random_seed: seed,
        history_limit: None,
    })
    .await
}

pub(crate) fn resume_narration_for_state(
    story: &LoadedStory,
    state: &PlayerState,
) -> Result<Narration, NarrationError> {
    resume_narration_from_json(ResumeNarrationOptions {
        story_json: story.story_json.clone(),
        save: state.save.clone(),
        history_limit: None,
    })
}

pub(crate) fn save_narration_state(
    path: &Path,
    narration: &Narration,
    story_id: &str,
) -> Result<(), NarrationError> {
    let state = PlayerState {
        schema_version: PLAYER_STATE_SCHEMA.to_string(),
        story_id: story_id.to_string(),
        save: narration.export_state(),
    };
    save_player_state(path, &state)
}

pub(crate) fn load_narration_from_state_for_ref(
    path: &Path,
) -> Result<(LoadedStory, PlayerState, Narration), NarrationError> {
    let state = load_player_state(path)?;
    let story = load_story_by_ref(&state.story_id)?;
    let narration = resume_narration_for_state(&story, &state)?;
    Ok((story, state, narration))
}

pub(crate) fn load_narration_from_state_for_story(
    path: &Path,
    story: &LoadedStory,
) -> Result<Narration, NarrationError> {
    let state = load_player_state(path)?;
    if state.story_id != story.id {
        return Err(NarrationError::new(
            "PLAY_STATE_STORY_MISMATCH",
            format!(
                "State story mismatch. expected={} actual={}",
                story.id, state.story_id
            ),
        ));
    }
    resume_narration_for_state(story, &state)
}

pub(crate) fn emit_boundary_with_saved_state(
    narration: &Narration,
    boundary: BoundaryResult,
    state_out: &str,
    story_id: &str,
) -> Result<i32, NarrationError> {
    save_narration_state(Path::new(state_out), narration, story_id)?;
    emit_boundary(boundary, Some(state_out.to_string()));
    Ok(0)
}

#[cfg(test)]
mod session_ops_tests {
    use super::*;
    use crate::cli_test_support::*;
    use crate::load_story_by_path;

    #[tokio::test]
    async fn saved_state_resumes_for_the_same_story_only() {
        let story = load_story_by_path(&demo_story_path()).expect("demo story should load");
        let narration = create_narration_for_story(&story, None, Some(1))
            .await
            .expect("narration should start");
        let path = temp_path("session-state.json");
        save_narration_state(&path, &narration, &story.id).expect("save should pass");

        let (loaded_story, state, resumed) =
            load_narration_from_state_for_ref(&path).expect("resume by ref should pass");
        assert_eq!(loaded_story.id, story.id);
        assert_eq!(state.story_id, story.id);
        assert_eq!(resumed.history(), narration.history());

        let other = LoadedStory {
            id: "story:/elsewhere".to_string(),
            title: "elsewhere".to_string(),
            story_json: story.story_json.clone(),
        };
        let error = load_narration_from_state_for_story(&path, &other)
            .expect_err("foreign story should fail");
        assert_eq!(error.code, "PLAY_STATE_STORY_MISMATCH");
    }
}
