use std::path::Path;

use nv_core::NarrationError;
use nv_runtime::Narration;
use serde_json::Value;

use crate::{
    create_narration_for_story, describe_boundary, emit_boundary_with_saved_state,
    load_narration_from_state_for_ref, load_story_by_path, map_cli_output, run_to_boundary,
    AgentArgs, AgentCommand, BackArgs, ChooseArgs, InputArgs, NextArgs, StartArgs,
    TranscriptArgs,
};

pub(super) async fn run_agent(args: AgentArgs) -> Result<i32, NarrationError> {
    match args.command {
        AgentCommand::Start(args) => run_start(args).await,
        AgentCommand::Next(args) => run_next(args).await,
        AgentCommand::Choose(args) => run_choose(args).await,
        AgentCommand::Input(args) => run_input(args).await,
        AgentCommand::Back(args) => run_back(args),
        AgentCommand::Transcript(args) => run_transcript(args),
    }
}

pub(super) async fn run_start(args: StartArgs) -> Result<i32, NarrationError> {
    let story = load_story_by_path(&args.story)?;
    let mut narration = create_narration_for_story(&story, args.entry_label, args.seed).await?;

    let boundary = run_to_boundary(&mut narration, 0).await?;
    emit_boundary_with_saved_state(&narration, boundary, &args.state_out, &story.id)
}

pub(super) async fn run_next(args: NextArgs) -> Result<i32, NarrationError> {
    let (_, state, mut narration) = load_narration_from_state_for_ref(Path::new(&args.state_in))?;
    let since = narration.step_counter();
    narration.go_next(&Value::Null, None).await?;
    finish_transition(&mut narration, since, &args.state_out, &state.story_id).await
}

pub(super) async fn run_choose(args: ChooseArgs) -> Result<i32, NarrationError> {
    let (_, state, mut narration) = load_narration_from_state_for_ref(Path::new(&args.state_in))?;
    let since = narration.step_counter();
    narration.select_choice(args.choice, &Value::Null).await?;
    finish_transition(&mut narration, since, &args.state_out, &state.story_id).await
}

pub(super) async fn run_input(args: InputArgs) -> Result<i32, NarrationError> {
    let (_, state, mut narration) = load_narration_from_state_for_ref(Path::new(&args.state_in))?;
    let since = narration.step_counter();
    submit_input(&mut narration, &args.text).await?;
    finish_transition(&mut narration, since, &args.state_out, &state.story_id).await
}

pub(super) fn run_back(args: BackArgs) -> Result<i32, NarrationError> {
    let (_, state, mut narration) = load_narration_from_state_for_ref(Path::new(&args.state_in))?;
    narration.go_back(
        |path| tracing::debug!(path, "restored path"),
        args.steps,
    )?;
    let boundary = describe_boundary(&narration);
    emit_boundary_with_saved_state(&narration, boundary, &args.state_out, &state.story_id)
}

pub(super) fn run_transcript(args: TranscriptArgs) -> Result<i32, NarrationError> {
    let (_, _, narration) = load_narration_from_state_for_ref(Path::new(&args.state_in))?;
    let mut lines = Vec::new();
    for entry in narration.narrative_history() {
        let json = serde_json::to_string(&entry).map_err(map_cli_output)?;
        lines.push(format!("TRANSCRIPT_JSON:{}", json));
    }

    println!("RESULT:OK");
    for line in lines {
        println!("{}", line);
    }
    Ok(0)
}

/// Answers the pending input request. Empty text takes the request's
/// default when it has one.
pub(crate) async fn submit_input(
    narration: &mut Narration,
    text: &str,
) -> Result<(), NarrationError> {
    let Some(request) = narration.input_request() else {
        return Err(NarrationError::new(
            "CLI_INPUT_UNEXPECTED",
            "The story is not waiting for input.",
        ));
    };
    let value = match request.default_value {
        Some(default) if text.is_empty() => default,
        _ => Value::String(text.to_string()),
    };
    narration.set_input_value(value);
    narration.go_next(&Value::Null, None).await?;
    Ok(())
}

async fn finish_transition(
    narration: &mut Narration,
    since: u64,
    state_out: &str,
    story_id: &str,
) -> Result<i32, NarrationError> {
    let boundary = run_to_boundary(narration, since).await?;
    emit_boundary_with_saved_state(narration, boundary, state_out, story_id)
}
