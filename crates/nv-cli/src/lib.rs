use std::ffi::OsString;

use clap::Parser;
use nv_core::NarrationError;
use tracing_subscriber::EnvFilter;

mod agent;
mod boundary_runner;
mod cli_args;
mod error_map;
mod models;
mod play;
mod session_ops;
mod source_loader;
mod state_store;

pub(crate) use agent::submit_input;
pub(crate) use boundary_runner::{describe_boundary, emit_boundary, run_to_boundary};
pub(crate) use cli_args::{
    AgentArgs, AgentCommand, BackArgs, ChooseArgs, Cli, InputArgs, Mode, NextArgs, PlayArgs,
    StartArgs, TranscriptArgs,
};
pub(crate) use error_map::{
    emit_error, json_string, map_cli_output, map_cli_runtime, map_cli_state_invalid,
    map_cli_state_read, map_cli_state_write, map_cli_story_invalid, map_cli_story_path,
    map_cli_story_read, map_play_io,
};
pub(crate) use models::{
    BoundaryEvent, BoundaryResult, LineCommandAction, LineCommandContext, LoadedStory,
    PlayerState, PLAYER_STATE_SCHEMA,
};
pub(crate) use play::run_play_line_mode;
#[cfg(test)]
pub(crate) use play::{handle_line_cmd, run_play_line_mode_with_io};
pub(crate) use session_ops::{
    create_narration_for_story, emit_boundary_with_saved_state,
    load_narration_from_state_for_ref, load_narration_from_state_for_story, save_narration_state,
};
pub(crate) use source_loader::{load_story_by_path, load_story_by_ref};
pub(crate) use state_store::{load_player_state, save_player_state};

const DEFAULT_STATE_FILE: &str = ".novel/save.json";

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            error.print().ok();
            return error.exit_code();
        }
    };
    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => return emit_error(map_cli_runtime(error)),
    };
    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

/// Diagnostics go to stderr so stdout stays the agent protocol.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

async fn run(cli: Cli) -> Result<i32, NarrationError> {
    match cli.command {
        Mode::Agent(args) => agent::run_agent(args).await,
        Mode::Play(args) => run_play(args).await,
    }
}

async fn run_play(args: PlayArgs) -> Result<i32, NarrationError> {
    let state_file = args
        .state_file
        .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string());
    let story = load_story_by_path(&args.story)?;
    let mut narration = create_narration_for_story(&story, args.entry_label, args.seed).await?;

    run_play_line_mode(&state_file, &story, &mut narration).await
}
