use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "novel-player")]
#[command(about = "Visual novel narration player")]
pub(crate) struct Cli {
    /// Log engine internals at debug level on stderr.
    #[arg(long, global = true)]
    pub(crate) verbose: bool,
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    Agent(AgentArgs),
    Play(PlayArgs),
}

#[derive(Debug, Args)]
pub(crate) struct AgentArgs {
    #[command(subcommand)]
    pub(crate) command: AgentCommand,
}

#[derive(Debug, Subcommand)]
pub(crate) enum AgentCommand {
    Start(StartArgs),
    Next(NextArgs),
    Choose(ChooseArgs),
    Input(InputArgs),
    Back(BackArgs),
    Transcript(TranscriptArgs),
}

#[derive(Debug, Args)]
pub(crate) struct StartArgs {
    #[arg(long = "story")]
    pub(crate) story: String,
    #[arg(long = "entry-label")]
    pub(crate) entry_label: Option<String>,
    #[arg(long = "seed")]
    pub(crate) seed: Option<u32>,
    #[arg(long = "state-out")]
    pub(crate) state_out: String,
}

#[derive(Debug, Args)]
pub(crate) struct NextArgs {
    #[arg(long = "state-in")]
    pub(crate) state_in: String,
    #[arg(long = "state-out")]
    pub(crate) state_out: String,
}

#[derive(Debug, Args)]
pub(crate) struct ChooseArgs {
    #[arg(long = "state-in")]
    pub(crate) state_in: String,
    #[arg(long = "choice")]
    pub(crate) choice: usize,
    #[arg(long = "state-out")]
    pub(crate) state_out: String,
}

#[derive(Debug, Args)]
pub(crate) struct InputArgs {
    #[arg(long = "state-in")]
    pub(crate) state_in: String,
    #[arg(long = "text")]
    pub(crate) text: String,
    #[arg(long = "state-out")]
    pub(crate) state_out: String,
}

#[derive(Debug, Args)]
pub(crate) struct BackArgs {
    #[arg(long = "state-in")]
    pub(crate) state_in: String,
    #[arg(long = "steps", default_value_t = 1)]
    pub(crate) steps: usize,
    #[arg(long = "state-out")]
    pub(crate) state_out: String,
}

#[derive(Debug, Args)]
pub(crate) struct TranscriptArgs {
    #[arg(long = "state-in")]
    pub(crate) state_in: String,
}

#[derive(Debug, Args)]
pub(crate) struct PlayArgs {
    #[arg(long = "story")]
    pub(crate) story: String,
    #[arg(long = "entry-label")]
    pub(crate) entry_label: Option<String>,
    #[arg(long = "seed")]
    pub(crate) seed: Option<u32>,
    #[arg(long = "state-file")]
    pub(crate) state_file: Option<String>,
}
