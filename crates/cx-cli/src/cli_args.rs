use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "codex")]
#[command(about = "Codex interactive fiction player")]
pub(crate) struct Cli {
    /// Diagnostics threshold for stderr: off, error, warn, info, debug, trace.
    #[arg(long = "log-level", global = true, default_value = "warn")]
    pub(crate) log_level: String,
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    Agent(AgentArgs),
    Play(PlayArgs),
    Tui(PlayArgs),
    List(ListArgs),
}

#[derive(Debug, Args)]
pub(crate) struct AgentArgs {
    #[command(subcommand)]
    pub(crate) command: AgentCommand,
}

#[derive(Debug, Subcommand)]
pub(crate) enum AgentCommand {
    Start(StartArgs),
    Choose(ChooseArgs),
    Trigger(TriggerArgs),
}

#[derive(Debug, Clone, Args)]
pub(crate) struct SourceArgs {
    #[arg(long = "story", conflicts_with_all = ["stories_dir", "name"])]
    pub(crate) story: Option<String>,
    #[arg(long = "stories-dir")]
    pub(crate) stories_dir: Option<String>,
    #[arg(long = "name")]
    pub(crate) name: Option<String>,
}

#[derive(Debug, Args)]
pub(crate) struct StartArgs {
    #[command(flatten)]
    pub(crate) source: SourceArgs,
    #[arg(long = "section")]
    pub(crate) section: Option<String>,
    #[arg(long = "seed")]
    pub(crate) seed: Option<u32>,
    #[arg(long = "state-out")]
    pub(crate) state_out: String,
}

#[derive(Debug, Args)]
pub(crate) struct ChooseArgs {
    #[arg(long = "state-in")]
    pub(crate) state_in: String,
    #[arg(long = "option")]
    pub(crate) option: String,
    #[arg(long = "state-out")]
    pub(crate) state_out: String,
}

#[derive(Debug, Args)]
pub(crate) struct TriggerArgs {
    #[arg(long = "state-in")]
    pub(crate) state_in: String,
    #[arg(long = "event")]
    pub(crate) event: String,
    /// Event argument, parsed as JSON when possible and kept as text otherwise.
    #[arg(long = "arg")]
    pub(crate) args: Vec<String>,
    #[arg(long = "state-out")]
    pub(crate) state_out: String,
}

#[derive(Debug, Args)]
pub(crate) struct PlayArgs {
    #[command(flatten)]
    pub(crate) source: SourceArgs,
    #[arg(long = "seed")]
    pub(crate) seed: Option<u32>,
    #[arg(long = "state-file")]
    pub(crate) state_file: Option<String>,
}

#[derive(Debug, Args)]
pub(crate) struct ListArgs {
    #[arg(long = "stories-dir", default_value = "stories")]
    pub(crate) stories_dir: String,
}
