//! Subcommands and their arguments.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Subcommands of the `comfyx` binary.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the workflow JSON found in free-form text.
    Extract(InputArgs),
    /// Check whether a document is a workflow.
    Validate(InputArgs),
    /// Convert a workflow to the execution form.
    Convert(InputArgs),
    /// Print the laid out display graph of a workflow.
    Graph(GraphArgs),
    /// List node classes installed on the job engine.
    Nodes(NodesArgs),
    /// Submit a workflow and follow its execution.
    Queue(QueueArgs),
    /// Print execution events as they arrive.
    Watch(WatchArgs),
    /// Ask the chat provider for a workflow.
    Generate(GenerateArgs),
}

impl Command {
    /// Returns the subcommand name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Extract(_) => "extract",
            Self::Validate(_) => "validate",
            Self::Convert(_) => "convert",
            Self::Graph(_) => "graph",
            Self::Nodes(_) => "nodes",
            Self::Queue(_) => "queue",
            Self::Watch(_) => "watch",
            Self::Generate(_) => "generate",
        }
    }
}

/// A document read from a file or stdin.
#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Input file, `-` for stdin
    #[arg(value_name = "PATH")]
    pub path: PathBuf,
}

/// Arguments of `graph`.
#[derive(Debug, Clone, Args)]
pub struct GraphArgs {
    #[clap(flatten)]
    pub input: InputArgs,

    /// Fetch node definitions from the job engine to type ports and widgets
    #[arg(long)]
    pub with_registry: bool,

    /// Print compact JSON
    #[arg(long)]
    pub compact: bool,
}

/// Arguments of `nodes`.
#[derive(Debug, Clone, Args)]
pub struct NodesArgs {
    /// Case-insensitive filter on class name, display name or category
    pub query: Option<String>,

    /// Print the definitions as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments of `queue`.
#[derive(Debug, Clone, Args)]
pub struct QueueArgs {
    #[clap(flatten)]
    pub input: InputArgs,

    /// Print the prompt id and exit without waiting for the result
    #[arg(long)]
    pub no_wait: bool,

    /// Directory to save the output images into
    #[arg(long, value_name = "DIR")]
    pub download: Option<PathBuf>,
}

/// Arguments of `watch`.
#[derive(Debug, Clone, Args)]
pub struct WatchArgs {
    /// Only print events of this prompt id
    #[arg(long)]
    pub prompt_id: Option<String>,
}

/// Arguments of `generate`.
#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    /// What the workflow should do
    pub request: String,

    /// List the job engine's node classes in the system prompt
    #[arg(long)]
    pub with_nodes: bool,

    /// Write the workflow to a file instead of stdout
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Submit the generated workflow and follow its execution
    #[arg(long)]
    pub queue: bool,

    /// Directory to save output images into when queueing
    #[arg(long, value_name = "DIR", requires = "queue")]
    pub download: Option<PathBuf>,
}
