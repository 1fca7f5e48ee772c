mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use storyloop_core::StoryloopError;

#[derive(Parser)]
#[command(
    name = "storyloop",
    about = "Drive sprint stories through their development lifecycle with the Claude CLI",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .storyloop/ or .git/)
    #[arg(long, global = true, env = "STORYLOOP_ROOT")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full remaining lifecycle for a story
    Run { story: String },

    /// Run the full lifecycle for several stories in order
    Queue {
        #[arg(required = true)]
        stories: Vec<String>,
    },

    /// Run every story in an epic, in story-number order
    Epic { epic: String },

    /// Show the remaining lifecycle steps without executing anything
    Plan { story: String },

    /// Run only the next phase for a story
    Next { story: String },

    /// Run the draft phase for a story (no status update)
    Draft { story: String },

    /// Run the implement phase for a story (no status update)
    Implement { story: String },

    /// Run the review phase for a story (no status update)
    Review { story: String },

    /// Run the commit phase for a story (no status update)
    Commit { story: String },

    /// Run an arbitrary prompt through the agent
    Raw { prompt: String },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");

    // Ctrl-C trips the token; in-flight subprocesses are killed and the
    // current phase's status update is skipped.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\ninterrupted — stopping after cleanup");
                cancel.cancel();
            }
        });
    }

    let result = runtime.block_on(async {
        match cli.command {
            Commands::Run { story } => cmd::run::run(&root, &story, &cancel).await,
            Commands::Queue { stories } => cmd::queue::run(&root, &stories, &cancel).await,
            Commands::Epic { epic } => cmd::epic::run(&root, &epic, &cancel).await,
            Commands::Plan { story } => cmd::plan::run(&root, &story),
            Commands::Next { story } => cmd::next::run(&root, &story, &cancel).await,
            Commands::Draft { story } => cmd::phase::run(&root, "draft", &story, &cancel).await,
            Commands::Implement { story } => {
                cmd::phase::run(&root, "implement", &story, &cancel).await
            }
            Commands::Review { story } => {
                cmd::phase::run(&root, "review-phase", &story, &cancel).await
            }
            Commands::Commit { story } => cmd::phase::run(&root, "commit", &story, &cancel).await,
            Commands::Raw { prompt } => cmd::raw::run(&root, &prompt, &cancel).await,
        }
    });

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(exit_code(&e));
    }
}

/// 0 on success, the subprocess exit code for phase failures, 1 for
/// everything else.
fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<StoryloopError>() {
        Some(StoryloopError::PhaseFailed { code, .. }) => *code,
        Some(StoryloopError::FallbackExit(code)) => *code,
        _ => 1,
    }
}
