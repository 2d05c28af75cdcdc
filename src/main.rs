//! ToolSage command-line front end.
//!
//! Two subcommands, one per engine: `discover` inspects a tool server and
//! writes an expert descriptor; `serve` loads a descriptor and serves the
//! expert over stdio until stdin closes or Ctrl-C arrives.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use toolsage::discovery;
use toolsage::peer::ConnectionSpec;
use toolsage::planner::PlannerConfig;
use toolsage::serve::{self, CoordinationEngine};

#[derive(Parser)]
#[command(
    name = "toolsage",
    version,
    about = "Wrap any MCP tool server as a natural-language expert"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect a tool server and persist an expert descriptor for it
    Discover {
        /// Executable that speaks the tool protocol over stdio
        command: String,
        /// Arguments passed to the executable
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
        /// Directory to write the descriptor into (default: the app data dir)
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
    /// Serve an expert descriptor over stdio
    Serve {
        /// Path to a descriptor produced by `discover`
        descriptor: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    toolsage::init_tracing();
    let cli = Cli::parse();

    // The credential is resolved here, once, and threaded into the engines
    // as an explicit value.
    let planner_config = PlannerConfig::from_env();

    match cli.command {
        Command::Discover {
            command,
            args,
            output_dir,
        } => {
            let spec = ConnectionSpec::new(command, args);
            let output_dir = output_dir.unwrap_or_else(toolsage::experts_dir);

            let report = discovery::discover(&spec, planner_config, &output_dir)
                .await
                .context("discovery failed")?;

            println!("Created expert: {}", report.name);
            println!("  {}", report.description);
            println!(
                "  capabilities: {} tools, {} resources, {} prompts",
                report.tool_count, report.resource_count, report.prompt_count
            );
            println!("  descriptor: {}", report.path.display());
            println!();
            println!("Serve it with: toolsage serve {}", report.path.display());
        }

        Command::Serve { descriptor } => {
            let engine = CoordinationEngine::load(&descriptor, planner_config)
                .await
                .context("serve startup failed")?;

            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "failed to listen for ctrl-c");
                    std::future::pending::<()>().await;
                }
            };

            serve::serve(engine, shutdown)
                .await
                .context("serve session failed")?;
        }
    }

    Ok(())
}
