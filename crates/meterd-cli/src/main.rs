mod config;
mod output;
mod run_cmd;
mod shim_cmd;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use meterd_core::plugin::builtin;
use meterd_core::{InputRegistry, ProcessorRegistry};

#[derive(Parser)]
#[command(name = "meterd", about = "Metrics agent with out-of-process plugins")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent pipeline described by the config file
    Run {
        /// Config file path (overrides METERD_CONFIG env var)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run a built-in processor as an external plugin on stdin/stdout
    Shim {
        /// Processor name (see `meterd processors`)
        processor: String,
        /// Processor option, repeatable
        #[arg(long = "option", value_name = "KEY=VALUE")]
        options: Vec<String>,
    },
    /// Run a built-in input as an external plugin; gathers on each stdin
    /// line and on SIGUSR1
    Input {
        /// Input name (see `meterd inputs`)
        input: String,
        /// Input option, repeatable
        #[arg(long = "option", value_name = "KEY=VALUE")]
        options: Vec<String>,
    },
    /// List built-in processors
    Processors,
    /// List built-in inputs
    Inputs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries samples, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut registry = ProcessorRegistry::new();
    builtin::register_builtins(&mut registry);
    let mut inputs = InputRegistry::new();
    builtin::register_builtin_inputs(&mut inputs);

    match cli.command {
        Commands::Run { config: flag } => {
            let path = config::resolve_config_path(flag.as_deref());
            let agent_config = config::load_config(&path)?;
            tracing::info!(config = %path.display(), "loaded config");
            run_cmd::run_agent(agent_config).await?;
        }
        Commands::Shim { processor, options } => {
            if let Err(e) = shim_cmd::run_shim(&registry, &processor, &options).await {
                tracing::error!(processor = %processor, "{e:#}");
                std::process::exit(1);
            }
        }
        Commands::Input { input, options } => {
            if let Err(e) = shim_cmd::run_input(&inputs, &input, &options).await {
                tracing::error!(input = %input, "{e:#}");
                std::process::exit(1);
            }
        }
        Commands::Processors => {
            shim_cmd::list_plugins(&registry);
        }
        Commands::Inputs => {
            shim_cmd::list_plugins(&inputs);
        }
    }

    Ok(())
}
