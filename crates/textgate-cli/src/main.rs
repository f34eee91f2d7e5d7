//! textgate CLI - run text operations and administer limits from the shell

mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::PathBuf;
use std::sync::Arc;
use textgate_engine::{Orchestrator, StubBackend};
use textgate_kernel::{
    MemoryUsageStore, Operation, OperationParams, OperationRequest, PlatformConfig,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt().with_env_filter("debug").init();
    } else {
        tracing_subscriber::fmt().with_env_filter("warn").init();
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_command_async(cli))
}

async fn run_command_async(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => PlatformConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PlatformConfig::default(),
    };
    if let Some(dir) = &cli.models_dir {
        config = config.with_models_dir(dir);
    }
    if cli.eager {
        config = config.with_eager_load(true);
    }
    tracing::info!(
        config = %cli.config.as_deref().map(|p| p.display().to_string()).unwrap_or_else(|| "builtin defaults".to_string()),
        models_dir = %config.models_dir.display(),
        eager_load = config.eager_load,
        "platform configuration resolved"
    );

    let orchestrator = Orchestrator::new(
        Arc::new(config),
        Arc::new(StubBackend::new()),
        Arc::new(MemoryUsageStore::new()),
    )
    .await?;

    match cli.command {
        Commands::Summarize {
            text,
            file,
            max_sentences,
            language,
            correlation_id,
        } => {
            let params = OperationParams::Summarize {
                text: read_input(text, file)?,
                max_sentences,
                language,
            };
            execute(&orchestrator, params, correlation_id).await?;
        }

        Commands::Translate {
            text,
            file,
            source,
            target,
            correlation_id,
        } => {
            let params = OperationParams::Translate {
                text: read_input(text, file)?,
                source_language: source,
                target_language: target,
            };
            execute(&orchestrator, params, correlation_id).await?;
        }

        Commands::Classify {
            text,
            file,
            categories,
            correlation_id,
        } => {
            let params = OperationParams::Classify {
                text: read_input(text, file)?,
                categories,
            };
            execute(&orchestrator, params, correlation_id).await?;
        }

        Commands::Limits => {
            for (operation, limit) in orchestrator.limits().limits().await? {
                println!(
                    "{operation:<12} daily_limit={:<8} max_input_chars={:<8} max_output_tokens={}",
                    limit.daily_limit, limit.max_input_chars, limit.max_output_tokens
                );
            }
        }

        Commands::SetLimit {
            operation,
            daily_limit,
        } => {
            let operation: Operation = operation.parse()?;
            let updated = orchestrator.limits().update_limit(operation, daily_limit).await?;
            println!("{operation} daily_limit={}", updated.daily_limit);
        }

        Commands::Usage { operation } => {
            let operation = operation.map(|o| o.parse::<Operation>()).transpose()?;
            let snapshot = orchestrator.limits().usage_snapshot(operation).await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }

        Commands::Health => {
            let report = orchestrator.health();
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

async fn execute(
    orchestrator: &Orchestrator,
    params: OperationParams,
    correlation_id: Option<String>,
) -> anyhow::Result<()> {
    let correlation_id =
        correlation_id.unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
    let request = OperationRequest::new(params).with_correlation_id(correlation_id);
    let response = orchestrator.execute(request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Take the input either as an argument or from a file; exactly one of
/// the two must be given.
fn read_input(text: Option<String>, file: Option<PathBuf>) -> anyhow::Result<String> {
    match (text, file) {
        (Some(text), None) => Ok(text),
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading input from {}", path.display())),
        (None, None) => anyhow::bail!("provide the input text as an argument or via --file"),
        (Some(_), Some(_)) => unreachable!("clap rejects text together with --file"),
    }
}
