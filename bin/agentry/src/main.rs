//! Agentry dispatcher.
//!
//! Reads one task intent as JSON from the file named by the first argument,
//! or from stdin, dispatches it and prints the outcome as JSON.

mod config;
mod dispatch;
mod error;

use agentry_adapter::TaskIntent;
use crate::config::EngineConfig;
use crate::dispatch::Engine;
use crate::error::DispatchError;
use std::process::ExitCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> agentry_core::Result<ExitCode, DispatchError> {
    let config = EngineConfig::from_env().map_err(|e| DispatchError::Config {
        details: e.to_string(),
    })?;

    // Logs go to stderr; stdout carries the outcome.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let input = read_input(std::env::args().nth(1)).await?;
    let intent: TaskIntent =
        serde_json::from_str(&input).map_err(|e| DispatchError::ParseIntent {
            details: e.to_string(),
        })?;

    tracing::info!(
        tool = %intent.tool,
        intent = %intent.intent,
        max_retries = config.orchestrator.max_retries.get(),
        timeout_ms = config.orchestrator.timeout_ms,
        "dispatching intent"
    );

    let engine = Engine::from_config(&config);
    let report = engine.dispatch(&intent).await?;

    let mut output = serde_json::to_vec_pretty(&report).map_err(|e| DispatchError::Output {
        details: e.to_string(),
    })?;
    output.push(b'\n');
    tokio::io::stdout()
        .write_all(&output)
        .await
        .map_err(|e| DispatchError::Output {
            details: e.to_string(),
        })?;

    Ok(if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn read_input(path: Option<String>) -> agentry_core::Result<String, DispatchError> {
    match path {
        Some(path) => Ok(tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| DispatchError::ReadInput {
                source: path.clone(),
                details: e.to_string(),
            })?),
        None => {
            let mut input = String::new();
            tokio::io::stdin()
                .read_to_string(&mut input)
                .await
                .map_err(|e| DispatchError::ReadInput {
                    source: "stdin".to_string(),
                    details: e.to_string(),
                })?;
            Ok(input)
        }
    }
}
