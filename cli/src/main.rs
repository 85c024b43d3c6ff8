//! CLI entrypoint for thinkstream
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::{Value, json};
use std::process::ExitCode;
use std::sync::Arc;
use thinkstream_application::SessionController;
use thinkstream_domain::{StreamPhase, StreamSnapshot};
use thinkstream_infrastructure::{ConfigLoader, FileConfig, HttpTransportReader, Settings};
use thinkstream_presentation::{Cli, ConsoleObserver, OutputMode, format_json};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Exit status after Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    // stdout carries the streamed response only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(ExitCode::SUCCESS);
    }

    let mut file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?
    };
    apply_overrides(&mut file_config, &cli);
    let settings = file_config.validate().context("Invalid configuration")?;

    let payload = build_payload(&cli, &settings)?;

    info!(
        "Starting thinkstream against {} ({} format)",
        settings.endpoint, settings.transport.format
    );

    // === Dependency Injection ===
    let reader = Arc::new(HttpTransportReader::new(settings.transport.clone())?);
    let mut controller =
        SessionController::new(reader).with_classifier(settings.classifier.clone());

    if cli.output == OutputMode::Live {
        let observer = ConsoleObserver::new(settings.endpoint.clone()).with_progress(!cli.quiet);
        controller = controller.with_observer(Arc::new(observer));
    }

    controller.start(settings.endpoint.clone(), payload)?;

    let snapshot = tokio::select! {
        snapshot = controller.wait_settled() => snapshot,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, closing the stream");
            controller.reset();
            return Ok(ExitCode::from(EXIT_INTERRUPTED));
        }
    };

    if cli.output == OutputMode::Json {
        println!("{}", format_json(&snapshot));
    }

    if succeeded(&snapshot) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Command-line flags take precedence over every configuration source.
fn apply_overrides(config: &mut FileConfig, cli: &Cli) {
    if let Some(url) = &cli.url {
        config.transport.endpoint = url.clone();
    }
    if let Some(format) = cli.format {
        config.transport.format = format.as_str().to_string();
    }
    if let Some(model) = &cli.model {
        config.request.model = model.clone();
    }
    if let Some(threshold) = cli.threshold {
        config.classifier.threshold = threshold;
    }
    if cli.reevaluate {
        config.classifier.heuristic = "reevaluate".to_string();
    }
}

/// Request body: `--payload` verbatim, otherwise an Ollama generate request.
fn build_payload(cli: &Cli, settings: &Settings) -> Result<Value> {
    if let Some(raw) = &cli.payload {
        let payload: Value = serde_json::from_str(raw).context("--payload is not valid JSON")?;
        if !payload.is_object() {
            bail!("--payload must be a JSON object");
        }
        return Ok(payload);
    }

    match &cli.prompt {
        Some(prompt) => Ok(json!({
            "model": settings.model,
            "prompt": prompt,
        })),
        None => bail!("A prompt is required (or pass --payload)."),
    }
}

fn succeeded(snapshot: &StreamSnapshot) -> bool {
    snapshot.phase != StreamPhase::Errored
}
