// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Textwerk: photograph or pick a document, recognise its text, keep where it
// was taken.
//
// Entry point. Initialises logging, backend services and one scan session,
// then runs the requested command.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use textwerk_core::error::TextwerkError;
use textwerk_core::human_errors::humanize_error;
use textwerk_core::types::{AcquisitionSource, PipelineState, ScanRecord};
use textwerk_pipeline::{Action, ActionOutcome, ScanOutcome, ScanSession};

use services::app_services::AppServices;

#[derive(Parser, Debug)]
#[command(name = "textwerk", version, about = "Recognise text in photos, tagged with where they were taken")]
struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Acquire one image, recognise its text, then run the requested actions.
    Scan {
        #[arg(long, conflicts_with = "image", help = "Take a new photo with the camera")]
        capture: bool,
        #[arg(long, help = "Use this image instead of opening the picker")]
        image: Option<PathBuf>,
        #[arg(long, help = "Directory holding the OCR models")]
        models: Option<PathBuf>,
        #[arg(long, help = "Save the captured photo to the picture library")]
        save: bool,
        #[arg(long, help = "Write the recognised text to a new file")]
        export: bool,
        #[arg(long, help = "Hand the recognised text to the share sheet")]
        share: bool,
        #[arg(long, help = "Copy the recognised text to the clipboard")]
        copy: bool,
    },
    /// List recent scans.
    History {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Show the effective configuration, optionally writing it to disk.
    Config {
        #[arg(long, help = "Write the current settings to the config file")]
        init: bool,
    },
}

#[derive(Serialize)]
struct JsonOut<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Serialize)]
struct ActionReport {
    action: Action,
    completed: bool,
    message: String,
}

#[derive(Serialize)]
struct ScanReport {
    outcome: &'static str,
    state: PipelineState,
    record: Option<ScanRecord>,
    actions: Vec<ActionReport>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(?cli, "textwerk starting");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let human = humanize_error(&err);
            tracing::error!(error = %err, "command failed");
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), TextwerkError> {
    let mut services = AppServices::init();

    match cli.command {
        Commands::Scan {
            capture,
            image,
            models,
            save,
            export,
            share,
            copy,
        } => {
            let source = if capture {
                AcquisitionSource::Capture
            } else {
                AcquisitionSource::Library
            };
            let session = services.session(image, models.as_deref())?;
            let outcome = session.scan(source).await?;

            let mut requested = Vec::new();
            for (wanted, action) in [
                (save, Action::PersistImage),
                (export, Action::ExportText),
                (share, Action::ShareText),
                (copy, Action::CopyText),
            ] {
                if wanted {
                    requested.push(action);
                }
            }
            let actions = run_actions(&session, &requested).await;

            let report = ScanReport {
                outcome: match outcome {
                    ScanOutcome::Ready(_) => "ready",
                    ScanOutcome::Cancelled => "cancelled",
                    ScanOutcome::Denied(_) => "denied",
                    ScanOutcome::Superseded => "superseded",
                },
                state: session.state(),
                record: session.record().map(|record| record.as_ref().clone()),
                actions,
            };
            print_scan(&report, &session, cli.json)?;
        }
        Commands::History { limit } => {
            let entries = services.recent_history(limit)?;
            if cli.json {
                print_json(&entries)?;
            } else if entries.is_empty() {
                println!("No scans yet.");
            } else {
                for entry in entries {
                    let place = match (entry.latitude, entry.longitude) {
                        (Some(lat), Some(lon)) => format!("{lat:.5},{lon:.5}"),
                        _ => "-".to_string(),
                    };
                    let preview = entry
                        .text
                        .as_deref()
                        .and_then(|text| text.lines().find(|line| !line.trim().is_empty()))
                        .unwrap_or("");
                    println!(
                        "{}  {:<10}  {:<22}  {}",
                        entry.created_at, entry.outcome, place, preview
                    );
                }
            }
        }
        Commands::Config { init } => {
            if init {
                let config = services.config().clone();
                services.save_config(config)?;
            }
            if cli.json {
                print_json(services.config())?;
            } else {
                println!("# {}", services.config_path().display());
                println!("{}", serde_json::to_string_pretty(services.config())?);
            }
        }
    }
    Ok(())
}

async fn run_actions(session: &ScanSession, requested: &[Action]) -> Vec<ActionReport> {
    let mut reports = Vec::with_capacity(requested.len());
    for &action in requested {
        let outcome = match action {
            Action::PersistImage => session.persist_image().await,
            Action::ExportText => session.export_text().await,
            Action::ShareText => session.share_text().await,
            Action::CopyText => session.copy_text().await,
        };
        let message = match &outcome {
            ActionOutcome::Rejected(rejection) => format!("skipped: {rejection}"),
            other => other
                .status()
                .map(|status| status.text)
                .unwrap_or_default(),
        };
        reports.push(ActionReport {
            action,
            completed: outcome.is_completed(),
            message,
        });
    }
    reports
}

fn print_scan(report: &ScanReport, session: &ScanSession, json: bool) -> Result<(), TextwerkError> {
    if json {
        return print_json(report);
    }

    let snapshot = session.snapshot();
    if let Some(status) = &snapshot.status {
        println!("{}", status.text);
    }
    if let Some(alert) = &snapshot.alert {
        eprintln!("{}\n{}", alert.message, alert.suggestion);
    }
    if let Some(record) = &report.record {
        match record.coordinate() {
            Some(c) => println!("Location: {:.5}, {:.5}", c.latitude, c.longitude),
            None => println!("Location: unavailable"),
        }
        match record.text().text() {
            Some(text) => println!("{text}"),
            None => println!("(no text recognised)"),
        }
    }
    for action in &report.actions {
        println!("{:?}: {}", action.action, action.message);
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(data: &T) -> Result<(), TextwerkError> {
    let out = JsonOut { ok: true, data };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
