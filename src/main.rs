use futures::StreamExt;
use pcap_tracker::{
    app_state::AppState,
    config::ClientConfig,
    models::upload::{Payload, TransferUpdate},
    services::{tracker::format_time, validation},
};
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let Some(target) = std::env::args().nth(1) else {
        eprintln!("usage: pcap-tracker <CAPTURE_FILE | ASSIGNMENT_ID>");
        return ExitCode::FAILURE;
    };

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration from environment");
            return ExitCode::FAILURE;
        }
    };

    metrics::describe_counter!("uploads_total", "Capture uploads started");
    metrics::describe_counter!("uploads_failed", "Capture uploads that failed");
    metrics::describe_counter!(
        "assignment_refetches_total",
        "Scheduled assignment refetches"
    );
    metrics::describe_counter!(
        "assignments_converged_total",
        "Assignments that reached a final result"
    );

    tracing::info!(api = %config.api_base_url, "Initializing pcap-tracker");

    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize API client");
            return ExitCode::FAILURE;
        }
    };

    match state.api.health().await {
        Ok(health) => print!("{}", health.report()),
        Err(e) => tracing::warn!(error = %e, "Health check failed"),
    }

    let assignment_id = if validation::is_valid_uuid(&target) {
        target
    } else {
        match upload(&state, Path::new(&target)).await {
            Some(id) => id,
            None => return ExitCode::FAILURE,
        }
    };

    follow(&state, &assignment_id).await
}

/// Upload a capture, rendering progress. Returns the new assignment id.
async fn upload(state: &AppState, path: &Path) -> Option<String> {
    let payload = match Payload::from_path(path).await {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to read capture file");
            return None;
        }
    };

    let mut updates = state.api.upload(payload);
    let mut outcome = None;
    while let Some(update) = updates.next().await {
        match update {
            Ok(TransferUpdate::Progress(pct)) => {
                print!("\rUploading... ({}%)", pct);
                let _ = std::io::stdout().flush();
            }
            Ok(TransferUpdate::Complete(result)) => outcome = Some(result),
            Err(e) => {
                println!();
                tracing::error!(error = %e, "Upload failed");
                println!("Upload failed! Try again.");
                return None;
            }
        }
    }
    println!();

    let outcome = outcome?;
    if !outcome.success {
        println!("{}", outcome.message.as_deref().unwrap_or("Upload rejected"));
        return None;
    }

    println!(
        "Successfully submitted {} for processing! ({} bytes total)",
        outcome.filename, outcome.filesize
    );
    if outcome.assignment_id.is_none() {
        println!(
            "{}",
            outcome
                .message
                .as_deref()
                .unwrap_or("Server accepted the capture without an assignment id")
        );
    }
    outcome.assignment_id
}

/// Follow an assignment until it converges or the user interrupts.
async fn follow(state: &AppState, assignment_id: &str) -> ExitCode {
    let tracker = match state.track(assignment_id) {
        Ok(tracker) => tracker,
        Err(e) => {
            tracing::error!(assignment_id, error = %e, "Cannot track assignment");
            println!("Oops! That assignment doesn't exist.");
            return ExitCode::FAILURE;
        }
    };

    let mut snapshots = tracker.subscribe();
    let mut countdown = tracker.subscribe_countdown();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = tracker.wait_finished() => {
                println!();
                return match result {
                    Some(result) => {
                        let verdict = if result.success { "Job Successful" } else { "Task Failed" };
                        println!("{}: {}", verdict, result.message.as_deref().unwrap_or(""));
                        ExitCode::SUCCESS
                    }
                    None => ExitCode::FAILURE,
                };
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    return ExitCode::FAILURE;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if snapshot.not_found {
                    println!("\nOops! That assignment doesn't exist.");
                    return ExitCode::FAILURE;
                }
                println!();
                for row in snapshot.stage_rows() {
                    println!("[{}] {}: {}", row.accent, row.name, row.status_label());
                    if row.status.is_none() {
                        continue;
                    }
                    println!("    queue: {}", row.queue.as_deref().unwrap_or("-"));
                    println!("    enqueued: {}", format_time(row.enqueued_at));
                    println!("    ended: {}", format_time(row.ended_at));
                    if let (Some(verdict), Some(result)) = (row.verdict(), &row.result) {
                        println!("    {}: {}", verdict, result.message.as_deref().unwrap_or(""));
                    }
                }
            }
            changed = countdown.changed() => {
                if changed.is_err() {
                    return ExitCode::FAILURE;
                }
                let remaining = countdown.borrow_and_update().remaining();
                print!("\rChecking again in {} seconds...   ", remaining);
                let _ = std::io::stdout().flush();
            }
            _ = &mut ctrl_c => {
                tracing::info!(assignment_id = %tracker.id(), "Interrupted, stopping tracker");
                return ExitCode::SUCCESS;
            }
        }
    }
}
