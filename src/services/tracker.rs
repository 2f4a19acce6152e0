//! Follows one assignment through the pipeline.
//!
//! Wires the pieces together: the [`AdaptivePoller`] drives refetches of the
//! assignment and its stage jobs, every finished job's result is forwarded to
//! a single task owning the [`ConvergenceDetector`], and the detector's
//! outcome switches the poller off.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::assignment::{stage_accent, Assignment};
use crate::models::job::{JobResponse, JobResult, JobStatus};
use crate::services::api::{ApiClient, ApiError};
use crate::services::convergence::ConvergenceDetector;
use crate::services::poller::{AdaptivePoller, Backoff};
use crate::services::validation;

/// Latest view of the assignment, replaced on every successful fetch.
#[derive(Debug, Clone, Default)]
pub struct TrackerSnapshot {
    pub assignment: Option<Assignment>,
    pub jobs: HashMap<Uuid, JobResponse>,
    pub last_error: Option<String>,
    /// Set while the latest fetch says the assignment does not exist.
    pub not_found: bool,
    pub fetches: u32,
}

/// One line of the progress display.
#[derive(Debug, Clone, PartialEq)]
pub struct StageRow {
    pub name: String,
    pub description: Option<String>,
    pub status: Option<JobStatus>,
    pub queue: Option<String>,
    pub enqueued_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub result: Option<JobResult>,
    pub accent: &'static str,
}

impl StageRow {
    pub fn status_label(&self) -> String {
        self.status
            .map(|status| status.to_string())
            .unwrap_or_else(|| "Waiting".to_string())
    }

    /// "Job Successful" / "Task Failed" once the stage's job has a result.
    pub fn verdict(&self) -> Option<&'static str> {
        self.result.as_ref().map(|result| {
            if result.success {
                "Job Successful"
            } else {
                "Task Failed"
            }
        })
    }
}

/// Timestamp for display, "(pending)" until the server reports one.
pub fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "(pending)".to_string())
}

impl TrackerSnapshot {
    pub fn stage_rows(&self) -> Vec<StageRow> {
        let Some(assignment) = &self.assignment else {
            return Vec::new();
        };

        assignment
            .stages
            .iter()
            .enumerate()
            .map(|(index, stage)| {
                let job = stage.id.and_then(|id| self.jobs.get(&id));
                StageRow {
                    name: stage.name.clone(),
                    description: stage.description.clone(),
                    status: job.map(|job| job.status),
                    queue: job.map(|job| job.queue.clone()),
                    enqueued_at: job.and_then(JobResponse::enqueued_time),
                    ended_at: job.and_then(JobResponse::ended_time),
                    result: job.and_then(|job| job.result.clone()),
                    accent: stage_accent(index),
                }
            })
            .collect()
    }
}

pub struct AssignmentTracker {
    id: Uuid,
    poller: AdaptivePoller,
    snapshot: watch::Receiver<TrackerSnapshot>,
    outcome: watch::Receiver<Option<JobResult>>,
    convergence: JoinHandle<()>,
}

impl AssignmentTracker {
    /// Validate `assignment_id`, fetch it right away and keep polling it.
    ///
    /// A malformed id is rejected before any request is made.
    pub fn spawn(api: Arc<ApiClient>, assignment_id: &str) -> Result<Self, ApiError> {
        let id = validation::parse_id(assignment_id)?;

        let (snapshot_tx, snapshot) = watch::channel(TrackerSnapshot::default());
        let snapshot_tx = Arc::new(snapshot_tx);
        let (outcome_tx, outcome) = watch::channel(None);
        let (results_tx, mut results_rx) = mpsc::unbounded_channel::<Option<JobResult>>();

        let convergence = tokio::spawn(async move {
            let mut detector = ConvergenceDetector::new();
            while let Some(result) = results_rx.recv().await {
                if let Some(final_result) = detector.observe(result.as_ref()) {
                    metrics::counter!("assignments_converged_total").increment(1);
                    tracing::info!(
                        assignment_id = %id,
                        success = final_result.success,
                        message = ?final_result.message,
                        "Assignment finished"
                    );
                    outcome_tx.send_replace(Some(final_result));
                }
            }
        });

        let refetch = move || {
            let api = Arc::clone(&api);
            let snapshot_tx = Arc::clone(&snapshot_tx);
            let results_tx = results_tx.clone();
            async move { refresh(&api, id, &snapshot_tx, &results_tx).await }
        };
        let finished = outcome.clone();
        let poller = AdaptivePoller::spawn(refetch, move || finished.borrow().is_some());

        tracing::info!(assignment_id = %id, "Tracking assignment");
        poller.check_now();

        Ok(Self {
            id,
            poller,
            snapshot,
            outcome,
            convergence,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Seconds until the next scheduled check.
    pub fn countdown(&self) -> u64 {
        self.poller.countdown()
    }

    pub fn subscribe_countdown(&self) -> watch::Receiver<Backoff> {
        self.poller.subscribe()
    }

    /// Fetch now without touching the countdown.
    pub fn check_now(&self) {
        self.poller.check_now();
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackerSnapshot> {
        self.snapshot.clone()
    }

    pub fn outcome(&self) -> Option<JobResult> {
        self.outcome.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    /// Resolves with the final result once the assignment converges.
    /// `None` if tracking was stopped first.
    pub async fn wait_finished(&self) -> Option<JobResult> {
        let mut outcome = self.outcome.clone();
        let result = outcome.wait_for(Option::is_some).await.ok()?.clone();
        result
    }

    /// Stop polling and result handling. Safe to call more than once.
    pub fn stop(&mut self) {
        self.poller.cancel();
        self.convergence.abort();
    }
}

impl Drop for AssignmentTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One fetch round: the assignment, then the job behind every scheduled stage.
async fn refresh(
    api: &ApiClient,
    id: Uuid,
    snapshot: &watch::Sender<TrackerSnapshot>,
    results: &mpsc::UnboundedSender<Option<JobResult>>,
) {
    let assignment = match api.assignment(&id.to_string()).await {
        Ok(assignment) => assignment,
        Err(e) => {
            tracing::warn!(assignment_id = %id, error = %e, "Assignment fetch failed");
            let not_found = e.is_not_found();
            snapshot.send_modify(|s| {
                s.last_error = Some(e.to_string());
                s.not_found = not_found;
            });
            return;
        }
    };

    let mut jobs = HashMap::new();
    let mut last_error = None;
    for job_id in assignment.scheduled_jobs() {
        match api.job(&job_id.to_string()).await {
            Ok(job) => {
                if job.is_finished() && results.send(job.result.clone()).is_err() {
                    tracing::debug!(
                        assignment_id = %id,
                        job_id = %job_id,
                        "Job result arrived after result handling stopped"
                    );
                }
                jobs.insert(job_id, job);
            }
            Err(e) => {
                tracing::warn!(assignment_id = %id, job_id = %job_id, error = %e, "Job fetch failed");
                last_error = Some(e.to_string());
            }
        }
    }

    tracing::debug!(
        assignment_id = %id,
        stages = assignment.stages.len(),
        jobs = jobs.len(),
        "Assignment refreshed"
    );

    snapshot.send_modify(|s| {
        s.assignment = Some(assignment);
        s.jobs = jobs;
        s.last_error = last_error;
        s.not_found = false;
        s.fetches += 1;
    });
}
