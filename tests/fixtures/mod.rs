//! Canned API payloads shared by the integration tests

#![allow(dead_code)]

use serde_json::{json, Value};

pub const ASSIGNMENT_ID: &str = "a1b2c3d4-0000-4000-8000-000000000000";
pub const INTAKE_JOB_ID: &str = "b1b2c3d4-0000-4000-8000-000000000001";
pub const ANALYSIS_JOB_ID: &str = "b1b2c3d4-0000-4000-8000-000000000002";

pub fn assignment(stages: &[(Option<&str>, &str)]) -> Value {
    let stages: Vec<Value> = stages
        .iter()
        .map(|(id, name)| json!({ "id": id, "name": name, "description": null }))
        .collect();
    json!({ "id": ASSIGNMENT_ID, "stages": stages })
}

/// Both stages scheduled, in pipeline order.
pub fn two_stage_assignment() -> Value {
    assignment(&[
        (Some(INTAKE_JOB_ID), "Flow extraction"),
        (Some(ANALYSIS_JOB_ID), "Threat classification"),
    ])
}

pub fn job(id: &str, status: &str, result: Option<Value>) -> Value {
    json!({
        "id": id,
        "status": status,
        "queue": "pcap_jobs",
        "enqeued_at": "1700000000000",
        "ended_at": null,
        "result": result,
    })
}

pub fn job_result(success: bool, message: &str) -> Value {
    json!({ "success": success, "message": message, "next_job_id": null })
}

pub fn upload_outcome() -> Value {
    json!({
        "success": true,
        "filename": "cap.pcap",
        "filesize": 1_000_000,
        "message": null,
        "assignment_id": ASSIGNMENT_ID,
    })
}
