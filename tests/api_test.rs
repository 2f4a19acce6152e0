mod fixtures;
mod helpers;

use futures::StreamExt;
use pcap_tracker::{
    config::ClientConfig,
    models::{
        job::JobStatus,
        upload::{Payload, TransferUpdate},
    },
    services::{
        api::{ApiClient, ApiError},
        transfer::TransferError,
    },
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fixtures::*;
use helpers::*;

#[tokio::test]
async fn test_health_with_failing_service_is_not_all_good() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/api",
        json!({
            "redis": {"working": true, "message": null},
            "s3": {"working": false, "message": "timeout"}
        }),
    )
    .await;

    let health = api_for(&server).health().await.expect("health ok");
    assert!(!health.all_good());
    assert!(health.report().contains("s3: timeout"));
}

#[tokio::test]
async fn test_assignment_is_fetched_by_id() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        &format!("/api/assignment/{}", ASSIGNMENT_ID),
        assignment(&[
            (Some(INTAKE_JOB_ID), "Flow extraction"),
            (None, "Threat classification"),
        ]),
    )
    .await;

    let assignment = api_for(&server)
        .assignment(ASSIGNMENT_ID)
        .await
        .expect("assignment ok");
    assert_eq!(assignment.id.to_string(), ASSIGNMENT_ID);
    assert_eq!(assignment.stages.len(), 2);
    assert!(assignment.stages[0].is_scheduled());
    assert!(!assignment.stages[1].is_scheduled());
}

#[tokio::test]
async fn test_job_is_fetched_by_id() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        &format!("/api/job/{}", INTAKE_JOB_ID),
        job(INTAKE_JOB_ID, "started", None),
    )
    .await;

    let job = api_for(&server).job(INTAKE_JOB_ID).await.expect("job ok");
    assert_eq!(job.status, JobStatus::Started);
    assert_eq!(job.enqueued_time().unwrap().timestamp_millis(), 1_700_000_000_000);
    assert!(job.result.is_none());
}

#[tokio::test]
async fn test_malformed_id_is_rejected_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let api = api_for(&server);
    let err = api.assignment("not-a-uuid").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidId(_)));
    assert!(err.is_not_found());

    let err = api
        .job("a1b2c3d4-0000-4000-8000-00000000000")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidId(_)));
}

#[tokio::test]
async fn test_error_status_is_request_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/assignment/{}", ASSIGNMENT_ID)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = api_for(&server).assignment(ASSIGNMENT_ID).await.unwrap_err();
    match &err {
        ApiError::Request { status, status_text } => {
            assert_eq!(*status, 404);
            assert_eq!(status_text, "Not Found");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_non_json_success_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>up</html>"))
        .mount(&server)
        .await;

    let err = api_for(&server).health().await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn test_upload_streams_progress_then_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(upload_outcome()))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig {
        upload_chunk_size: 250_000,
        ..config_for(&server)
    };
    let api = ApiClient::new(config).expect("client builds");
    let updates: Vec<TransferUpdate> = api
        .upload(Payload::new("cap.pcap", vec![7u8; 1_000_000]))
        .map(|update| update.expect("upload ok"))
        .collect()
        .await;

    let percents: Vec<u8> = updates
        .iter()
        .filter_map(|update| match update {
            TransferUpdate::Progress(pct) => Some(*pct),
            TransferUpdate::Complete(_) => None,
        })
        .collect();
    assert_eq!(percents, vec![0, 25, 50, 75, 100]);

    match updates.last() {
        Some(TransferUpdate::Complete(outcome)) => {
            assert!(outcome.success);
            assert_eq!(outcome.filesize, 1_000_000);
            assert_eq!(outcome.assignment_id.as_deref(), Some(ASSIGNMENT_ID));
        }
        other => panic!("expected completion, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rejected_upload_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = api_for(&server)
        .upload_and_wait(Payload::new("cap.pcap", vec![1u8; 10]))
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::Request { status: 500, .. }));
}

#[tokio::test]
async fn test_unreachable_server_is_transport_failure() {
    // Reserve a free port, then release it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    let api = ApiClient::new(ClientConfig::with_base_url(format!(
        "http://127.0.0.1:{}/api",
        port
    )))
    .expect("client builds");
    let mut updates = api.upload(Payload::new("cap.pcap", vec![1u8; 10]));

    let mut items = Vec::new();
    while let Some(update) = updates.next().await {
        items.push(update);
    }

    assert!(matches!(
        items.first(),
        Some(Ok(TransferUpdate::Progress(0)))
    ));
    assert!(matches!(
        items.last(),
        Some(Err(TransferError::Transport(_)))
    ));
    assert_eq!(
        items.iter().filter(|item| item.is_err()).count(),
        1
    );
    assert!(updates.next().await.is_none());
}
