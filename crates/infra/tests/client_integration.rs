//! Integration tests for WarehouseClient over real HTTP
//!
//! **Coverage:**
//! - Resource reads: notFound maps to `None`, invalid ids error
//! - Paginated listings follow `nextPageToken`
//! - Table data decoding and streaming insert errors
//! - Job lifecycle: insert with wait, cancel then wait
//! - Batch: one composite request, per-part results, uniform failure
//!
//! **Infrastructure:**
//! - WireMock HTTP server standing in for the warehouse API
//! - `HttpTransport` with a static bearer token

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use std::time::Duration;

use serde_json::json;
use support::{api_path, client_for, composite_body, error_body, job_body, TEST_TOKEN};
use tabula_domain::{
    InsertOptions, JobState, QueryOptions, Reason, TableDataOptions, TabulaError,
};
use tabula_infra::Deferred;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_missing_dataset_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("/datasets/absent")))
        .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(error_body(404, "notFound", "Not found: Dataset test-project:absent")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.dataset("absent").await.unwrap(), None);
}

#[tokio::test]
async fn test_invalid_dataset_id_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(error_body(400, "invalid", "Invalid dataset ID \"bad.id\"")),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.dataset("bad.id").await.unwrap_err();

    let api = err.api_error().expect("service error");
    assert_eq!(api.reason, Reason::Invalid);
    assert_eq!(api.status, Some(400));
    assert!(api.message.contains("Invalid dataset ID"));
}

#[tokio::test]
async fn test_tables_listing_follows_page_tokens() {
    let server = MockServer::start().await;
    let table = |id: &str| {
        json!({"tableReference": {"projectId": "test-project", "datasetId": "d", "tableId": id}})
    };
    Mock::given(method("GET"))
        .and(path(api_path("/datasets/d/tables")))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tables": [table("c")]})))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("/datasets/d/tables")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tables": [table("a"), table("b")],
            "nextPageToken": "page-2"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let tables = client.tables("d").await.unwrap();

    let ids: Vec<_> = tables.iter().map(|t| t.table_reference.table_id.as_str()).collect();
    assert_eq!(ids, ["a", "b", "c"]);
}

#[tokio::test]
async fn test_tabledata_rows_are_named_by_schema() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("/datasets/d/tables/t")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tableReference": {"projectId": "test-project", "datasetId": "d", "tableId": "t"},
            "schema": {"fields": [
                {"name": "id", "type": "INTEGER"},
                {"name": "tags", "type": "STRING", "mode": "REPEATED"}
            ]}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("/datasets/d/tables/t/data")))
        .and(query_param("startIndex", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalRows": "6",
            "rows": [{"f": [{"v": "6"}, {"v": [{"v": "x"}, {"v": "y"}]}]}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let options = TableDataOptions { start_index: Some(5), ..TableDataOptions::default() };
    let data = client.list_tabledata(("d", "t"), &options).await?;

    assert_eq!(data.total_rows, 6);
    assert_eq!(data.next_token, None);
    assert_eq!(data.rows[0]["id"], "6");
    assert_eq!(data.rows[0]["tags"], json!(["x", "y"]));
    Ok(())
}

#[tokio::test]
async fn test_insert_errors_are_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("/datasets/d/tables/t/insertAll")))
        .and(body_partial_json(json!({"ignoreUnknownValues": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "insertErrors": [{"index": 0, "errors": [{"reason": "invalid", "message": "no such field"}]}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let options = InsertOptions { ignore_unknown_values: true, ..InsertOptions::default() };
    let err = client
        .insert_tabledata(("d", "t"), &[json!({"unknown": 1})], &options)
        .await
        .unwrap_err();

    assert_eq!(err.reason(), Some(&Reason::Invalid));
}

#[tokio::test]
async fn test_query_with_wait_polls_until_done() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("/jobs")))
        .and(body_partial_json(json!({"jobReference": {"jobId": "q-wait"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body("q-wait", "PENDING")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("/jobs/q-wait")))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body("q-wait", "RUNNING")))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("/jobs/q-wait")))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body("q-wait", "DONE")))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let options = QueryOptions {
        job_id: Some("q-wait".to_string()),
        wait: Some(Duration::from_secs(10)),
        ..QueryOptions::default()
    };
    let job = client.query("SELECT 17", &options).await?;

    assert_eq!(job.state(), JobState::Done);
    Ok(())
}

#[tokio::test]
async fn test_cancel_then_wait_reports_stopped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("/jobs/long/cancel")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"kind": "bigquery#jobCancelResponse", "job": job_body("long", "RUNNING")})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("/jobs/long")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobReference": {"projectId": "test-project", "jobId": "long"},
            "status": {
                "state": "DONE",
                "errorResult": {"reason": "stopped", "message": "Job cancel was requested."}
            }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let cancelled = client.cancel_job("long").await.unwrap();
    assert!(matches!(cancelled.state(), JobState::Running | JobState::Done));

    let err = client.wait_job("long", Some(Duration::from_secs(5))).await.unwrap_err();
    assert_eq!(err.reason(), Some(&Reason::Stopped));
    assert!(err.to_string().contains("Job cancel was requested"));
}

#[tokio::test]
async fn test_batch_delivers_each_part() {
    let server = MockServer::start().await;
    let boundary = "batch_test_boundary";
    let body = composite_body(
        boundary,
        &[
            (
                200,
                json!({"tableReference": {"projectId": "test-project", "datasetId": "d", "tableId": "present"}}),
            ),
            (404, error_body(404, "notFound", "Not found: Table test-project:d.absent")),
        ],
    );
    Mock::given(method("POST"))
        .and(path("/batch/bigquery/v2"))
        .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(body, &format!("multipart/mixed; boundary={boundary}")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (on_present, present) = Deferred::channel();
    let (on_absent, absent) = Deferred::channel();

    let summary = client
        .with_batch(|batch| {
            batch.table(("d", "present"), on_present)?;
            batch.table(("d", "absent"), on_absent)
        })
        .await
        .unwrap();

    assert_eq!(summary.calls, 2);
    let present = present.wait().await.unwrap().expect("table exists");
    assert_eq!(present.table_reference.table_id, "present");
    assert_eq!(absent.wait().await.unwrap(), None);

    let requests = server.received_requests().await.expect("recording enabled");
    let sent = String::from_utf8_lossy(&requests[0].body);
    assert!(sent.contains("GET /bigquery/v2/projects/test-project/datasets/d/tables/present HTTP/1.1"));
    assert!(sent.contains("GET /bigquery/v2/projects/test-project/datasets/d/tables/absent HTTP/1.1"));
}

#[tokio::test]
async fn test_batch_failure_reaches_every_callback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/batch/bigquery/v2"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(error_body(503, "backendError", "Backend Error")),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (on_first, first) = Deferred::channel();
    let (on_second, second) = Deferred::channel();

    let err = client
        .with_batch(|batch| {
            batch.job("j1", on_first)?;
            batch.delete_table(("d", "t"), on_second)
        })
        .await
        .unwrap_err();

    assert_eq!(err.reason(), Some(&Reason::BackendError));
    assert_eq!(first.wait().await.unwrap_err(), err);
    assert_eq!(second.wait().await.unwrap_err(), err);
}

#[tokio::test]
async fn test_empty_batch_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let client = client_for(&server);
    let summary = client.with_batch(|_| Ok(())).await.unwrap();

    assert_eq!(summary.calls, 0);
    assert!(!matches!(client.batch(), Err(TabulaError::BatchAlreadyActive)));
}
