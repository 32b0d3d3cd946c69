// Integration tests for `RrfClient` using wiremock.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use duetlink_api::{Error, Request, Response, RetryPolicy, RrfClient, StatusLevel};

// ── Helpers ─────────────────────────────────────────────────────────

fn policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        request_timeout: Duration::from_millis(300),
    }
}

async fn setup(max_retries: u32) -> (MockServer, RrfClient) {
    let server = MockServer::start().await;
    let client = RrfClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        policy(max_retries),
    );
    (server, client)
}

// ── Session ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_sends_password_and_time() {
    let (server, client) = setup(1).await;

    Mock::given(method("GET"))
        .and(path("/rr_connect"))
        .and(query_param("password", "reprap"))
        .and(query_param("time", "2024-03-01T12:30:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "err": 0,
            "sessionTimeout": 8000,
            "boardType": "duetwifi102"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client
        .connect(&SecretString::from("reprap"), "2024-03-01T12:30:00")
        .await
        .unwrap();

    assert_eq!(resp.err, 0);
    assert_eq!(resp.session_timeout, Some(8000));
    assert_eq!(resp.board_type.as_deref(), Some("duetwifi102"));
}

#[tokio::test]
async fn test_connect_is_not_retried() {
    let (server, client) = setup(3).await;

    Mock::given(method("GET"))
        .and(path("/rr_connect"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;

    let err = client
        .connect(&SecretString::from("reprap"), "2024-03-01T12:30:00")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MalformedPayload { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_connect_reports_wrong_password_code() {
    let (server, client) = setup(1).await;

    Mock::given(method("GET"))
        .and(path("/rr_connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "err": 1 })))
        .mount(&server)
        .await;

    let resp = client
        .connect(&SecretString::from("wrong"), "2024-03-01T12:30:00")
        .await
        .unwrap();
    assert_eq!(resp.err, 1);
    assert!(resp.session_timeout.is_none());
}

// ── Retry policy ────────────────────────────────────────────────────

#[tokio::test]
async fn test_empty_body_is_retried_then_succeeds() {
    let (server, client) = setup(1).await;

    Mock::given(method("GET"))
        .and(path("/rr_status"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rr_status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "I", "seq": 4 })))
        .mount(&server)
        .await;

    let status = client.status(StatusLevel::Default).await.unwrap();
    assert_eq!(status.status, "I");
    assert_eq!(status.seq, 4);
}

#[tokio::test]
async fn test_exhausted_retries_become_connection_lost() {
    let (server, client) = setup(2).await;

    Mock::given(method("GET"))
        .and(path("/rr_status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"status\":"))
        .expect(3)
        .mount(&server)
        .await;

    let err = client.status(StatusLevel::Default).await.unwrap_err();
    match err {
        Error::ConnectionLost { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected ConnectionLost, got {other:?}"),
    }
}

#[tokio::test]
async fn test_slow_response_times_out_and_retries() {
    let (server, client) = setup(1).await;

    Mock::given(method("GET"))
        .and(path("/rr_reply"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("ok")
                .set_delay(Duration::from_secs(2)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let err = client.reply().await.unwrap_err();
    assert!(matches!(err, Error::ConnectionLost { attempts: 2, .. }), "got {err:?}");
}

#[tokio::test]
async fn test_http_error_is_not_retried() {
    let (server, client) = setup(3).await;

    Mock::given(method("GET"))
        .and(path("/rr_config"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.config().await.unwrap_err();
    assert!(matches!(err, Error::Http { status: 500, .. }), "got {err:?}");
}

// ── Cancellation ────────────────────────────────────────────────────

#[tokio::test]
async fn test_cancel_all_aborts_outstanding_requests() {
    let server = MockServer::start().await;
    let client = RrfClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        RetryPolicy {
            max_retries: 0,
            request_timeout: Duration::from_secs(5),
        },
    );

    Mock::given(method("GET"))
        .and(path("/rr_status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "I" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let (result, ()) = tokio::join!(client.status(StatusLevel::Default), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(client.in_flight(), 1);
        client.cancel_all();
    });

    assert!(result.unwrap_err().is_aborted());
    assert_eq!(client.in_flight(), 0);
}

// ── Endpoints ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_status_level_is_sent_as_type() {
    let (server, client) = setup(0).await;

    Mock::given(method("GET"))
        .and(path("/rr_status"))
        .and(query_param("type", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "I",
            "name": "Printy",
            "geometry": "cartesian",
            "coldExtrudeTemp": 160.0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let status = client.status(StatusLevel::Extended).await.unwrap();
    assert_eq!(status.name.as_deref(), Some("Printy"));
    assert_eq!(status.cold_extrude_temp, Some(160.0));
}

#[tokio::test]
async fn test_reply_and_gcode_are_text() {
    let (server, client) = setup(0).await;

    Mock::given(method("GET"))
        .and(path("/rr_gcode"))
        .and(query_param("gcode", "G28 X"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "buff": 200 })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rr_reply"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    client.gcode("G28 X").await.unwrap();
    assert_eq!(client.reply().await.unwrap(), "");
}

#[tokio::test]
async fn test_send_returns_body_in_declared_shape() {
    let (server, client) = setup(0).await;

    Mock::given(method("GET"))
        .and(path("/rr_fileinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "err": 2 })))
        .mount(&server)
        .await;

    let resp = client.send(&Request::json("rr_fileinfo")).await.unwrap();
    assert_eq!(resp, Response::Json(json!({ "err": 2 })));

    let info = client.file_info().await.unwrap();
    assert_eq!(info.err, 2);
}

#[tokio::test]
async fn test_missing_oem_file_is_not_found() {
    let (server, client) = setup(2).await;

    Mock::given(method("GET"))
        .and(path("/rr_download"))
        .and(query_param("name", "0:/sys/oem.json"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.oem_features().await.unwrap_err();
    assert!(err.is_not_found());
}
