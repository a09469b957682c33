// 端到端上传流程测试（真实客户端 + mockito 模拟 DDownload）

mod common;

use common::{json_body, multipart_body, test_config, upload_request};
use axum::http::StatusCode;
use ddownload_relay::config::AppConfig;
use ddownload_relay::{
    build_router, AppState, ErrorClass, UploadEngine, UploadRequest, UploadSource,
};
use mockito::{Matcher, Server};
use tower::ServiceExt;

fn relay_config(server: &Server, api_key: Option<&str>) -> AppConfig {
    let mut config = test_config();
    config.ddownload.api_key = api_key.map(str::to_string);
    config.ddownload.api_url = format!("{}/api", server.url());
    config.ddownload.download_url = "https://ddownload.com".to_string();
    config.ddownload.negotiate_timeout_secs = 5;
    config.ddownload.transfer_timeout_secs = 5;
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn report_upload_through_router() {
    let mut server = Server::new_async().await;

    let negotiate = server
        .mock("GET", "/api/upload/server")
        .match_query(Matcher::UrlEncoded("key".into(), "K123".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"status":200,"msg":"OK","result":"{}/cgi-bin/upload.cgi","sess_id":"S1"}}"#,
            server.url()
        ))
        .expect(1)
        .create_async()
        .await;

    let transfer = server
        .mock("POST", "/cgi-bin/upload.cgi")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="utype"\r\n\r\nprem"#.to_string()),
            Matcher::Regex(r#"name="sess_id"\r\n\r\nS1"#.to_string()),
            Matcher::Regex(r#"filename="report.pdf""#.to_string()),
            Matcher::Regex("%PDF-1.4 quarterly".to_string()),
        ]))
        .with_status(200)
        .with_body(r#"[{"file_code":"Z9","file_status":"OK"}]"#)
        .expect(1)
        .create_async()
        .await;

    let state = AppState::new(relay_config(&server, Some("K123"))).unwrap();
    let app = build_router(state);

    let body = multipart_body("file", Some("report.pdf"), b"%PDF-1.4 quarterly");
    let response = app.oneshot(upload_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["download_link"], "https://ddownload.com/Z9");

    negotiate.assert_async().await;
    transfer.assert_async().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn upload_without_session_id() {
    let mut server = Server::new_async().await;

    let negotiate = server
        .mock("GET", "/api/upload/server")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(format!(
            r#"{{"status":200,"result":"{}/cgi-bin/upload.cgi"}}"#,
            server.url()
        ))
        .expect(1)
        .create_async()
        .await;

    let transfer = server
        .mock("POST", "/cgi-bin/upload.cgi")
        .with_status(200)
        .with_body(r#"[{"file_code":"abc123","file_status":"OK"}]"#)
        .expect(1)
        .create_async()
        .await;

    let engine = UploadEngine::from_config(&relay_config(&server, Some("K"))).unwrap();
    let result = engine
        .run(UploadRequest::new(
            UploadSource::from_bytes(b"plain text".to_vec()),
            "notes.TXT",
        ))
        .await
        .unwrap();

    assert_eq!(result.file_code, "abc123");
    assert_eq!(result.download_link, "https://ddownload.com/abc123");

    negotiate.assert_async().await;
    transfer.assert_async().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn negotiation_failure_never_transfers() {
    let mut server = Server::new_async().await;

    let negotiate = server
        .mock("GET", "/api/upload/server")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"status":403,"msg":"Wrong auth"}"#)
        .expect(1)
        .create_async()
        .await;

    let transfer = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let app = build_router(AppState::new(relay_config(&server, Some("bad"))).unwrap());

    let body = multipart_body("file", Some("report.pdf"), b"%PDF");
    let response = app.oneshot(upload_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("Wrong auth"));

    negotiate.assert_async().await;
    transfer.assert_async().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn transfer_rejection_is_api_error() {
    let mut server = Server::new_async().await;

    let _negotiate = server
        .mock("GET", "/api/upload/server")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(format!(
            r#"{{"status":200,"result":"{}/cgi-bin/upload.cgi","sess_id":"S2"}}"#,
            server.url()
        ))
        .create_async()
        .await;

    let transfer = server
        .mock("POST", "/cgi-bin/upload.cgi")
        .with_status(200)
        .with_body(r#"[{"file_status":"Not allowed file type","error":"blocked"}]"#)
        .expect(1)
        .create_async()
        .await;

    let engine = UploadEngine::from_config(&relay_config(&server, Some("K"))).unwrap();
    let err = engine
        .run(UploadRequest::new(
            UploadSource::from_bytes(b"zip".to_vec()),
            "bundle.zip",
        ))
        .await
        .unwrap_err();

    assert_eq!(err.class(), ErrorClass::Api);
    assert_eq!(err.message(), "blocked");
    transfer.assert_async().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_api_key_makes_no_requests() {
    let mut server = Server::new_async().await;

    let any = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let app = build_router(AppState::new(relay_config(&server, None)).unwrap());

    let body = multipart_body("file", Some("report.pdf"), b"%PDF");
    let response = app.oneshot(upload_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["success"], false);

    any.assert_async().await;
}
