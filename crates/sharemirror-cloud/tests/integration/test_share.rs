//! Share discovery: share info and access codes

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use sharemirror_core::domain::ShareCode;
use sharemirror_core::ports::IRemoteShareClient;

use crate::common::*;

#[tokio::test]
async fn test_get_share_info_sends_session_and_code() {
    let (server, provider) = setup_provider_mock().await;

    Mock::given(method("GET"))
        .and(path("/open/share/getShareInfoByCodeV2.action"))
        .and(query_param("shareCode", "abcDEF123"))
        .and(header("cookie", "COOKIE_LOGIN_USER=test-session"))
        .and(header("accept", "application/json;charset=UTF-8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "res_code": 0,
            "shareId": 12345,
            "fileId": "9001",
            "fileName": "Show",
            "isFolder": true,
            "shareMode": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let code = ShareCode::parse("https://cloud.189.cn/t/abcDEF123").unwrap();
    let info = provider.get_share_info(&code).await.unwrap();

    assert_eq!(info.share_id.as_deref(), Some("12345"));
    assert_eq!(info.file_id.as_str(), "9001");
    assert_eq!(info.file_name, "Show");
    assert!(info.is_folder);
    assert!(!info.requires_access_code());
}

#[tokio::test]
async fn test_get_share_info_api_error() {
    let (server, provider) = setup_provider_mock().await;
    mount_get(
        &server,
        "/open/share/getShareInfoByCodeV2.action",
        json!({"res_code": "ShareNotFound", "res_message": "分享不存在"}),
    )
    .await;

    let code = ShareCode::parse("abcDEF123").unwrap();
    let err = provider.get_share_info(&code).await.unwrap_err();
    assert!(format!("{:#}", err).contains("ShareNotFound"));
}

#[tokio::test]
async fn test_check_access_code_accepted() {
    let (server, provider) = setup_provider_mock().await;

    Mock::given(method("GET"))
        .and(path("/open/share/checkAccessCode.action"))
        .and(query_param("shareCode", "abcDEF123"))
        .and(query_param("accessCode", "x1y2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "res_code": 0,
            "shareId": 777
        })))
        .mount(&server)
        .await;

    let code = ShareCode::parse("abcDEF123").unwrap();
    let share_id = provider.check_access_code(&code, "x1y2").await.unwrap();
    assert_eq!(share_id.as_deref(), Some("777"));
}

#[tokio::test]
async fn test_check_access_code_refused() {
    let (server, provider) = setup_provider_mock().await;
    mount_get(
        &server,
        "/open/share/checkAccessCode.action",
        json!({"res_code": "ShareAccessCodeError", "res_message": "wrong"}),
    )
    .await;

    let code = ShareCode::parse("abcDEF123").unwrap();
    assert_eq!(provider.check_access_code(&code, "bad").await.unwrap(), None);
}

#[tokio::test]
async fn test_unauthorized_session() {
    let (server, provider) = setup_provider_mock().await;
    Mock::given(method("GET"))
        .and(path("/open/share/getShareInfoByCodeV2.action"))
        .respond_with(ResponseTemplate::new(401).set_body_string("login required"))
        .mount(&server)
        .await;

    let code = ShareCode::parse("abcDEF123").unwrap();
    let err = provider.get_share_info(&code).await.unwrap_err();
    assert!(format!("{:#}", err).contains("Unauthorized"));
}
