//! Folder creation and renames

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

use sharemirror_core::domain::RenameOutcome;
use sharemirror_core::ports::IRemoteShareClient;

use crate::common::*;

#[tokio::test]
async fn test_create_folder() {
    let (server, provider) = setup_provider_mock().await;

    Mock::given(method("POST"))
        .and(path("/open/file/createFolder.action"))
        .and(body_string_contains("parentFolderId=200"))
        .and(body_string_contains("folderName=Show"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "res_code": 0,
            "id": 880,
            "name": "Show"
        })))
        .mount(&server)
        .await;

    let folder = provider.create_folder("Show", &rid("200")).await.unwrap();
    assert_eq!(folder.id.as_str(), "880");
    assert_eq!(folder.name, "Show");
}

#[tokio::test]
async fn test_rename_file_success() {
    let (server, provider) = setup_provider_mock().await;

    Mock::given(method("POST"))
        .and(path("/open/file/renameFile.action"))
        .and(body_string_contains("fileId=501"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"res_code": 0, "res_msg": "ok"})))
        .mount(&server)
        .await;

    let outcome = provider.rename_file(&rid("501"), "E02.mkv").await.unwrap();
    assert_eq!(outcome, RenameOutcome::Renamed);
}

#[tokio::test]
async fn test_rename_file_name_clash() {
    let (server, provider) = setup_provider_mock().await;

    Mock::given(method("POST"))
        .and(path("/open/file/renameFile.action"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "res_code": "FileAlreadyExists",
            "res_message": "文件已存在"
        })))
        .mount(&server)
        .await;

    let outcome = provider.rename_file(&rid("501"), "E02.mkv").await.unwrap();
    assert!(!outcome.is_renamed());
}

#[tokio::test]
async fn test_rename_file_server_error() {
    let (server, provider) = setup_provider_mock().await;

    Mock::given(method("POST"))
        .and(path("/open/file/renameFile.action"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    assert!(provider.rename_file(&rid("501"), "E02.mkv").await.is_err());
}
