//! Share and personal folder listings

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sharemirror_cloud::client::CloudClient;
use sharemirror_cloud::provider::CloudShareProvider;
use sharemirror_core::domain::ShareLocation;
use sharemirror_core::ports::IRemoteShareClient;

use crate::common::*;

fn location() -> ShareLocation {
    ShareLocation {
        share_id: "12345".into(),
        folder_id: rid("9001"),
        share_mode: 1,
        access_code: Some("x1y2".into()),
    }
}

#[tokio::test]
async fn test_list_share_dir_parameters_and_mapping() {
    let (server, provider) = setup_provider_mock().await;

    Mock::given(method("GET"))
        .and(path("/open/share/listShareDir.action"))
        .and(query_param("shareId", "12345"))
        .and(query_param("fileId", "9001"))
        .and(query_param("isFolder", "true"))
        .and(query_param("orderBy", "lastOpTime"))
        .and(query_param("descending", "true"))
        .and(query_param("shareMode", "1"))
        .and(query_param("pageNum", "1"))
        .and(query_param("pageSize", "1000"))
        .and(query_param("accessCode", "x1y2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_body(
            json!([
                {"id": 501, "name": "Show.S01E02.mkv", "md5": "aa11", "size": 2048,
                 "createDate": "2024-05-01 21:30:00"},
                {"id": "500", "name": "Show.S01E01.mkv", "md5": "bb22", "size": "1024"}
            ]),
            json!([{"id": 600, "name": "Extras"}]),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let listing = provider.list_share_dir(&location()).await.unwrap();

    assert_eq!(listing.files.len(), 2);
    assert_eq!(listing.files[0].id.as_str(), "501");
    assert_eq!(listing.files[0].content_hash.as_ref().unwrap().as_str(), "AA11");
    assert!(listing.files[0].created_at.is_some());
    assert_eq!(listing.files[1].size, 1024);
    assert!(listing.files[1].created_at.is_none());
    assert_eq!(listing.folders[0].id.as_str(), "600");
}

#[tokio::test]
async fn test_list_share_dir_missing_file_list_is_error() {
    let (server, provider) = setup_provider_mock().await;
    mount_get(
        &server,
        "/open/share/listShareDir.action",
        json!({"res_code": 0, "fileListAO": {"folderList": []}}),
    )
    .await;

    let err = provider.list_share_dir(&location()).await.unwrap_err();
    assert!(format!("{:#}", err).contains("fileList"));
}

#[tokio::test]
async fn test_list_share_dir_malformed_body_is_error() {
    let (server, provider) = setup_provider_mock().await;
    Mock::given(method("GET"))
        .and(path("/open/share/listShareDir.action"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    assert!(provider.list_share_dir(&location()).await.is_err());
}

#[tokio::test]
async fn test_list_files_in_own_folder() {
    let (server, provider) = setup_provider_mock().await;

    Mock::given(method("GET"))
        .and(path("/open/file/listFiles.action"))
        .and(query_param("folderId", "200"))
        .and(query_param("mediaType", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_body(
            json!([{"id": 1, "name": "Show.S01E01.mkv", "md5": "BB22", "size": 1024}]),
            json!([]),
        )))
        .mount(&server)
        .await;

    let listing = provider.list_files(&rid("200")).await.unwrap();
    assert_eq!(listing.files.len(), 1);
    assert!(listing.folders.is_empty());
}

#[tokio::test]
async fn test_list_files_server_error() {
    let (server, provider) = setup_provider_mock().await;
    Mock::given(method("GET"))
        .and(path("/open/file/listFiles.action"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = provider.list_files(&rid("200")).await.unwrap_err();
    assert!(format!("{:#}", err).contains("HTTP 502"));
}

async fn paged_provider(page_size: usize) -> (MockServer, CloudShareProvider) {
    let server = MockServer::start().await;
    let client = CloudClient::with_base_url(SESSION, server.uri()).with_page_size(page_size);
    (server, CloudShareProvider::new(client))
}

#[tokio::test]
async fn test_list_share_dir_follows_pages() {
    let (server, provider) = paged_provider(2).await;

    Mock::given(method("GET"))
        .and(path("/open/share/listShareDir.action"))
        .and(query_param("pageNum", "1"))
        .and(query_param("pageSize", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_body(
            json!([
                {"id": 503, "name": "Show.S01E03.mkv", "md5": "cc33", "size": 10},
                {"id": 502, "name": "Show.S01E02.mkv", "md5": "bb22", "size": 10}
            ]),
            json!([]),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/open/share/listShareDir.action"))
        .and(query_param("pageNum", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_body(
            json!([{"id": 501, "name": "Show.S01E01.mkv", "md5": "aa11", "size": 10}]),
            json!([]),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let listing = provider.list_share_dir(&location()).await.unwrap();
    let ids: Vec<&str> = listing.files.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["503", "502", "501"]);
}

#[tokio::test]
async fn test_list_files_full_last_page_needs_one_empty_page() {
    let (server, provider) = paged_provider(1).await;

    Mock::given(method("GET"))
        .and(path("/open/file/listFiles.action"))
        .and(query_param("pageNum", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_body(
            json!([{"id": 1, "name": "Show.S01E01.mkv", "md5": "aa11", "size": 10}]),
            json!([]),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/open/file/listFiles.action"))
        .and(query_param("pageNum", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_body(json!([]), json!([]))))
        .expect(1)
        .mount(&server)
        .await;

    let listing = provider.list_files(&rid("200")).await.unwrap();
    assert_eq!(listing.files.len(), 1);
}

#[tokio::test]
async fn test_list_files_error_on_later_page_fails_listing() {
    let (server, provider) = paged_provider(1).await;

    Mock::given(method("GET"))
        .and(path("/open/file/listFiles.action"))
        .and(query_param("pageNum", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_body(
            json!([{"id": 1, "name": "Show.S01E01.mkv", "md5": "aa11", "size": 10}]),
            json!([]),
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/open/file/listFiles.action"))
        .and(query_param("pageNum", "2"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let err = provider.list_files(&rid("200")).await.unwrap_err();
    assert!(format!("{:#}", err).contains("HTTP 503"));
}
