//! Shared test helpers for provider API integration tests

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sharemirror_cloud::client::CloudClient;
use sharemirror_cloud::provider::CloudShareProvider;
use sharemirror_core::domain::RemoteId;

pub const SESSION: &str = "test-session";

/// Starts a mock server and returns a provider pointing at it
pub async fn setup_provider_mock() -> (MockServer, CloudShareProvider) {
    let server = MockServer::start().await;
    let client = CloudClient::with_base_url(SESSION, server.uri());
    (server, CloudShareProvider::new(client))
}

pub fn rid(id: &str) -> RemoteId {
    RemoteId::new(id).unwrap()
}

/// Mounts a GET endpoint answering with the given JSON
pub async fn mount_get(server: &MockServer, endpoint: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts a POST endpoint answering with the given JSON
pub async fn mount_post(server: &MockServer, endpoint: &str, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// A listing body with the given files and folders
pub fn listing_body(files: serde_json::Value, folders: serde_json::Value) -> serde_json::Value {
    json!({
        "res_code": 0,
        "res_message": "成功",
        "fileListAO": {
            "fileList": files,
            "folderList": folders,
            "fileListSize": 0
        }
    })
}
