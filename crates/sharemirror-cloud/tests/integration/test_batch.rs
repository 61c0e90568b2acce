//! Batch submission, status polling and conflict handling

use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

use sharemirror_core::domain::{BatchItem, BatchKind, BatchStatus, ConflictDealWay};
use sharemirror_core::ports::IRemoteShareClient;

use crate::common::*;

#[tokio::test]
async fn test_submit_batch_save_form() {
    let (server, provider) = setup_provider_mock().await;

    Mock::given(method("POST"))
        .and(path("/open/batch/createBatchTask.action"))
        .and(body_string_contains("type=SHARE_SAVE"))
        .and(body_string_contains("targetFolderId=200"))
        .and(body_string_contains("shareId=12345"))
        .and(body_string_contains("Show.S01E03.mkv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "res_code": 0,
            "res_message": "成功",
            "taskId": "op-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let items = vec![BatchItem::file(rid("503"), "Show.S01E03.mkv")];
    let submission = provider
        .submit_batch_save(&items, &rid("200"), "12345")
        .await
        .unwrap();

    assert!(submission.is_accepted());
    assert_eq!(submission.operation_id.as_deref(), Some("op-1"));
}

#[tokio::test]
async fn test_submit_batch_rejection_is_a_value() {
    let (server, provider) = setup_provider_mock().await;
    mount_post(
        &server,
        "/open/batch/createBatchTask.action",
        json!({"res_code": 1, "res_message": "space full"}),
    )
    .await;

    let items = vec![BatchItem::file(rid("503"), "a.mkv")];
    let submission = provider
        .submit_batch_save(&items, &rid("200"), "12345")
        .await
        .unwrap();

    assert!(!submission.is_accepted());
    assert_eq!(submission.message.as_deref(), Some("space full"));
    assert!(submission.operation_id.is_none());
}

#[tokio::test]
async fn test_submit_delete_and_recycle() {
    let (server, provider) = setup_provider_mock().await;

    Mock::given(method("POST"))
        .and(path("/open/batch/createBatchTask.action"))
        .and(body_string_contains("type=DELETE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"res_code": 0, "taskId": 9})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/open/batch/createBatchTask.action"))
        .and(body_string_contains("type=EMPTY_RECYCLE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"res_code": 0, "taskId": 10})))
        .mount(&server)
        .await;

    let deleted = provider
        .submit_batch_delete(&[BatchItem::file(rid("1"), "old.mkv")])
        .await
        .unwrap();
    assert_eq!(deleted.operation_id.as_deref(), Some("9"));

    let purged = provider.submit_empty_recycle().await.unwrap();
    assert_eq!(purged.operation_id.as_deref(), Some("10"));
}

#[tokio::test]
async fn test_poll_batch_status_codes() {
    let (server, provider) = setup_provider_mock().await;

    Mock::given(method("POST"))
        .and(path("/open/batch/checkBatchTask.action"))
        .and(body_string_contains("taskId=op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"res_code": 0, "taskStatus": 3})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/open/batch/checkBatchTask.action"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"res_code": 0, "taskStatus": 4})))
        .mount(&server)
        .await;

    assert_eq!(
        provider.poll_batch_status("op-1", BatchKind::Save).await.unwrap(),
        BatchStatus::Running
    );
    assert_eq!(
        provider.poll_batch_status("op-1", BatchKind::Save).await.unwrap(),
        BatchStatus::Success
    );
}

#[tokio::test]
async fn test_conflict_detail_and_resolution() {
    let (server, provider) = setup_provider_mock().await;

    mount_post(
        &server,
        "/open/batch/getConflictTaskInfo.action",
        json!({
            "res_code": 0,
            "targetFolderId": 200,
            "taskInfos": [
                {"fileId": 503, "fileName": "a.mkv", "isConflict": 1, "isFolder": 0}
            ]
        }),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/open/batch/manageBatchTask.action"))
        .and(body_json(json!({
            "taskId": "op-1",
            "type": "SHARE_SAVE",
            "targetFolderId": "200",
            "taskInfos": [
                {"fileId": "503", "fileName": "a.mkv", "isFolder": 0, "isConflict": 1, "dealWay": 1}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"res_code": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let detail = provider
        .get_conflict_detail("op-1", BatchKind::Save)
        .await
        .unwrap();
    assert_eq!(detail.target_folder_id.as_str(), "200");
    assert_eq!(detail.items.len(), 1);
    assert!(detail.items[0].is_conflict);

    let resolved: Vec<_> = detail
        .items
        .into_iter()
        .map(|item| item.resolve(ConflictDealWay::Skip))
        .collect();
    provider
        .resolve_conflict("op-1", BatchKind::Save, &detail.target_folder_id, &resolved)
        .await
        .unwrap();
}
