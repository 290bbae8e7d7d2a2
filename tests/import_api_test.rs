// ==========================================
// 集成测试 - 上传API
// ==========================================
// 测试目标: 边界校验 + 三种响应形态 + 状态码
// ==========================================


use inventory_import::api::{ImportApi, UploadRequest, UploadResponse, XLSX_CONTENT_TYPE};
use inventory_import::config::{config_keys, ConfigManager};
use inventory_import::logging;
use inventory_import::repository::{DatasetStore, SqliteDatasetStore};
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};
use test_helpers::{csv_bytes, product_xlsx, HEADER};

struct Fixture {
    store: Arc<SqliteDatasetStore>,
    config: Arc<ConfigManager>,
    api: ImportApi<SqliteDatasetStore, ConfigManager>,
}

fn setup() -> Fixture {
    let conn = Arc::new(Mutex::new(Connection::open_in_memory().unwrap()));
    let store = Arc::new(SqliteDatasetStore::from_connection(conn.clone()).unwrap());
    let config = Arc::new(ConfigManager::from_connection(conn).unwrap());
    let api = ImportApi::new(store.clone(), config.clone());
    Fixture { store, config, api }
}

fn xlsx_request(filename: &str, bytes: Vec<u8>) -> UploadRequest {
    UploadRequest {
        filename: filename.to_string(),
        content_type: Some(XLSX_CONTENT_TYPE.to_string()),
        bytes,
    }
}

#[tokio::test]
async fn test_success_payload_shape() {
    logging::init_test();
    let fx = setup();

    let bytes = product_xlsx(&[
        vec!["A1", "Widget", "Tools", "10", "5"],
        vec!["A2", "Gadget", "Tools", "", ""],
    ]);
    let response = fx.api.upload_products(xlsx_request("stock.xlsx", bytes)).await;

    assert_eq!(response.status_code(), 201);
    let body = serde_json::to_value(&response).unwrap();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["filename"], json!("stock.xlsx"));
    assert_eq!(body["data"]["totalRows"], json!(2));
    assert_eq!(body["data"]["insertedRows"], json!(2));

    let upload_id = body["data"]["uploadId"].as_i64().unwrap();
    let dataset = fx.store.get_dataset(upload_id).await.unwrap().unwrap();
    assert_eq!(dataset.display_name, "stock");
    assert!(body.get("status").is_none());
}

#[tokio::test]
async fn test_validation_failure_payload() {
    logging::init_test();
    let fx = setup();

    let bytes = product_xlsx(&[
        vec!["A1", "Widget", "Tools", "10", "5"],
        vec!["", "Gadget", "Tools", "1", "1"],
    ]);
    let response = fx.api.upload_products(xlsx_request("bad.xlsx", bytes)).await;

    assert_eq!(response.status_code(), 400);
    let body = serde_json::to_value(&response).unwrap();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Validation failed. No data was saved."));
    assert_eq!(body["errors"], json!(["Row 3: Code must not be empty"]));
    assert!(fx.store.list_datasets().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_code_payload() {
    logging::init_test();
    let fx = setup();

    let bytes = product_xlsx(&[
        vec!["A1", "Widget", "Tools", "10", "5"],
        vec!["A1", "Widget", "Tools", "10", "5"],
    ]);
    let response = fx.api.upload_products(xlsx_request("dup.xlsx", bytes)).await;

    assert_eq!(response.status_code(), 409);
    match &response {
        UploadResponse::Failed { message, error, .. } => {
            assert_eq!(message, "Upload cancelled. Product code 'A1' is duplicated.");
            assert_eq!(error, "No data was saved.");
        }
        other => panic!("unexpected response: {:?}", other),
    }
    assert!(fx.store.list_datasets().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_schema_failure_lists_expected_columns() {
    logging::init_test();
    let fx = setup();

    let bytes = test_helpers::xlsx_bytes(&[vec!["Code", "Name"], vec!["A1", "Widget"]]);
    let response = fx.api.upload_products(xlsx_request("cols.xlsx", bytes)).await;

    assert_eq!(response.status_code(), 400);
    let body = serde_json::to_value(&response).unwrap();
    assert_eq!(
        body["message"],
        json!("Required columns not found: Category, Price, Stock")
    );
    assert_eq!(body["expected"], json!(HEADER));
}

#[tokio::test]
async fn test_oversize_upload_rejected_before_import() {
    logging::init_test();
    let fx = setup();
    fx.config
        .set_config_value(config_keys::MAX_UPLOAD_BYTES, "64")
        .unwrap();

    let bytes = product_xlsx(&[vec!["A1", "Widget", "Tools", "10", "5"]]);
    assert!(bytes.len() > 64);
    let response = fx.api.upload_products(xlsx_request("big.xlsx", bytes)).await;

    assert_eq!(response.status_code(), 400);
    assert!(!response.is_success());
    assert!(fx.store.list_datasets().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_content_type_rules() {
    logging::init_test();
    let fx = setup();
    let csv = csv_bytes(&[HEADER.to_vec(), vec!["A1", "Widget", "Tools", "1", "1"]]);

    // 非表格类型
    let response = fx
        .api
        .upload_products(UploadRequest {
            filename: "notes.txt".to_string(),
            content_type: Some("text/plain".to_string()),
            bytes: b"hello".to_vec(),
        })
        .await;
    assert_eq!(response.status_code(), 400);

    // xlsx 后缀即可，不依赖 MIME
    let response = fx
        .api
        .upload_products(UploadRequest {
            filename: "plain.xlsx".to_string(),
            content_type: None,
            bytes: product_xlsx(&[vec!["B1", "Bolt", "", "1", "1"]]),
        })
        .await;
    assert_eq!(response.status_code(), 201);

    // CSV 默认接受
    let response = fx
        .api
        .upload_products(UploadRequest {
            filename: "stock.csv".to_string(),
            content_type: Some("text/csv".to_string()),
            bytes: csv.clone(),
        })
        .await;
    assert_eq!(response.status_code(), 201);

    // 关闭后拒绝
    fx.config
        .set_config_value(config_keys::ACCEPT_CSV, "false")
        .unwrap();
    let response = fx
        .api
        .upload_products(UploadRequest {
            filename: "stock.csv".to_string(),
            content_type: Some("text/csv".to_string()),
            bytes: csv,
        })
        .await;
    assert_eq!(response.status_code(), 400);

    assert_eq!(fx.store.list_datasets().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_csv_extension_gated_even_with_xlsx_mime() {
    logging::init_test();
    let fx = setup();
    fx.config
        .set_config_value(config_keys::ACCEPT_CSV, "false")
        .unwrap();

    let csv = csv_bytes(&[HEADER.to_vec(), vec!["A1", "Widget", "Tools", "1", "1"]]);
    let response = fx.api.upload_products(xlsx_request("stock.csv", csv)).await;

    assert_eq!(response.status_code(), 400);
    assert!(fx.store.list_datasets().await.unwrap().is_empty());

    // MIME 为 CSV、扩展名为 xlsx 时按 xlsx 处理
    let response = fx
        .api
        .upload_products(UploadRequest {
            filename: "stock.xlsx".to_string(),
            content_type: Some("text/csv".to_string()),
            bytes: product_xlsx(&[vec!["B1", "Bolt", "", "1", "1"]]),
        })
        .await;
    assert_eq!(response.status_code(), 201);
}

#[tokio::test]
async fn test_blank_filename_gets_default_display_name() {
    logging::init_test();
    let fx = setup();

    let bytes = product_xlsx(&[vec!["A1", "Widget", "Tools", "10", "5"]]);
    let response = fx.api.upload_products(xlsx_request("  ", bytes)).await;

    assert_eq!(response.status_code(), 201);
    let datasets = fx.store.list_datasets().await.unwrap();
    assert_eq!(datasets.len(), 1);
    assert_eq!(datasets[0].display_name, "Untitled upload");
}

#[tokio::test]
async fn test_empty_upload_rejected() {
    logging::init_test();
    let fx = setup();

    let response = fx
        .api
        .upload_products(xlsx_request("empty.xlsx", Vec::new()))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_malformed_xlsx_is_client_error() {
    logging::init_test();
    let fx = setup();

    let response = fx
        .api
        .upload_products(xlsx_request("broken.xlsx", b"definitely not a zip".to_vec()))
        .await;

    assert_eq!(response.status_code(), 400);
    assert!(fx.store.list_datasets().await.unwrap().is_empty());
}
