// ==========================================
// 集成测试 - 商品导入管道
// ==========================================
// 测试目标: 解析 → 校验 → 登记目录 → 建表 → 插入，及失败时的补偿
// 覆盖范围: ProductImporter + SqliteDatasetStore
// ==========================================


use inventory_import::domain::{ImportState, TableRef, ValidationError};
use inventory_import::importer::{CompensationPlan, ImportError, ProductImporter};
use inventory_import::logging;
use inventory_import::repository::{DatasetStore, SqliteDatasetStore};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use test_helpers::{count_product_tables, csv_bytes, product_xlsx, FaultyStore, HEADER};

fn create_importer(db_path: &str) -> (Arc<SqliteDatasetStore>, ProductImporter<SqliteDatasetStore>) {
    let store = Arc::new(SqliteDatasetStore::new(db_path).expect("Failed to create store"));
    let importer = ProductImporter::with_defaults(store.clone(), None);
    (store, importer)
}

fn create_faulty_importer(db_path: &str) -> (Arc<FaultyStore>, ProductImporter<FaultyStore>) {
    let inner = SqliteDatasetStore::new(db_path).expect("Failed to create store");
    let store = Arc::new(FaultyStore::new(inner));
    let importer = ProductImporter::with_defaults(store.clone(), None);
    (store, importer)
}

// ==========================================
// 成功路径
// ==========================================

#[tokio::test]
async fn test_import_two_rows_with_defaults() {
    logging::init_test();
    let (_temp, db_path) = test_helpers::create_test_db().unwrap();
    let (store, importer) = create_importer(&db_path);

    let bytes = product_xlsx(&[
        vec!["A1", "Widget", "Tools", "10", "5"],
        vec!["A2", "Gadget", "Tools", "", ""],
    ]);

    let report = importer.import("spring_stock.xlsx", &bytes).await.unwrap();

    assert_eq!(report.state, ImportState::Committed);
    assert_eq!(report.inserted_rows, 2);
    assert_eq!(report.total_rows, 2);
    assert_eq!(report.display_name, "spring_stock");
    assert_eq!(report.filename, "spring_stock.xlsx");

    // 目录行与物理表一致
    let dataset = store.get_dataset(report.dataset_id).await.unwrap().unwrap();
    assert_eq!(dataset.total_rows, 2);
    assert_eq!(dataset.table_ref.as_ref(), Some(&report.table_ref));
    assert!(store.table_exists(&report.table_ref).await.unwrap());

    let rows = store.list_rows(&report.table_ref).await.unwrap();
    assert_eq!(rows.len(), 2);
    let gadget = rows.iter().find(|r| r.code == "A2").unwrap();
    assert_eq!(gadget.price, 0.0);
    assert_eq!(gadget.stock, 0);
    let widget = rows.iter().find(|r| r.code == "A1").unwrap();
    assert_eq!(widget.price, 10.0);
    assert_eq!(widget.stock, 5);
    assert_eq!(widget.category.as_deref(), Some("Tools"));
}

#[tokio::test]
async fn test_each_import_gets_its_own_table() {
    logging::init_test();
    let (_temp, db_path) = test_helpers::create_test_db().unwrap();
    let (store, importer) = create_importer(&db_path);
    let bytes = product_xlsx(&[vec!["A1", "Widget", "Tools", "1", "1"]]);

    let first = importer.import("a.xlsx", &bytes).await.unwrap();
    let second = importer.import("a.xlsx", &bytes).await.unwrap();

    assert_ne!(first.table_ref, second.table_ref);
    assert_eq!(store.list_datasets().await.unwrap().len(), 2);
    assert_eq!(count_product_tables(&db_path), 2);
}

#[tokio::test]
async fn test_csv_import() {
    logging::init_test();
    let (_temp, db_path) = test_helpers::create_test_db().unwrap();
    let (store, importer) = create_importer(&db_path);

    let bytes = csv_bytes(&[
        HEADER.to_vec(),
        vec!["C1", "Cable", "", "3.5", "12"],
    ]);

    let report = importer.import("cables.csv", &bytes).await.unwrap();
    let rows = store.list_rows(&report.table_ref).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].category, None);
    assert_eq!(rows[0].price, 3.5);
}

// ==========================================
// 写库前失败（Rejected，无副作用）
// ==========================================

#[tokio::test]
async fn test_missing_columns_creates_nothing() {
    logging::init_test();
    let (_temp, db_path) = test_helpers::create_test_db().unwrap();
    let (store, importer) = create_importer(&db_path);

    let bytes = test_helpers::xlsx_bytes(&[
        vec!["Code", "Name", "Price"],
        vec!["A1", "Widget", "1"],
    ]);

    let failure = importer.import("partial.xlsx", &bytes).await.unwrap_err();

    assert_eq!(failure.terminal, ImportState::Rejected);
    assert_eq!(failure.reached, ImportState::Received);
    match &failure.error {
        ImportError::Schema { missing } => assert_eq!(missing, &vec!["Category", "Stock"]),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(store.list_datasets().await.unwrap().is_empty());
    assert_eq!(count_product_tables(&db_path), 0);
}

#[tokio::test]
async fn test_empty_code_rejects_whole_file() {
    logging::init_test();
    let (_temp, db_path) = test_helpers::create_test_db().unwrap();
    let (store, importer) = create_importer(&db_path);

    let bytes = product_xlsx(&[
        vec!["A1", "Widget", "Tools", "10", "5"],
        vec!["", "Gadget", "Tools", "1", "1"],
    ]);

    let failure = importer.import("bad.xlsx", &bytes).await.unwrap_err();

    assert_eq!(failure.terminal, ImportState::Rejected);
    assert_eq!(failure.reached, ImportState::Parsed);
    match &failure.error {
        ImportError::Validation(errors) => {
            assert_eq!(errors, &vec![ValidationError::new(3, "Code must not be empty")]);
            assert_eq!(errors[0].to_string(), "Row 3: Code must not be empty");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(store.list_datasets().await.unwrap().is_empty());
    assert_eq!(count_product_tables(&db_path), 0);
}

#[tokio::test]
async fn test_non_numeric_price_names_field_and_row() {
    logging::init_test();
    let (_temp, db_path) = test_helpers::create_test_db().unwrap();
    let (_store, importer) = create_importer(&db_path);

    let bytes = product_xlsx(&[
        vec!["A1", "Widget", "Tools", "10", "5"],
        vec!["A2", "Gadget", "Tools", "cheap", "2"],
        vec!["A3", "Gizmo", "Tools", "1", "lots"],
    ]);

    let failure = importer.import("prices.xlsx", &bytes).await.unwrap_err();
    let messages: Vec<String> = match failure.error {
        ImportError::Validation(errors) => errors.iter().map(ToString::to_string).collect(),
        other => panic!("unexpected error: {:?}", other),
    };

    assert_eq!(
        messages,
        vec!["Row 3: Price must be numeric", "Row 4: Stock must be numeric"]
    );
}

#[tokio::test]
async fn test_header_only_file_is_empty() {
    logging::init_test();
    let (_temp, db_path) = test_helpers::create_test_db().unwrap();
    let (_store, importer) = create_importer(&db_path);

    let failure = importer
        .import("empty.xlsx", &product_xlsx(&[]))
        .await
        .unwrap_err();
    assert!(matches!(failure.error, ImportError::EmptySheet));
    assert!(failure.is_client_error());
}

// ==========================================
// 写库后失败（Aborted，补偿清理）
// ==========================================

#[tokio::test]
async fn test_duplicate_code_aborts_and_cleans_up() {
    logging::init_test();
    let (_temp, db_path) = test_helpers::create_test_db().unwrap();
    let (store, importer) = create_importer(&db_path);

    let bytes = product_xlsx(&[
        vec!["A1", "Widget", "Tools", "10", "5"],
        vec!["A2", "Gadget", "Tools", "1", "1"],
        vec!["A1", "Widget again", "Tools", "2", "2"],
    ]);

    let failure = importer.import("dup.xlsx", &bytes).await.unwrap_err();

    assert_eq!(failure.terminal, ImportState::Aborted);
    assert_eq!(failure.reached, ImportState::TableCreated);
    assert!(matches!(failure.error, ImportError::DuplicateKey { ref code } if code == "A1"));
    assert!(failure.cleanup_errors.is_empty());

    assert!(store.list_datasets().await.unwrap().is_empty());
    assert_eq!(count_product_tables(&db_path), 0);
}

#[tokio::test]
async fn test_injected_insert_failure_cleans_up() {
    logging::init_test();
    let (_temp, db_path) = test_helpers::create_test_db().unwrap();
    let (store, importer) = create_faulty_importer(&db_path);
    store.faults.fail_insert.store(true, Ordering::SeqCst);

    let bytes = product_xlsx(&[vec!["A1", "Widget", "Tools", "10", "5"]]);
    let failure = importer.import("faulty.xlsx", &bytes).await.unwrap_err();

    assert_eq!(failure.terminal, ImportState::Aborted);
    assert!(matches!(failure.error, ImportError::Store(_)));
    assert!(!failure.is_client_error());
    assert_eq!(store.faults.drop_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.faults.remove_calls.load(Ordering::SeqCst), 1);

    assert!(store.list_datasets().await.unwrap().is_empty());
    assert_eq!(count_product_tables(&db_path), 0);
}

#[tokio::test]
async fn test_table_creation_failure_removes_catalog_entry() {
    logging::init_test();
    let (_temp, db_path) = test_helpers::create_test_db().unwrap();
    let (store, importer) = create_faulty_importer(&db_path);
    store.faults.fail_create_table.store(true, Ordering::SeqCst);

    let bytes = product_xlsx(&[vec!["A1", "Widget", "Tools", "10", "5"]]);
    let failure = importer.import("faulty.xlsx", &bytes).await.unwrap_err();

    assert_eq!(failure.terminal, ImportState::Aborted);
    assert_eq!(failure.reached, ImportState::CatalogRegistered);
    assert!(store.list_datasets().await.unwrap().is_empty());
    assert_eq!(count_product_tables(&db_path), 0);
}

#[tokio::test]
async fn test_catalog_failure_aborts_without_cleanup_calls() {
    logging::init_test();
    let (_temp, db_path) = test_helpers::create_test_db().unwrap();
    let (store, importer) = create_faulty_importer(&db_path);
    store.faults.fail_create_dataset.store(true, Ordering::SeqCst);

    let bytes = product_xlsx(&[vec!["A1", "Widget", "Tools", "10", "5"]]);
    let failure = importer.import("faulty.xlsx", &bytes).await.unwrap_err();

    assert_eq!(failure.terminal, ImportState::Aborted);
    assert_eq!(failure.reached, ImportState::Validated);
    assert_eq!(store.faults.drop_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.faults.remove_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cleanup_failure_does_not_mask_original_error() {
    logging::init_test();
    let (_temp, db_path) = test_helpers::create_test_db().unwrap();
    let (store, importer) = create_faulty_importer(&db_path);
    store.faults.fail_insert.store(true, Ordering::SeqCst);
    store.faults.fail_drop_table.store(true, Ordering::SeqCst);

    let bytes = product_xlsx(&[vec!["A1", "Widget", "Tools", "10", "5"]]);
    let failure = importer.import("faulty.xlsx", &bytes).await.unwrap_err();

    // 原始错误保留；删表失败后仍继续删目录行
    match &failure.error {
        ImportError::Store(e) => assert!(e.to_string().contains("insert_rows")),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(failure.cleanup_errors.len(), 1);
    assert_eq!(store.faults.remove_calls.load(Ordering::SeqCst), 1);
    assert!(store.list_datasets().await.unwrap().is_empty());

    // 遗留的孤儿表由对账清理
    assert_eq!(count_product_tables(&db_path), 1);
    let swept = store.sweep_orphan_tables().await.unwrap();
    assert_eq!(swept.len(), 1);
    assert_eq!(count_product_tables(&db_path), 0);
}

#[tokio::test]
async fn test_compensation_is_idempotent() {
    logging::init_test();
    let (_temp, db_path) = test_helpers::create_test_db().unwrap();
    let (store, importer) = create_importer(&db_path);

    let dataset = store.create_dataset("manual", 0).await.unwrap();
    let table = store.create_backing_table(dataset.id).await.unwrap();
    let plan = CompensationPlan {
        table: Some(table.clone()),
        dataset_id: Some(dataset.id),
    };

    assert!(importer.compensate(&plan).await.is_empty());
    assert!(importer.compensate(&plan).await.is_empty());
    assert!(!store.table_exists(&table).await.unwrap());
    assert!(store.get_dataset(dataset.id).await.unwrap().is_none());

    // 空计划无操作
    assert!(importer
        .compensate(&CompensationPlan::default())
        .await
        .is_empty());

    // 从未存在过的表同样安全
    let ghost = CompensationPlan {
        table: TableRef::parse("products_upload_99999"),
        dataset_id: Some(99_999),
    };
    assert!(importer.compensate(&ghost).await.is_empty());
}
