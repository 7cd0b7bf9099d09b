// DataSourceStore tests: init, CRUD, optimistic concurrency, org scoping

mod common;

use common::loki_datasource;
use logvolume::datasource_store::DataSourceStore;
use logvolume::error::StoreError;
use logvolume::models::DataSourceAccess;
use tempfile::TempDir;

async fn open(dir: &TempDir, org_id: i64) -> DataSourceStore {
    let path = dir.path().join("datasources.db");
    let store = DataSourceStore::connect(path.to_str().unwrap(), org_id)
        .await
        .unwrap();
    store.init().await.unwrap();
    store
}

#[tokio::test]
async fn datasource_store_connect_and_init() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir, 1).await;
    // Second init is no-op (IF NOT EXISTS)
    store.init().await.unwrap();
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn datasource_store_creates_parent_directory() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/dir/datasources.db");
    let store = DataSourceStore::connect(path.to_str().unwrap(), 1)
        .await
        .unwrap();
    store.init().await.unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn datasource_store_insert_and_get() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir, 1).await;

    let mut ds = loki_datasource("loki-1", "Loki");
    ds.spec.access = DataSourceAccess::Direct;
    ds.spec.basic_auth = true;
    ds.spec.basic_auth_user = "admin".into();
    ds.spec
        .json_data
        .insert("maxLines".into(), serde_json::json!(250));
    ds.resource_version = "ignored".into();

    let created = store.insert(&ds).await.unwrap();
    assert_eq!(created.resource_version, "1");
    assert_eq!(created.spec, ds.spec);

    let fetched = store.get("loki-1").await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn datasource_store_insert_duplicate_uid_fails() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir, 1).await;
    store.insert(&loki_datasource("dup", "A")).await.unwrap();
    let err = store.insert(&loki_datasource("dup", "B")).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(uid) if uid == "dup"));
}

#[tokio::test]
async fn datasource_store_get_missing_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir, 1).await;
    let err = store.get("missing").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn datasource_store_list_orders_by_name() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir, 1).await;
    store.insert(&loki_datasource("c", "Zeta")).await.unwrap();
    store.insert(&loki_datasource("a", "Alpha")).await.unwrap();
    store.insert(&loki_datasource("b", "Alpha")).await.unwrap();

    let uids: Vec<_> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|ds| ds.uid)
        .collect();
    assert_eq!(uids, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn datasource_store_update_bumps_version() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir, 1).await;
    let mut ds = store.insert(&loki_datasource("u", "Before")).await.unwrap();

    ds.spec.name = "After".into();
    let updated = store.update(&ds).await.unwrap();
    assert_eq!(updated.resource_version, "2");
    assert_eq!(updated.spec.name, "After");
}

#[tokio::test]
async fn datasource_store_update_with_stale_version_conflicts() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir, 1).await;
    let stale = store.insert(&loki_datasource("u", "One")).await.unwrap();

    let mut fresh = stale.clone();
    fresh.spec.name = "Two".into();
    store.update(&fresh).await.unwrap();

    let err = store.update(&stale).await.unwrap_err();
    assert!(matches!(err, StoreError::VersionConflict { expected: 1, .. }));
    assert_eq!(store.get("u").await.unwrap().spec.name, "Two");
}

#[tokio::test]
async fn datasource_store_update_rejects_bad_resource_version() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir, 1).await;
    let mut ds = store.insert(&loki_datasource("u", "One")).await.unwrap();
    ds.resource_version = "v1".into();
    let err = store.update(&ds).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidResourceVersion(_)));
}

#[tokio::test]
async fn datasource_store_update_missing_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir, 1).await;
    let mut ds = loki_datasource("ghost", "Ghost");
    ds.resource_version = "1".into();
    let err = store.update(&ds).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn datasource_store_delete() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir, 1).await;
    store.insert(&loki_datasource("d", "Doomed")).await.unwrap();
    store.delete("d").await.unwrap();
    assert!(matches!(
        store.get("d").await.unwrap_err(),
        StoreError::NotFound(_)
    ));
    assert!(matches!(
        store.delete("d").await.unwrap_err(),
        StoreError::NotFound(_)
    ));
}

#[tokio::test]
async fn datasource_store_is_scoped_to_org() {
    let dir = TempDir::new().unwrap();
    let org_one = open(&dir, 1).await;
    let org_two = open(&dir, 2).await;

    org_one.insert(&loki_datasource("shared", "One")).await.unwrap();
    org_two.insert(&loki_datasource("shared", "Two")).await.unwrap();

    assert_eq!(org_one.get("shared").await.unwrap().spec.name, "One");
    assert_eq!(org_two.get("shared").await.unwrap().spec.name, "Two");
    assert_eq!(org_two.list().await.unwrap().len(), 1);
}
