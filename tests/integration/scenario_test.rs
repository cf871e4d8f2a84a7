//! End-to-end scenarios for storage limits, cascades and bandwidth.

use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use uuid::Uuid;

use stowage_core::error::ErrorKind;
use stowage_core::types::settings::{ObjectStoreSettings, StorageMode};
use stowage_entity::BYTES_PER_GB;
use stowage_entity::file::CreateFile;
use stowage_entity::subscription::AccessState;
use stowage_entity::user::Role;

use crate::helpers::{MemoryObjectStore, TestApp, text};

fn metadata(organization_id: Uuid, owner_id: Uuid, folder_id: Uuid, name: &str, size: u64) -> CreateFile {
    CreateFile {
        organization_id,
        owner_id,
        folder_id,
        original_filename: name.to_string(),
        storage_key: format!("scenario/{}", Uuid::new_v4()),
        storage_backend: StorageMode::Local,
        size_bytes: size as i64,
        content_type: "application/octet-stream".to_string(),
    }
}

#[tokio::test]
async fn test_plan_limit_rejects_the_upload_that_does_not_fit() {
    let app = TestApp::new().await;
    let org = app.organization("Acme").await;
    app.subscribe(org, 10).await;
    let owner = Uuid::new_v4();
    let root = app.engine.folders.ensure_root(org, owner).await.unwrap();
    let limit = app.engine.quota.limits(org).await.unwrap().total_storage_bytes();
    assert_eq!(limit, 10 * BYTES_PER_GB);

    let (fits, _) = app.engine.quota.can_store(org, 5 * BYTES_PER_GB).await.unwrap();
    assert!(fits);
    app.engine
        .usage
        .record_upload(metadata(org, owner, root.id, "a.iso", 5 * BYTES_PER_GB), limit)
        .await
        .unwrap();
    assert_eq!(app.cached_bytes(org).await, 5 * BYTES_PER_GB);

    let (fits, snapshot) = app.engine.quota.can_store(org, 6 * BYTES_PER_GB).await.unwrap();
    assert!(!fits);
    assert_eq!(snapshot.used_bytes, 5 * BYTES_PER_GB);
    let err = app
        .engine
        .usage
        .record_upload(metadata(org, owner, root.id, "b.iso", 6 * BYTES_PER_GB), limit)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::StorageLimitExceeded);
    assert_eq!(app.cached_bytes(org).await, 5 * BYTES_PER_GB);
}

#[tokio::test]
async fn test_exact_remaining_space_fits_and_one_more_byte_does_not() {
    let app = TestApp::new().await;
    let org = app.organization("Acme").await;
    app.subscribe(org, 1).await;
    let (_, ctx) = app.member(org, Role::OrgUser).await;

    app.engine.usage.increment(org, BYTES_PER_GB - 10).await.unwrap();
    let err = app
        .engine
        .explorer
        .upload(&ctx, None, text("eleven.txt", "01234567890"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::StorageLimitExceeded);
    let breach = err.breach.unwrap();
    assert_eq!((breach.used, breach.limit), (BYTES_PER_GB - 10, BYTES_PER_GB));

    app.engine
        .explorer
        .upload(&ctx, None, text("ten.txt", "0123456789"))
        .await
        .unwrap();
    assert_eq!(app.cached_bytes(org).await, BYTES_PER_GB);
}

#[tokio::test]
async fn test_folder_cascade_removes_objects_and_usage() {
    let app = TestApp::new().await;
    let org = app.organization("Acme").await;
    app.subscribe(org, 1).await;
    let (_, ctx) = app.member(org, Role::OrgUser).await;
    let explorer = &app.engine.explorer;

    let a = explorer.create_folder(&ctx, None, "A").await.unwrap();
    let b = explorer.create_folder(&ctx, Some(a.id), "B").await.unwrap();
    let f = explorer.upload(&ctx, Some(b.id), text("f.txt", "0123456789")).await.unwrap();
    let keep = explorer.upload(&ctx, None, text("keep.txt", "abc")).await.unwrap();
    assert!(app.engine.storage.exists(&f.storage_key).await.unwrap());
    assert_eq!(app.cached_bytes(org).await, 13);

    let report = explorer.delete_folder(&ctx, a.id).await.unwrap();
    assert_eq!(report.folders_deleted, 2);
    assert_eq!(report.files_deleted, 1);
    assert_eq!(report.bytes_freed, 10);

    let folders = app.folders();
    assert!(folders.find_by_id(a.id).await.unwrap().unwrap().is_deleted);
    assert!(folders.find_by_id(b.id).await.unwrap().unwrap().is_deleted);
    assert!(app.engine.files.get_live(f.id).await.is_err());
    assert!(!app.engine.storage.exists(&f.storage_key).await.unwrap());
    assert!(app.engine.storage.exists(&keep.storage_key).await.unwrap());
    assert_eq!(app.cached_bytes(org).await, 3);
    assert_eq!(app.live_bytes(org).await, 3);
}

#[tokio::test]
async fn test_object_mode_without_credentials_writes_locally() {
    let app = TestApp::with_config(|config| {
        config.storage.bootstrap.mode = StorageMode::Object;
    })
    .await;
    assert_eq!(app.config.storage.bootstrap.mode, StorageMode::Object);
    let org = app.organization("Acme").await;
    app.subscribe(org, 1).await;
    let (_, ctx) = app.member(org, Role::OrgUser).await;

    let file = app
        .engine
        .explorer
        .upload(&ctx, None, text("notes.txt", "hello"))
        .await
        .unwrap();

    let on_disk = std::path::Path::new(&app.config.storage.local.root_path).join(&file.storage_key);
    assert_eq!(std::fs::read(on_disk).unwrap(), b"hello");
}

#[tokio::test]
async fn test_completed_credentials_switch_uploads_to_object_storage() {
    let store = Arc::new(MemoryObjectStore::default());
    let app = TestApp::with_object_store(
        |config| config.storage.bootstrap.mode = StorageMode::Object,
        Arc::clone(&store),
    )
    .await;
    let org = app.organization("Acme").await;
    app.subscribe(org, 1).await;
    let (_, ctx) = app.member(org, Role::OrgUser).await;
    let explorer = &app.engine.explorer;
    let local_root = std::path::Path::new(&app.config.storage.local.root_path);

    let early = explorer.upload(&ctx, None, text("early.txt", "local")).await.unwrap();
    assert_eq!(early.storage_backend, StorageMode::Local);
    assert!(local_root.join(&early.storage_key).exists());

    let credentials = ObjectStoreSettings {
        bucket: "media".into(),
        access_key: "ak".into(),
        secret_key: "sk".into(),
        ..Default::default()
    };
    app.engine.settings.save(StorageMode::Object, &credentials).await.unwrap();

    let late = explorer.upload(&ctx, None, text("late.txt", "remote")).await.unwrap();
    assert_eq!(late.storage_backend, StorageMode::Object);
    assert_eq!(store.get(&late.storage_key).as_deref(), Some(b"remote".as_slice()));
    assert!(!local_root.join(&late.storage_key).exists());

    // Files keep their backend after the operator switches back to local.
    app.engine.settings.save(StorageMode::Local, &credentials).await.unwrap();
    let download = explorer.download(&ctx, late.id).await.unwrap();
    let chunks: Vec<Bytes> = download.stream.try_collect().await.unwrap();
    assert_eq!(chunks.concat(), b"remote");
    let download = explorer.download(&ctx, early.id).await.unwrap();
    let chunks: Vec<Bytes> = download.stream.try_collect().await.unwrap();
    assert_eq!(chunks.concat(), b"local");

    explorer.delete_file(&ctx, late.id).await.unwrap();
    assert_eq!(store.get(&late.storage_key), None);
    assert_eq!(app.cached_bytes(org).await, 5);
}

#[tokio::test]
async fn test_bandwidth_allowance_is_enforced_per_cycle() {
    let app = TestApp::new().await;
    let org = app.organization("Acme").await;
    app.subscribe_with_bandwidth(org, 1, Some(10)).await;
    let meter = &app.engine.bandwidth;

    let (ok, snap) = meter.apply_usage(org, 9 * BYTES_PER_GB).await.unwrap();
    assert!(ok);
    assert_eq!(snap.used_bytes, 9 * BYTES_PER_GB);

    let (ok, snap) = meter.apply_usage(org, 2 * BYTES_PER_GB).await.unwrap();
    assert!(!ok);
    assert_eq!(snap.used_bytes, 9 * BYTES_PER_GB);

    let (ok, snap) = meter.apply_usage(org, BYTES_PER_GB).await.unwrap();
    assert!(ok);
    assert_eq!(snap.used_bytes, 10 * BYTES_PER_GB);
    assert_eq!(snap.limit_bytes, 10 * BYTES_PER_GB);
}

#[tokio::test]
async fn test_download_over_allowance_is_refused() {
    let app = TestApp::new().await;
    let org = app.organization("Acme").await;
    app.subscribe_with_bandwidth(org, 1, Some(1)).await;
    let (_, ctx) = app.member(org, Role::OrgUser).await;
    let explorer = &app.engine.explorer;

    let file = explorer.upload(&ctx, None, text("a.txt", "abc")).await.unwrap();
    app.engine.bandwidth.apply_usage(org, BYTES_PER_GB - 3).await.unwrap();

    explorer.download(&ctx, file.id).await.unwrap();
    let err = explorer.download(&ctx, file.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::BandwidthLimitExceeded);

    let overview = explorer.usage_overview(&ctx).await.unwrap();
    assert_eq!(overview.access, AccessState::Active);
    assert_eq!(overview.bandwidth.used_bytes, BYTES_PER_GB);
}
