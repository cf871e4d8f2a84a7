//! The cached counter matches the live files after any mix of operations.

use std::sync::Arc;

use stowage_entity::user::Role;
use stowage_worker::run_task;
use stowage_worker::tasks::UsageReconcileTask;

use crate::helpers::{TestApp, blob};

#[tokio::test]
async fn test_counter_tracks_live_files_through_mixed_operations() {
    let app = TestApp::new().await;
    let org = app.organization("Acme").await;
    app.subscribe(org, 1).await;
    let (_, ctx) = app.member(org, Role::OrgUser).await;
    let explorer = &app.engine.explorer;

    let docs = explorer.create_folder(&ctx, None, "Docs").await.unwrap();
    let old = explorer.create_folder(&ctx, Some(docs.id), "Old").await.unwrap();

    let mut uploaded = Vec::new();
    for i in 0..12usize {
        let folder = match i % 3 {
            0 => None,
            1 => Some(docs.id),
            _ => Some(old.id),
        };
        let file = explorer
            .upload(&ctx, folder, blob(&format!("f{i}.bin"), 17 * (i + 1)))
            .await
            .unwrap();
        uploaded.push(file);
        assert_eq!(app.cached_bytes(org).await, app.live_bytes(org).await);
    }

    for file in uploaded.iter().step_by(4) {
        explorer.delete_file(&ctx, file.id).await.unwrap();
        assert_eq!(app.cached_bytes(org).await, app.live_bytes(org).await);
    }
    // Deleting twice is a not-found, never a second decrement.
    assert!(explorer.delete_file(&ctx, uploaded[0].id).await.is_err());

    explorer.move_file(&ctx, uploaded[1].id, old.id).await.unwrap();
    explorer.delete_folder(&ctx, old.id).await.unwrap();
    assert_eq!(app.cached_bytes(org).await, app.live_bytes(org).await);

    let live = app.live_bytes(org).await;
    let first = app.engine.usage.rebuild(org).await.unwrap().used();
    let second = app.engine.usage.rebuild(org).await.unwrap().used();
    assert_eq!((first, second), (live, live));
}

#[tokio::test]
async fn test_reconcile_sweep_repairs_every_organization() {
    let app = TestApp::new().await;
    let acme = app.organization("Acme").await;
    let globex = app.organization("Globex").await;
    for org in [acme, globex] {
        app.subscribe(org, 1).await;
        let (_, ctx) = app.member(org, Role::OrgUser).await;
        app.engine.explorer.upload(&ctx, None, blob("a.bin", 100)).await.unwrap();
    }
    app.engine.usage.increment(acme, 1_000).await.unwrap();
    app.engine.usage.decrement(globex, 60).await.unwrap();

    let task = UsageReconcileTask::new(Arc::clone(&app.engine.usage));
    let summary = run_task(&task).await.unwrap();
    assert_eq!(summary, "2 organizations reconciled, 2 corrected");

    assert_eq!(app.cached_bytes(acme).await, 100);
    assert_eq!(app.cached_bytes(globex).await, 100);
}
