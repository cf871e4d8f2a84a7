//! Concurrent uploads against a nearly full organization.

use futures::future::join_all;

use stowage_core::error::ErrorKind;
use stowage_entity::BYTES_PER_GB;
use stowage_entity::user::Role;

use crate::helpers::{TestApp, blob};

const SIZE: usize = 64;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_uploads_admit_exactly_what_fits() {
    for n in [2usize, 4, 8] {
        let app = TestApp::new().await;
        let org = app.organization("Acme").await;
        app.subscribe(org, 1).await;
        let (_, ctx) = app.member(org, Role::OrgUser).await;

        // Leave room for exactly n - 1 uploads.
        let room = (n as u64 - 1) * SIZE as u64;
        app.engine.usage.increment(org, BYTES_PER_GB - room).await.unwrap();

        let uploads = (0..n).map(|i| {
            let explorer = app.engine.explorer.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move { explorer.upload(&ctx, None, blob(&format!("part-{i}.bin"), SIZE)).await })
        });
        let results: Vec<_> = join_all(uploads).await.into_iter().map(|r| r.unwrap()).collect();

        let accepted = results.iter().filter(|r| r.is_ok()).count();
        let rejected: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(accepted, n - 1, "n = {n}");
        assert_eq!(rejected.len(), 1, "n = {n}");
        assert_eq!(rejected[0].kind, ErrorKind::StorageLimitExceeded);

        assert_eq!(app.cached_bytes(org).await, BYTES_PER_GB);
        assert_eq!(app.live_bytes(org).await, room);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_same_name_uploads_get_distinct_names() {
    let app = TestApp::new().await;
    let org = app.organization("Acme").await;
    app.subscribe(org, 1).await;
    let (_, ctx) = app.member(org, Role::OrgUser).await;

    let uploads = (0..5).map(|_| {
        let explorer = app.engine.explorer.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move { explorer.upload(&ctx, None, blob("report.pdf", 10)).await })
    });
    let mut names: Vec<String> = join_all(uploads)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap().original_filename)
        .collect();
    names.sort();

    assert_eq!(
        names,
        vec![
            "report (1).pdf",
            "report (2).pdf",
            "report (3).pdf",
            "report (4).pdf",
            "report.pdf",
        ]
    );
    assert_eq!(app.cached_bytes(org).await, 50);
}
