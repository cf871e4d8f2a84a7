//! Bulk downloads bundle files with their folder paths.

use std::io::{Cursor, Read};

use bytes::Bytes;
use futures::TryStreamExt;

use stowage_core::error::ErrorKind;
use stowage_core::traits::storage::ByteStream;
use stowage_entity::user::Role;

use crate::helpers::{TestApp, text};

async fn entries(stream: ByteStream) -> Vec<(String, String)> {
    let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
    let mut zip = zip::ZipArchive::new(Cursor::new(chunks.concat())).unwrap();
    let mut out = Vec::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).unwrap();
        let mut body = String::new();
        entry.read_to_string(&mut body).unwrap();
        out.push((entry.name().to_string(), body));
    }
    out.sort();
    out
}

#[tokio::test]
async fn test_folder_selection_keeps_relative_paths() {
    let app = TestApp::new().await;
    let org = app.organization("Acme").await;
    app.subscribe(org, 1).await;
    let (_, ctx) = app.member(org, Role::OrgUser).await;
    let explorer = &app.engine.explorer;

    let projects = explorer.create_folder(&ctx, None, "Projects").await.unwrap();
    let q3 = explorer.create_folder(&ctx, Some(projects.id), "Q3").await.unwrap();
    explorer.upload(&ctx, Some(projects.id), text("plan.txt", "plan")).await.unwrap();
    explorer.upload(&ctx, Some(q3.id), text("numbers.txt", "42")).await.unwrap();
    let loose = explorer.upload(&ctx, None, text("readme.txt", "hi")).await.unwrap();

    let bundle = explorer
        .bulk_download(&ctx, &[loose.id], &[projects.id])
        .await
        .unwrap();
    assert_eq!(bundle.file_count, 3);
    assert_eq!(bundle.total_bytes, 8);
    assert_eq!(bundle.bandwidth.used_bytes, 8);
    assert_eq!(
        entries(bundle.stream).await,
        vec![
            ("Projects/Q3/numbers.txt".to_string(), "42".to_string()),
            ("Projects/plan.txt".to_string(), "plan".to_string()),
            ("readme.txt".to_string(), "hi".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_colliding_entry_names_are_numbered() {
    let app = TestApp::new().await;
    let org = app.organization("Acme").await;
    app.subscribe(org, 1).await;
    let (_, ctx) = app.member(org, Role::OrgUser).await;
    let explorer = &app.engine.explorer;

    let other = explorer.create_folder(&ctx, None, "Other").await.unwrap();
    let first = explorer.upload(&ctx, None, text("a.txt", "one")).await.unwrap();
    let second = explorer.upload(&ctx, Some(other.id), text("a.txt", "two")).await.unwrap();

    let bundle = explorer
        .bulk_download(&ctx, &[first.id, second.id], &[])
        .await
        .unwrap();
    let names: Vec<String> = entries(bundle.stream).await.into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["a (1).txt", "a.txt"]);
}

#[tokio::test]
async fn test_another_users_folder_cannot_be_bundled() {
    let app = TestApp::new().await;
    let org = app.organization("Acme").await;
    app.subscribe(org, 1).await;
    let (_, owner) = app.member(org, Role::OrgUser).await;
    let (_, peer) = app.member(org, Role::OrgUser).await;

    let private = app.engine.explorer.create_folder(&owner, None, "Private").await.unwrap();
    let err = app
        .engine
        .explorer
        .bulk_download(&peer, &[], &[private.id])
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PermissionDenied);
}
