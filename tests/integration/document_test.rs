//! Save, read, and optimistic-concurrency scenarios.

use bytes::Bytes;
use futures::StreamExt;

use docvault::{
    DocumentEvent, ErrorKind, FolderId, RightsSet, StaticRightsResolver, UserId,
};

use crate::helpers::{ctx, new_document, test_store, test_store_with, test_store_with_quota, update_of, version_numbers, FOLDER};

#[tokio::test]
async fn save_without_content_creates_placeholder_only() {
    let t = test_store().await;
    let alice = ctx(1);

    let doc = t
        .store
        .documents
        .save(&alice, new_document(Some("notes.txt")), None, None)
        .await
        .unwrap();

    assert_eq!(doc.current_version, 0);
    assert_eq!(version_numbers(&t.pool, doc.id).await, vec![0]);

    let v0 = t.store.documents.get_version(&alice, doc.id, 0).await.unwrap();
    assert!(v0.blob_key.is_none());
    assert_eq!(v0.file_size, 0);
    assert_eq!(v0.title.as_deref(), Some("Title of notes.txt"));
}

#[tokio::test]
async fn save_with_content_produces_versions_zero_and_one() {
    let t = test_store().await;
    let alice = ctx(1);

    let doc = t
        .store
        .documents
        .save(
            &alice,
            new_document(Some("report.pdf")),
            Some(Bytes::from("%PDF-1.4 content")),
            None,
        )
        .await
        .unwrap();

    assert_eq!(doc.current_version, 1);
    assert_eq!(version_numbers(&t.pool, doc.id).await, vec![0, 1]);

    let v1 = t.store.documents.get_version(&alice, doc.id, 1).await.unwrap();
    assert_eq!(v1.file_size, 16);
    assert!(v1.blob_key.is_some());
    assert!(v1.file_md5.is_some());

    // Content reads back byte for byte.
    let mut stream = t
        .store
        .documents
        .get_content(&alice, doc.id, None)
        .await
        .unwrap();
    let mut read = Vec::new();
    while let Some(chunk) = stream.next().await {
        read.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(read, b"%PDF-1.4 content");
}

#[tokio::test]
async fn duplicate_file_name_in_folder_is_rejected() {
    let t = test_store().await;
    let alice = ctx(1);

    t.store
        .documents
        .save(&alice, new_document(Some("unique.txt")), None, None)
        .await
        .unwrap();

    let err = t
        .store
        .documents
        .save(&alice, new_document(Some("unique.txt")), None, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::DuplicateFilename);

    // Documents without a file name are exempt from uniqueness.
    t.store
        .documents
        .save(&alice, new_document(None), None, None)
        .await
        .unwrap();
    t.store
        .documents
        .save(&alice, new_document(None), None, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn metadata_update_bumps_sequence_and_syncs_version_zero() {
    let t = test_store().await;
    let alice = ctx(1);

    let doc = t
        .store
        .documents
        .save(&alice, new_document(Some("plan.md")), None, None)
        .await
        .unwrap();

    let mut input = update_of(&doc);
    input.title = Some("Revised plan".into());
    input.description = Some("Q3 scope".into());

    let updated = t
        .store
        .documents
        .save(&alice, input, None, Some(doc.sequence_number))
        .await
        .unwrap();

    assert!(updated.sequence_number > doc.sequence_number);
    assert_eq!(updated.current_version, 0);

    // Version 0 mirrors title/description/url by copy-forward.
    let v0 = t.store.documents.get_version(&alice, doc.id, 0).await.unwrap();
    assert_eq!(v0.title.as_deref(), Some("Revised plan"));
    assert_eq!(v0.description.as_deref(), Some("Q3 scope"));
}

#[tokio::test]
async fn stale_sequence_number_loses_with_conflict() {
    let t = test_store().await;
    let alice = ctx(1);
    let bob = ctx(2);

    let doc = t
        .store
        .documents
        .save(&alice, new_document(Some("shared.txt")), None, None)
        .await
        .unwrap();
    let baseline = doc.sequence_number;

    // Two writers start from the same baseline; exactly one wins.
    let mut first = update_of(&doc);
    first.title = Some("Alice's title".into());
    let winner = t
        .store
        .documents
        .save(&alice, first, None, Some(baseline))
        .await
        .unwrap();

    let mut second = update_of(&doc);
    second.title = Some("Bob's title".into());
    let err = t
        .store
        .documents
        .save(&bob, second, None, Some(baseline))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    // A reload sees the winner's state; the loser retries from there.
    let reloaded = t.store.documents.get_metadata(&bob, doc.id).await.unwrap();
    assert_eq!(reloaded.title.as_deref(), Some("Alice's title"));
    assert_eq!(reloaded.sequence_number, winner.sequence_number);

    let mut retry = update_of(&reloaded);
    retry.title = Some("Bob's title".into());
    t.store
        .documents
        .save(&bob, retry, None, Some(reloaded.sequence_number))
        .await
        .unwrap();
}

#[tokio::test]
async fn content_update_appends_a_version() {
    let t = test_store().await;
    let alice = ctx(1);

    let doc = t
        .store
        .documents
        .save(
            &alice,
            new_document(Some("data.bin")),
            Some(Bytes::from("v1")),
            None,
        )
        .await
        .unwrap();

    let updated = t
        .store
        .documents
        .save(
            &alice,
            update_of(&doc),
            Some(Bytes::from("v2 content")),
            Some(doc.sequence_number),
        )
        .await
        .unwrap();

    assert_eq!(updated.current_version, 2);
    assert_eq!(version_numbers(&t.pool, doc.id).await, vec![0, 1, 2]);

    // The history lists newest first by default.
    let versions = t
        .store
        .documents
        .list_versions(&alice, doc.id, &[], None)
        .await
        .unwrap();
    let numbers: Vec<i64> = versions.iter().map(|v| v.version_number).collect();
    assert_eq!(numbers, vec![2, 1, 0]);

    // Old versions remain readable.
    let mut stream = t
        .store
        .documents
        .get_content(&alice, doc.id, Some(1))
        .await
        .unwrap();
    let mut read = Vec::new();
    while let Some(chunk) = stream.next().await {
        read.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(read, b"v1");
}

#[tokio::test]
async fn permission_denied_aborts_without_side_effects() {
    let resolver = StaticRightsResolver::denying_all();
    resolver.grant(
        FolderId::from_raw(FOLDER),
        UserId::from_raw(1),
        RightsSet::full(),
    );
    let t = test_store_with(None, resolver).await;

    let alice = ctx(1);
    let mallory = ctx(66);

    let err = t
        .store
        .documents
        .save(&mallory, new_document(Some("denied.txt")), None, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PermissionDenied);

    let doc = t
        .store
        .documents
        .save(&alice, new_document(Some("mine.txt")), None, None)
        .await
        .unwrap();
    let err = t.store.documents.get_metadata(&mallory, doc.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PermissionDenied);
}

#[tokio::test]
async fn read_own_only_scopes_listing_and_count() {
    let resolver = StaticRightsResolver::denying_all();
    let folder = FolderId::from_raw(FOLDER);
    resolver.grant(folder, UserId::from_raw(1), RightsSet::full());
    resolver.grant(folder, UserId::from_raw(2), RightsSet::own_only());
    let t = test_store_with(None, resolver).await;

    let alice = ctx(1);
    let bob = ctx(2);

    t.store
        .documents
        .save(&alice, new_document(Some("alice.txt")), None, None)
        .await
        .unwrap();
    t.store
        .documents
        .save(&bob, new_document(Some("bob.txt")), None, None)
        .await
        .unwrap();

    let all = t
        .store
        .documents
        .list_documents(&alice, folder, &[], None)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let own = t
        .store
        .documents
        .list_documents(&bob, folder, &[], None)
        .await
        .unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].file_name.as_deref(), Some("bob.txt"));

    assert_eq!(t.store.documents.count_documents(&alice, folder).await.unwrap(), 2);
    assert_eq!(t.store.documents.count_documents(&bob, folder).await.unwrap(), 1);
}

#[tokio::test]
async fn quota_exceeded_leaves_valid_contentless_document() {
    let t = test_store_with_quota(8).await;
    let alice = ctx(1);

    let err = t
        .store
        .documents
        .save(
            &alice,
            new_document(Some("big.bin")),
            Some(Bytes::from("way more than eight bytes")),
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::QuotaExceeded);

    // The document row and version 0 survived the failed content step.
    let listed = t
        .store
        .documents
        .list_documents(&alice, FolderId::from_raw(FOLDER), &[], None)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].current_version, 0);
    assert_eq!(version_numbers(&t.pool, listed[0].id).await, vec![0]);
}

#[tokio::test]
async fn listing_supports_projection_and_sort() {
    let t = test_store().await;
    let alice = ctx(1);
    let folder = FolderId::from_raw(FOLDER);

    for name in ["cherry.txt", "apple.txt", "banana.txt"] {
        t.store
            .documents
            .save(&alice, new_document(Some(name)), None, None)
            .await
            .unwrap();
    }

    let listed = t
        .store
        .documents
        .list_documents(
            &alice,
            folder,
            &[docvault::DocumentField::FileName],
            Some(docvault::SortOrder::asc(docvault::DocumentField::FileName)),
        )
        .await
        .unwrap();

    let names: Vec<_> = listed
        .iter()
        .map(|d| d.file_name.clone().unwrap())
        .collect();
    assert_eq!(names, vec!["apple.txt", "banana.txt", "cherry.txt"]);

    // Unselected columns come back defaulted; identity is always there.
    assert!(listed.iter().all(|d| d.id.into_raw() > 0));
    assert!(listed.iter().all(|d| d.title.is_none()));
}

#[tokio::test]
async fn save_emits_created_and_modified_events() {
    let t = test_store().await;
    let alice = ctx(1);

    let doc = t
        .store
        .documents
        .save(&alice, new_document(Some("evented.txt")), None, None)
        .await
        .unwrap();

    let mut input = update_of(&doc);
    input.title = Some("Changed".into());
    t.store
        .documents
        .save(&alice, input, None, Some(doc.sequence_number))
        .await
        .unwrap();

    let events = t.sink.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0].payload, DocumentEvent::Created { .. }));
    assert!(matches!(events[1].payload, DocumentEvent::Modified { .. }));
}
