//! Batch deletion and version removal scenarios.

use bytes::Bytes;

use docvault::{DocumentEvent, ErrorKind, INFINITE_TIMEOUT};

use crate::helpers::{ctx, new_document, test_store, update_of, version_numbers};

#[tokio::test]
async fn batch_delete_rejects_newer_items_and_deletes_the_rest() {
    let t = test_store().await;
    let alice = ctx(1);

    let a = t
        .store
        .documents
        .save(&alice, new_document(Some("a.txt")), Some(Bytes::from("aaa")), None)
        .await
        .unwrap();
    let b = t
        .store
        .documents
        .save(&alice, new_document(Some("b.txt")), None, None)
        .await
        .unwrap();
    let c = t
        .store
        .documents
        .save(&alice, new_document(Some("c.txt")), Some(Bytes::from("ccc")), None)
        .await
        .unwrap();

    let a_blob = t
        .store
        .documents
        .get_version(&alice, a.id, 1)
        .await
        .unwrap()
        .blob_key
        .unwrap();

    // The caller's snapshot predates a later change to B.
    let snapshot = c.sequence_number;
    let mut input = update_of(&b);
    input.title = Some("B moved on".into());
    t.store
        .documents
        .save(&alice, input, None, Some(b.sequence_number))
        .await
        .unwrap();

    let rejected = t
        .store
        .removal
        .remove_documents_by_id(&alice, &[a.id, b.id, c.id], snapshot)
        .await
        .unwrap();

    assert_eq!(rejected, vec![b.id]);
    assert!(!t.store.documents.exists(a.id).await.unwrap());
    assert!(t.store.documents.exists(b.id).await.unwrap());
    assert!(!t.store.documents.exists(c.id).await.unwrap());

    // The deleted documents' blobs were reaped after commit.
    use docvault::BlobStore;
    let err = t.blobs.get_bytes(&a_blob).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let events = t.sink.events();
    let deletions: Vec<_> = events
        .iter()
        .filter(|e| matches!(e.payload, DocumentEvent::Deleted { .. }))
        .collect();
    assert_eq!(deletions.len(), 2);
}

#[tokio::test]
async fn batch_delete_rejects_documents_locked_by_another_owner() {
    let t = test_store().await;
    let alice = ctx(1);
    let bob = ctx(2);

    let doc = t
        .store
        .documents
        .save(&bob, new_document(Some("held.txt")), None, None)
        .await
        .unwrap();
    t.store.locks.lock(&bob, doc.id, INFINITE_TIMEOUT).await.unwrap();

    let rejected = t
        .store
        .removal
        .remove_documents_by_id(&alice, &[doc.id], i64::MAX)
        .await
        .unwrap();
    assert_eq!(rejected, vec![doc.id]);
    assert!(t.store.documents.exists(doc.id).await.unwrap());
}

#[tokio::test]
async fn remove_whole_folder_deletes_everything_eligible() {
    let t = test_store().await;
    let alice = ctx(1);
    let folder = docvault::FolderId::from_raw(crate::helpers::FOLDER);

    for name in ["one.txt", "two.txt", "three.txt"] {
        t.store
            .documents
            .save(&alice, new_document(Some(name)), None, None)
            .await
            .unwrap();
    }
    assert_eq!(t.store.documents.count_documents(&alice, folder).await.unwrap(), 3);

    let rejected = t
        .store
        .removal
        .remove_documents(&alice, folder, i64::MAX)
        .await
        .unwrap();
    assert!(rejected.is_empty());
    assert!(t.store.documents.is_folder_empty(&alice, folder).await.unwrap());
}

#[tokio::test]
async fn removing_current_version_promotes_the_next_highest() {
    let t = test_store().await;
    let alice = ctx(1);

    let doc = t
        .store
        .documents
        .save(
            &alice,
            new_document(Some("spec-v1.txt")),
            Some(Bytes::from("first")),
            None,
        )
        .await
        .unwrap();

    let mut input = update_of(&doc);
    input.file_name = Some("spec-v2.txt".into());
    input.title = Some("Second title".into());
    let doc = t
        .store
        .documents
        .save(
            &alice,
            input,
            Some(Bytes::from("second")),
            Some(doc.sequence_number),
        )
        .await
        .unwrap();
    assert_eq!(doc.current_version, 2);

    let not_removed = t
        .store
        .removal
        .remove_version(&alice, doc.id, &[2])
        .await
        .unwrap();
    assert!(not_removed.is_empty());

    // Version 1 is promoted; the document takes over its name and title,
    // and version 0 mirrors them.
    let reloaded = t.store.documents.get_metadata(&alice, doc.id).await.unwrap();
    assert_eq!(reloaded.current_version, 1);
    assert_eq!(reloaded.file_name.as_deref(), Some("spec-v1.txt"));
    assert_eq!(reloaded.title.as_deref(), Some("Title of spec-v1.txt"));

    let v0 = t.store.documents.get_version(&alice, doc.id, 0).await.unwrap();
    assert_eq!(v0.title.as_deref(), Some("Title of spec-v1.txt"));

    assert_eq!(version_numbers(&t.pool, doc.id).await, vec![0, 1]);

    // The removed version's content is unreachable.
    // `ByteStream` does not implement `Debug`, so `unwrap_err` is unavailable;
    // extract the error by hand instead.
    let err = match t.store.documents.get_content(&alice, doc.id, Some(2)).await {
        Ok(_) => panic!("expected get_content to fail for a removed version"),
        Err(e) => e,
    };
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn remove_version_refuses_wholesale_when_locked_by_another() {
    let t = test_store().await;
    let alice = ctx(1);
    let bob = ctx(2);

    let doc = t
        .store
        .documents
        .save(
            &bob,
            new_document(Some("locked.txt")),
            Some(Bytes::from("content")),
            None,
        )
        .await
        .unwrap();
    t.store.locks.lock(&bob, doc.id, INFINITE_TIMEOUT).await.unwrap();

    let not_removed = t
        .store
        .removal
        .remove_version(&alice, doc.id, &[1])
        .await
        .unwrap();
    assert_eq!(not_removed, vec![1]);
    assert_eq!(version_numbers(&t.pool, doc.id).await, vec![0, 1]);
}

#[tokio::test]
async fn version_zero_and_unknown_numbers_are_not_removed() {
    let t = test_store().await;
    let alice = ctx(1);

    let doc = t
        .store
        .documents
        .save(
            &alice,
            new_document(Some("stable.txt")),
            Some(Bytes::from("content")),
            None,
        )
        .await
        .unwrap();

    let not_removed = t
        .store
        .removal
        .remove_version(&alice, doc.id, &[0, 7])
        .await
        .unwrap();
    assert_eq!(not_removed, vec![0, 7]);
    assert_eq!(version_numbers(&t.pool, doc.id).await, vec![0, 1]);
}

#[tokio::test]
async fn deleted_version_numbers_are_never_reused() {
    let t = test_store().await;
    let alice = ctx(1);

    let doc = t
        .store
        .documents
        .save(
            &alice,
            new_document(Some("history.txt")),
            Some(Bytes::from("v1")),
            None,
        )
        .await
        .unwrap();

    let doc = t
        .store
        .documents
        .save(
            &alice,
            update_of(&doc),
            Some(Bytes::from("v2")),
            Some(doc.sequence_number),
        )
        .await
        .unwrap();

    t.store.removal.remove_version(&alice, doc.id, &[2]).await.unwrap();

    let reloaded = t.store.documents.get_metadata(&alice, doc.id).await.unwrap();
    let after = t
        .store
        .documents
        .save(
            &alice,
            update_of(&reloaded),
            Some(Bytes::from("v3")),
            Some(reloaded.sequence_number),
        )
        .await
        .unwrap();

    // The number 2 was spent; the new content gets 3.
    assert_eq!(after.current_version, 3);
    assert_eq!(version_numbers(&t.pool, doc.id).await, vec![0, 1, 3]);
}
