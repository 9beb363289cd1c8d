//! Advisory write-lock scenarios.

use std::time::Duration;

use docvault::{ErrorKind, INFINITE_TIMEOUT};

use crate::helpers::{ctx, new_document, test_store, update_of};

#[tokio::test]
async fn lock_blocks_other_writers_but_not_the_holder() {
    let t = test_store().await;
    let alice = ctx(1);
    let bob = ctx(2);

    let doc = t
        .store
        .documents
        .save(&alice, new_document(Some("contract.doc")), None, None)
        .await
        .unwrap();

    t.store.locks.lock(&alice, doc.id, INFINITE_TIMEOUT).await.unwrap();
    assert!(t.store.locks.is_locked(doc.id).await.unwrap());

    // Bob cannot write while Alice holds the lock.
    let mut input = update_of(&doc);
    input.title = Some("Bob's edit".into());
    let err = t
        .store
        .documents
        .save(&bob, input, None, Some(doc.sequence_number))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Locked);

    // The same call by the holder succeeds.
    let mut input = update_of(&doc);
    input.title = Some("Alice's edit".into());
    t.store
        .documents
        .save(&alice, input, None, Some(doc.sequence_number))
        .await
        .unwrap();
}

#[tokio::test]
async fn relock_by_holder_refreshes_instead_of_failing() {
    let t = test_store().await;
    let alice = ctx(1);
    let bob = ctx(2);

    let doc = t
        .store
        .documents
        .save(&alice, new_document(Some("draft.txt")), None, None)
        .await
        .unwrap();

    t.store.locks.lock(&alice, doc.id, 60_000).await.unwrap();
    t.store.locks.lock(&alice, doc.id, 60_000).await.unwrap();

    let err = t.store.locks.lock(&bob, doc.id, 60_000).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Locked);
}

#[tokio::test]
async fn unlock_requires_creator_modifier_or_holder() {
    let t = test_store().await;
    let alice = ctx(1);
    let carol = ctx(3);

    let doc = t
        .store
        .documents
        .save(&alice, new_document(Some("guarded.txt")), None, None)
        .await
        .unwrap();
    t.store.locks.lock(&alice, doc.id, INFINITE_TIMEOUT).await.unwrap();

    // Carol is neither creator, last modifier, nor lock holder.
    let err = t.store.locks.unlock(&carol, doc.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PermissionDenied);
    assert!(t.store.locks.is_locked(doc.id).await.unwrap());

    t.store.locks.unlock(&alice, doc.id).await.unwrap();
    assert!(!t.store.locks.is_locked(doc.id).await.unwrap());
}

#[tokio::test]
async fn timed_lock_expires_lazily() {
    let t = test_store().await;
    let alice = ctx(1);

    let doc = t
        .store
        .documents
        .save(&alice, new_document(Some("ephemeral.txt")), None, None)
        .await
        .unwrap();

    t.store.locks.lock(&alice, doc.id, 50).await.unwrap();
    assert!(t.store.locks.is_locked(doc.id).await.unwrap());

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(!t.store.locks.is_locked(doc.id).await.unwrap());
    assert!(t.store.locks.find_locks(doc.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn infinite_lock_does_not_expire() {
    let t = test_store().await;
    let alice = ctx(1);

    let doc = t
        .store
        .documents
        .save(&alice, new_document(Some("forever.txt")), None, None)
        .await
        .unwrap();

    t.store.locks.lock(&alice, doc.id, INFINITE_TIMEOUT).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let locks = t.store.locks.find_locks(doc.id).await.unwrap();
    assert_eq!(locks.len(), 1);
    assert!(locks[0].timeout_at.is_none());
}
