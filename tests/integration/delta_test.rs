//! Delta partition scenarios: new / modified / deleted are disjoint.

use std::collections::HashSet;

use docvault::{DocumentId, FolderId, RightsSet, StaticRightsResolver, UserId};

use crate::helpers::{ctx, new_document, test_store, test_store_with, update_of, FOLDER};

#[tokio::test]
async fn delta_partitions_are_disjoint_and_complete() {
    let t = test_store().await;
    let alice = ctx(1);
    let folder = FolderId::from_raw(FOLDER);

    // A and C exist before the baseline; B is created after it.
    let a = t
        .store
        .documents
        .save(&alice, new_document(Some("a.txt")), None, None)
        .await
        .unwrap();
    let c = t
        .store
        .documents
        .save(&alice, new_document(Some("c.txt")), None, None)
        .await
        .unwrap();

    let baseline = c.sequence_number;

    let b = t
        .store
        .documents
        .save(&alice, new_document(Some("b.txt")), None, None)
        .await
        .unwrap();

    let mut input = update_of(&a);
    input.title = Some("A modified".into());
    t.store
        .documents
        .save(&alice, input, None, Some(a.sequence_number))
        .await
        .unwrap();

    let rejected = t
        .store
        .removal
        .remove_documents_by_id(&alice, &[c.id], i64::MAX)
        .await
        .unwrap();
    assert!(rejected.is_empty());

    let delta = t.store.documents.delta(&alice, folder, baseline).await.unwrap();

    let new_ids: HashSet<DocumentId> = delta.new.iter().map(|d| d.id).collect();
    let modified_ids: HashSet<DocumentId> = delta.modified.iter().map(|d| d.id).collect();
    let deleted_ids: HashSet<DocumentId> = delta.deleted.iter().map(|d| d.document_id).collect();

    assert_eq!(new_ids, HashSet::from([b.id]));
    assert_eq!(modified_ids, HashSet::from([a.id]));
    assert_eq!(deleted_ids, HashSet::from([c.id]));

    // Pairwise disjoint.
    assert!(new_ids.is_disjoint(&modified_ids));
    assert!(new_ids.is_disjoint(&deleted_ids));
    assert!(modified_ids.is_disjoint(&deleted_ids));
}

#[tokio::test]
async fn delta_from_zero_reports_everything_as_new() {
    let t = test_store().await;
    let alice = ctx(1);
    let folder = FolderId::from_raw(FOLDER);

    for name in ["x.txt", "y.txt"] {
        t.store
            .documents
            .save(&alice, new_document(Some(name)), None, None)
            .await
            .unwrap();
    }

    let delta = t.store.documents.delta(&alice, folder, 0).await.unwrap();
    assert_eq!(delta.new.len(), 2);
    assert!(delta.modified.is_empty());
    assert!(delta.deleted.is_empty());
}

#[tokio::test]
async fn unchanged_documents_stay_out_of_the_delta() {
    let t = test_store().await;
    let alice = ctx(1);
    let folder = FolderId::from_raw(FOLDER);

    let doc = t
        .store
        .documents
        .save(&alice, new_document(Some("static.txt")), None, None)
        .await
        .unwrap();

    let delta = t
        .store
        .documents
        .delta(&alice, folder, doc.sequence_number)
        .await
        .unwrap();
    assert!(delta.is_empty());
}

#[tokio::test]
async fn own_scope_delta_hides_foreign_changes() {
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
    let bobs = t
        .store
        .documents
        .save(&bob, new_document(Some("bob.txt")), None, None)
        .await
        .unwrap();

    let delta = t.store.documents.delta(&bob, folder, 0).await.unwrap();
    assert_eq!(delta.new.len(), 1);
    assert_eq!(delta.new[0].id, bobs.id);
}
