// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! First startup against an empty store.

use crate::prelude::*;
use soma_engine::StepStatus;
use soma_store::MemoryIndexClient;

#[tokio::test]
async fn fresh_store_ends_with_generation_one_behind_the_alias() {
    let client = MemoryIndexClient::new();
    let migrator = migrator(&client);

    let steps = migrator.run_migrations().await.unwrap();

    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].status, StepStatus::Migrated);
    assert_eq!(steps[0].dest_index, ".test-objects_1");
    assert_eq!(
        client.alias_target(COLLECTION).as_deref(),
        Some(".test-objects_1")
    );
    assert_eq!(client.index_names(), vec![".test-objects_1".to_string()]);
    // Lock released on the way out
    assert!(client.marker(LOCK).is_none());
}

#[tokio::test]
async fn created_index_carries_the_merged_mapping_and_hash() {
    let client = MemoryIndexClient::new();
    let migrator = migrator(&client);
    let merged = migrator.active_mappings().unwrap();

    migrator.run_migrations().await.unwrap();

    use soma_store::IndexClient as _;
    let stored = client
        .get_mapping(".test-objects_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, merged);
    assert!(stored.migration_hash().is_some());
}

#[tokio::test]
async fn seeded_documents_are_upgraded_into_the_next_generation() {
    let client = MemoryIndexClient::new();
    let migrator = migrator(&client);
    client.seed_index(
        ".test-objects_1",
        migrator.active_mappings().unwrap(),
        [doc("dashboard", "d-1"), doc("visualization", "v-1")],
    );
    client.seed_alias(COLLECTION, ".test-objects_1");

    let steps = migrator.run_migrations().await.unwrap();

    assert_eq!(steps[0].status, StepStatus::Migrated);
    assert_eq!(steps[0].source_index.as_deref(), Some(".test-objects_1"));
    assert_eq!(steps[0].dest_index, ".test-objects_2");
    assert_eq!(
        client.alias_target(COLLECTION).as_deref(),
        Some(".test-objects_2")
    );

    let docs = client.documents(".test-objects_2");
    assert_eq!(docs.len(), 2);
    // The old generation stays behind for rollback
    assert_eq!(client.documents(".test-objects_1").len(), 2);
}
