// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup against a store that has already been migrated.

use crate::prelude::*;
use semver::Version;
use serde_json::json;
use soma_core::test_support::sealed_registry;
use soma_core::{FakeClock, SavedObject};
use soma_engine::StepStatus;
use soma_store::{MemoryIndexClient, StoreCall};

#[tokio::test]
async fn second_startup_with_the_same_registry_is_a_no_op() {
    let client = MemoryIndexClient::new();
    migrator(&client).run_migrations().await.unwrap();
    client.clear_calls();

    let steps = migrator(&client).run_migrations().await.unwrap();

    assert_eq!(steps[0].status, StepStatus::Skipped);
    assert_eq!(steps[0].dest_index, ".test-objects_1");
    assert_eq!(client.index_names(), vec![".test-objects_1".to_string()]);
    // No writes and no lock traffic on the skip path
    assert!(!client
        .calls()
        .iter()
        .any(|c| matches!(c, StoreCall::CreateIndex { .. } | StoreCall::CreateMarker { .. })));
}

#[tokio::test]
async fn current_documents_written_between_runs_do_not_trigger_a_reindex() {
    let client = MemoryIndexClient::new();
    migrator(&client).run_migrations().await.unwrap();

    use soma_store::IndexClient as _;
    let current = doc("dashboard", "d-1").with_version(Version::new(7, 1, 0));
    client
        .bulk_write(".test-objects_1", &[current])
        .await
        .unwrap();

    let steps = migrator(&client).run_migrations().await.unwrap();
    assert_eq!(steps[0].status, StepStatus::Skipped);
}

#[tokio::test]
async fn a_newer_registry_reindexes_existing_documents() {
    let client = MemoryIndexClient::new();
    let first = migrator(&client);
    client.seed_index(
        ".test-objects_1",
        first.active_mappings().unwrap(),
        [doc("dashboard", "d-1")],
    );
    client.seed_alias(COLLECTION, ".test-objects_1");
    first.run_migrations().await.unwrap();

    // A later deployment ships one more dashboard transform
    let extended = sealed_registry([
        dashboard().with_migration(Version::new(7, 3, 0), |mut doc: SavedObject| {
            doc.attributes["layout"] = json!("grid");
            Ok(doc)
        }),
        visualization(),
    ]);
    let steps = migrator_with(&client, extended, FakeClock::at(0))
        .run_migrations()
        .await
        .unwrap();

    assert_eq!(steps[0].status, StepStatus::Migrated);
    assert_eq!(steps[0].dest_index, ".test-objects_3");

    let docs = client.documents(".test-objects_3");
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].attributes["layout"], json!("grid"));
    assert_eq!(docs[0].own_version(), Some(&Version::new(7, 3, 0)));
}
