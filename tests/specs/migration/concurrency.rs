// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Several processes starting up against the same store at once.

use crate::prelude::*;
use soma_store::MemoryIndexClient;

#[tokio::test]
async fn racing_migrators_converge_on_a_single_generation() {
    let client = MemoryIndexClient::new();

    let runs = (0..3).map(|_| {
        let migrator = migrator(&client);
        tokio::spawn(async move { migrator.run_migrations().await })
    });

    for run in runs.collect::<Vec<_>>() {
        let steps = run.await.unwrap().unwrap();
        assert_eq!(steps[0].dest_index, ".test-objects_1");
    }

    // Exactly one index was ever created, and the alias points at it
    assert_eq!(client.index_names(), vec![".test-objects_1".to_string()]);
    assert_eq!(
        client.alias_target(COLLECTION).as_deref(),
        Some(".test-objects_1")
    );
    assert!(client.marker(LOCK).is_none());
}

#[tokio::test]
async fn racing_migrators_with_documents_reindex_once() {
    let client = MemoryIndexClient::new();
    let seeder = migrator(&client);
    client.seed_index(
        ".test-objects_1",
        seeder.active_mappings().unwrap(),
        [doc("dashboard", "d-1"), doc("dashboard", "d-2")],
    );
    client.seed_alias(COLLECTION, ".test-objects_1");

    let runs = (0..2).map(|_| {
        let migrator = migrator(&client);
        tokio::spawn(async move { migrator.run_migrations().await })
    });
    for run in runs.collect::<Vec<_>>() {
        run.await.unwrap().unwrap();
    }

    assert_eq!(
        client.alias_target(COLLECTION).as_deref(),
        Some(".test-objects_2")
    );
    assert_eq!(client.documents(".test-objects_2").len(), 2);
    // No third generation appeared
    assert_eq!(
        client.index_names(),
        vec![".test-objects_1".to_string(), ".test-objects_2".to_string()]
    );
}
