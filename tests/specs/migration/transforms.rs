// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Document transform behavior observed through a full migration.

use crate::prelude::*;
use semver::Version;
use serde_json::json;
use soma_store::MemoryIndexClient;

#[tokio::test]
async fn chained_transforms_apply_in_ascending_version_order() {
    let client = MemoryIndexClient::new();
    let migrator = migrator(&client);
    client.seed_index(
        ".test-objects_1",
        migrator.active_mappings().unwrap(),
        [doc("visualization", "v-1")],
    );
    client.seed_alias(COLLECTION, ".test-objects_1");

    migrator.run_migrations().await.unwrap();

    let docs = client.documents(".test-objects_2");
    assert_eq!(docs.len(), 1);
    // 7.0.0 added the kind, then 7.2.0 uppercased the title
    assert_eq!(docs[0].attributes["kind"], json!("unknown"));
    assert_eq!(docs[0].attributes["title"], json!("V-1"));
    assert_eq!(docs[0].own_version(), Some(&Version::new(7, 2, 0)));
}

#[tokio::test]
async fn documents_of_unregistered_types_survive_the_reindex() {
    let client = MemoryIndexClient::new();
    let migrator = migrator(&client);
    client.seed_index(
        ".test-objects_1",
        migrator.active_mappings().unwrap(),
        [doc("dashboard", "d-1"), doc("retired-type", "r-1")],
    );
    client.seed_alias(COLLECTION, ".test-objects_1");

    migrator.run_migrations().await.unwrap();

    let docs = client.documents(".test-objects_2");
    let retired = docs.iter().find(|d| d.ty == "retired-type").unwrap();
    assert_eq!(retired.attributes, json!({"title": "r-1"}));
    assert!(retired.migration_version.is_empty());
}

#[tokio::test]
async fn read_path_migration_matches_the_reindex_result() {
    let client = MemoryIndexClient::new();
    let migrator = migrator(&client);
    client.seed_index(
        ".test-objects_1",
        migrator.active_mappings().unwrap(),
        [doc("visualization", "v-1")],
    );
    client.seed_alias(COLLECTION, ".test-objects_1");

    let on_read = migrator.migrate_document(&doc("visualization", "v-1")).unwrap();
    migrator.run_migrations().await.unwrap();

    let reindexed = client.documents(".test-objects_2");
    assert_eq!(on_read.doc, reindexed[0]);
}
