// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovering from a migrator that died mid-run.

use crate::prelude::*;
use soma_core::FakeClock;
use soma_engine::{Lease, StepStatus};
use soma_store::MemoryIndexClient;
use std::time::Duration;

#[tokio::test]
async fn an_expired_lease_is_reclaimed_and_the_migration_finishes() {
    let client = MemoryIndexClient::new();
    let clock = FakeClock::at(0);

    // A previous process took the lock and crashed without releasing it
    let _stale = Lease::acquire(client.clone(), clock.clone(), LOCK, Duration::from_secs(30))
        .await
        .unwrap();
    clock.advance(31_000);

    let steps = migrator_with(&client, registry(), clock)
        .run_migrations()
        .await
        .unwrap();

    assert_eq!(steps[0].status, StepStatus::Migrated);
    assert_eq!(
        client.alias_target(COLLECTION).as_deref(),
        Some(".test-objects_1")
    );
    assert!(client.marker(LOCK).is_none());
}

#[tokio::test]
async fn a_crashed_runs_orphan_index_is_left_behind_and_skipped_over() {
    let client = MemoryIndexClient::new();
    let seeder = migrator(&client);
    let mapping = seeder.active_mappings().unwrap();
    // Generation 1 serves traffic; generation 2 was abandoned mid-reindex
    client.seed_index(".test-objects_1", mapping.clone(), [doc("dashboard", "d-1")]);
    client.seed_index(".test-objects_2", mapping, []);
    client.seed_alias(COLLECTION, ".test-objects_1");

    let steps = seeder.run_migrations().await.unwrap();

    assert_eq!(steps[0].status, StepStatus::Migrated);
    assert_eq!(steps[0].dest_index, ".test-objects_3");
    assert_eq!(client.documents(".test-objects_3").len(), 1);
}
