// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Published status and its wire shape.

use crate::prelude::*;
use soma_engine::{await_terminal, MigrationState};
use soma_store::MemoryIndexClient;

#[tokio::test]
async fn subscribers_see_running_then_a_terminal_state() {
    let client = MemoryIndexClient::new();
    let migrator = migrator(&client);
    let mut rx = migrator.subscribe();

    migrator.run_migrations().await.unwrap();

    assert_eq!(rx.recv().await.unwrap().state, MigrationState::Running);
    let terminal = await_terminal(&mut rx).await.unwrap();
    assert_eq!(terminal.state, MigrationState::Completed);
}

#[tokio::test]
async fn completed_status_serializes_with_camel_case_step_fields() {
    let client = MemoryIndexClient::new();
    let migrator = migrator(&client);
    migrator.run_migrations().await.unwrap();

    let status = serde_json::to_value(migrator.status()).unwrap();
    assert_eq!(status["state"], "completed");
    let step = &status["result"][0];
    assert_eq!(step["status"], "migrated");
    assert_eq!(step["destIndex"], ".test-objects_1");
    assert!(step["elapsedMs"].is_u64());
    // Fresh store: no source index, so the field is omitted entirely
    assert!(step.get("sourceIndex").is_none());
}

#[tokio::test]
async fn failed_status_carries_the_error_message() {
    let client = MemoryIndexClient::new();
    let migrator = migrator(&client);
    client.fail_next(
        "get_alias",
        soma_store::StoreError::IndexNotFound("boom".to_string()),
    );

    migrator.run_migrations().await.unwrap_err();

    let status = migrator.status();
    assert_eq!(status.state, MigrationState::Failed);
    assert!(status.error.unwrap().contains("boom"));
}
