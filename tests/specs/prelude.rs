// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for behavioral specifications.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use semver::Version;
use serde_json::json;
use soma_core::test_support::sealed_registry;
use soma_core::{
    FakeClock, FieldMapping, NamespaceType, SavedObject, TypeDefinition, TypeRegistry,
};
use soma_engine::{MigrationConfig, Migrator};
use soma_store::MemoryIndexClient;
use std::sync::Arc;
use std::time::Duration;

pub const COLLECTION: &str = ".test-objects";
pub const LOCK: &str = ".test-objects_migration_lock";

/// Dashboard: one transform that backfills an empty panel list at 7.1.0
pub fn dashboard() -> TypeDefinition {
    TypeDefinition::new(
        "dashboard",
        NamespaceType::Single,
        FieldMapping::object([
            ("title", FieldMapping::text()),
            ("panels", FieldMapping::keyword()),
        ]),
    )
    .with_migration(Version::new(7, 1, 0), |mut doc: SavedObject| {
        doc.attributes["panels"] = json!([]);
        Ok(doc)
    })
}

/// Visualization: two chained transforms, 7.0.0 then 7.2.0
pub fn visualization() -> TypeDefinition {
    TypeDefinition::new(
        "visualization",
        NamespaceType::Multiple,
        FieldMapping::object([
            ("title", FieldMapping::text()),
            ("kind", FieldMapping::keyword()),
        ]),
    )
    .with_migration(Version::new(7, 0, 0), |mut doc: SavedObject| {
        doc.attributes["kind"] = json!("unknown");
        Ok(doc)
    })
    .with_migration(Version::new(7, 2, 0), |mut doc: SavedObject| {
        let title = doc.attributes["title"]
            .as_str()
            .unwrap_or_default()
            .to_uppercase();
        doc.attributes["title"] = json!(title);
        Ok(doc)
    })
}

pub fn registry() -> Arc<TypeRegistry> {
    sealed_registry([dashboard(), visualization()])
}

/// Tight delays so retry and poll paths finish quickly under test
pub fn fast_config() -> MigrationConfig {
    MigrationConfig {
        retry_base_delay: Duration::from_millis(1),
        poll_interval: Duration::from_millis(2),
        poll_budget: 500,
        ..MigrationConfig::for_collection(COLLECTION)
    }
}

pub fn migrator(client: &MemoryIndexClient) -> Migrator<MemoryIndexClient, FakeClock> {
    migrator_with(client, registry(), FakeClock::at(0))
}

pub fn migrator_with(
    client: &MemoryIndexClient,
    registry: Arc<TypeRegistry>,
    clock: FakeClock,
) -> Migrator<MemoryIndexClient, FakeClock> {
    Migrator::new(client.clone(), clock, registry, fast_config())
}

/// A document with a title attribute and no applied migrations
pub fn doc(ty: &str, id: &str) -> SavedObject {
    SavedObject::new(ty, id).with_attributes(json!({"title": id}))
}
