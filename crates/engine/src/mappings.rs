// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Merges per-type mapping fragments into one index mapping.
//!
//! The merge is a pure function of the registered types: contributors are
//! sorted by name and every map is BTree-backed, so recomputing against an
//! unchanged registry yields byte-identical output. The hash of that
//! output is stored in the index `_meta` and is the planner's cache key.

use sha2::{Digest, Sha256};
use soma_core::{FieldMapping, IndexMapping, TypeDefinition};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Two contributors disagree about one top-level field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("mapping conflict on field '{field}' (declared by {first} and {second})")]
pub struct MappingConflict {
    pub field: String,
    pub first: String,
    pub second: String,
}

/// Root fields shared by every saved object, independent of type
fn root_properties() -> BTreeMap<String, FieldMapping> {
    [
        ("id".to_string(), FieldMapping::keyword()),
        ("type".to_string(), FieldMapping::keyword()),
        ("namespace".to_string(), FieldMapping::keyword()),
        ("updated_at".to_string(), FieldMapping::date()),
        (
            "references".to_string(),
            FieldMapping::object([
                ("name", FieldMapping::keyword()),
                ("type", FieldMapping::keyword()),
                ("id", FieldMapping::keyword()),
            ]),
        ),
        ("migrationVersion".to_string(), FieldMapping::dynamic_object()),
    ]
    .into()
}

/// Merge type mapping fragments under per-type namespaces plus the common
/// root fields.
///
/// Deterministic: contributors are sorted by name before merging, so the
/// result is independent of registration order.
pub fn merge_mappings(types: &[Arc<TypeDefinition>]) -> Result<IndexMapping, MappingConflict> {
    let mut sorted: Vec<&Arc<TypeDefinition>> = types.iter().collect();
    sorted.sort_by_key(|def| def.name());

    let mut properties = root_properties();
    let mut owners: BTreeMap<String, String> = properties
        .keys()
        .map(|k| (k.clone(), "root".to_string()))
        .collect();

    for def in sorted {
        let name = def.name().to_string();
        match properties.get(&name) {
            None => {
                properties.insert(name.clone(), def.mapping().clone());
                owners.insert(name, def.name().to_string());
            }
            Some(existing) if existing == def.mapping() => {}
            Some(_) => {
                return Err(MappingConflict {
                    first: owners
                        .get(&name)
                        .cloned()
                        .unwrap_or_else(|| "root".to_string()),
                    second: def.name().to_string(),
                    field: name,
                });
            }
        }
    }

    Ok(IndexMapping::strict(properties))
}

/// Hex SHA-256 of the mapping's canonical JSON, ignoring `_meta`.
///
/// Stored on the index at creation time; a stored hash equal to the
/// freshly computed one means the mapping on disk already matches the
/// registry.
pub fn mapping_hash(mapping: &IndexMapping) -> Result<String, serde_json::Error> {
    let mut bare = mapping.clone();
    bare.meta = None;
    let canonical = serde_json::to_string(&bare)?;
    let digest = Sha256::digest(canonical.as_bytes());
    Ok(format!("{:x}", digest))
}

#[cfg(test)]
#[path = "mappings_tests.rs"]
mod tests;
