// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Saved-object document envelope.
//!
//! A saved object is a typed, versioned document. Its `migration_version`
//! map records, per type name, the newest transform already applied, which
//! is what the migration engine compares against the registry to decide
//! whether the document is current.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pointer from one saved object to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub id: String,
}

/// A typed, schema-versioned document.
///
/// Attributes are an opaque payload whose shape is defined by the type's
/// mapping. Documents are replaced whole; transforms take the document by
/// value and return a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedObject {
    pub id: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub attributes: serde_json::Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Reference>,
    /// Per-type record of the newest transform already applied
    #[serde(
        rename = "migrationVersion",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub migration_version: BTreeMap<String, Version>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl SavedObject {
    /// Create a document with empty attributes and no applied migrations
    pub fn new(ty: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ty: ty.into(),
            attributes: serde_json::Value::Object(serde_json::Map::new()),
            references: Vec::new(),
            migration_version: BTreeMap::new(),
            namespace: None,
            updated_at: None,
        }
    }

    /// Replace the attributes payload
    #[must_use]
    pub fn with_attributes(mut self, attributes: serde_json::Value) -> Self {
        self.attributes = attributes;
        self
    }

    /// Record `version` as applied for this document's own type
    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.migration_version.insert(self.ty.clone(), version);
        self
    }

    /// The version recorded for this document's own type, if any.
    ///
    /// Absent means the unversioned baseline: every registered transform
    /// is still pending.
    pub fn own_version(&self) -> Option<&Version> {
        self.migration_version.get(&self.ty)
    }
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
