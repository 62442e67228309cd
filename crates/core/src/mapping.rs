// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Index mapping model.
//!
//! Mirrors the document store's wire shapes: a leaf field is
//! `{"type": "keyword"}`, an object is `{"properties": {...}}`. All maps
//! are `BTreeMap` so that serializing the same mapping twice yields
//! byte-identical JSON, which the planner relies on for hashing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Storable leaf field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Keyword,
    Text,
    Integer,
    Long,
    Float,
    Boolean,
    Date,
}

/// Dynamic-mapping policy for an index or object field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dynamic {
    True,
    False,
    Strict,
}

/// One field's schema: either a leaf of a concrete kind or a nested object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldMapping {
    Field {
        #[serde(rename = "type")]
        kind: FieldKind,
    },
    Object {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dynamic: Option<Dynamic>,
        properties: BTreeMap<String, FieldMapping>,
    },
}

impl FieldMapping {
    pub fn keyword() -> Self {
        Self::Field {
            kind: FieldKind::Keyword,
        }
    }

    pub fn text() -> Self {
        Self::Field {
            kind: FieldKind::Text,
        }
    }

    pub fn integer() -> Self {
        Self::Field {
            kind: FieldKind::Integer,
        }
    }

    pub fn long() -> Self {
        Self::Field {
            kind: FieldKind::Long,
        }
    }

    pub fn float() -> Self {
        Self::Field {
            kind: FieldKind::Float,
        }
    }

    pub fn boolean() -> Self {
        Self::Field {
            kind: FieldKind::Boolean,
        }
    }

    pub fn date() -> Self {
        Self::Field {
            kind: FieldKind::Date,
        }
    }

    /// Build an object field from `(name, mapping)` pairs
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldMapping)>,
        K: Into<String>,
    {
        Self::Object {
            dynamic: None,
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        }
    }

    /// Build an object field that accepts arbitrary sub-fields
    pub fn dynamic_object() -> Self {
        Self::Object {
            dynamic: Some(Dynamic::True),
            properties: BTreeMap::new(),
        }
    }
}

/// Engine-owned metadata stored alongside the index mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingMeta {
    /// Hash of the merged mapping this index was created from
    #[serde(rename = "migrationHash")]
    pub migration_hash: String,
}

/// Full mapping document for one physical index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMapping {
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MappingMeta>,
    pub dynamic: Dynamic,
    pub properties: BTreeMap<String, FieldMapping>,
}

impl IndexMapping {
    /// Create a strict mapping with the given top-level properties
    pub fn strict<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldMapping)>,
        K: Into<String>,
    {
        Self {
            meta: None,
            dynamic: Dynamic::Strict,
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        }
    }

    /// The stored migration hash, if this mapping carries one
    pub fn migration_hash(&self) -> Option<&str> {
        self.meta.as_ref().map(|m| m.migration_hash.as_str())
    }
}

#[cfg(test)]
#[path = "mapping_tests.rs"]
mod tests;
