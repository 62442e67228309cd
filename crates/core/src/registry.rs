// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Type registry for saved-object definitions.
//!
//! Each type carries its mapping fragment and an ordered list of versioned
//! transforms. The registry is built explicitly at startup, sealed once
//! registration completes, and passed by `Arc` to anything that needs it.

use crate::document::SavedObject;
use crate::mapping::FieldMapping;
use parking_lot::RwLock;
use semver::Version;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Error type transforms may return
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A versioned document transform.
///
/// Takes the document by value and returns a replacement; the engine never
/// mutates a document in place.
pub type TransformFn = Arc<dyn Fn(SavedObject) -> Result<SavedObject, BoxError> + Send + Sync>;

/// How documents of a type relate to namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceType {
    /// Each document lives in exactly one namespace
    Single,
    /// A document may be shared across namespaces
    Multiple,
    /// Namespace-agnostic: visible everywhere
    Agnostic,
}

/// Errors from registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("type already registered: {0}")]
    DuplicateType(String),
    #[error("unknown type: {0}")]
    UnknownType(String),
    #[error("type {ty} declares two migrations for version {version}")]
    DuplicateMigration { ty: String, version: Version },
    #[error("registry is sealed; registration is closed")]
    Sealed,
}

/// Definition of one saved-object type
#[derive(Clone)]
pub struct TypeDefinition {
    name: String,
    namespace_type: NamespaceType,
    mapping: FieldMapping,
    /// Sorted ascending by version once registered
    migrations: Vec<(Version, TransformFn)>,
}

impl TypeDefinition {
    pub fn new(
        name: impl Into<String>,
        namespace_type: NamespaceType,
        mapping: FieldMapping,
    ) -> Self {
        Self {
            name: name.into(),
            namespace_type,
            mapping,
            migrations: Vec::new(),
        }
    }

    /// Attach a transform that upgrades documents to `version`
    #[must_use]
    pub fn with_migration<F>(mut self, version: Version, transform: F) -> Self
    where
        F: Fn(SavedObject) -> Result<SavedObject, BoxError> + Send + Sync + 'static,
    {
        self.migrations.push((version, Arc::new(transform)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace_type(&self) -> NamespaceType {
        self.namespace_type
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    /// All transforms, ascending by version
    pub fn migrations(&self) -> &[(Version, TransformFn)] {
        &self.migrations
    }

    /// The newest transform version, if the type has any migrations
    pub fn latest_version(&self) -> Option<&Version> {
        self.migrations.last().map(|(v, _)| v)
    }

    /// The first transform strictly newer than `current` (absent means the
    /// unversioned baseline, so the first transform overall)
    pub fn next_migration(&self, current: Option<&Version>) -> Option<&(Version, TransformFn)> {
        self.migrations
            .iter()
            .find(|(v, _)| current.map_or(true, |c| v > c))
    }
}

impl std::fmt::Debug for TypeDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDefinition")
            .field("name", &self.name)
            .field("namespace_type", &self.namespace_type)
            .field("migrations", &self.migrations.len())
            .finish_non_exhaustive()
    }
}

/// Registry of all saved-object types known to this process.
///
/// Append-only while unsealed; immutable after `seal()`.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: RwLock<BTreeMap<String, Arc<TypeDefinition>>>,
    sealed: AtomicBool,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type definition.
    ///
    /// Migrations are sorted ascending by version here; two transforms for
    /// the same version are rejected.
    pub fn register(&self, mut def: TypeDefinition) -> Result<(), RegistryError> {
        if self.sealed.load(Ordering::SeqCst) {
            return Err(RegistryError::Sealed);
        }

        def.migrations.sort_by(|(a, _), (b, _)| a.cmp(b));
        if let Some(dup) = def
            .migrations
            .windows(2)
            .find(|pair| pair[0].0 == pair[1].0)
        {
            return Err(RegistryError::DuplicateMigration {
                ty: def.name.clone(),
                version: dup[0].0.clone(),
            });
        }

        let mut types = self.types.write();
        if types.contains_key(&def.name) {
            return Err(RegistryError::DuplicateType(def.name));
        }
        types.insert(def.name.clone(), Arc::new(def));
        Ok(())
    }

    /// Close registration for the lifetime of the process
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::SeqCst);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }

    /// Look up a type definition by name
    pub fn get(&self, name: &str) -> Result<Arc<TypeDefinition>, RegistryError> {
        self.types
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownType(name.to_string()))
    }

    /// Snapshot of all registered definitions, sorted by name
    pub fn all_types(&self) -> Vec<Arc<TypeDefinition>> {
        self.types.read().values().cloned().collect()
    }

    /// Newest migration version per type; types without migrations are
    /// absent (their documents are always current)
    pub fn latest_versions(&self) -> BTreeMap<String, Version> {
        self.types
            .read()
            .values()
            .filter_map(|def| {
                def.latest_version()
                    .map(|v| (def.name().to_string(), v.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
