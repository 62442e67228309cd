// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-document transform pipeline.
//!
//! Walks a document from the version it carries up to the newest
//! registered transform for its type, in ascending semver order. A
//! transform may rename the document to another registered type; the
//! pipeline then continues with that type's remaining transforms.

use semver::Version;
use soma_core::registry::BoxError;
use soma_core::{SavedObject, TypeRegistry};
use std::sync::Arc;
use thiserror::Error;

/// Applied-transform ceiling per document; only reachable through a
/// rename cycle or a transform that rolls its own version back
const MAX_TRANSFORM_STEPS: usize = 1000;

/// Errors from migrating a single document
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("transform {ty}@{version} failed for document '{id}': {source}")]
    Failed {
        ty: String,
        version: Version,
        id: String,
        #[source]
        source: BoxError,
    },
    #[error("transforms for document '{id}' did not settle after {steps} steps")]
    Cycle { id: String, steps: usize },
}

/// A migrated document plus pass-through metadata
#[derive(Debug, Clone)]
pub struct MigratedDocument {
    pub doc: SavedObject,
    /// The document's type (original or post-rename) is not registered;
    /// the document was passed through untouched rather than dropped
    pub unknown_type: bool,
}

/// Applies registered transforms to bring documents up to date
#[derive(Clone)]
pub struct DocumentMigrator {
    registry: Arc<TypeRegistry>,
}

impl DocumentMigrator {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    /// Migrate one document to the newest registered versions.
    ///
    /// The input is never mutated; on error the caller still holds the
    /// original for reporting. Migrating an already-current document
    /// returns it unchanged, so the operation is idempotent.
    pub fn migrate(&self, doc: &SavedObject) -> Result<MigratedDocument, TransformError> {
        let Ok(mut def) = self.registry.get(&doc.ty) else {
            tracing::warn!(ty = %doc.ty, id = %doc.id, "unknown saved-object type, passing through");
            return Ok(MigratedDocument {
                doc: doc.clone(),
                unknown_type: true,
            });
        };

        let mut current = doc.clone();
        let mut steps = 0usize;

        while let Some((version, transform)) = def.next_migration(current.own_version()) {
            steps += 1;
            if steps > MAX_TRANSFORM_STEPS {
                return Err(TransformError::Cycle {
                    id: doc.id.clone(),
                    steps,
                });
            }

            let version = version.clone();
            let transform = transform.clone();
            let applied_ty = current.ty.clone();

            let mut next = transform(current).map_err(|source| TransformError::Failed {
                ty: applied_ty.clone(),
                version: version.clone(),
                id: doc.id.clone(),
                source,
            })?;
            next.migration_version.insert(applied_ty.clone(), version);

            if next.ty != applied_ty {
                // Rename migration: continue with the new type's chain
                match self.registry.get(&next.ty) {
                    Ok(renamed) => def = renamed,
                    Err(_) => {
                        tracing::warn!(
                            from = %applied_ty,
                            to = %next.ty,
                            id = %doc.id,
                            "transform renamed document to an unregistered type"
                        );
                        return Ok(MigratedDocument {
                            doc: next,
                            unknown_type: true,
                        });
                    }
                }
            }
            current = next;
        }

        Ok(MigratedDocument {
            doc: current,
            unknown_type: false,
        })
    }
}

#[cfg(test)]
#[path = "transform_tests.rs"]
mod tests;
