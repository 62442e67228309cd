// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Migration planning.
//!
//! The planner captures the store's state at call time and decides what
//! the executor has to do: nothing, patch the live mapping in place, or
//! reindex into the next generation. It never writes.

use crate::error::MigrationError;
use crate::mappings::{mapping_hash, merge_mappings};
use soma_core::{IndexMapping, MappingMeta, TypeRegistry};
use soma_store::{IndexClient, StoreError};
use std::sync::Arc;

/// What the executor has to do for this collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    /// Stored mapping and documents are already current
    Skip,
    /// Mapping additions only: update the live index mapping in place
    Patch,
    /// Create the next generation and reindex into it
    Migrate,
}

/// Immutable result of planning one collection
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    pub action: PlanAction,
    /// Physical index currently behind the alias, if any
    pub source_index: Option<String>,
    /// Next generation's index name; never collides with an existing index
    pub target_index: String,
    /// Merged mapping with the migration hash stamped into `_meta`
    pub merged_mapping: IndexMapping,
    pub mapping_hash: String,
}

/// Decides whether (and how) a collection needs migrating
#[derive(Clone)]
pub struct Planner<C: IndexClient> {
    client: C,
    registry: Arc<TypeRegistry>,
    collection: String,
}

impl<C: IndexClient> Planner<C> {
    pub fn new(client: C, registry: Arc<TypeRegistry>, collection: impl Into<String>) -> Self {
        Self {
            client,
            registry,
            collection: collection.into(),
        }
    }

    /// Merge the registry's mappings and stamp the hash.
    ///
    /// Pure with respect to the store; fails only on mapping conflicts.
    pub fn merged(&self) -> Result<(IndexMapping, String), MigrationError> {
        let mut mapping = merge_mappings(&self.registry.all_types())?;
        let hash = mapping_hash(&mapping)?;
        mapping.meta = Some(MappingMeta {
            migration_hash: hash.clone(),
        });
        Ok((mapping, hash))
    }

    /// Read the store and build the plan for a precomputed merge.
    ///
    /// Read-only and safe to re-run, so the executor retries it as a unit.
    pub async fn survey(
        &self,
        mapping: &IndexMapping,
        hash: &str,
    ) -> Result<MigrationPlan, StoreError> {
        let source_index = self.client.get_alias(&self.collection).await?;
        let target_index = self.next_target().await?;

        let action = match &source_index {
            None => PlanAction::Migrate,
            Some(index) => {
                let stored_hash = self
                    .client
                    .get_mapping(index)
                    .await?
                    .and_then(|m| m.migration_hash().map(str::to_string));
                let outdated = self
                    .client
                    .count_outdated(index, &self.registry.latest_versions())
                    .await?;

                if outdated > 0 {
                    PlanAction::Migrate
                } else if stored_hash.as_deref() == Some(hash) {
                    PlanAction::Skip
                } else {
                    PlanAction::Patch
                }
            }
        };

        Ok(MigrationPlan {
            action,
            source_index,
            target_index,
            merged_mapping: mapping.clone(),
            mapping_hash: hash.to_string(),
        })
    }

    /// Merge and survey in one call
    pub async fn plan(&self) -> Result<MigrationPlan, MigrationError> {
        let (mapping, hash) = self.merged()?;
        Ok(self.survey(&mapping, &hash).await?)
    }

    /// `<collection>_<n+1>` where n is the highest existing generation
    async fn next_target(&self) -> Result<String, StoreError> {
        let indices = self.client.list_indices(&self.collection).await?;
        let generation = indices
            .iter()
            .filter_map(|name| parse_generation(&self.collection, name))
            .max()
            .unwrap_or(0);
        Ok(format!("{}_{}", self.collection, generation + 1))
    }
}

/// Parse the generation suffix out of `<base>_<n>`
pub(crate) fn parse_generation(base: &str, index: &str) -> Option<u64> {
    index.strip_prefix(base)?.strip_prefix('_')?.parse().ok()
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
