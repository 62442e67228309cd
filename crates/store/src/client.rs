// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Async client trait for the indexed document service.
//!
//! The migration engine only ever talks to the store through this trait:
//! alias resolution, index creation, batched reads, id-preserving bulk
//! writes, a compare-and-swap alias swap, and an exclusive-create marker
//! primitive used for distributed locking.

use async_trait::async_trait;
use semver::Version;
use soma_core::{IndexMapping, SavedObject};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("index not found: {0}")]
    IndexNotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("malformed response: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether a retry with backoff is worthwhile
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}

/// Outcome of an exclusive create (index or marker)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Outcome of a compare-and-swap alias update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    Swapped,
    /// The alias no longer points at the expected index
    Conflict,
}

/// Opaque resume token for batched reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(pub String);

/// One page of documents plus the cursor for the next page
#[derive(Debug, Clone)]
pub struct DocumentBatch {
    pub docs: Vec<SavedObject>,
    /// `None` when the index is exhausted
    pub next: Option<Cursor>,
}

/// Client for the external document store.
///
/// Every method is a suspension point; implementations must be safe to
/// clone and share across tasks.
#[async_trait]
pub trait IndexClient: Clone + Send + Sync + 'static {
    /// Resolve an alias to the physical index behind it
    async fn get_alias(&self, alias: &str) -> Result<Option<String>, StoreError>;

    /// All physical index names starting with `prefix`
    async fn list_indices(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// The mapping stored on an index, or `None` if the index is absent
    async fn get_mapping(&self, index: &str) -> Result<Option<IndexMapping>, StoreError>;

    /// Replace the mapping on an existing index
    async fn put_mapping(&self, index: &str, mapping: &IndexMapping) -> Result<(), StoreError>;

    /// Create an index with the given mapping; creation is exclusive
    async fn create_index(
        &self,
        index: &str,
        mapping: &IndexMapping,
    ) -> Result<CreateOutcome, StoreError>;

    /// Read one bounded batch of documents in the index's natural order
    async fn fetch_batch(
        &self,
        index: &str,
        cursor: Option<Cursor>,
        size: usize,
    ) -> Result<DocumentBatch, StoreError>;

    /// Write documents, keyed by id (id-preserving upsert)
    async fn bulk_write(&self, index: &str, docs: &[SavedObject]) -> Result<(), StoreError>;

    /// Count documents whose own-type migration version lags `latest`
    async fn count_outdated(
        &self,
        index: &str,
        latest: &BTreeMap<String, Version>,
    ) -> Result<u64, StoreError>;

    /// Atomically repoint `alias` from `expected_current` to `target`.
    ///
    /// `expected_current = None` asserts the alias does not exist yet.
    async fn swap_alias(
        &self,
        alias: &str,
        expected_current: Option<&str>,
        target: &str,
    ) -> Result<SwapOutcome, StoreError>;

    /// Exclusively create a marker document (lock primitive)
    async fn create_marker(
        &self,
        name: &str,
        body: &serde_json::Value,
    ) -> Result<CreateOutcome, StoreError>;

    /// Read a marker's body, or `None` if absent
    async fn read_marker(&self, name: &str) -> Result<Option<serde_json::Value>, StoreError>;

    /// Overwrite a marker's body (lease renewal)
    async fn put_marker(&self, name: &str, body: &serde_json::Value) -> Result<(), StoreError>;

    /// Delete a marker; deleting an absent marker is not an error
    async fn delete_marker(&self, name: &str) -> Result<(), StoreError>;
}
