// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory fake of the document store for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::client::{
    CreateOutcome, Cursor, DocumentBatch, IndexClient, StoreError, SwapOutcome,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use semver::Version;
use soma_core::{IndexMapping, SavedObject};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// Recorded call to the fake store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    GetAlias { alias: String },
    ListIndices { prefix: String },
    GetMapping { index: String },
    PutMapping { index: String },
    CreateIndex { index: String },
    FetchBatch { index: String },
    BulkWrite { index: String, count: usize },
    CountOutdated { index: String },
    SwapAlias { alias: String, target: String },
    CreateMarker { name: String },
    ReadMarker { name: String },
    PutMarker { name: String },
    DeleteMarker { name: String },
}

#[derive(Debug)]
struct IndexData {
    mapping: IndexMapping,
    docs: BTreeMap<String, SavedObject>,
}

#[derive(Debug)]
struct MemoryState {
    indices: BTreeMap<String, IndexData>,
    aliases: BTreeMap<String, String>,
    markers: BTreeMap<String, serde_json::Value>,
    calls: Vec<StoreCall>,
    injected: BTreeMap<String, VecDeque<StoreError>>,
}

/// Shared in-memory document store.
///
/// Clones share state, so several racing migrators in one test observe the
/// same indices, aliases, and markers. Records every call and supports
/// injecting errors per operation name.
#[derive(Clone, Debug)]
pub struct MemoryIndexClient {
    inner: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryIndexClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIndexClient {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryState {
                indices: BTreeMap::new(),
                aliases: BTreeMap::new(),
                markers: BTreeMap::new(),
                calls: Vec::new(),
                injected: BTreeMap::new(),
            })),
        }
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner.lock().calls.clone()
    }

    /// Clear recorded calls
    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// Queue an error for the next invocation of `op` (method name,
    /// e.g. `"create_index"`). Queued errors are consumed in order before
    /// the real behavior runs.
    pub fn fail_next(&self, op: &str, err: StoreError) {
        self.inner
            .lock()
            .injected
            .entry(op.to_string())
            .or_default()
            .push_back(err);
    }

    /// Create an index with documents already in it
    pub fn seed_index(
        &self,
        name: &str,
        mapping: IndexMapping,
        docs: impl IntoIterator<Item = SavedObject>,
    ) {
        let mut state = self.inner.lock();
        state.indices.insert(
            name.to_string(),
            IndexData {
                mapping,
                docs: docs.into_iter().map(|d| (d.id.clone(), d)).collect(),
            },
        );
    }

    /// Point an alias at an index
    pub fn seed_alias(&self, alias: &str, index: &str) {
        self.inner
            .lock()
            .aliases
            .insert(alias.to_string(), index.to_string());
    }

    /// Snapshot of the documents in an index, sorted by id
    pub fn documents(&self, index: &str) -> Vec<SavedObject> {
        self.inner
            .lock()
            .indices
            .get(index)
            .map(|data| data.docs.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Current alias target, if any
    pub fn alias_target(&self, alias: &str) -> Option<String> {
        self.inner.lock().aliases.get(alias).cloned()
    }

    /// Current marker body, if present
    pub fn marker(&self, name: &str) -> Option<serde_json::Value> {
        self.inner.lock().markers.get(name).cloned()
    }

    /// Names of all existing indices
    pub fn index_names(&self) -> Vec<String> {
        self.inner.lock().indices.keys().cloned().collect()
    }

    fn begin(&self, op: &str, call: StoreCall) -> Result<(), StoreError> {
        let mut state = self.inner.lock();
        tracing::trace!(op, ?call, "store call");
        state.calls.push(call);
        if let Some(queue) = state.injected.get_mut(op) {
            if let Some(err) = queue.pop_front() {
                tracing::debug!(op, "returning injected error");
                return Err(err);
            }
        }
        Ok(())
    }
}

fn is_outdated(doc: &SavedObject, latest: &BTreeMap<String, Version>) -> bool {
    match latest.get(&doc.ty) {
        Some(newest) => doc.own_version().map_or(true, |v| v < newest),
        None => false,
    }
}

#[async_trait]
impl IndexClient for MemoryIndexClient {
    async fn get_alias(&self, alias: &str) -> Result<Option<String>, StoreError> {
        self.begin(
            "get_alias",
            StoreCall::GetAlias {
                alias: alias.to_string(),
            },
        )?;
        Ok(self.inner.lock().aliases.get(alias).cloned())
    }

    async fn list_indices(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.begin(
            "list_indices",
            StoreCall::ListIndices {
                prefix: prefix.to_string(),
            },
        )?;
        Ok(self
            .inner
            .lock()
            .indices
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get_mapping(&self, index: &str) -> Result<Option<IndexMapping>, StoreError> {
        self.begin(
            "get_mapping",
            StoreCall::GetMapping {
                index: index.to_string(),
            },
        )?;
        Ok(self
            .inner
            .lock()
            .indices
            .get(index)
            .map(|data| data.mapping.clone()))
    }

    async fn put_mapping(&self, index: &str, mapping: &IndexMapping) -> Result<(), StoreError> {
        self.begin(
            "put_mapping",
            StoreCall::PutMapping {
                index: index.to_string(),
            },
        )?;
        let mut state = self.inner.lock();
        match state.indices.get_mut(index) {
            Some(data) => {
                data.mapping = mapping.clone();
                Ok(())
            }
            None => Err(StoreError::IndexNotFound(index.to_string())),
        }
    }

    async fn create_index(
        &self,
        index: &str,
        mapping: &IndexMapping,
    ) -> Result<CreateOutcome, StoreError> {
        self.begin(
            "create_index",
            StoreCall::CreateIndex {
                index: index.to_string(),
            },
        )?;
        let mut state = self.inner.lock();
        if state.indices.contains_key(index) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        state.indices.insert(
            index.to_string(),
            IndexData {
                mapping: mapping.clone(),
                docs: BTreeMap::new(),
            },
        );
        Ok(CreateOutcome::Created)
    }

    async fn fetch_batch(
        &self,
        index: &str,
        cursor: Option<Cursor>,
        size: usize,
    ) -> Result<DocumentBatch, StoreError> {
        self.begin(
            "fetch_batch",
            StoreCall::FetchBatch {
                index: index.to_string(),
            },
        )?;
        let state = self.inner.lock();
        let data = state
            .indices
            .get(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;

        let docs: Vec<SavedObject> = match &cursor {
            Some(Cursor(after)) => data
                .docs
                .range::<String, _>((
                    std::ops::Bound::Excluded(after.clone()),
                    std::ops::Bound::Unbounded,
                ))
                .take(size)
                .map(|(_, d)| d.clone())
                .collect(),
            None => data.docs.values().take(size).cloned().collect(),
        };

        let next = docs.last().and_then(|last| {
            let more = data
                .docs
                .range::<String, _>((
                    std::ops::Bound::Excluded(last.id.clone()),
                    std::ops::Bound::Unbounded,
                ))
                .next()
                .is_some();
            more.then(|| Cursor(last.id.clone()))
        });

        Ok(DocumentBatch { docs, next })
    }

    async fn bulk_write(&self, index: &str, docs: &[SavedObject]) -> Result<(), StoreError> {
        self.begin(
            "bulk_write",
            StoreCall::BulkWrite {
                index: index.to_string(),
                count: docs.len(),
            },
        )?;
        let mut state = self.inner.lock();
        let data = state
            .indices
            .get_mut(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;
        for doc in docs {
            data.docs.insert(doc.id.clone(), doc.clone());
        }
        Ok(())
    }

    async fn count_outdated(
        &self,
        index: &str,
        latest: &BTreeMap<String, Version>,
    ) -> Result<u64, StoreError> {
        self.begin(
            "count_outdated",
            StoreCall::CountOutdated {
                index: index.to_string(),
            },
        )?;
        let state = self.inner.lock();
        let data = state
            .indices
            .get(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;
        Ok(data
            .docs
            .values()
            .filter(|doc| is_outdated(doc, latest))
            .count() as u64)
    }

    async fn swap_alias(
        &self,
        alias: &str,
        expected_current: Option<&str>,
        target: &str,
    ) -> Result<SwapOutcome, StoreError> {
        self.begin(
            "swap_alias",
            StoreCall::SwapAlias {
                alias: alias.to_string(),
                target: target.to_string(),
            },
        )?;
        let mut state = self.inner.lock();
        let current = state.aliases.get(alias).map(String::as_str);
        if current != expected_current {
            return Ok(SwapOutcome::Conflict);
        }
        state.aliases.insert(alias.to_string(), target.to_string());
        Ok(SwapOutcome::Swapped)
    }

    async fn create_marker(
        &self,
        name: &str,
        body: &serde_json::Value,
    ) -> Result<CreateOutcome, StoreError> {
        self.begin(
            "create_marker",
            StoreCall::CreateMarker {
                name: name.to_string(),
            },
        )?;
        let mut state = self.inner.lock();
        if state.markers.contains_key(name) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        state.markers.insert(name.to_string(), body.clone());
        Ok(CreateOutcome::Created)
    }

    async fn read_marker(&self, name: &str) -> Result<Option<serde_json::Value>, StoreError> {
        self.begin(
            "read_marker",
            StoreCall::ReadMarker {
                name: name.to_string(),
            },
        )?;
        Ok(self.inner.lock().markers.get(name).cloned())
    }

    async fn put_marker(&self, name: &str, body: &serde_json::Value) -> Result<(), StoreError> {
        self.begin(
            "put_marker",
            StoreCall::PutMarker {
                name: name.to_string(),
            },
        )?;
        self.inner
            .lock()
            .markers
            .insert(name.to_string(), body.clone());
        Ok(())
    }

    async fn delete_marker(&self, name: &str) -> Result<(), StoreError> {
        self.begin(
            "delete_marker",
            StoreCall::DeleteMarker {
                name: name.to_string(),
            },
        )?;
        self.inner.lock().markers.remove(name);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
