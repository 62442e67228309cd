// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observable migration status.
//!
//! Single-writer broadcast: the executor publishes monotonic transitions
//! (pending → running → completed | failed) and any number of subscribers
//! receive every transition in order. The snapshot is kept alongside the
//! channel so late callers can read the current value without subscribing.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// Outcome of migrating one logical index group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Stored mapping and documents already current
    Skipped,
    /// Mapping updated in place, no reindex
    Patched,
    /// Full reindex into a new generation
    Migrated,
}

/// One document whose transform failed during a reindex
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformFailure {
    pub id: String,
    pub error: String,
}

/// Result of one migration step, accumulated into the published status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStepResult {
    pub status: StepStatus,
    /// Absent when the collection had no index yet
    #[serde(rename = "sourceIndex", skip_serializing_if = "Option::is_none")]
    pub source_index: Option<String>,
    #[serde(rename = "destIndex")]
    pub dest_index: String,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    /// Documents whose transform failed within the tolerated threshold;
    /// each was carried into the new index unchanged
    #[serde(rename = "transformErrors", skip_serializing_if = "Vec::is_empty")]
    pub transform_errors: Vec<TransformFailure>,
}

/// Lifecycle state of the migration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Published snapshot of the migration run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub state: MigrationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<MigrationStepResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MigrationStatus {
    pub fn pending() -> Self {
        Self {
            state: MigrationState::Pending,
            result: None,
            error: None,
        }
    }

    pub fn running() -> Self {
        Self {
            state: MigrationState::Running,
            result: None,
            error: None,
        }
    }

    pub fn completed(result: Vec<MigrationStepResult>) -> Self {
        Self {
            state: MigrationState::Completed,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            state: MigrationState::Failed,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, MigrationState::Completed | MigrationState::Failed)
    }
}

/// Errors from status transitions
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: MigrationState,
        to: MigrationState,
    },
}

/// Single-writer publisher of migration status transitions
#[derive(Clone)]
pub struct StatusPublisher {
    current: Arc<Mutex<MigrationStatus>>,
    tx: broadcast::Sender<MigrationStatus>,
}

impl Default for StatusPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusPublisher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            current: Arc::new(Mutex::new(MigrationStatus::pending())),
            tx,
        }
    }

    /// Current status snapshot
    pub fn get(&self) -> MigrationStatus {
        self.current.lock().clone()
    }

    /// Receive every subsequent transition, in order
    pub fn subscribe(&self) -> broadcast::Receiver<MigrationStatus> {
        self.tx.subscribe()
    }

    /// Publish a transition, enforcing the pending → running →
    /// (completed | failed) order. The status never reverts.
    pub fn transition(&self, next: MigrationStatus) -> Result<(), StatusError> {
        let mut current = self.current.lock();
        let allowed = matches!(
            (current.state, next.state),
            (MigrationState::Pending, MigrationState::Running)
                | (MigrationState::Running, MigrationState::Completed)
                | (MigrationState::Running, MigrationState::Failed)
        );
        if !allowed {
            return Err(StatusError::InvalidTransition {
                from: current.state,
                to: next.state,
            });
        }
        *current = next.clone();
        drop(current);
        // No receivers is fine
        let _ = self.tx.send(next);
        Ok(())
    }
}

/// Wait for the next terminal status on a subscription.
///
/// Returns `None` if the publisher went away first.
pub async fn await_terminal(
    rx: &mut broadcast::Receiver<MigrationStatus>,
) -> Option<MigrationStatus> {
    loop {
        match rx.recv().await {
            Ok(status) if status.is_terminal() => return Some(status),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
