// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the migration engine

use crate::lease::LeaseError;
use crate::mappings::MappingConflict;
use crate::retry::RetryError;
use crate::status::StatusError;
use soma_store::StoreError;
use thiserror::Error;

/// Errors that abort a migration run
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    MappingConflict(#[from] MappingConflict),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("retries exhausted for {op} after {attempts} attempts: {source}")]
    ExhaustedRetries {
        op: String,
        attempts: u32,
        #[source]
        source: StoreError,
    },
    #[error(
        "{failures} transform failure(s) in index '{index}' exceeded threshold {threshold}; \
         first: {first}"
    )]
    TransformFailures {
        index: String,
        failures: u32,
        threshold: u32,
        first: String,
    },
    #[error("alias '{alias}' advanced to another generation while targeting '{target}'")]
    AliasConflict { alias: String, target: String },
    #[error("gave up waiting for the migration lock holder on '{collection}'")]
    LockWaitTimeout { collection: String },
    #[error(transparent)]
    Lease(#[from] LeaseError),
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<RetryError> for MigrationError {
    fn from(err: RetryError) -> Self {
        match err {
            RetryError::Exhausted {
                op,
                attempts,
                source,
            } => Self::ExhaustedRetries {
                op,
                attempts,
                source,
            },
            RetryError::Fatal(source) => Self::Store(source),
        }
    }
}
