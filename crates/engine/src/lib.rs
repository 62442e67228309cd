// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! soma-engine: saved-object migration planning and execution.
//!
//! At startup the migrator plans against the live index, and if the
//! registered types have moved on it creates the next index generation,
//! streams every document through the transform pipeline, and atomically
//! repoints the collection alias. A store-level lease keeps concurrently
//! starting processes from reindexing the same generation twice.

mod config;
mod error;
mod executor;
mod lease;
mod mappings;
mod plan;
mod retry;
mod status;
mod transform;

pub use config::{ConfigError, MigrationConfig};
pub use error::MigrationError;
pub use executor::Migrator;
pub use lease::{Lease, LeaseError};
pub use mappings::{mapping_hash, merge_mappings, MappingConflict};
pub use plan::{MigrationPlan, PlanAction, Planner};
pub use status::{
    await_terminal, MigrationState, MigrationStatus, MigrationStepResult, StatusError,
    StatusPublisher, StepStatus, TransformFailure,
};
pub use transform::{DocumentMigrator, MigratedDocument, TransformError};
