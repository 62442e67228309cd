// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Migration executor.
//!
//! Drives one collection through plan → create → reindex → alias swap,
//! publishing status transitions along the way. A store-level lease keeps
//! concurrently starting processes from doing the work twice: losers poll
//! for the winner's alias swap and adopt its result.

use crate::config::MigrationConfig;
use crate::error::MigrationError;
use crate::lease::{Lease, LeaseError};
use crate::plan::{MigrationPlan, PlanAction, Planner};
use crate::retry::with_retry;
use crate::status::{
    MigrationState, MigrationStatus, MigrationStepResult, StatusPublisher, StepStatus,
    TransformFailure,
};
use crate::transform::{DocumentMigrator, MigratedDocument, TransformError};
use soma_core::{Clock, IndexMapping, SavedObject, TypeRegistry};
use soma_store::{CreateOutcome, Cursor, IndexClient, SwapOutcome};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::Instrument;

/// Alias conflicts and holder takeovers re-enter planning at most this
/// many times before the run is abandoned
const MAX_REPLANS: u32 = 5;

enum PerformOutcome {
    Done(MigrationStepResult),
    /// The alias advanced underneath us; the caller should re-plan
    AliasMoved,
}

enum WaitOutcome {
    Adopted(MigrationStepResult),
    /// The lock vanished without a swap; the waiter takes over
    TakeOver,
}

/// Runs migrations for one saved-object collection
pub struct Migrator<C: IndexClient, K: Clock> {
    client: C,
    clock: K,
    registry: Arc<TypeRegistry>,
    config: MigrationConfig,
    transformer: DocumentMigrator,
    status: StatusPublisher,
}

impl<C: IndexClient, K: Clock> Migrator<C, K> {
    pub fn new(client: C, clock: K, registry: Arc<TypeRegistry>, config: MigrationConfig) -> Self {
        Self {
            client,
            clock,
            transformer: DocumentMigrator::new(Arc::clone(&registry)),
            registry,
            config,
            status: StatusPublisher::new(),
        }
    }

    /// Current status snapshot
    pub fn status(&self) -> MigrationStatus {
        self.status.get()
    }

    /// Receive every status transition, in order
    pub fn subscribe(&self) -> broadcast::Receiver<MigrationStatus> {
        self.status.subscribe()
    }

    /// Upgrade a single stale document on the read path
    pub fn migrate_document(&self, doc: &SavedObject) -> Result<MigratedDocument, TransformError> {
        self.transformer.migrate(doc)
    }

    /// The merged mapping the collection serves after migration
    pub fn active_mappings(&self) -> Result<IndexMapping, MigrationError> {
        Ok(self.planner().merged()?.0)
    }

    /// Run the migration to completion.
    ///
    /// Safe to call again after success: the recorded result is returned
    /// without touching the store. A failed run leaves the process
    /// unreadied; the error carries the index and cause.
    pub async fn run_migrations(&self) -> Result<Vec<MigrationStepResult>, MigrationError> {
        let current = self.status.get();
        if current.state == MigrationState::Completed {
            return Ok(current.result.unwrap_or_default());
        }
        self.status.transition(MigrationStatus::running())?;

        let span = tracing::info_span!("migration", collection = %self.config.collection);
        let started = self.clock.epoch_ms();

        match self.run_inner(started).instrument(span).await {
            Ok(steps) => {
                tracing::info!(
                    elapsed_ms = self.clock.epoch_ms().saturating_sub(started),
                    steps = steps.len(),
                    "migration completed"
                );
                self.status
                    .transition(MigrationStatus::completed(steps.clone()))?;
                Ok(steps)
            }
            Err(err) => {
                tracing::error!(error = %err, "migration failed");
                // The first transition error wins; a publish failure here
                // cannot mask the migration failure
                let _ = self
                    .status
                    .transition(MigrationStatus::failed(err.to_string()));
                Err(err)
            }
        }
    }

    fn planner(&self) -> Planner<C> {
        Planner::new(
            self.client.clone(),
            Arc::clone(&self.registry),
            self.config.collection.clone(),
        )
    }

    async fn run_inner(&self, started: u64) -> Result<Vec<MigrationStepResult>, MigrationError> {
        let planner = self.planner();
        let (mapping, hash) = planner.merged()?;
        let mut last_target = String::new();

        for _ in 0..MAX_REPLANS {
            let plan = with_retry(&self.config, "plan", || planner.survey(&mapping, &hash)).await?;
            tracing::info!(
                action = ?plan.action,
                source = ?plan.source_index,
                target = %plan.target_index,
                "planned"
            );
            last_target = plan.target_index.clone();

            match plan.action {
                PlanAction::Skip => {
                    let index = plan
                        .source_index
                        .clone()
                        .unwrap_or_else(|| plan.target_index.clone());
                    return Ok(vec![self.step(
                        StepStatus::Skipped,
                        plan.source_index.clone(),
                        index,
                        started,
                    )]);
                }
                PlanAction::Patch => return Ok(vec![self.patch(&plan, started).await?]),
                PlanAction::Migrate => {}
            }

            match Lease::acquire(
                self.client.clone(),
                self.clock.clone(),
                &self.config.lock_name(),
                self.config.lease_ttl,
            )
            .await
            {
                Ok(lease) => {
                    let lease = Arc::new(lease);
                    let heartbeat = self.spawn_heartbeat(Arc::clone(&lease));
                    let outcome = self.perform(&plan, started).await;
                    heartbeat.abort();
                    if let Err(err) = lease.release().await {
                        tracing::warn!(error = %err, "failed to release migration lock");
                    }
                    match outcome? {
                        PerformOutcome::Done(step) => return Ok(vec![step]),
                        PerformOutcome::AliasMoved => continue,
                    }
                }
                Err(LeaseError::Held(_)) => match self.wait_for_holder(&plan, started).await? {
                    WaitOutcome::Adopted(step) => return Ok(vec![step]),
                    WaitOutcome::TakeOver => continue,
                },
                Err(err) => return Err(err.into()),
            }
        }

        Err(MigrationError::AliasConflict {
            alias: self.config.collection.clone(),
            target: last_target,
        })
    }

    /// Create → reindex → alias swap, holding the lease
    async fn perform(
        &self,
        plan: &MigrationPlan,
        started: u64,
    ) -> Result<PerformOutcome, MigrationError> {
        let created = with_retry(&self.config, "create_index", || {
            self.client
                .create_index(&plan.target_index, &plan.merged_mapping)
        })
        .await?;
        if created == CreateOutcome::AlreadyExists {
            // Someone else may have built this generation while we were
            // acquiring the lock; never write into an index that already
            // serves readers
            let current = with_retry(&self.config, "get_alias", || {
                self.client.get_alias(&self.config.collection)
            })
            .await?;
            if current.as_deref() == Some(plan.target_index.as_str()) {
                tracing::info!(
                    target = %plan.target_index,
                    "target generation already serves the alias, adopting"
                );
                return Ok(PerformOutcome::Done(self.step(
                    StepStatus::Migrated,
                    plan.source_index.clone(),
                    plan.target_index.clone(),
                    started,
                )));
            }
            if current != plan.source_index {
                tracing::warn!(
                    alias = %self.config.collection,
                    "alias moved while acquiring the lock, re-planning"
                );
                return Ok(PerformOutcome::AliasMoved);
            }
            // Alias unchanged: a crashed holder left the target behind.
            // Writes are id-preserving, so resuming overwrites cleanly.
            tracing::info!(index = %plan.target_index, "target index already exists, resuming");
        }

        let transform_errors = match &plan.source_index {
            Some(source) => self.reindex(source, &plan.target_index).await?,
            None => Vec::new(),
        };

        let swapped = with_retry(&self.config, "swap_alias", || {
            self.client.swap_alias(
                &self.config.collection,
                plan.source_index.as_deref(),
                &plan.target_index,
            )
        })
        .await?;

        match swapped {
            SwapOutcome::Swapped => {
                tracing::info!(
                    source = ?plan.source_index,
                    target = %plan.target_index,
                    "alias swapped"
                );
                let mut step = self.step(
                    StepStatus::Migrated,
                    plan.source_index.clone(),
                    plan.target_index.clone(),
                    started,
                );
                step.transform_errors = transform_errors;
                Ok(PerformOutcome::Done(step))
            }
            SwapOutcome::Conflict => {
                tracing::warn!(
                    alias = %self.config.collection,
                    target = %plan.target_index,
                    "alias advanced underneath the migration, re-planning"
                );
                Ok(PerformOutcome::AliasMoved)
            }
        }
    }

    /// Stream the source through the transformer into the target.
    ///
    /// The next batch is fetched only after the previous batch's writes
    /// acknowledge. A document whose transform fails is carried into the
    /// target unchanged and reported in the returned list; more failures
    /// than the configured threshold abort the run instead.
    async fn reindex(
        &self,
        source: &str,
        target: &str,
    ) -> Result<Vec<TransformFailure>, MigrationError> {
        let mut cursor: Option<Cursor> = None;
        let mut failures: Vec<TransformFailure> = Vec::new();
        let mut total = 0usize;

        loop {
            let batch = with_retry(&self.config, "fetch_batch", || {
                self.client
                    .fetch_batch(source, cursor.clone(), self.config.batch_size)
            })
            .await?;

            let mut out = Vec::with_capacity(batch.docs.len());
            for doc in &batch.docs {
                match self.transformer.migrate(doc) {
                    Ok(migrated) => out.push(migrated.doc),
                    Err(err) => {
                        tracing::warn!(
                            id = %doc.id,
                            error = %err,
                            "document transform failed, carrying the original"
                        );
                        failures.push(TransformFailure {
                            id: doc.id.clone(),
                            error: err.to_string(),
                        });
                        if failures.len() as u32 > self.config.failure_threshold {
                            let first = &failures[0];
                            return Err(MigrationError::TransformFailures {
                                index: source.to_string(),
                                failures: failures.len() as u32,
                                threshold: self.config.failure_threshold,
                                first: format!("{}: {}", first.id, first.error),
                            });
                        }
                        // Never dropped: the untransformed original stays
                        // in the collection and stays flagged as outdated
                        out.push(doc.clone());
                    }
                }
            }

            if !out.is_empty() {
                with_retry(&self.config, "bulk_write", || {
                    self.client.bulk_write(target, &out)
                })
                .await?;
            }
            total += out.len();

            match batch.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        if !failures.is_empty() {
            tracing::warn!(
                source,
                count = failures.len(),
                threshold = self.config.failure_threshold,
                "reindex completed with tolerated transform failures"
            );
        }
        tracing::info!(source, target, total, "reindex complete");
        Ok(failures)
    }

    /// Patch the live index's mapping in place (additive change, no
    /// outdated documents)
    async fn patch(
        &self,
        plan: &MigrationPlan,
        started: u64,
    ) -> Result<MigrationStepResult, MigrationError> {
        let index = plan
            .source_index
            .clone()
            .unwrap_or_else(|| plan.target_index.clone());
        with_retry(&self.config, "put_mapping", || {
            self.client.put_mapping(&index, &plan.merged_mapping)
        })
        .await?;
        tracing::info!(index = %index, "mapping patched in place");
        Ok(self.step(
            StepStatus::Patched,
            plan.source_index.clone(),
            index,
            started,
        ))
    }

    /// Poll while another process holds the lock; adopt its swap or take
    /// over if it disappears without one
    async fn wait_for_holder(
        &self,
        plan: &MigrationPlan,
        started: u64,
    ) -> Result<WaitOutcome, MigrationError> {
        let lock = self.config.lock_name();
        tracing::info!(lock = %lock, "another process is migrating, waiting for its result");

        for _ in 0..self.config.poll_budget {
            tokio::time::sleep(self.config.poll_interval).await;

            if let Some(step) = self.observe_swap(plan, started).await? {
                return Ok(WaitOutcome::Adopted(step));
            }

            let marker = with_retry(&self.config, "read_marker", || {
                self.client.read_marker(&lock)
            })
            .await?;
            match marker {
                None => {
                    // The swap precedes the release, so look once more
                    // before concluding the holder died without finishing
                    if let Some(step) = self.observe_swap(plan, started).await? {
                        return Ok(WaitOutcome::Adopted(step));
                    }
                    tracing::info!(lock = %lock, "lock released without a swap, re-planning");
                    return Ok(WaitOutcome::TakeOver);
                }
                Some(body) => {
                    // A crashed holder stops renewing; once its lease runs
                    // out the waiter re-plans and reclaims via acquire
                    if crate::lease::marker_expired(&body, self.clock.epoch_ms()) {
                        if let Some(step) = self.observe_swap(plan, started).await? {
                            return Ok(WaitOutcome::Adopted(step));
                        }
                        tracing::warn!(lock = %lock, "lock holder's lease expired, taking over");
                        return Ok(WaitOutcome::TakeOver);
                    }
                }
            }
        }

        Err(MigrationError::LockWaitTimeout {
            collection: self.config.collection.clone(),
        })
    }

    async fn observe_swap(
        &self,
        plan: &MigrationPlan,
        started: u64,
    ) -> Result<Option<MigrationStepResult>, MigrationError> {
        let current = with_retry(&self.config, "get_alias", || {
            self.client.get_alias(&self.config.collection)
        })
        .await?;
        if current.as_deref() == Some(plan.target_index.as_str()) {
            tracing::info!(target = %plan.target_index, "adopting the lock holder's result");
            return Ok(Some(self.step(
                StepStatus::Migrated,
                plan.source_index.clone(),
                plan.target_index.clone(),
                started,
            )));
        }
        Ok(None)
    }

    fn spawn_heartbeat(&self, lease: Arc<Lease<C, K>>) -> tokio::task::JoinHandle<()> {
        let interval = lease.heartbeat_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = lease.renew().await {
                    tracing::warn!(error = %err, "lease renewal failed, stopping heartbeat");
                    break;
                }
            }
        })
    }

    fn step(
        &self,
        status: StepStatus,
        source_index: Option<String>,
        dest_index: String,
        started: u64,
    ) -> MigrationStepResult {
        MigrationStepResult {
            status,
            source_index,
            dest_index,
            elapsed_ms: self.clock.epoch_ms().saturating_sub(started),
            transform_errors: Vec::new(),
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
