// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed migration lock as a renewable lease.
//!
//! The lock is an exclusively-created marker document in the store itself,
//! so no external lock service is involved. The body carries the owner id
//! and an expiry; a holder renews on a heartbeat, and a marker whose
//! expiry has passed is reclaimable by any waiter (crashed holders do not
//! block the cluster forever).

use serde::{Deserialize, Serialize};
use soma_core::Clock;
use soma_store::{CreateOutcome, IndexClient, StoreError};
use std::time::Duration;
use thiserror::Error;

/// Errors from lease operations
#[derive(Debug, Error)]
pub enum LeaseError {
    #[error("migration lock '{0}' is held by another process")]
    Held(String),
    #[error("migration lock '{0}' was taken over by another process")]
    Lost(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize, Deserialize)]
struct LeaseBody {
    owner: String,
    expires_at: u64,
}

/// Whether a stored marker body's lease has run out at `now_ms`.
///
/// A body that does not parse counts as expired: it cannot be renewed by
/// anyone, so waiting on it would block forever.
pub(crate) fn marker_expired(body: &serde_json::Value, now_ms: u64) -> bool {
    serde_json::from_value::<LeaseBody>(body.clone()).map_or(true, |b| now_ms >= b.expires_at)
}

/// An acquired, renewable lease on the migration lock
#[derive(Debug)]
pub struct Lease<C: IndexClient, K: Clock> {
    client: C,
    clock: K,
    name: String,
    owner: String,
    ttl: Duration,
}

impl<C: IndexClient, K: Clock> Lease<C, K> {
    /// Try to acquire the lock named `name`.
    ///
    /// An existing marker whose expiry has passed is deleted and the
    /// acquisition retried once; a live marker yields `LeaseError::Held`.
    pub async fn acquire(
        client: C,
        clock: K,
        name: &str,
        ttl: Duration,
    ) -> Result<Self, LeaseError> {
        let owner = uuid::Uuid::new_v4().to_string();
        let lease = Self {
            client,
            clock,
            name: name.to_string(),
            owner,
            ttl,
        };

        if lease.try_create().await? == CreateOutcome::Created {
            return Ok(lease);
        }

        match lease.client.read_marker(&lease.name).await? {
            Some(raw) => {
                let body: LeaseBody = serde_json::from_value(raw).map_err(StoreError::from)?;
                if lease.clock.epoch_ms() < body.expires_at {
                    return Err(LeaseError::Held(lease.name));
                }
                tracing::warn!(
                    lock = %lease.name,
                    stale_owner = %body.owner,
                    "reclaiming expired migration lock"
                );
                lease.client.delete_marker(&lease.name).await?;
            }
            // Holder released between create and read; retry below
            None => {}
        }

        if lease.try_create().await? == CreateOutcome::Created {
            Ok(lease)
        } else {
            Err(LeaseError::Held(lease.name))
        }
    }

    async fn try_create(&self) -> Result<CreateOutcome, StoreError> {
        let body = serde_json::to_value(LeaseBody {
            owner: self.owner.clone(),
            expires_at: self.clock.epoch_ms() + self.ttl.as_millis() as u64,
        })?;
        self.client.create_marker(&self.name, &body).await
    }

    /// Extend the lease by another TTL from now.
    ///
    /// Fails with `Lost` if the marker no longer names this owner (a
    /// waiter reclaimed it after an expiry).
    pub async fn renew(&self) -> Result<(), LeaseError> {
        match self.client.read_marker(&self.name).await? {
            Some(raw) => {
                let body: LeaseBody = serde_json::from_value(raw).map_err(StoreError::from)?;
                if body.owner != self.owner {
                    return Err(LeaseError::Lost(self.name.clone()));
                }
            }
            None => return Err(LeaseError::Lost(self.name.clone())),
        }
        let body = serde_json::to_value(LeaseBody {
            owner: self.owner.clone(),
            expires_at: self.clock.epoch_ms() + self.ttl.as_millis() as u64,
        })
        .map_err(StoreError::from)?;
        self.client.put_marker(&self.name, &body).await?;
        Ok(())
    }

    /// Drop the lock so waiters can proceed
    pub async fn release(&self) -> Result<(), LeaseError> {
        self.client.delete_marker(&self.name).await?;
        Ok(())
    }

    /// Interval at which the holder should renew
    pub fn heartbeat_interval(&self) -> Duration {
        self.ttl / 3
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
