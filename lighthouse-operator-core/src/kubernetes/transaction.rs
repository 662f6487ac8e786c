//! Read-modify-write transactions over resources owned by someone else.
//!
//! A [`GuardedUpdate`] is executed against a [`VersionedStore`] by
//! [`run_guarded_update`]: the current value is read, checked for prior
//! application, the dependency needed to compute the new value is resolved,
//! the value is checked again and finally written back conditioned on the
//! version that was read. A conflicting write restarts the whole attempt from
//! a fresh read, up to [`ConflictRetry::max_attempts`] times.

use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use log::{debug, warn};
use thiserror::Error;

pub const DEFAULT_CONFLICT_ATTEMPTS: u32 = 5;
pub const DEFAULT_CONFLICT_DELAY: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictRetry {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ConflictRetry {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_CONFLICT_ATTEMPTS,
            delay: DEFAULT_CONFLICT_DELAY,
        }
    }
}

/// A value together with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: Option<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("The resource was modified concurrently!")]
    Conflict,
    #[error("Couldn't access the resource! Reason: {}", .0)]
    KubeApiError(kube::Error),
}

impl StoreError {
    pub fn from_kube(error: kube::Error) -> Self {
        match error {
            kube::Error::Api(response) if response.code == 409 => StoreError::Conflict,
            error => StoreError::KubeApiError(error),
        }
    }
}

#[async_trait]
pub trait VersionedStore: Send + Sync {
    type Value: Send + Sync;

    async fn load(&self) -> Result<Versioned<Self::Value>, StoreError>;

    /// Writes `update.value`, failing with [`StoreError::Conflict`] when the
    /// stored version no longer matches `update.version`.
    async fn store(&self, update: Versioned<Self::Value>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait GuardedUpdate: Send + Sync {
    type Value: Send + Sync;
    type Dependency: Send;
    type Error: Debug + Send;

    /// Checked right after reading, before the dependency is resolved.
    fn is_applied(&self, current: &Self::Value) -> bool;

    async fn resolve_dependency(&self) -> Result<Self::Dependency, Self::Error>;

    /// Checked after the dependency is resolved, just before writing.
    fn is_partially_applied(&self, current: &Self::Value) -> bool {
        self.is_applied(current)
    }

    fn apply(&self, current: Self::Value, dependency: Self::Dependency) -> Self::Value;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    AlreadyApplied,
    Updated,
}

#[derive(Debug, Error)]
pub enum TransactionError<E: Debug> {
    #[error("{}", .0)]
    Store(StoreError),
    #[error("Couldn't resolve the update dependency! Reason: {:?}", .0)]
    Dependency(E),
    #[error("The resource kept being modified concurrently, gave up after {} attempts!", .0)]
    ConflictRetriesExhausted(u32),
}

pub async fn run_guarded_update<S, U>(
    store: &S,
    update: &U,
    retry: &ConflictRetry,
) -> Result<UpdateOutcome, TransactionError<U::Error>>
where
    S: VersionedStore + ?Sized,
    U: GuardedUpdate<Value = S::Value> + ?Sized,
{
    let attempts = retry.max_attempts.max(1);

    for attempt in 1..=attempts {
        let current = store.load().await.map_err(TransactionError::Store)?;

        if update.is_applied(&current.value) {
            debug!("Update is already applied, nothing to do");
            return Ok(UpdateOutcome::AlreadyApplied);
        }

        let dependency = update
            .resolve_dependency()
            .await
            .map_err(TransactionError::Dependency)?;

        if update.is_partially_applied(&current.value) {
            debug!("Update was already partially applied, nothing to do");
            return Ok(UpdateOutcome::AlreadyApplied);
        }

        let updated = Versioned {
            value: update.apply(current.value, dependency),
            version: current.version,
        };

        match store.store(updated).await {
            Ok(()) => return Ok(UpdateOutcome::Updated),
            Err(StoreError::Conflict) => {
                warn!("Conflicting write detected (attempt {attempt}/{attempts}), retrying...");
                tokio::time::sleep(retry.delay).await;
            }
            Err(error) => return Err(TransactionError::Store(error)),
        }
    }

    Err(TransactionError::ConflictRetriesExhausted(attempts))
}
