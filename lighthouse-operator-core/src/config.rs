use std::{borrow::Cow, env::var, num::ParseIntError};

use thiserror::Error;

use crate::{dns::CorednsTarget, kubernetes::transaction::ConflictRetry};

pub const WATCH_NAMESPACE_ENV: &str = "WATCH_NAMESPACE";
pub const POD_NAME_ENV: &str = "POD_NAME";
pub const OPERATOR_NAME_ENV: &str = "OPERATOR_NAME";
pub const COREDNS_NAMESPACE_ENV: &str = "LIGHTHOUSE_COREDNS_NAMESPACE";
pub const COREDNS_CONFIGMAP_ENV: &str = "LIGHTHOUSE_COREDNS_CONFIGMAP";
pub const CONFLICT_RETRIES_ENV: &str = "LIGHTHOUSE_CONFLICT_RETRIES";

/// Runtime configuration of the operator daemon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatorConfig {
    /// namespace the controller is restricted to, `None` means all namespaces
    pub watch_namespace: Option<String>,
    pub pod_name: Option<String>,
    pub coredns: CorednsTarget,
    pub conflict_retry: ConflictRetry,
}

#[derive(Debug, Error, PartialEq)]
pub enum FromEnvError {
    #[error("Env var {} contains an invalid number: {}", .0, .1)]
    InvalidNumber(Cow<'static, str>, ParseIntError),
    #[error("Env var {} must be greater than zero!", .0)]
    NotPositive(Cow<'static, str>),
}

impl OperatorConfig {
    pub fn from_env() -> Result<Self, FromEnvError> {
        Self::from_lookup(|key| var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, FromEnvError> {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let conflict_retry = match non_empty(CONFLICT_RETRIES_ENV) {
            Some(raw) => {
                let attempts = raw
                    .trim()
                    .parse::<u32>()
                    .map_err(|err| FromEnvError::InvalidNumber(CONFLICT_RETRIES_ENV.into(), err))?;

                if attempts == 0 {
                    return Err(FromEnvError::NotPositive(CONFLICT_RETRIES_ENV.into()));
                }

                ConflictRetry {
                    max_attempts: attempts,
                    ..defaults.conflict_retry
                }
            }
            None => defaults.conflict_retry,
        };

        Ok(Self {
            watch_namespace: non_empty(WATCH_NAMESPACE_ENV),
            pod_name: non_empty(POD_NAME_ENV),
            coredns: CorednsTarget {
                namespace: non_empty(COREDNS_NAMESPACE_ENV).unwrap_or(defaults.coredns.namespace),
                name: non_empty(COREDNS_CONFIGMAP_ENV).unwrap_or(defaults.coredns.name),
            },
            conflict_retry,
        })
    }

    /// Name this operator instance is reported under, the pod name when running
    /// in-cluster.
    pub fn instance_name(&self) -> &str {
        self.pod_name.as_deref().unwrap_or(crate::OPERATOR_FIELD_MANAGER)
    }
}
