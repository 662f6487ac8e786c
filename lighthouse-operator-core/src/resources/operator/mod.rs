//! The lighthouse operator's own workload, installed by `lighthouse-ctl`.

use std::time::Duration;

use kube::{api::PatchParams, core::ObjectMeta, Client};
use log::info;
use thiserror::Error;

use crate::kubernetes::{
    deployment::wait_for_deployment_ready,
    operations::{converge_resource, OperationError},
    poll::{PollConfig, PollError},
};

use super::labels::get_operator_labels;

pub mod deployment;
pub mod rbac;

pub const DEFAULT_OPERATOR_NAME: &str = "lighthouse-operator";
pub const DEFAULT_OPERATOR_NAMESPACE: &str = "submariner-operator";

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Couldn't apply '{}' operator deployment! Reason: {}", .0, .1)]
    Apply(String, OperationError),
    #[error("Couldn't check '{}' operator deployment readiness! Reason: {}", .0, .1)]
    Check(String, OperationError),
    #[error("'{}/{}' operator deployment didn't become ready within {:?}!", .namespace, .name, .timeout)]
    Timeout {
        namespace: String,
        name: String,
        timeout: Duration,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorRelease {
    pub namespace: String,
    pub name: String,
    pub image: String,
    pub debug: bool,
}

impl OperatorRelease {
    pub fn generate_metadata(&self) -> ObjectMeta {
        ObjectMeta {
            labels: Some(get_operator_labels(&self.name)),
            namespace: Some(self.namespace.to_owned()),
            name: Some(self.name.to_owned()),
            ..Default::default()
        }
    }

    pub fn generate_clusterwide_metadata(&self) -> ObjectMeta {
        ObjectMeta {
            labels: Some(get_operator_labels(&self.name)),
            name: Some(self.name.to_owned()),
            ..Default::default()
        }
    }

    /// Creates or updates the operator deployment, returning `true` when it
    /// didn't exist before.
    pub async fn ensure(
        &self,
        client: &Client,
        patch_params: &PatchParams,
    ) -> Result<bool, BootstrapError> {
        let deployment = self.generate_operator_deployment();
        let outcome = converge_resource(client, &deployment, patch_params)
            .await
            .map_err(|e| BootstrapError::Apply(self.name.to_owned(), e))?;

        if outcome.is_created() {
            info!("Created '{}/{}' operator deployment", self.namespace, self.name);
        } else if outcome.is_changed() {
            info!("Updated '{}/{}' operator deployment", self.namespace, self.name);
        } else {
            info!("'{}/{}' operator deployment is up to date", self.namespace, self.name);
        }

        Ok(outcome.is_created())
    }

    pub async fn wait_until_ready(
        &self,
        client: &Client,
        poll: &PollConfig,
    ) -> Result<(), BootstrapError> {
        wait_for_deployment_ready(client, &self.name, &self.namespace, poll)
            .await
            .map_err(|error| self.map_poll_error(error))?;

        info!("'{}/{}' operator deployment is ready", self.namespace, self.name);

        Ok(())
    }

    /// Ensure followed by the readiness wait.
    pub async fn ensure_ready(
        &self,
        client: &Client,
        patch_params: &PatchParams,
        poll: &PollConfig,
    ) -> Result<bool, BootstrapError> {
        let created = self.ensure(client, patch_params).await?;
        self.wait_until_ready(client, poll).await?;

        Ok(created)
    }

    fn map_poll_error(&self, error: PollError<OperationError>) -> BootstrapError {
        match error {
            PollError::Timeout(timeout) => BootstrapError::Timeout {
                namespace: self.namespace.to_owned(),
                name: self.name.to_owned(),
                timeout,
            },
            PollError::Check(error) => BootstrapError::Check(self.name.to_owned(), error),
        }
    }
}
