//! Everything the reconciler needs from the cluster, behind one seam.

use async_trait::async_trait;
use k8s_openapi::api::{
    apps::v1::Deployment,
    core::v1::{ConfigMap, Service},
};
use kube::{
    api::{DeleteParams, PatchParams, PostParams},
    Api, Client,
};
use lighthouse_operator_core::{
    config::OperatorConfig,
    dns::{patch_coredns, CorednsPatchError, CorednsTarget},
    helpers::RequireMetadata,
    kubernetes::{
        operations::{
            converge_resource, delete_resources_by_labels, try_get_resource, ApplyOutcome,
            OperationError,
        },
        transaction::{ConflictRetry, UpdateOutcome},
    },
    resources::{
        crd::v1alpha1::servicediscovery::ServiceDiscovery, labels::get_lighthouse_listparams,
        lighthouse::AGENT_NAME,
    },
    OPERATOR_FIELD_MANAGER,
};
#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait LighthouseCluster: Send + Sync {
    async fn get_service_discovery(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<ServiceDiscovery>, kube::Error>;

    async fn converge_deployment(&self, deployment: &Deployment)
        -> Result<ApplyOutcome, OperationError>;

    async fn converge_configmap(&self, configmap: &ConfigMap)
        -> Result<ApplyOutcome, OperationError>;

    async fn service_exists(&self, name: &str, namespace: &str) -> Result<bool, kube::Error>;

    async fn create_service(&self, service: &Service) -> Result<(), OperationError>;

    /// Returns how many agent deployments were removed.
    async fn delete_agent_deployments(&self, namespace: &str) -> Result<usize, OperationError>;

    async fn patch_coredns(
        &self,
        resolver_name: &str,
        resolver_namespace: &str,
    ) -> Result<UpdateOutcome, CorednsPatchError>;
}

pub struct KubeCluster {
    client: Client,
    coredns: CorednsTarget,
    conflict_retry: ConflictRetry,
    patch_params: PatchParams,
}

impl KubeCluster {
    pub fn new(client: Client, config: &OperatorConfig) -> Self {
        Self {
            client,
            coredns: config.coredns.to_owned(),
            conflict_retry: config.conflict_retry,
            patch_params: PatchParams::apply(OPERATOR_FIELD_MANAGER).force(),
        }
    }
}

#[async_trait]
impl LighthouseCluster for KubeCluster {
    async fn get_service_discovery(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<ServiceDiscovery>, kube::Error> {
        try_get_resource(&self.client, name, namespace).await
    }

    async fn converge_deployment(
        &self,
        deployment: &Deployment,
    ) -> Result<ApplyOutcome, OperationError> {
        converge_resource(&self.client, deployment, &self.patch_params).await
    }

    async fn converge_configmap(
        &self,
        configmap: &ConfigMap,
    ) -> Result<ApplyOutcome, OperationError> {
        converge_resource(&self.client, configmap, &self.patch_params).await
    }

    async fn service_exists(&self, name: &str, namespace: &str) -> Result<bool, kube::Error> {
        Ok(try_get_resource::<Service>(&self.client, name, namespace)
            .await?
            .is_some())
    }

    async fn create_service(&self, service: &Service) -> Result<(), OperationError> {
        let namespace = service.require_namespace_or(OperationError::MissingMetadata("Service"))?;
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);

        api.create(&PostParams::default(), service)
            .await
            .map_err(OperationError::KubeApiError)?;

        Ok(())
    }

    async fn delete_agent_deployments(&self, namespace: &str) -> Result<usize, OperationError> {
        delete_resources_by_labels::<Deployment>(
            &self.client,
            namespace,
            &get_lighthouse_listparams(AGENT_NAME),
            &DeleteParams::default(),
        )
        .await
    }

    async fn patch_coredns(
        &self,
        resolver_name: &str,
        resolver_namespace: &str,
    ) -> Result<UpdateOutcome, CorednsPatchError> {
        patch_coredns(
            &self.client,
            &self.coredns,
            resolver_name,
            resolver_namespace,
            &self.conflict_retry,
        )
        .await
    }
}
