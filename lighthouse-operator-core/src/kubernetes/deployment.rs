use k8s_openapi::api::apps::v1::Deployment;
use kube::Client;
use log::info;

use super::{
    operations::{try_get_resource, OperationError},
    poll::{poll_until, PollConfig, PollError},
};

/// A deployment is ready once the controller has observed its latest
/// generation and rolled out as many updated and ready replicas as it requests.
/// An unset replica count defaults to 1, as it does on the API server.
pub fn is_deployment_ready(deployment: &Deployment) -> bool {
    let Some(status) = deployment.status.as_ref() else {
        return false;
    };
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(1);

    let observed = match deployment.metadata.generation {
        Some(generation) => status.observed_generation.unwrap_or(0) >= generation,
        None => true,
    };

    observed
        && status.updated_replicas.unwrap_or(0) >= desired
        && status.ready_replicas.unwrap_or(0) >= desired
}

pub async fn wait_for_deployment_ready(
    client: &Client,
    name: &str,
    namespace: &str,
    config: &PollConfig,
) -> Result<(), PollError<OperationError>> {
    info!("Waiting up to {:?} for '{namespace}/{name}' deployment to be ready...", config.timeout);

    poll_until(config, || async move {
        try_get_resource::<Deployment>(client, name, namespace)
            .await
            .map(|deployment| deployment.as_ref().map(is_deployment_ready).unwrap_or(false))
            .map_err(OperationError::KubeApiError)
    })
    .await
}
