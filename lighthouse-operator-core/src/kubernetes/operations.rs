use std::fmt::Debug;

use anyhow::{anyhow, Context};
use k8s_openapi::{
    api::core::v1::Namespace,
    apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition,
    serde::{de::DeserializeOwned, Serialize},
    ClusterResourceScope, NamespaceResourceScope,
};
use kube::{
    api::{DeleteParams, ListParams, Patch, PatchParams},
    config::{KubeConfigOptions, Kubeconfig},
    core::ObjectMeta,
    Api, Client, Config, Resource,
};
use log::{debug, info};
use thiserror::Error;

use crate::helpers::{pretty_type_name, RequireMetadata};

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("{} resource is missing a name or a namespace!", .0)]
    MissingMetadata(&'static str),
    #[error("Kubernetes API call failed! Reason: {}", .0)]
    KubeApiError(kube::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Updated,
    Unchanged,
}

impl ApplyOutcome {
    pub fn is_changed(&self) -> bool {
        !matches!(self, ApplyOutcome::Unchanged)
    }

    pub fn is_created(&self) -> bool {
        matches!(self, ApplyOutcome::Created)
    }
}

pub async fn create_local_client(
    config_path: &Option<String>,
    context_name: &Option<String>,
) -> anyhow::Result<Client> {
    let config_options = KubeConfigOptions {
        context: context_name.to_owned(),
        ..Default::default()
    };

    let config = match config_path {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)?;
            Config::from_custom_kubeconfig(kubeconfig, &config_options).await?
        }
        None => Config::from_kubeconfig(&config_options).await?,
    };

    let client = Client::try_from(config)?;

    Ok(client)
}

pub async fn create_namespace_if_not_exists(
    client: &Client,
    patch_params: &PatchParams,
    name: &str,
) -> anyhow::Result<()> {
    let namespace_api: Api<Namespace> = Api::all(client.clone());
    let namespace = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            ..Default::default()
        },
        ..Default::default()
    };

    info!("Ensuring namespace '{}' is created...", name);
    namespace_api
        .patch(name, patch_params, &Patch::Apply(namespace))
        .await?;

    Ok(())
}

pub async fn create_cluster_resource<T>(
    client: &Client,
    resource: &T,
    patch_params: &PatchParams,
) -> anyhow::Result<()>
where
    T: Resource<Scope = ClusterResourceScope, DynamicType = ()>
        + Serialize
        + Clone
        + DeserializeOwned
        + Debug,
{
    let resource_name = resource
        .require_name_or_else(|| anyhow!("{} is missing a name!", pretty_type_name::<T>()))?;

    info!(
        "Creating '{resource_name}' {} resource on the cluster...",
        pretty_type_name::<T>()
    );

    let resource_api: Api<T> = Api::all(client.clone());
    resource_api
        .patch(resource_name, patch_params, &Patch::Apply(resource))
        .await
        .context(format!(
            "Unable to create '{resource_name}' {} resource!",
            pretty_type_name::<T>()
        ))?;

    Ok(())
}

pub async fn create_crd(
    client: &Client,
    crd: &CustomResourceDefinition,
    patch_params: &PatchParams,
) -> anyhow::Result<()> {
    let crd_name = crd
        .metadata
        .name
        .as_ref()
        .ok_or_else(|| anyhow!("CRD is missing a name!"))?;
    let crd_apiversions = crd
        .spec
        .versions
        .iter()
        .map(|version| version.name.as_str())
        .collect::<Vec<&str>>()
        .join(", ");

    info!("Creating {crd_name} ({crd_apiversions}) CRD...");

    let crd_api: Api<CustomResourceDefinition> = Api::all(client.clone());
    crd_api
        .patch(crd_name, patch_params, &Patch::Apply(crd))
        .await
        .context(format!(
            "Unable to create {crd_name} ({crd_apiversions}) CRD!"
        ))?;

    Ok(())
}

pub async fn try_get_resource<T>(
    client: &Client,
    name: &str,
    namespace: &str,
) -> Result<Option<T>, kube::Error>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()> + Clone + DeserializeOwned + Debug,
{
    let api: Api<T> = Api::namespaced(client.clone(), namespace);

    api.get_opt(name).await
}

/// Server-side applies `resource`, creating it if it doesn't exist. The outcome
/// reports whether the object had to be created or its resource version moved.
pub async fn converge_resource<T>(
    client: &Client,
    resource: &T,
    patch_params: &PatchParams,
) -> Result<ApplyOutcome, OperationError>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Serialize
        + Clone
        + DeserializeOwned
        + Debug,
{
    let type_name = pretty_type_name::<T>();
    let name = resource.require_name_or_else(|| OperationError::MissingMetadata(type_name))?;
    let namespace =
        resource.require_namespace_or_else(|| OperationError::MissingMetadata(type_name))?;

    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    let previous_version = api
        .get_opt(name)
        .await
        .map_err(OperationError::KubeApiError)?
        .map(|existing| existing.meta().resource_version.clone());

    let applied = api
        .patch(name, patch_params, &Patch::Apply(resource))
        .await
        .map_err(OperationError::KubeApiError)?;

    let outcome = get_apply_outcome(
        previous_version.as_ref().map(Option::as_deref),
        applied.meta().resource_version.as_deref(),
    );

    debug!("{type_name} '{namespace}/{name}' converged: {outcome:?}");

    Ok(outcome)
}

/// `previous` is `None` when the object didn't exist before applying, and
/// carries its resource version otherwise.
pub fn get_apply_outcome(previous: Option<Option<&str>>, applied: Option<&str>) -> ApplyOutcome {
    match previous {
        None => ApplyOutcome::Created,
        Some(version) if version != applied => ApplyOutcome::Updated,
        Some(_) => ApplyOutcome::Unchanged,
    }
}

/// Deletes every resource matching `list_params` in `namespace`, returning how
/// many were removed. Nothing matching is not an error.
pub async fn delete_resources_by_labels<T>(
    client: &Client,
    namespace: &str,
    list_params: &ListParams,
    delete_params: &DeleteParams,
) -> Result<usize, OperationError>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()> + Clone + DeserializeOwned + Debug,
{
    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    let removed = api
        .delete_collection(delete_params, list_params)
        .await
        .map_err(OperationError::KubeApiError)?
        .either(|list| list.items.len(), |_status| 0);

    info!(
        "Removed {removed} {} resource(s) from '{namespace}' namespace",
        pretty_type_name::<T>()
    );

    Ok(removed)
}
