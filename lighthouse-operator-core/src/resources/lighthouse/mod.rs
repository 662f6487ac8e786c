use std::collections::BTreeMap;

use derive_builder::Builder;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{core::ObjectMeta, Resource};

use crate::helpers::RequireMetadata;

use super::{crd::v1alpha1::servicediscovery::ServiceDiscovery, ResourceGenerationError};

pub mod agent;
pub mod configmap;
pub mod coredns;
pub mod service;

pub const AGENT_NAME: &str = "submariner-lighthouse-agent";
pub const COREDNS_NAME: &str = "submariner-lighthouse-coredns";
pub const SERVICE_ACCOUNT_NAME: &str = "submariner-lighthouse";

pub const AGENT_IMAGE: &str = "lighthouse-agent";
pub const COREDNS_IMAGE: &str = "lighthouse-coredns";

/// Repository name used for images injected directly into the cluster
/// (development, testing and CI).
pub const LOCAL_REPOSITORY: &str = "local";

/// Everything needed to render the lighthouse child resources of a
/// `ServiceDiscovery` object.
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct LighthouseRelease {
    /// namespace the child resources are created in
    pub namespace: String,
    pub submariner_namespace: String,
    pub cluster_id: String,
    pub repository: String,
    pub version: String,
    pub broker_api_server: String,
    pub broker_api_server_token: String,
    pub broker_remote_namespace: String,
    pub broker_ca: String,
    pub debug: bool,
    #[builder(default, setter(strip_option))]
    pub owner: Option<OwnerReference>,
}

impl LighthouseReleaseBuilder {
    pub fn with_service_discovery_crd(
        &mut self,
        crd: &ServiceDiscovery,
    ) -> Result<&mut Self, ResourceGenerationError> {
        let namespace = crd
            .require_namespace_or(ResourceGenerationError::DependentMissingMetadataNamespace)?
            .to_owned();
        let spec = &crd.spec;

        Ok(self
            .namespace(namespace)
            .submariner_namespace(spec.namespace.to_owned())
            .cluster_id(spec.cluster_id.to_owned())
            .repository(spec.repository.to_owned())
            .version(spec.version.to_owned())
            .broker_api_server(spec.broker_k8s_api_server.to_owned())
            .broker_api_server_token(spec.broker_k8s_api_server_token.to_owned())
            .broker_remote_namespace(spec.broker_k8s_remote_namespace.to_owned())
            .broker_ca(spec.broker_k8s_ca.to_owned())
            .debug(spec.debug))
    }
}

impl LighthouseRelease {
    /// Builds a release owned by `crd`, so every generated resource is
    /// garbage collected together with it.
    pub fn from_crd(crd: &ServiceDiscovery) -> Result<Self, ResourceGenerationError> {
        let owner = crd
            .controller_owner_ref(&())
            .ok_or(ResourceGenerationError::MissingData("ServiceDiscovery uid".into()))?;

        LighthouseReleaseBuilder::default()
            .with_service_discovery_crd(crd)?
            .owner(owner)
            .build()
            .map_err(|err| ResourceGenerationError::MissingData(err.to_string().into()))
    }

    pub fn generate_metadata(&self, name: &str, labels: BTreeMap<String, String>) -> ObjectMeta {
        ObjectMeta {
            labels: Some(labels),
            namespace: Some(self.namespace.to_owned()),
            name: Some(name.to_owned()),
            owner_references: self.owner.as_ref().map(|owner| vec![owner.to_owned()]),
            ..Default::default()
        }
    }

    pub fn get_image_path(&self, component_image: &str) -> String {
        match self.repository.as_str() {
            LOCAL_REPOSITORY => format!("{component_image}:{}", self.version),
            repository => format!("{repository}/{component_image}:{}", self.version),
        }
    }

    pub fn get_agent_image(&self) -> String {
        self.get_image_path(AGENT_IMAGE)
    }

    pub fn get_coredns_image(&self) -> String {
        self.get_image_path(COREDNS_IMAGE)
    }
}
