use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use kube::{Api, Client};

/// Looks up the cluster-internal address allocated to a service.
#[async_trait]
pub trait ClusterIpSource: Send + Sync {
    /// `None` when the service doesn't exist or no address was allocated yet.
    async fn cluster_ip(&self) -> Result<Option<String>, kube::Error>;
}

pub struct ServiceClusterIp {
    api: Api<Service>,
    name: String,
}

impl ServiceClusterIp {
    pub fn new(client: &Client, name: &str, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client.clone(), namespace),
            name: name.to_owned(),
        }
    }
}

#[async_trait]
impl ClusterIpSource for ServiceClusterIp {
    async fn cluster_ip(&self) -> Result<Option<String>, kube::Error> {
        let service = self.api.get_opt(&self.name).await?;

        Ok(service.as_ref().and_then(get_cluster_ip))
    }
}

pub fn get_cluster_ip(service: &Service) -> Option<String> {
    service
        .spec
        .as_ref()
        .and_then(|spec| spec.cluster_ip.as_deref())
        .map(str::trim)
        // headless services report the literal "None"
        .filter(|ip| !ip.is_empty() && *ip != "None")
        .map(str::to_owned)
}
