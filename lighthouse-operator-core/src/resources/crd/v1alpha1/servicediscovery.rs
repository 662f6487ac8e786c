use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "submariner.io",
    version = "v1alpha1",
    kind = "ServiceDiscovery",
    plural = "servicediscoveries",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDiscoverySpec {
    /// namespace the lighthouse agent watches submariner resources in
    pub namespace: String,
    /// identifier of this cluster within the supercluster
    #[serde(rename = "clusterID")]
    pub cluster_id: String,
    /// image repository, `local` for images injected into the cluster directly
    pub repository: String,
    /// image tag
    pub version: String,
    /// broker kubernetes API server address
    pub broker_k8s_api_server: String,
    /// broker kubernetes API server token
    pub broker_k8s_api_server_token: String,
    /// namespace on the broker cluster to synchronize through
    pub broker_k8s_remote_namespace: String,
    /// broker API server certificate authority data
    #[serde(rename = "brokerK8sCA")]
    pub broker_k8s_ca: String,
    #[serde(default)]
    pub debug: bool,
}
