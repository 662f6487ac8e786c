use k8s_openapi::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use lighthouse_operator_core::config::OperatorConfig;

use super::cluster::KubeCluster;

pub struct ReconcilerContext {
    pub client: Client,
    pub config: OperatorConfig,
    pub cluster: KubeCluster,
}

impl ReconcilerContext {
    /// Api limited to the watched namespace, or spanning all of them when
    /// none is configured.
    pub fn scoped_api<T>(&self) -> Api<T>
    where
        T: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        match &self.config.watch_namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }

    pub fn namespaced_api<T>(&self, namespace: &str) -> Api<T>
    where
        T: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}
