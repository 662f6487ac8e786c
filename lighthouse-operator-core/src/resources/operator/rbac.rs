use k8s_openapi::api::{
    core::v1::ServiceAccount,
    rbac::v1::{ClusterRole, ClusterRoleBinding, PolicyRule, RoleRef, Subject},
};
use kube::Resource;

use crate::resources::crd::v1alpha1::servicediscovery::ServiceDiscovery;

use super::OperatorRelease;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn rule(api_group: &str, resources: &[&str], allowed: &[&str]) -> PolicyRule {
    PolicyRule {
        api_groups: Some(vec![api_group.to_owned()]),
        resources: Some(strings(resources)),
        verbs: strings(allowed),
        ..Default::default()
    }
}

impl OperatorRelease {
    pub fn generate_service_account(&self) -> ServiceAccount {
        ServiceAccount {
            metadata: self.generate_metadata(),
            automount_service_account_token: Some(true),
            ..Default::default()
        }
    }

    pub fn generate_cluster_role(&self) -> ClusterRole {
        let crd_group = ServiceDiscovery::group(&());
        let crd_plural = ServiceDiscovery::plural(&());
        let all = ["get", "list", "watch", "create", "update", "patch", "delete", "deletecollection"];

        ClusterRole {
            metadata: self.generate_clusterwide_metadata(),
            rules: Some(vec![
                rule(
                    &crd_group,
                    &[crd_plural.as_ref()],
                    &["get", "list", "watch", "update", "patch"],
                ),
                rule("apps", &["deployments"], &all),
                rule("", &["configmaps", "services"], &all),
            ]),
            ..Default::default()
        }
    }

    pub fn generate_cluster_role_binding(
        &self,
        role: &ClusterRole,
        account: &ServiceAccount,
    ) -> ClusterRoleBinding {
        ClusterRoleBinding {
            metadata: self.generate_clusterwide_metadata(),
            role_ref: RoleRef {
                api_group: "rbac.authorization.k8s.io".to_owned(),
                kind: "ClusterRole".to_owned(),
                name: role.metadata.name.to_owned().unwrap_or_default(),
            },
            subjects: Some(vec![Subject {
                kind: "ServiceAccount".to_owned(),
                name: account.metadata.name.to_owned().unwrap_or_default(),
                namespace: account.metadata.namespace.to_owned(),
                ..Default::default()
            }]),
        }
    }
}
