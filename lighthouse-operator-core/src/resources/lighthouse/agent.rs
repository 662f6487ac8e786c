use k8s_openapi::{
    api::{
        apps::v1::{Deployment, DeploymentSpec},
        core::v1::{Container, EnvVar, PodSpec, PodTemplateSpec},
    },
    apimachinery::pkg::apis::meta::v1::LabelSelector,
};
use kube::core::ObjectMeta;

use crate::resources::labels::{get_lighthouse_labels, get_lighthouse_selector};

use super::{LighthouseRelease, AGENT_NAME, SERVICE_ACCOUNT_NAME};

/// Namespaces the agent never exports services from.
pub const EXCLUDED_NAMESPACES: &str = "submariner,kube-system,operators";

fn env(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_owned(),
        value: Some(value.to_owned()),
        ..Default::default()
    }
}

impl LighthouseRelease {
    pub fn generate_agent_env(&self) -> Vec<EnvVar> {
        vec![
            env("SUBMARINER_NAMESPACE", &self.submariner_namespace),
            env("SUBMARINER_CLUSTERID", &self.cluster_id),
            env("SUBMARINER_EXCLUDENS", EXCLUDED_NAMESPACES),
            env("SUBMARINER_DEBUG", &self.debug.to_string()),
            env("BROKER_K8S_APISERVER", &self.broker_api_server),
            env("BROKER_K8S_APISERVERTOKEN", &self.broker_api_server_token),
            env("BROKER_K8S_REMOTENAMESPACE", &self.broker_remote_namespace),
            env("BROKER_K8S_CA", &self.broker_ca),
        ]
    }

    pub fn generate_agent_deployment(&self) -> Deployment {
        let labels = get_lighthouse_labels(AGENT_NAME);

        Deployment {
            metadata: self.generate_metadata(AGENT_NAME, labels.to_owned()),
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                selector: LabelSelector {
                    match_expressions: None,
                    match_labels: Some(get_lighthouse_selector(AGENT_NAME)),
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: AGENT_NAME.to_owned(),
                            image: Some(self.get_agent_image()),
                            image_pull_policy: Some("IfNotPresent".to_owned()),
                            env: Some(self.generate_agent_env()),
                            ..Default::default()
                        }],
                        service_account_name: Some(SERVICE_ACCOUNT_NAME.to_owned()),
                        termination_grace_period_seconds: Some(0),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
