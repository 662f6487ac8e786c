use k8s_openapi::{
    api::{
        apps::v1::{Deployment, DeploymentSpec},
        core::v1::{Container, EnvVar, EnvVarSource, ObjectFieldSelector, PodSpec, PodTemplateSpec},
    },
    apimachinery::pkg::apis::meta::v1::LabelSelector,
};
use kube::core::ObjectMeta;

use crate::{
    config::{OPERATOR_NAME_ENV, POD_NAME_ENV, WATCH_NAMESPACE_ENV},
    resources::labels::get_operator_labels,
};

use super::OperatorRelease;

fn field_ref_env(name: &str, field_path: &str) -> EnvVar {
    EnvVar {
        name: name.to_owned(),
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: field_path.to_owned(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

impl OperatorRelease {
    /// Locally built images are side-loaded into the cluster and can't be pulled.
    pub fn get_image_pull_policy(&self) -> &'static str {
        if self.image.ends_with(":local") {
            "IfNotPresent"
        } else {
            "Always"
        }
    }

    pub fn get_command(&self) -> Vec<String> {
        let verbosity = if self.debug { "-v=3" } else { "-v=1" };

        vec![self.name.to_owned(), verbosity.to_owned()]
    }

    pub fn generate_operator_env(&self) -> Vec<EnvVar> {
        vec![
            field_ref_env(WATCH_NAMESPACE_ENV, "metadata.namespace"),
            field_ref_env(POD_NAME_ENV, "metadata.name"),
            EnvVar {
                name: OPERATOR_NAME_ENV.to_owned(),
                value: Some(self.name.to_owned()),
                ..Default::default()
            },
        ]
    }

    pub fn generate_operator_deployment(&self) -> Deployment {
        let labels = get_operator_labels(&self.name);

        Deployment {
            metadata: self.generate_metadata(),
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                selector: LabelSelector {
                    match_expressions: None,
                    match_labels: Some(labels.to_owned()),
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: self.name.to_owned(),
                            image: Some(self.image.to_owned()),
                            image_pull_policy: Some(self.get_image_pull_policy().to_owned()),
                            command: Some(self.get_command()),
                            env: Some(self.generate_operator_env()),
                            ..Default::default()
                        }],
                        service_account_name: Some(self.name.to_owned()),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
