use k8s_openapi::{
    api::{
        apps::v1::{Deployment, DeploymentSpec},
        core::v1::{
            ConfigMap, ConfigMapVolumeSource, Container, KeyToPath, PodSpec, PodTemplateSpec,
            Volume, VolumeMount,
        },
    },
    apimachinery::pkg::apis::meta::v1::LabelSelector,
};
use kube::core::ObjectMeta;

use crate::{
    dns::corefile::COREFILE_KEY,
    helpers::RequireMetadata,
    resources::{
        labels::{get_lighthouse_labels, get_lighthouse_selector},
        ResourceGenerationError,
    },
};

use super::{LighthouseRelease, COREDNS_NAME, SERVICE_ACCOUNT_NAME};

pub const COREDNS_REPLICAS: i32 = 2;
pub const CONFIG_VOLUME_NAME: &str = "config-volume";
pub const CONFIG_MOUNT_PATH: &str = "/etc/coredns";

impl LighthouseRelease {
    pub fn generate_coredns_deployment(
        &self,
        configmap: &ConfigMap,
    ) -> Result<Deployment, ResourceGenerationError> {
        let configmap_name =
            configmap.require_name_or(ResourceGenerationError::DependentMissingMetadataName)?;
        let labels = get_lighthouse_labels(COREDNS_NAME);

        Ok(Deployment {
            metadata: self.generate_metadata(COREDNS_NAME, labels.to_owned()),
            spec: Some(DeploymentSpec {
                replicas: Some(COREDNS_REPLICAS),
                selector: LabelSelector {
                    match_expressions: None,
                    match_labels: Some(get_lighthouse_selector(COREDNS_NAME)),
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: COREDNS_NAME.to_owned(),
                            image: Some(self.get_coredns_image()),
                            image_pull_policy: Some("IfNotPresent".to_owned()),
                            args: Some(vec![
                                "-conf".to_owned(),
                                format!("{CONFIG_MOUNT_PATH}/{COREFILE_KEY}"),
                            ]),
                            volume_mounts: Some(vec![VolumeMount {
                                name: CONFIG_VOLUME_NAME.to_owned(),
                                mount_path: CONFIG_MOUNT_PATH.to_owned(),
                                read_only: Some(true),
                                ..Default::default()
                            }]),
                            ..Default::default()
                        }],
                        service_account_name: Some(SERVICE_ACCOUNT_NAME.to_owned()),
                        termination_grace_period_seconds: Some(0),
                        volumes: Some(vec![Volume {
                            name: CONFIG_VOLUME_NAME.to_owned(),
                            config_map: Some(ConfigMapVolumeSource {
                                name: Some(configmap_name.to_owned()),
                                items: Some(vec![KeyToPath {
                                    key: COREFILE_KEY.to_owned(),
                                    path: COREFILE_KEY.to_owned(),
                                    mode: None,
                                }]),
                                default_mode: Some(420),
                                ..Default::default()
                            }),
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        })
    }
}
