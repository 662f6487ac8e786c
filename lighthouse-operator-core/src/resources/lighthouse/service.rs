use k8s_openapi::{
    api::core::v1::{Service, ServicePort, ServiceSpec},
    apimachinery::pkg::util::intstr::IntOrString,
};

use crate::resources::labels::{get_lighthouse_labels, get_lighthouse_selector};

use super::{LighthouseRelease, COREDNS_NAME};

pub const DNS_PORT: i32 = 53;

impl LighthouseRelease {
    pub fn generate_coredns_service(&self) -> Service {
        Service {
            metadata: self.generate_metadata(COREDNS_NAME, get_lighthouse_labels(COREDNS_NAME)),
            spec: Some(ServiceSpec {
                type_: Some("ClusterIP".to_owned()),
                selector: Some(get_lighthouse_selector(COREDNS_NAME)),
                ports: Some(vec![ServicePort {
                    name: Some("udp".to_owned()),
                    port: DNS_PORT,
                    protocol: Some("UDP".to_owned()),
                    target_port: Some(IntOrString::Int(DNS_PORT)),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
