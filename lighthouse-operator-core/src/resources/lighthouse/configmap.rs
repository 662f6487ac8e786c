use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ConfigMap;

use crate::{
    dns::corefile::{generate_resolver_corefile, COREFILE_KEY},
    resources::labels::get_lighthouse_labels,
};

use super::{LighthouseRelease, COREDNS_NAME};

impl LighthouseRelease {
    pub fn generate_coredns_configmap(&self) -> ConfigMap {
        ConfigMap {
            metadata: self.generate_metadata(COREDNS_NAME, get_lighthouse_labels(COREDNS_NAME)),
            data: Some(BTreeMap::from([(
                COREFILE_KEY.to_owned(),
                generate_resolver_corefile(),
            )])),
            ..Default::default()
        }
    }
}
