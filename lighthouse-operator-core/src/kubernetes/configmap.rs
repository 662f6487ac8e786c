use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{
    api::{Patch, PatchParams},
    Api, Client,
};
use serde_json::json;

use super::transaction::{StoreError, Versioned, VersionedStore};

/// A single text key of a config map, read and written under optimistic
/// concurrency using the config map's resource version.
pub struct ConfigMapKeyStore {
    api: Api<ConfigMap>,
    name: String,
    key: String,
    field_manager: String,
}

impl ConfigMapKeyStore {
    pub fn new(client: &Client, namespace: &str, name: &str, key: &str, field_manager: &str) -> Self {
        Self {
            api: Api::namespaced(client.clone(), namespace),
            name: name.to_owned(),
            key: key.to_owned(),
            field_manager: field_manager.to_owned(),
        }
    }
}

/// Missing data or a missing key both read as empty text.
pub fn read_key(configmap: &ConfigMap, key: &str) -> String {
    configmap
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .cloned()
        .unwrap_or_default()
}

/// Merge patch replacing `key`; carrying the resource version makes the API
/// server reject it with a conflict when the config map changed meanwhile.
pub fn build_key_patch(key: &str, value: &str, version: Option<&str>) -> serde_json::Value {
    match version {
        Some(version) => json!({
            "metadata": { "resourceVersion": version },
            "data": { key: value },
        }),
        None => json!({
            "data": { key: value },
        }),
    }
}

#[async_trait]
impl VersionedStore for ConfigMapKeyStore {
    type Value = String;

    async fn load(&self) -> Result<Versioned<String>, StoreError> {
        let configmap = self
            .api
            .get(&self.name)
            .await
            .map_err(StoreError::from_kube)?;

        Ok(Versioned {
            value: read_key(&configmap, &self.key),
            version: configmap.metadata.resource_version.clone(),
        })
    }

    async fn store(&self, update: Versioned<String>) -> Result<(), StoreError> {
        let patch = build_key_patch(&self.key, &update.value, update.version.as_deref());
        let patch_params = PatchParams {
            field_manager: Some(self.field_manager.clone()),
            ..Default::default()
        };

        self.api
            .patch(&self.name, &patch_params, &Patch::Merge(&patch))
            .await
            .map_err(StoreError::from_kube)?;

        Ok(())
    }
}
