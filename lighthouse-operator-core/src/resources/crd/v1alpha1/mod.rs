use kube::{api::PatchParams, Client, CustomResourceExt};

use crate::kubernetes::operations::create_crd;

use self::servicediscovery::ServiceDiscovery;

pub mod servicediscovery;

pub async fn create_v1alpha1_crds(client: &Client, apply_params: &PatchParams) -> anyhow::Result<()> {
    let service_discovery_spec = ServiceDiscovery::crd();

    create_crd(client, &service_discovery_spec, apply_params).await?;

    Ok(())
}
