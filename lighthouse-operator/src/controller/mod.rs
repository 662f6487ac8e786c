use std::sync::Arc;

use kube::Client;
use lighthouse_operator_core::config::OperatorConfig;

use self::{
    reconciler::{cluster::KubeCluster, context::ReconcilerContext},
    service_discovery::start_service_discovery_controller,
};

pub mod reconciler;
pub mod service_discovery;

pub async fn main_controller(client: Client, config: OperatorConfig) {
    let context = Arc::new(ReconcilerContext {
        cluster: KubeCluster::new(client.clone(), &config),
        client,
        config,
    });

    start_service_discovery_controller(&context).await
}
