use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::runtime::{watcher::Config, Controller};
use lighthouse_operator_core::resources::crd::v1alpha1::servicediscovery::ServiceDiscovery;
use log::info;

use crate::helpers::handle_reconciliation_result;

use super::reconciler::{
    context::ReconcilerContext,
    service_discovery::{reconcile_service_discovery, reconcile_service_discovery_error},
};

pub async fn start_service_discovery_controller(context: &Arc<ReconcilerContext>) {
    info!("Creating service discovery controller...");

    let watcher_config = Config::default();
    let controller = Controller::new(
        context.scoped_api::<ServiceDiscovery>(),
        watcher_config.clone(),
    )
    .owns(context.scoped_api::<Deployment>(), watcher_config)
    .shutdown_on_signal()
    .run(
        reconcile_service_discovery,
        reconcile_service_discovery_error,
        context.clone(),
    )
    .for_each(handle_reconciliation_result);

    info!("Service discovery controller created!");

    controller.await
}
