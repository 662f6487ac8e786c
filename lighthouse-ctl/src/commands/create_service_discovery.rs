use anyhow::Context;
use kube::{api::PatchParams, core::ObjectMeta, Client};
use lighthouse_operator_core::{
    helpers::AndIf,
    kubernetes::operations::{converge_resource, try_get_resource},
    resources::crd::v1alpha1::servicediscovery::{ServiceDiscovery, ServiceDiscoverySpec},
    CLI_FIELD_MANAGER,
};
use log::{debug, info};

use crate::cli::{CreateServiceDiscoveryArgs, GlobalArgs};

pub async fn create_service_discovery(
    global_args: &GlobalArgs,
    args: CreateServiceDiscoveryArgs,
    client: &Client,
) -> anyhow::Result<()> {
    info!(
        "Creating '{}' service discovery in '{}' namespace...",
        args.name, global_args.namespace
    );

    let existing =
        try_get_resource::<ServiceDiscovery>(client, &args.name, &global_args.namespace).await?;

    if existing.is_some() {
        if args.force {
            info!("'{}' already exists! Force applying changes...", args.name);
        } else {
            info!(
                "'{}' already exists! Use --force to force apply changes...",
                args.name
            );

            return Ok(());
        }
    }

    let apply_params = PatchParams::apply(CLI_FIELD_MANAGER)
        .force()
        .and_if(args.dry_run, PatchParams::dry_run);
    let service_discovery = create_service_discovery_crd(&global_args.namespace, args);

    debug!("{service_discovery:#?}");

    converge_resource(client, &service_discovery, &apply_params)
        .await
        .context("Couldn't apply the service discovery object!")?;

    if existing.is_some() {
        info!("Service discovery successfully updated!");
    } else {
        info!("Service discovery successfully created!");
    }

    Ok(())
}

fn create_service_discovery_crd(
    namespace: &str,
    args: CreateServiceDiscoveryArgs,
) -> ServiceDiscovery {
    ServiceDiscovery {
        metadata: ObjectMeta {
            name: Some(args.name),
            namespace: Some(namespace.to_owned()),
            ..Default::default()
        },
        spec: ServiceDiscoverySpec {
            namespace: args
                .submariner_namespace
                .unwrap_or_else(|| namespace.to_owned()),
            cluster_id: args.cluster_id,
            repository: args.repository,
            version: args.version,
            broker_k8s_api_server: args.broker_api_server,
            broker_k8s_api_server_token: args.broker_api_server_token,
            broker_k8s_remote_namespace: args.broker_remote_namespace,
            broker_k8s_ca: args.broker_ca,
            debug: args.debug,
        },
    }
}
