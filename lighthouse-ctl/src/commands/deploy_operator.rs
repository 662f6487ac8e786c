use std::time::Duration;

use anyhow::Context;
use kube::{api::PatchParams, Client};
use lighthouse_operator_core::{
    helpers::AndIf,
    kubernetes::{
        operations::{converge_resource, create_cluster_resource, create_namespace_if_not_exists},
        poll::PollConfig,
    },
    resources::{crd::v1alpha1::create_v1alpha1_crds, operator::OperatorRelease},
    CLI_FIELD_MANAGER,
};
use log::{debug, info};

use crate::cli::{DeployOperatorArgs, GlobalArgs};

pub async fn deploy_operator(
    global_args: &GlobalArgs,
    args: &DeployOperatorArgs,
    client: &Client,
) -> anyhow::Result<()> {
    let release = prepare_release(global_args, args);
    let poll = get_poll_config(args);
    let apply_params = PatchParams::apply(CLI_FIELD_MANAGER)
        .force()
        .and_if(args.dry_run, PatchParams::dry_run);

    info!(
        "Deploying '{}' operator into '{}' namespace...",
        release.name, release.namespace
    );

    create_namespace_if_not_exists(client, &apply_params, &release.namespace).await?;
    create_v1alpha1_crds(client, &apply_params).await?;
    deploy_rbac(&release, client, &apply_params).await?;

    let created = if args.dry_run {
        let created = release.ensure(client, &apply_params).await?;
        info!("Dry run, skipping the readiness wait");
        created
    } else {
        release.ensure_ready(client, &apply_params, &poll).await?
    };

    if created {
        info!("Successfully deployed '{}' operator!", release.name);
    } else {
        info!("Successfully updated '{}' operator!", release.name);
    }

    Ok(())
}

fn prepare_release(global_args: &GlobalArgs, args: &DeployOperatorArgs) -> OperatorRelease {
    info!("Using operator image: {}", args.image);

    OperatorRelease {
        namespace: global_args.namespace.to_owned(),
        name: args.operator_name.to_owned(),
        image: args.image.to_owned(),
        debug: args.debug,
    }
}

fn get_poll_config(args: &DeployOperatorArgs) -> PollConfig {
    PollConfig {
        interval: Duration::from_secs(args.interval_secs),
        timeout: Duration::from_secs(args.timeout_secs),
    }
}

async fn deploy_rbac(
    release: &OperatorRelease,
    client: &Client,
    apply_params: &PatchParams,
) -> anyhow::Result<()> {
    let service_account = release.generate_service_account();
    let cluster_role = release.generate_cluster_role();
    let cluster_role_binding = release.generate_cluster_role_binding(&cluster_role, &service_account);

    debug!("{service_account:#?}");
    converge_resource(client, &service_account, apply_params)
        .await
        .context("Couldn't create the operator service account!")?;

    debug!("{cluster_role:#?}");
    create_cluster_resource(client, &cluster_role, apply_params).await?;

    debug!("{cluster_role_binding:#?}");
    create_cluster_resource(client, &cluster_role_binding, apply_params).await?;

    Ok(())
}
