use anyhow::Context;
use clap::Parser;
use cli::{Commands, GlobalArgs, LogLevel};
use commands::{
    create_service_discovery::create_service_discovery, deploy_operator::deploy_operator,
};
use env_logger::Target;
use lighthouse_operator_core::kubernetes::operations::create_local_client;
use log::LevelFilter;

use crate::cli::Cli;

mod cli;
mod commands;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    configure_logging(&cli.global_args);

    let client = create_local_client(&cli.global_args.kube_config, &cli.global_args.kube_context)
        .await
        .context("Couldn't initialize k8s API client!")?;

    if let Some(command) = cli.command {
        match command {
            Commands::DeployOperator(args) => {
                deploy_operator(&cli.global_args, &args, &client).await?
            }
            Commands::CreateServiceDiscovery(args) => {
                create_service_discovery(&cli.global_args, args, &client).await?
            }
        }
    }

    Ok(())
}

fn configure_logging(global_args: &GlobalArgs) {
    let log_level = global_args.get_log_level();
    let mut logger = env_logger::builder();

    logger
        .format_timestamp(None)
        .format_module_path(matches!(log_level, LogLevel::Trace))
        .format_target(false)
        .format_level(false)
        .target(Target::Stderr);

    match log_level {
        LogLevel::Normal => logger.filter(Some("lighthouse"), LevelFilter::Info),
        LogLevel::Verbose => logger.filter(Some("lighthouse"), LevelFilter::Debug),
        LogLevel::Trace => logger.filter(None, LevelFilter::Debug),
    };

    logger.init();
}
