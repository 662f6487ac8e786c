use std::process::exit;

use clap::Parser;
use kube::Client;
use lighthouse_operator_core::config::OperatorConfig;
use log::{error, info, LevelFilter};

use crate::controller::main_controller;

mod controller;
mod helpers;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// log verbosity: 1 is info, 2 is debug, 3 and above is trace
    #[arg(short = 'v', long = "verbosity", default_value_t = 1)]
    verbosity: u8,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    configure_logger(args.verbosity);

    let config = get_config();
    let client = create_client().await;

    info!(
        "Starting lighthouse operator '{}' (watching {})...",
        config.instance_name(),
        config.watch_namespace.as_deref().unwrap_or("all namespaces")
    );

    main_controller(client, config).await;
}

async fn create_client() -> Client {
    match Client::try_default().await {
        Ok(client) => client,
        Err(error) => {
            error!("Couldn't create client! {error:?}");
            exit(6)
        }
    }
}

fn get_config() -> OperatorConfig {
    match OperatorConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            error!("Couldn't read operator configuration! {error}");
            exit(7)
        }
    }
}

fn get_level_filter(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn configure_logger(verbosity: u8) {
    env_logger::builder()
        .default_format()
        .format_module_path(false)
        .filter_level(get_level_filter(verbosity))
        .init()
}
