use clap::{Args, Parser, Subcommand};
use lighthouse_operator_core::{
    kubernetes::poll::{DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT},
    resources::operator::{DEFAULT_OPERATOR_NAME, DEFAULT_OPERATOR_NAMESPACE},
};

pub const DEFAULT_OPERATOR_IMAGE: &str = "quay.io/submariner/lighthouse-operator:latest";
pub const DEFAULT_SERVICE_DISCOVERY_NAME: &str = "service-discovery";
pub const DEFAULT_REPOSITORY: &str = "quay.io/submariner";
pub const DEFAULT_VERSION: &str = "latest";
pub const DEFAULT_BROKER_NAMESPACE: &str = "submariner-k8s-broker";

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    #[command(flatten)]
    pub global_args: GlobalArgs,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// kubernetes namespace to work with
    #[arg(short = 'n', long, global = true, default_value = DEFAULT_OPERATOR_NAMESPACE)]
    pub namespace: String,
    /// override default kubeconfig
    #[arg(long, global = true)]
    pub kube_config: Option<String>,
    /// override default kubeconfig context
    #[arg(long, global = true)]
    pub kube_context: Option<String>,
    /// enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose_logging: bool,
    /// enable trace output (more detailed than verbose, overrides it if present)
    #[arg(long = "trace", global = true)]
    pub trace_logging: bool,
}

impl GlobalArgs {
    pub fn get_log_level(&self) -> LogLevel {
        if self.trace_logging {
            return LogLevel::Trace;
        }

        if self.verbose_logging {
            return LogLevel::Verbose;
        }

        LogLevel::Normal
    }
}

pub enum LogLevel {
    Normal,
    Verbose,
    Trace,
}

#[derive(Debug, Subcommand)]
#[command(arg_required_else_help = true)]
pub enum Commands {
    /// install the lighthouse operator and wait until it's ready
    #[command(alias = "d")]
    DeployOperator(DeployOperatorArgs),
    /// create or update a service discovery object
    #[command(alias = "c")]
    CreateServiceDiscovery(CreateServiceDiscoveryArgs),
}

#[derive(Debug, Args)]
pub struct DeployOperatorArgs {
    /// operator container image
    #[arg(long, default_value = DEFAULT_OPERATOR_IMAGE)]
    pub image: String,
    /// name of the operator deployment and its service account
    #[arg(long, default_value = DEFAULT_OPERATOR_NAME)]
    pub operator_name: String,
    /// run the operator with debug logging
    #[arg(long)]
    pub debug: bool,
    /// seconds between readiness checks
    #[arg(
        long,
        default_value_t = DEFAULT_POLL_INTERVAL.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval_secs: u64,
    /// seconds to wait for the operator to become ready
    #[arg(long, default_value_t = DEFAULT_POLL_TIMEOUT.as_secs())]
    pub timeout_secs: u64,
    /// if set, no action will be taken on the cluster
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct CreateServiceDiscoveryArgs {
    /// name of the service discovery object
    #[arg(default_value = DEFAULT_SERVICE_DISCOVERY_NAME)]
    pub name: String,
    /// namespace the lighthouse agent watches (defaults to --namespace)
    #[arg(long)]
    pub submariner_namespace: Option<String>,
    /// identifier of this cluster within the supercluster
    #[arg(long)]
    pub cluster_id: String,
    /// image repository, use `local` for images loaded directly into the cluster
    #[arg(long, default_value = DEFAULT_REPOSITORY)]
    pub repository: String,
    /// image tag
    #[arg(long = "image-version", default_value = DEFAULT_VERSION)]
    pub version: String,
    /// broker kubernetes API server address
    #[arg(long)]
    pub broker_api_server: String,
    /// broker kubernetes API server token
    #[arg(long)]
    pub broker_api_server_token: String,
    /// namespace on the broker cluster
    #[arg(long, default_value = DEFAULT_BROKER_NAMESPACE)]
    pub broker_remote_namespace: String,
    /// broker API server certificate authority data
    #[arg(long)]
    pub broker_ca: String,
    /// run the lighthouse agent with debug logging
    #[arg(long)]
    pub debug: bool,
    /// apply changes even if the object already exists
    #[arg(long)]
    pub force: bool,
    /// if set, no action will be taken on the cluster
    #[arg(long)]
    pub dry_run: bool,
}
