pub mod create_service_discovery;
pub mod deploy_operator;
