pub mod cluster;
pub mod context;
pub mod error;
pub mod service_discovery;
