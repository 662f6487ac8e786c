pub mod config;
pub mod dns;
pub mod helpers;
pub mod kubernetes;
pub mod resources;

pub const RESOURCE_GROUP: &str = "submariner.io";

pub const OPERATOR_FIELD_MANAGER: &str = "lighthouse-operator";
pub const CLI_FIELD_MANAGER: &str = "lighthouse-ctl";
