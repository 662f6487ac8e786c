pub mod configmap;
pub mod deployment;
pub mod operations;
pub mod poll;
pub mod service;
pub mod transaction;
