use std::borrow::Cow;

use thiserror::Error;

pub mod crd;
pub mod labels;
pub mod lighthouse;
pub mod operator;

#[derive(Debug, Error)]
pub enum ResourceGenerationError {
    #[error("Resource is missing required data ({})!", .0)]
    MissingData(Cow<'static, str>),
    #[error("Provided dependent resource is missing a name!")]
    DependentMissingMetadataName,
    #[error("Provided dependent resource is missing a namespace!")]
    DependentMissingMetadataNamespace,
}
