use lighthouse_operator_core::{
    dns::{CorednsPatchError, DnsPatchError},
    kubernetes::{operations::OperationError, transaction::TransactionError},
    resources::ResourceGenerationError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Object is missing metadata!")]
    MissingObjectMetadata,
    #[error("Couldn't retrieve the resource! Reason: {}", .0)]
    KubeApiError(kube::Error),
    #[error("Couldn't generate a lighthouse resource! Reason: {}", .0)]
    ResourceGenerationError(ResourceGenerationError),
    #[error("Couldn't converge a lighthouse resource! Reason: {}", .0)]
    ConvergeError(OperationError),
    #[error("Couldn't remove the lighthouse agent! Reason: {}", .0)]
    CleanupError(OperationError),
    #[error("Couldn't patch the CoreDNS configuration! Reason: {}", .0)]
    CorednsPatchError(CorednsPatchError),
}

impl ReconcilerError {
    /// The resolver service exists but has no cluster address yet.
    pub fn is_waiting_for_resolver(&self) -> bool {
        matches!(
            self,
            ReconcilerError::CorednsPatchError(TransactionError::Dependency(
                DnsPatchError::ResolverAddressUnavailable
            ))
        )
    }
}
