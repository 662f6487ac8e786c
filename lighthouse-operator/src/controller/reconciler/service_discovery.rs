use std::{sync::Arc, time::Duration};

use kube::{
    runtime::{
        controller::Action,
        finalizer::{finalizer, Error as FinalizerError, Event as FinalizerEvent},
    },
    CustomResourceExt,
};
use lighthouse_operator_core::{
    helpers::RequireMetadata,
    kubernetes::transaction::UpdateOutcome,
    resources::{
        crd::v1alpha1::servicediscovery::ServiceDiscovery,
        lighthouse::{LighthouseRelease, COREDNS_NAME},
    },
};
use log::{debug, info};

use super::{cluster::LighthouseCluster, context::ReconcilerContext, error::ReconcilerError};

const DEFAULT_ERROR_REQUEUE_SECS: u64 = 10;
const RESOLVER_WAIT_REQUEUE_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Reconciled,
    /// the object is gone, carries the number of removed agent deployments
    CleanedUp(usize),
}

pub fn finalizer_name() -> String {
    format!("{}/cleanup", ServiceDiscovery::crd_name())
}

pub async fn reconcile_service_discovery(
    object: Arc<ServiceDiscovery>,
    context: Arc<ReconcilerContext>,
) -> Result<Action, FinalizerError<ReconcilerError>> {
    let namespace = object
        .require_namespace_or(FinalizerError::ApplyFailed(ReconcilerError::MissingObjectMetadata))?
        .to_owned();
    let api = context.namespaced_api::<ServiceDiscovery>(&namespace);

    finalizer(&api, &finalizer_name(), object, |event| async {
        match event {
            FinalizerEvent::Apply(object) => try_reconcile(&object, &context).await,
            FinalizerEvent::Cleanup(object) => cleanup(&object, &context).await,
        }
    })
    .await
}

async fn try_reconcile(
    object: &ServiceDiscovery,
    context: &ReconcilerContext,
) -> Result<Action, ReconcilerError> {
    let name = object.require_name_or(ReconcilerError::MissingObjectMetadata)?;
    let namespace = object.require_namespace_or(ReconcilerError::MissingObjectMetadata)?;

    reconcile_request(&context.cluster, name, namespace).await?;

    Ok(Action::await_change())
}

async fn cleanup(
    object: &ServiceDiscovery,
    context: &ReconcilerContext,
) -> Result<Action, ReconcilerError> {
    let name = object.require_name_or(ReconcilerError::MissingObjectMetadata)?;
    let namespace = object.require_namespace_or(ReconcilerError::MissingObjectMetadata)?;

    cleanup_request(&context.cluster, name, namespace).await?;

    Ok(Action::await_change())
}

pub fn reconcile_service_discovery_error(
    _object: Arc<ServiceDiscovery>,
    error: &FinalizerError<ReconcilerError>,
    _context: Arc<ReconcilerContext>,
) -> Action {
    Action::requeue(get_finalizer_error_requeue(error))
}

fn get_finalizer_error_requeue(error: &FinalizerError<ReconcilerError>) -> Duration {
    match error {
        FinalizerError::ApplyFailed(error) | FinalizerError::CleanupFailed(error) => {
            get_error_requeue(error)
        }
        _ => Duration::from_secs(DEFAULT_ERROR_REQUEUE_SECS),
    }
}

fn get_error_requeue(error: &ReconcilerError) -> Duration {
    if error.is_waiting_for_resolver() {
        Duration::from_secs(RESOLVER_WAIT_REQUEUE_SECS)
    } else {
        Duration::from_secs(DEFAULT_ERROR_REQUEUE_SECS)
    }
}

/// Brings the lighthouse deployment of `namespace` in line with the named
/// service discovery object, or tears it down when the object no longer
/// exists. Safe to rerun from the top after any failure.
pub async fn reconcile_request(
    cluster: &impl LighthouseCluster,
    name: &str,
    namespace: &str,
) -> Result<ReconcileOutcome, ReconcilerError> {
    let object = cluster
        .get_service_discovery(name, namespace)
        .await
        .map_err(ReconcilerError::KubeApiError)?;

    match object {
        Some(object) => {
            reconcile_existing(cluster, &object).await?;
            Ok(ReconcileOutcome::Reconciled)
        }
        None => {
            let removed = cleanup_request(cluster, name, namespace).await?;
            Ok(ReconcileOutcome::CleanedUp(removed))
        }
    }
}

/// Removes the lighthouse agent left behind by the named service discovery
/// object. Returns the number of removed deployments.
pub async fn cleanup_request(
    cluster: &impl LighthouseCluster,
    name: &str,
    namespace: &str,
) -> Result<usize, ReconcilerError> {
    info!("servicediscovery '{name}' in '{namespace}' namespace is gone, removing the lighthouse agent...");

    cluster
        .delete_agent_deployments(namespace)
        .await
        .map_err(ReconcilerError::CleanupError)
}

async fn reconcile_existing(
    cluster: &impl LighthouseCluster,
    object: &ServiceDiscovery,
) -> Result<(), ReconcilerError> {
    let release =
        LighthouseRelease::from_crd(object).map_err(ReconcilerError::ResourceGenerationError)?;

    let agent = release.generate_agent_deployment();
    cluster
        .converge_deployment(&agent)
        .await
        .map_err(ReconcilerError::ConvergeError)?;

    let configmap = release.generate_coredns_configmap();
    cluster
        .converge_configmap(&configmap)
        .await
        .map_err(ReconcilerError::ConvergeError)?;

    let coredns = release
        .generate_coredns_deployment(&configmap)
        .map_err(ReconcilerError::ResourceGenerationError)?;
    cluster
        .converge_deployment(&coredns)
        .await
        .map_err(ReconcilerError::ConvergeError)?;

    let service_exists = cluster
        .service_exists(COREDNS_NAME, &release.namespace)
        .await
        .map_err(ReconcilerError::KubeApiError)?;

    if service_exists {
        debug!("'{}/{COREDNS_NAME}' service already exists", release.namespace);
    } else {
        info!("Creating '{}/{COREDNS_NAME}' service...", release.namespace);

        cluster
            .create_service(&release.generate_coredns_service())
            .await
            .map_err(ReconcilerError::ConvergeError)?;
    }

    let outcome = cluster
        .patch_coredns(COREDNS_NAME, &release.namespace)
        .await
        .map_err(ReconcilerError::CorednsPatchError)?;

    if outcome == UpdateOutcome::AlreadyApplied {
        debug!("CoreDNS already forwards the supercluster zone");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::{apps::v1::Deployment, core::v1::ConfigMap};
    use kube::core::ObjectMeta;
    use lighthouse_operator_core::{
        dns::DnsPatchError,
        kubernetes::{
            operations::{ApplyOutcome, OperationError},
            transaction::{StoreError, TransactionError},
        },
        resources::{
            crd::v1alpha1::servicediscovery::ServiceDiscoverySpec,
            lighthouse::AGENT_NAME,
        },
    };
    use mockall::{predicate::eq, Sequence};

    use crate::controller::reconciler::cluster::MockLighthouseCluster;

    use super::*;

    const NAME: &str = "service-discovery";
    const NAMESPACE: &str = "submariner-operator";

    fn service_discovery() -> ServiceDiscovery {
        ServiceDiscovery {
            metadata: ObjectMeta {
                name: Some(NAME.to_owned()),
                namespace: Some(NAMESPACE.to_owned()),
                uid: Some("b3f4c1de-2f5a-4b8e-9d7c-0a1e2f3b4c5d".to_owned()),
                ..Default::default()
            },
            spec: ServiceDiscoverySpec {
                namespace: NAMESPACE.to_owned(),
                cluster_id: "west".to_owned(),
                repository: "local".to_owned(),
                version: "v1".to_owned(),
                broker_k8s_api_server: "broker:6443".to_owned(),
                broker_k8s_api_server_token: "token".to_owned(),
                broker_k8s_remote_namespace: "submariner-k8s-broker".to_owned(),
                broker_k8s_ca: "ca".to_owned(),
                debug: true,
            },
        }
    }

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_owned(),
            message: "test".to_owned(),
            reason: "Test".to_owned(),
            code,
        })
    }

    fn is_named(deployment: &Deployment, name: &str) -> bool {
        deployment.metadata.name.as_deref() == Some(name)
    }

    fn expect_service_discovery(cluster: &mut MockLighthouseCluster) {
        cluster
            .expect_get_service_discovery()
            .with(eq(NAME), eq(NAMESPACE))
            .returning(|_, _| Ok(Some(service_discovery())));
    }

    #[tokio::test]
    async fn children_are_converged_in_order() {
        let mut cluster = MockLighthouseCluster::new();
        let mut seq = Sequence::new();

        expect_service_discovery(&mut cluster);
        cluster
            .expect_converge_deployment()
            .withf(|deployment| is_named(deployment, AGENT_NAME))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(ApplyOutcome::Created));
        cluster
            .expect_converge_configmap()
            .withf(|configmap: &ConfigMap| configmap.metadata.name.as_deref() == Some(COREDNS_NAME))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(ApplyOutcome::Created));
        cluster
            .expect_converge_deployment()
            .withf(|deployment| is_named(deployment, COREDNS_NAME))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(ApplyOutcome::Created));
        cluster
            .expect_service_exists()
            .with(eq(COREDNS_NAME), eq(NAMESPACE))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(false));
        cluster
            .expect_create_service()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        cluster
            .expect_patch_coredns()
            .with(eq(COREDNS_NAME), eq(NAMESPACE))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(UpdateOutcome::Updated));
        cluster.expect_delete_agent_deployments().never();

        let outcome = reconcile_request(&cluster, NAME, NAMESPACE).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Reconciled);
    }

    #[tokio::test]
    async fn existing_service_is_left_untouched() {
        let mut cluster = MockLighthouseCluster::new();

        expect_service_discovery(&mut cluster);
        cluster
            .expect_converge_deployment()
            .times(2)
            .returning(|_| Ok(ApplyOutcome::Unchanged));
        cluster
            .expect_converge_configmap()
            .returning(|_| Ok(ApplyOutcome::Unchanged));
        cluster.expect_service_exists().returning(|_, _| Ok(true));
        cluster.expect_create_service().never();
        cluster
            .expect_patch_coredns()
            .times(1)
            .returning(|_, _| Ok(UpdateOutcome::AlreadyApplied));

        let outcome = reconcile_request(&cluster, NAME, NAMESPACE).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Reconciled);
    }

    #[tokio::test]
    async fn agent_failure_aborts_before_resolver() {
        let mut cluster = MockLighthouseCluster::new();

        expect_service_discovery(&mut cluster);
        cluster
            .expect_converge_deployment()
            .times(1)
            .returning(|_| Err(OperationError::KubeApiError(api_error(500))));
        cluster.expect_converge_configmap().never();
        cluster.expect_service_exists().never();
        cluster.expect_create_service().never();
        cluster.expect_patch_coredns().never();

        let result = reconcile_request(&cluster, NAME, NAMESPACE).await;

        assert!(matches!(result, Err(ReconcilerError::ConvergeError(_))));
    }

    #[tokio::test]
    async fn configmap_failure_skips_resolver_deployment() {
        let mut cluster = MockLighthouseCluster::new();

        expect_service_discovery(&mut cluster);
        cluster
            .expect_converge_deployment()
            .withf(|deployment| is_named(deployment, AGENT_NAME))
            .times(1)
            .returning(|_| Ok(ApplyOutcome::Unchanged));
        cluster
            .expect_converge_configmap()
            .times(1)
            .returning(|_| Err(OperationError::KubeApiError(api_error(403))));
        cluster
            .expect_converge_deployment()
            .withf(|deployment| is_named(deployment, COREDNS_NAME))
            .never();
        cluster.expect_patch_coredns().never();

        let result = reconcile_request(&cluster, NAME, NAMESPACE).await;

        assert!(matches!(result, Err(ReconcilerError::ConvergeError(_))));
    }

    #[tokio::test]
    async fn missing_resolver_address_is_surfaced_for_a_short_requeue() {
        let mut cluster = MockLighthouseCluster::new();

        expect_service_discovery(&mut cluster);
        cluster
            .expect_converge_deployment()
            .returning(|_| Ok(ApplyOutcome::Unchanged));
        cluster
            .expect_converge_configmap()
            .returning(|_| Ok(ApplyOutcome::Unchanged));
        cluster.expect_service_exists().returning(|_, _| Ok(false));
        cluster.expect_create_service().times(1).returning(|_| Ok(()));
        cluster.expect_patch_coredns().returning(|_, _| {
            Err(TransactionError::Dependency(
                DnsPatchError::ResolverAddressUnavailable,
            ))
        });

        let error = reconcile_request(&cluster, NAME, NAMESPACE)
            .await
            .unwrap_err();

        assert!(error.is_waiting_for_resolver());
        assert_eq!(get_error_requeue(&error), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn missing_object_removes_agent_deployments() {
        let mut cluster = MockLighthouseCluster::new();

        cluster
            .expect_get_service_discovery()
            .returning(|_, _| Ok(None));
        cluster
            .expect_delete_agent_deployments()
            .with(eq(NAMESPACE))
            .times(1)
            .returning(|_| Ok(1));
        cluster.expect_converge_deployment().never();
        cluster.expect_patch_coredns().never();

        let outcome = reconcile_request(&cluster, NAME, NAMESPACE).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::CleanedUp(1));
    }

    #[tokio::test]
    async fn cleanup_without_matching_deployments_succeeds() {
        let mut cluster = MockLighthouseCluster::new();

        cluster
            .expect_get_service_discovery()
            .returning(|_, _| Ok(None));
        cluster
            .expect_delete_agent_deployments()
            .times(1)
            .returning(|_| Ok(0));

        let outcome = reconcile_request(&cluster, NAME, NAMESPACE).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::CleanedUp(0));
    }

    #[tokio::test]
    async fn transient_fetch_error_mutates_nothing() {
        let mut cluster = MockLighthouseCluster::new();

        cluster
            .expect_get_service_discovery()
            .returning(|_, _| Err(api_error(503)));
        cluster.expect_delete_agent_deployments().never();
        cluster.expect_converge_deployment().never();
        cluster.expect_converge_configmap().never();
        cluster.expect_create_service().never();
        cluster.expect_patch_coredns().never();

        let error = reconcile_request(&cluster, NAME, NAMESPACE)
            .await
            .unwrap_err();

        assert!(matches!(error, ReconcilerError::KubeApiError(_)));
        assert_eq!(get_error_requeue(&error), Duration::from_secs(10));
    }

    fn expect_children_converged(cluster: &mut MockLighthouseCluster) {
        cluster
            .expect_converge_deployment()
            .times(2)
            .returning(|_| Ok(ApplyOutcome::Unchanged));
        cluster
            .expect_converge_configmap()
            .returning(|_| Ok(ApplyOutcome::Unchanged));
    }

    #[tokio::test]
    async fn resolver_deployment_failure_aborts_before_service() {
        let mut cluster = MockLighthouseCluster::new();

        expect_service_discovery(&mut cluster);
        cluster
            .expect_converge_deployment()
            .withf(|deployment| is_named(deployment, AGENT_NAME))
            .times(1)
            .returning(|_| Ok(ApplyOutcome::Unchanged));
        cluster
            .expect_converge_configmap()
            .times(1)
            .returning(|_| Ok(ApplyOutcome::Unchanged));
        cluster
            .expect_converge_deployment()
            .withf(|deployment| is_named(deployment, COREDNS_NAME))
            .times(1)
            .returning(|_| Err(OperationError::KubeApiError(api_error(422))));
        cluster.expect_service_exists().never();
        cluster.expect_create_service().never();
        cluster.expect_patch_coredns().never();

        let error = reconcile_request(&cluster, NAME, NAMESPACE)
            .await
            .unwrap_err();

        assert!(matches!(error, ReconcilerError::ConvergeError(_)));
        assert_eq!(get_error_requeue(&error), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn service_creation_failure_aborts_before_patch() {
        let mut cluster = MockLighthouseCluster::new();

        expect_service_discovery(&mut cluster);
        expect_children_converged(&mut cluster);
        cluster.expect_service_exists().returning(|_, _| Ok(false));
        cluster
            .expect_create_service()
            .times(1)
            .returning(|_| Err(OperationError::KubeApiError(api_error(409))));
        cluster.expect_patch_coredns().never();

        let error = reconcile_request(&cluster, NAME, NAMESPACE)
            .await
            .unwrap_err();

        assert!(matches!(error, ReconcilerError::ConvergeError(_)));
    }

    #[tokio::test]
    async fn exhausted_patch_retries_use_the_default_requeue() {
        let mut cluster = MockLighthouseCluster::new();

        expect_service_discovery(&mut cluster);
        expect_children_converged(&mut cluster);
        cluster.expect_service_exists().returning(|_, _| Ok(true));
        cluster
            .expect_patch_coredns()
            .times(1)
            .returning(|_, _| Err(TransactionError::ConflictRetriesExhausted(5)));

        let error = reconcile_request(&cluster, NAME, NAMESPACE)
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            ReconcilerError::CorednsPatchError(TransactionError::ConflictRetriesExhausted(5))
        ));
        assert!(!error.is_waiting_for_resolver());
        assert_eq!(get_error_requeue(&error), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn unreadable_corefile_uses_the_default_requeue() {
        let mut cluster = MockLighthouseCluster::new();

        expect_service_discovery(&mut cluster);
        expect_children_converged(&mut cluster);
        cluster.expect_service_exists().returning(|_, _| Ok(true));
        cluster.expect_patch_coredns().returning(|_, _| {
            Err(TransactionError::Store(StoreError::KubeApiError(
                api_error(404),
            )))
        });

        let error = reconcile_request(&cluster, NAME, NAMESPACE)
            .await
            .unwrap_err();

        assert!(matches!(error, ReconcilerError::CorednsPatchError(_)));
        assert_eq!(get_error_requeue(&error), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn failed_cleanup_is_requeued() {
        let mut cluster = MockLighthouseCluster::new();

        cluster.expect_get_service_discovery().never();
        cluster
            .expect_delete_agent_deployments()
            .with(eq(NAMESPACE))
            .times(1)
            .returning(|_| Err(OperationError::KubeApiError(api_error(500))));

        let error = cleanup_request(&cluster, NAME, NAMESPACE)
            .await
            .unwrap_err();
        assert!(matches!(error, ReconcilerError::CleanupError(_)));

        let error = FinalizerError::CleanupFailed(error);
        assert_eq!(get_finalizer_error_requeue(&error), Duration::from_secs(10));
    }

    #[test]
    fn finalizer_errors_keep_the_resolver_wait_requeue() {
        let waiting = FinalizerError::ApplyFailed(ReconcilerError::CorednsPatchError(
            TransactionError::Dependency(DnsPatchError::ResolverAddressUnavailable),
        ));
        let unnamed = FinalizerError::<ReconcilerError>::UnnamedObject;
        let missing = FinalizerError::ApplyFailed(ReconcilerError::MissingObjectMetadata);

        assert_eq!(get_finalizer_error_requeue(&waiting), Duration::from_secs(5));
        assert_eq!(get_finalizer_error_requeue(&unnamed), Duration::from_secs(10));
        assert_eq!(get_finalizer_error_requeue(&missing), Duration::from_secs(10));
    }

    #[test]
    fn finalizer_is_scoped_to_the_crd() {
        assert_eq!(finalizer_name(), "servicediscoveries.submariner.io/cleanup");
    }
}
