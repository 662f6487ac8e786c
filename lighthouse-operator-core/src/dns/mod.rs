//! Injection of the supercluster forwarding rule into the cluster's CoreDNS
//! configuration.
//!
//! The CoreDNS config map belongs to the cluster, not to this operator, and
//! may be written concurrently by other actors and by overlapping reconciles.
//! The patch therefore runs as a guarded transaction (see
//! [`crate::kubernetes::transaction`]) and is skipped whenever a previous
//! run already left its marks in the Corefile.

use async_trait::async_trait;
use kube::Client;
use log::info;
use thiserror::Error;

use crate::{
    kubernetes::{
        configmap::ConfigMapKeyStore,
        service::{ClusterIpSource, ServiceClusterIp},
        transaction::{
            run_guarded_update, ConflictRetry, GuardedUpdate, TransactionError, UpdateOutcome,
        },
    },
    OPERATOR_FIELD_MANAGER,
};

use self::corefile::{has_lighthouse_marker, has_supercluster_zone, prepend_forward_block, COREFILE_KEY};

pub mod corefile;

pub const DEFAULT_COREDNS_NAMESPACE: &str = "kube-system";
pub const DEFAULT_COREDNS_CONFIGMAP: &str = "coredns";

/// Location of the CoreDNS config map to patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorednsTarget {
    pub namespace: String,
    pub name: String,
}

impl Default for CorednsTarget {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_COREDNS_NAMESPACE.to_owned(),
            name: DEFAULT_COREDNS_CONFIGMAP.to_owned(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DnsPatchError {
    #[error("Lighthouse DNS service ClusterIP should be available!")]
    ResolverAddressUnavailable,
    #[error("Couldn't retrieve the lighthouse DNS service! Reason: {}", .0)]
    KubeApiError(kube::Error),
}

pub type CorednsPatchError = TransactionError<DnsPatchError>;

/// Prepends a `supercluster.local` forwarding block pointing at the
/// resolver's cluster IP.
pub struct SuperclusterForward<R> {
    resolver: R,
}

impl<R: ClusterIpSource> SuperclusterForward<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl<R: ClusterIpSource> GuardedUpdate for SuperclusterForward<R> {
    type Value = String;
    type Dependency = String;
    type Error = DnsPatchError;

    fn is_applied(&self, current: &String) -> bool {
        has_lighthouse_marker(current)
    }

    async fn resolve_dependency(&self) -> Result<String, DnsPatchError> {
        self.resolver
            .cluster_ip()
            .await
            .map_err(DnsPatchError::KubeApiError)?
            .ok_or(DnsPatchError::ResolverAddressUnavailable)
    }

    fn is_partially_applied(&self, current: &String) -> bool {
        has_supercluster_zone(current)
    }

    fn apply(&self, current: String, resolver_address: String) -> String {
        prepend_forward_block(&current, &resolver_address)
    }
}

/// Makes sure the CoreDNS Corefile forwards the supercluster zone to the
/// lighthouse resolver service `resolver_name` in `resolver_namespace`.
pub async fn patch_coredns(
    client: &Client,
    target: &CorednsTarget,
    resolver_name: &str,
    resolver_namespace: &str,
    retry: &ConflictRetry,
) -> Result<UpdateOutcome, CorednsPatchError> {
    let store = ConfigMapKeyStore::new(
        client,
        &target.namespace,
        &target.name,
        COREFILE_KEY,
        OPERATOR_FIELD_MANAGER,
    );
    let update = SuperclusterForward::new(ServiceClusterIp::new(
        client,
        resolver_name,
        resolver_namespace,
    ));

    let outcome = run_guarded_update(&store, &update, retry).await?;

    if let UpdateOutcome::Updated = outcome {
        info!(
            "Updated '{}/{}' Corefile to forward {} queries",
            target.namespace,
            target.name,
            corefile::SUPERCLUSTER_DOMAIN
        );
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicU32, Ordering},
            Arc, Mutex,
        },
        time::Duration,
    };

    use futures::future::join_all;

    use crate::kubernetes::transaction::{StoreError, Versioned, VersionedStore};

    use super::*;

    const KUBE_COREFILE: &str = ".:53 {\n    errors\n    kubernetes cluster.local\n    forward . /etc/resolv.conf\n}\n";

    /// Corefile store enforcing resource versions, optionally letting an
    /// outside actor edit the content right before the first write lands.
    struct CorefileStore {
        state: Mutex<(u64, String)>,
        writes: AtomicU32,
        foreign_edit: Mutex<Option<&'static str>>,
    }

    impl CorefileStore {
        fn new(corefile: &str) -> Self {
            Self {
                state: Mutex::new((1, corefile.to_owned())),
                writes: AtomicU32::new(0),
                foreign_edit: Mutex::new(None),
            }
        }

        fn with_foreign_edit(self, suffix: &'static str) -> Self {
            *self.foreign_edit.lock().unwrap() = Some(suffix);
            self
        }

        fn content(&self) -> String {
            self.state.lock().unwrap().1.clone()
        }

        fn writes(&self) -> u32 {
            self.writes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VersionedStore for CorefileStore {
        type Value = String;

        async fn load(&self) -> Result<Versioned<String>, StoreError> {
            let loaded = {
                let state = self.state.lock().unwrap();
                Versioned {
                    value: state.1.clone(),
                    version: Some(state.0.to_string()),
                }
            };

            // let other writers interleave between the read and the write
            tokio::task::yield_now().await;

            Ok(loaded)
        }

        async fn store(&self, update: Versioned<String>) -> Result<(), StoreError> {
            let foreign_edit = self.foreign_edit.lock().unwrap().take();
            let mut state = self.state.lock().unwrap();

            if let Some(suffix) = foreign_edit {
                state.1.push_str(suffix);
                state.0 += 1;
            }

            if update.version != Some(state.0.to_string()) {
                return Err(StoreError::Conflict);
            }

            self.writes.fetch_add(1, Ordering::SeqCst);
            *state = (state.0 + 1, update.value);

            Ok(())
        }
    }

    struct FixedClusterIp(Option<&'static str>);

    #[async_trait]
    impl ClusterIpSource for FixedClusterIp {
        async fn cluster_ip(&self) -> Result<Option<String>, kube::Error> {
            Ok(self.0.map(str::to_owned))
        }
    }

    fn retry() -> ConflictRetry {
        ConflictRetry {
            max_attempts: 10,
            delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn injects_forward_block_before_existing_content() {
        let store = CorefileStore::new(KUBE_COREFILE);
        let update = SuperclusterForward::new(FixedClusterIp(Some("10.0.0.5")));

        let outcome = run_guarded_update(&store, &update, &retry()).await.unwrap();
        let content = store.content();

        assert_eq!(outcome, UpdateOutcome::Updated);
        assert_eq!(store.writes(), 1);
        assert_eq!(content.matches("forward . 10.0.0.5").count(), 1);
        assert!(content.starts_with("#lighthouse\nsupercluster.local {\n"));
        assert!(content.ends_with(KUBE_COREFILE));
    }

    #[tokio::test]
    async fn marked_corefile_is_left_untouched() {
        let patched = prepend_forward_block(KUBE_COREFILE, "10.0.0.1");
        let store = CorefileStore::new(&patched);
        let update = SuperclusterForward::new(FixedClusterIp(Some("10.0.0.5")));

        let outcome = run_guarded_update(&store, &update, &retry()).await.unwrap();

        assert_eq!(outcome, UpdateOutcome::AlreadyApplied);
        assert_eq!(store.writes(), 0);
        assert_eq!(store.content(), patched);
    }

    #[tokio::test]
    async fn partial_supercluster_block_is_left_untouched() {
        let partial = format!("supercluster.local {{\nforward . 10.0.0.1\n}}\n{KUBE_COREFILE}");
        let store = CorefileStore::new(&partial);
        let update = SuperclusterForward::new(FixedClusterIp(Some("10.0.0.5")));

        let outcome = run_guarded_update(&store, &update, &retry()).await.unwrap();

        assert_eq!(outcome, UpdateOutcome::AlreadyApplied);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn unallocated_resolver_address_fails_without_writing() {
        let store = CorefileStore::new(KUBE_COREFILE);
        let update = SuperclusterForward::new(FixedClusterIp(None));

        let result = run_guarded_update(&store, &update, &retry()).await;

        assert!(matches!(
            result,
            Err(TransactionError::Dependency(DnsPatchError::ResolverAddressUnavailable))
        ));
        assert_eq!(store.writes(), 0);
        assert_eq!(store.content(), KUBE_COREFILE);
    }

    #[tokio::test]
    async fn empty_corefile_gets_only_the_forward_block() {
        let store = CorefileStore::new("");
        let update = SuperclusterForward::new(FixedClusterIp(Some("10.0.0.5")));

        run_guarded_update(&store, &update, &retry()).await.unwrap();

        assert_eq!(
            store.content(),
            "#lighthouse\nsupercluster.local {\nforward . 10.0.0.5\n}\n"
        );
    }

    #[tokio::test]
    async fn foreign_write_is_preserved_after_conflict() {
        let store = CorefileStore::new(KUBE_COREFILE).with_foreign_edit("# edited elsewhere\n");
        let update = SuperclusterForward::new(FixedClusterIp(Some("10.0.0.5")));

        let outcome = run_guarded_update(&store, &update, &retry()).await.unwrap();
        let content = store.content();

        assert_eq!(outcome, UpdateOutcome::Updated);
        assert_eq!(store.writes(), 1);
        assert_eq!(content.matches("forward . 10.0.0.5").count(), 1);
        assert!(content.ends_with("# edited elsewhere\n"));
    }

    #[tokio::test]
    async fn concurrent_patches_converge_to_a_single_block() {
        let store = Arc::new(CorefileStore::new(KUBE_COREFILE));
        let retry = retry();

        let patches = (0..8).map(|_| {
            let store = store.clone();
            async move {
                let update = SuperclusterForward::new(FixedClusterIp(Some("10.0.0.5")));
                run_guarded_update(store.as_ref(), &update, &retry).await
            }
        });
        let results = join_all(patches).await;

        assert!(results.iter().all(|result| result.is_ok()));
        assert_eq!(
            results
                .iter()
                .filter(|result| matches!(result, Ok(UpdateOutcome::Updated)))
                .count(),
            1
        );
        assert_eq!(store.writes(), 1);
        assert_eq!(store.content().matches("#lighthouse").count(), 1);
        assert!(store.content().ends_with(KUBE_COREFILE));
    }
}
