use crate::{
    events::{self, NoopRecorder, Recorder},
    outcome::Outcome,
    Error, Reconciler, Result, Timing,
};
use async_trait::async_trait;
use common::{
    apply::{ApplicationApplicator, Applicator, ApplyOptions},
    modify::{AccessingModifier, Modifier},
    resource::workload_reference,
    KubernetesApplication, ObjectFactory, Store,
};
use kube::{
    api::{ApiResource, DynamicObject},
    runtime::controller::Action,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, instrument, warn};

/// Everything a trait reconciler can be customized with
#[derive(Clone)]
pub struct TraitReconcilerConfig {
    /// Changes the package of the referenced workload, nothing by default
    pub modifier: Arc<dyn Modifier>,
    pub applicator: Arc<dyn Applicator>,
    pub apply_options: ApplyOptions,
    /// Builds the typed package from the stored one
    pub factory: ObjectFactory,
    /// Drops events by default
    pub recorder: Arc<dyn Recorder>,
    pub timing: Timing,
}

impl Default for TraitReconcilerConfig {
    fn default() -> Self {
        Self {
            modifier: Arc::new(AccessingModifier::default()),
            applicator: Arc::new(ApplicationApplicator),
            apply_options: ApplyOptions::controllers_must_match(),
            factory: ObjectFactory::default(),
            recorder: Arc::new(NoopRecorder),
            timing: Timing::default(),
        }
    }
}

/// Applies traits of one kind to the package of the workload they reference
pub struct TraitReconciler {
    resource: ApiResource,
    package: ApiResource,
    config: TraitReconcilerConfig,
}

impl TraitReconciler {
    /// Reconciler for traits modifying KubernetesApplication packages
    #[must_use]
    pub fn new(resource: ApiResource, config: TraitReconcilerConfig) -> Self {
        Self::with_package(resource, ApiResource::erase::<KubernetesApplication>(&()), config)
    }

    #[must_use]
    pub fn with_package(resource: ApiResource, package: ApiResource, config: TraitReconcilerConfig) -> Self {
        Self {
            resource,
            package,
            config,
        }
    }

    async fn modify_and_apply(&self, store: &dyn Store, ns: &str, tr: &DynamicObject) -> Outcome {
        let timing = &self.config.timing;
        let workload = match workload_reference(tr) {
            Ok(r) => r.name,
            Err(e) => {
                let err = Error::GetPackage(e);
                return Outcome::failed(&err, events::cannot_get_package(&err), timing.short_wait);
            }
        };
        let package = match store.get(&self.package, ns, &workload).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                debug!("no {} {}/{} yet", self.package.kind, ns, workload);
                return Outcome::waiting(
                    &format!("waiting for {} {} to exist", self.package.kind, workload),
                    events::waiting_for_package(&workload),
                    timing.short_wait,
                );
            }
            Err(e) => {
                let err = Error::GetPackage(e);
                return Outcome::failed(&err, events::cannot_get_package(&err), timing.short_wait);
            }
        };
        let mut obj = match self.config.factory.build(package) {
            Ok(obj) => obj,
            Err(e) => {
                let err = Error::GetPackage(e);
                return Outcome::failed(&err, events::cannot_get_package(&err), timing.short_wait);
            }
        };
        match self.config.modifier.modify(&mut obj, tr) {
            Ok(()) => {}
            Err(e @ common::Error::NotFoundForTrait { .. }) => {
                return Outcome::waiting(&e.to_string(), events::waiting_for_package(&workload), timing.short_wait);
            }
            Err(e) => {
                let err = Error::Modify(e);
                return Outcome::failed(&err, events::cannot_modify(&err), timing.short_wait);
            }
        }
        if let Err(e) = self
            .config
            .applicator
            .apply(store, &obj, &self.config.apply_options)
            .await
        {
            let err = Error::ApplyModification(e);
            return Outcome::failed(&err, events::cannot_apply_modification(&err), timing.short_wait);
        }
        Outcome::ready(events::package_modified(&workload), timing.long_wait)
    }

    async fn attempt(&self, store: &dyn Store, ns: &str, name: &str) -> Result<Action> {
        let Some(tr) = store.get(&self.resource, ns, name).await.map_err(Error::Get)? else {
            debug!("{} {}/{} is gone", self.resource.kind, ns, name);
            return Ok(Action::await_change());
        };
        self.modify_and_apply(store, ns, &tr)
            .await
            .persist(store, self.config.recorder.as_ref(), &self.resource, &tr)
            .await
    }
}

#[async_trait]
impl Reconciler for TraitReconciler {
    #[instrument(skip(self, store), fields(kind = %self.resource.kind))]
    async fn reconcile(&self, store: &dyn Store, ns: &str, name: &str) -> Result<Action> {
        let timing = self.config.timing;
        match tokio::time::timeout(timing.timeout, self.attempt(store, ns, name)).await {
            Ok(res) => res,
            Err(_) => {
                warn!("reconciling {} {}/{} timed out", self.resource.kind, ns, name);
                Ok(Action::requeue(timing.short_wait))
            }
        }
    }

    fn retry_after(&self) -> Duration {
        self.config.timing.short_wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        events::MemoryRecorder,
        workload::{WorkloadReconciler, WorkloadReconcilerConfig},
    };
    use common::{
        condition::{REASON_ERROR, REASON_SUCCESS, REASON_WAITING},
        containerized::{containerized_translator, manual_scaler_modifier},
        modify::DeploymentAccessor,
        resource::conditions,
        storemock::{MemoryStore, Operation},
        translate::{application_wrapper, service_injector, WrappedTranslator},
        ApplicationCondition, ConditionsStatus, ContainerizedWorkload, ManualScalerTrait,
    };
    use serde_json::{json, Value};

    fn trait_ar() -> ApiResource {
        ApiResource::erase::<ManualScalerTrait>(&())
    }

    fn workload_ar() -> ApiResource {
        ApiResource::erase::<ContainerizedWorkload>(&())
    }

    fn app_ar() -> ApiResource {
        ApiResource::erase::<KubernetesApplication>(&())
    }

    fn seed_trait(store: &MemoryStore, count: i32) {
        let tr = DynamicObject::new("cool-trait", &trait_ar())
            .within("cool-namespace")
            .data(json!({"spec": {"replicaCount": count, "workloadRef": {
                "apiVersion": "core.oam.dev/v1alpha2", "kind": "ContainerizedWorkload", "name": "cool-workload"}}}));
        store.insert(&trait_ar(), &tr).unwrap();
    }

    fn seed_workload(store: &MemoryStore) {
        let mut w = DynamicObject::new("cool-workload", &workload_ar())
            .within("cool-namespace")
            .data(json!({"spec": {"containers": [{
                "name": "web", "image": "nginx", "ports": [{"name": "http", "containerPort": 3000}]}]}}));
        w.metadata.uid = Some("cool-uid".to_string());
        store.insert(&workload_ar(), &w).unwrap();
    }

    fn trait_reconciler(recorder: Arc<MemoryRecorder>) -> TraitReconciler {
        TraitReconciler::new(
            trait_ar(),
            TraitReconcilerConfig {
                modifier: Arc::new(AccessingModifier::new(manual_scaler_modifier, DeploymentAccessor)),
                recorder,
                ..TraitReconcilerConfig::default()
            },
        )
    }

    fn workload_reconciler() -> WorkloadReconciler {
        WorkloadReconciler::new(
            workload_ar(),
            WorkloadReconcilerConfig {
                translator: Arc::new(WrappedTranslator::new(
                    containerized_translator,
                    vec![service_injector, application_wrapper],
                )),
                ..WorkloadReconcilerConfig::default()
            },
        )
    }

    fn status(store: &MemoryStore) -> Vec<ApplicationCondition> {
        conditions(&store.object(&trait_ar(), "cool-namespace", "cool-trait").unwrap())
    }

    fn templates(store: &MemoryStore) -> Vec<Value> {
        let app = store.object(&app_ar(), "cool-namespace", "cool-workload").unwrap();
        app.data["spec"]["resourceTemplates"].as_array().unwrap().clone()
    }

    async fn reconcile_trait(store: &MemoryStore, recorder: Arc<MemoryRecorder>) -> Action {
        trait_reconciler(recorder)
            .reconcile(store, "cool-namespace", "cool-trait")
            .await
            .unwrap()
    }

    async fn reconcile_workload(store: &MemoryStore) {
        workload_reconciler()
            .reconcile(store, "cool-namespace", "cool-workload")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_trait_gone() {
        let store = MemoryStore::new();
        let action = reconcile_trait(&store, Arc::new(MemoryRecorder::default())).await;
        assert_eq!(action, Action::await_change());
        assert!(store.writes(Operation::UpdateStatus).is_empty());
    }

    #[tokio::test]
    async fn test_trait_waits_for_package() {
        let store = MemoryStore::new();
        seed_trait(&store, 3);
        let recorder = Arc::new(MemoryRecorder::default());
        let action = reconcile_trait(&store, recorder.clone()).await;
        assert_eq!(action, Action::requeue(Timing::default().short_wait));
        let conds = status(&store);
        assert_eq!(conds[0].status, ConditionsStatus::True);
        assert_eq!(conds[0].reason, REASON_WAITING);
        assert_eq!(recorder.reasons(), vec![events::REASON_WAITING_FOR_PACKAGE]);
    }

    #[tokio::test]
    async fn test_trait_waits_for_target_in_package() {
        let store = MemoryStore::new();
        seed_trait(&store, 3);
        let mut app = KubernetesApplication::new("cool-workload", Default::default());
        app.metadata.namespace = Some("cool-namespace".to_string());
        let raw: DynamicObject = serde_json::from_value(serde_json::to_value(&app).unwrap()).unwrap();
        store.insert(&app_ar(), &raw).unwrap();
        reconcile_trait(&store, Arc::new(MemoryRecorder::default())).await;
        let conds = status(&store);
        assert_eq!(conds[0].reason, REASON_WAITING);
        assert!(store.writes(Operation::Patch).is_empty());
    }

    #[tokio::test]
    async fn test_trait_package_fetch_failure() {
        let store = MemoryStore::new();
        seed_trait(&store, 3);
        store.fail_kind(Operation::Get, "KubernetesApplication");
        let recorder = Arc::new(MemoryRecorder::default());
        let action = reconcile_trait(&store, recorder.clone()).await;
        assert_eq!(action, Action::requeue(Timing::default().short_wait));
        let conds = status(&store);
        assert_eq!(conds[0].status, ConditionsStatus::False);
        assert_eq!(conds[0].reason, REASON_ERROR);
        assert!(conds[0]
            .message
            .starts_with("cannot get package for workload reference in trait"));
        assert_eq!(recorder.reasons(), vec![events::REASON_CANNOT_GET_PACKAGE]);
    }

    #[tokio::test]
    async fn test_trait_without_workload_reference() {
        let store = MemoryStore::new();
        let tr = DynamicObject::new("cool-trait", &trait_ar())
            .within("cool-namespace")
            .data(json!({"spec": {"replicaCount": 3}}));
        store.insert(&trait_ar(), &tr).unwrap();
        let recorder = Arc::new(MemoryRecorder::default());
        let action = reconcile_trait(&store, recorder.clone()).await;
        assert_eq!(action, Action::requeue(Timing::default().short_wait));
        let conds = status(&store);
        assert_eq!(conds[0].reason, REASON_ERROR);
        assert!(conds[0]
            .message
            .starts_with("cannot get package for workload reference in trait"));
        assert_eq!(recorder.reasons(), vec![events::REASON_CANNOT_GET_PACKAGE]);
    }

    #[tokio::test]
    async fn test_trait_attempt_abandoned_after_timeout() {
        let timing = Timing {
            timeout: Duration::from_millis(10),
            ..Timing::default()
        };
        let store = MemoryStore::new();
        seed_trait(&store, 3);
        store.slow(Duration::from_secs(5));
        let recorder = Arc::new(MemoryRecorder::default());
        let r = TraitReconciler::new(
            trait_ar(),
            TraitReconcilerConfig {
                recorder: recorder.clone(),
                timing,
                ..TraitReconcilerConfig::default()
            },
        );
        let action = r.reconcile(&store, "cool-namespace", "cool-trait").await.unwrap();
        assert_eq!(action, Action::requeue(timing.short_wait));
        assert!(store.writes(Operation::UpdateStatus).is_empty());
        assert!(recorder.reasons().is_empty());
    }

    #[tokio::test]
    async fn test_trait_apply_failure() {
        let store = MemoryStore::new();
        seed_trait(&store, 3);
        seed_workload(&store);
        reconcile_workload(&store).await;
        store.fail(Operation::Patch);
        let recorder = Arc::new(MemoryRecorder::default());
        let action = reconcile_trait(&store, recorder.clone()).await;
        assert_eq!(action, Action::requeue(Timing::default().short_wait));
        let conds = status(&store);
        assert_eq!(conds[0].reason, REASON_ERROR);
        assert!(conds[0]
            .message
            .starts_with("cannot apply trait modification to workload package"));
        assert_eq!(recorder.reasons(), vec![events::REASON_CANNOT_APPLY_MODIFICATION]);
    }

    #[tokio::test]
    async fn test_trait_modifier_failure() {
        let store = MemoryStore::new();
        seed_trait(&store, 3);
        seed_workload(&store);
        reconcile_workload(&store).await;
        let failing = |_: &mut common::Object, _: &DynamicObject| -> common::Result<()> {
            Err(common::Error::Other("no way".to_string()))
        };
        let recorder = Arc::new(MemoryRecorder::default());
        let r = TraitReconciler::new(
            trait_ar(),
            TraitReconcilerConfig {
                modifier: Arc::new(failing),
                recorder: recorder.clone(),
                ..TraitReconcilerConfig::default()
            },
        );
        r.reconcile(&store, "cool-namespace", "cool-trait").await.unwrap();
        let conds = status(&store);
        assert_eq!(conds[0].status, ConditionsStatus::False);
        assert!(conds[0].message.starts_with("cannot apply trait modification"));
        assert_eq!(recorder.reasons(), vec![events::REASON_CANNOT_MODIFY]);
    }

    #[tokio::test]
    async fn test_workload_then_trait() {
        let store = MemoryStore::new();
        seed_workload(&store);
        seed_trait(&store, 1);
        reconcile_workload(&store).await;
        let before = templates(&store);
        assert_eq!(before.len(), 2);

        let recorder = Arc::new(MemoryRecorder::default());
        let action = reconcile_trait(&store, recorder.clone()).await;
        assert_eq!(action, Action::requeue(Timing::default().long_wait));
        assert_eq!(status(&store)[0].reason, REASON_SUCCESS);
        assert_eq!(recorder.reasons(), vec![events::REASON_PACKAGE_MODIFIED]);
        assert_eq!(templates(&store)[0]["spec"]["template"]["spec"]["replicas"], 1);

        // scale from 1 to 3, then let the workload be translated again
        seed_trait(&store, 3);
        reconcile_trait(&store, recorder.clone()).await;
        reconcile_workload(&store).await;

        let after = templates(&store);
        assert_eq!(after.len(), 2);
        assert_eq!(after[0]["spec"]["template"]["spec"]["replicas"], 3);
        for (b, a) in before.iter().zip(after.iter()) {
            assert_eq!(b["metadata"], a["metadata"]);
            assert_eq!(b["spec"]["template"]["kind"], a["spec"]["template"]["kind"]);
            let mut a = a["spec"]["template"].clone();
            if let Some(spec) = a["spec"].as_object_mut() {
                spec.remove("replicas");
            }
            assert_eq!(b["spec"]["template"], a);
        }
    }
}
