use crate::{
    events::{self, NoopRecorder, Recorder},
    outcome::Outcome,
    Error, Reconciler, Result, Timing,
};
use async_trait::async_trait;
use common::{
    apply::{ApplicationApplicator, Applicator, ApplyOptions},
    translate::{noop_translate, Translator},
    Store,
};
use kube::{
    api::{ApiResource, DynamicObject},
    runtime::controller::Action,
    ResourceExt,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, instrument, warn};

/// Everything a workload reconciler can be customized with
#[derive(Clone)]
pub struct WorkloadReconcilerConfig {
    /// Produces the package of a workload, nothing by default.
    ///
    /// The wrapper chain travels with the translator: pass a `WrappedTranslator`
    /// holding the base translator and its wrappers, in order.
    pub translator: Arc<dyn Translator>,
    /// Writes the package, as a KubernetesApplication by default
    pub applicator: Arc<dyn Applicator>,
    pub apply_options: ApplyOptions,
    /// Drops events by default
    pub recorder: Arc<dyn Recorder>,
    pub timing: Timing,
}

impl Default for WorkloadReconcilerConfig {
    fn default() -> Self {
        Self {
            translator: Arc::new(noop_translate),
            applicator: Arc::new(ApplicationApplicator),
            apply_options: ApplyOptions::controllers_must_match(),
            recorder: Arc::new(NoopRecorder),
            timing: Timing::default(),
        }
    }
}

/// Translates workloads of one kind into packages and applies them
pub struct WorkloadReconciler {
    resource: ApiResource,
    config: WorkloadReconcilerConfig,
}

impl WorkloadReconciler {
    #[must_use]
    pub fn new(resource: ApiResource, config: WorkloadReconcilerConfig) -> Self {
        Self { resource, config }
    }

    async fn translate_and_apply(&self, store: &dyn Store, workload: &DynamicObject) -> Outcome {
        let timing = &self.config.timing;
        let objs = match self.config.translator.translate(workload) {
            Ok(objs) => objs,
            Err(e) => {
                let err = Error::Translate(e);
                return Outcome::failed(&err, events::cannot_translate(&err), timing.short_wait);
            }
        };
        debug!("{} translated into {} object(s)", workload.name_any(), objs.len());
        for obj in &objs {
            if let Err(e) = self
                .config
                .applicator
                .apply(store, obj, &self.config.apply_options)
                .await
            {
                let err = Error::ApplyTranslation(e);
                return Outcome::failed(&err, events::cannot_apply_translation(&err), timing.short_wait);
            }
        }
        Outcome::ready(events::workload_translated(&workload.name_any()), timing.long_wait)
    }

    async fn attempt(&self, store: &dyn Store, ns: &str, name: &str) -> Result<Action> {
        let Some(workload) = store.get(&self.resource, ns, name).await.map_err(Error::Get)? else {
            debug!("{} {}/{} is gone", self.resource.kind, ns, name);
            return Ok(Action::await_change());
        };
        self.translate_and_apply(store, &workload)
            .await
            .persist(store, self.config.recorder.as_ref(), &self.resource, &workload)
            .await
    }
}

#[async_trait]
impl Reconciler for WorkloadReconciler {
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
