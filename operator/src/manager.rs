use crate::{
    events::{KubeRecorder, Recorder},
    metrics::ReconcileMetrics,
    Config, Error, Metrics, Reconciler, Registry, Result, TraitReconciler, TraitReconcilerConfig, WorkloadReconciler,
    WorkloadReconcilerConfig,
};
use chrono::{DateTime, Utc};
use common::{store::KubeStore, Store};
use futures::{future::BoxFuture, FutureExt, StreamExt};
use kube::{
    api::{Api, ApiResource, DynamicObject, ListParams, ResourceExt},
    client::Client,
    runtime::{
        controller::{Action, Controller},
        watcher::Config as WatcherConfig,
    },
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

// Context for our reconcilers
pub struct Context<R> {
    pub reconciler: R,
    /// Access to the cluster objects
    pub store: Arc<dyn Store>,
    /// Diagnostics read by the web server
    pub diagnostics: Arc<RwLock<Diagnostics>>,
    /// Prometheus metrics
    pub metrics: ReconcileMetrics,
}

/// Diagnostics to be exposed by the web server
#[derive(Clone, Serialize)]
pub struct Diagnostics {
    pub last_event: DateTime<Utc>,
    pub reporter: String,
}

impl Diagnostics {
    #[must_use]
    pub fn new(reporter: &str) -> Self {
        Self {
            last_event: Utc::now(),
            reporter: reporter.to_string(),
        }
    }
}

#[instrument(skip(obj, ctx), fields(name = %obj.name_any()))]
pub async fn reconcile<R: Reconciler>(obj: Arc<DynamicObject>, ctx: Arc<Context<R>>) -> Result<Action> {
    ctx.diagnostics.write().await.last_event = Utc::now();
    let _measure = ctx.metrics.count_and_measure();
    let ns = obj.namespace().unwrap_or_default();
    ctx.reconciler.reconcile(ctx.store.as_ref(), &ns, &obj.name_any()).await
}

#[must_use]
pub fn error_policy<R: Reconciler>(obj: Arc<DynamicObject>, error: &Error, ctx: Arc<Context<R>>) -> Action {
    warn!("reconcile failed for {:?}: {:?}", obj.metadata.name, error);
    ctx.metrics.reconcile_failure(&obj, error);
    Action::requeue(ctx.reconciler.retry_after())
}

fn controller<R: Reconciler + 'static>(
    client: Client,
    resource: ApiResource,
    ctx: Arc<Context<R>>,
) -> BoxFuture<'static, ()> {
    let api = Api::<DynamicObject>::all_with(client, &resource);
    Controller::new_with(api, WatcherConfig::default().any_semantic(), resource)
        .run(reconcile::<R>, error_policy::<R>, ctx)
        .filter_map(|x| async move { std::result::Result::ok(x) })
        .for_each(|_| futures::future::ready(()))
        .boxed()
}

async fn ensure_crd(client: &Client, resource: &ApiResource) {
    let _r = Api::<DynamicObject>::all_with(client.clone(), resource)
        .list(&ListParams::default().limit(1))
        .await
        .expect("is the crd installed? please run: cargo run --bin crdgen | kubectl apply -f -");
}

/// Data owned by the Manager
#[derive(Clone)]
pub struct Manager {
    /// Diagnostics populated by the reconcilers
    diagnostics: Arc<RwLock<Diagnostics>>,
    metrics: Arc<Metrics>,
}

/// Manager that owns a Controller per registered workload and trait kind
impl Manager {
    /// Lifecycle initialization interface for app
    ///
    /// This returns a `Manager` and one future per controller.
    /// It is up to `main` to wait for the controller streams.
    pub async fn new(config: &Config, registry: Registry) -> (Self, Vec<BoxFuture<'static, ()>>) {
        let client = Client::try_default().await.expect("create client");
        let store: Arc<dyn Store> = Arc::new(KubeStore::new(client.clone()));
        let recorder: Arc<dyn Recorder> = Arc::new(KubeRecorder::new(client.clone(), &config.reporter));
        let diagnostics = Arc::new(RwLock::new(Diagnostics::new(&config.reporter)));
        let mut metrics = Metrics::default();
        let mut controllers = Vec::new();

        for kind in registry.workloads {
            ensure_crd(&client, &kind.resource).await;
            info!("starting the {} controller", kind.resource.kind);
            let ctx = Arc::new(Context {
                reconciler: WorkloadReconciler::new(
                    kind.resource.clone(),
                    WorkloadReconcilerConfig {
                        translator: Arc::new(kind.translator),
                        recorder: recorder.clone(),
                        timing: config.timing(),
                        ..WorkloadReconcilerConfig::default()
                    },
                ),
                store: store.clone(),
                diagnostics: diagnostics.clone(),
                metrics: metrics.controller(&kind.resource.kind),
            });
            controllers.push(controller(client.clone(), kind.resource, ctx));
        }

        for kind in registry.traits {
            ensure_crd(&client, &kind.resource).await;
            ensure_crd(&client, &kind.package).await;
            info!("starting the {} controller", kind.resource.kind);
            let ctx = Arc::new(Context {
                reconciler: TraitReconciler::with_package(
                    kind.resource.clone(),
                    kind.package,
                    TraitReconcilerConfig {
                        modifier: Arc::new(kind.modifier),
                        factory: registry.factory.clone(),
                        recorder: recorder.clone(),
                        timing: config.timing(),
                        ..TraitReconcilerConfig::default()
                    },
                ),
                store: store.clone(),
                diagnostics: diagnostics.clone(),
                metrics: metrics.controller(&kind.resource.kind),
            });
            controllers.push(controller(client.clone(), kind.resource, ctx));
        }

        let manager = Manager {
            diagnostics,
            metrics: Arc::new(metrics),
        };
        (manager, controllers)
    }

    /// Metrics getter
    #[must_use]
    pub fn metrics(&self) -> String {
        self.metrics.encode()
    }

    /// State getter
    pub async fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.read().await.clone()
    }
}
