use async_trait::async_trait;
use common::Store;
use kube::runtime::controller::Action;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot get object to reconcile: {0}")]
    Get(#[source] common::Error),

    #[error("cannot translate workload: {0}")]
    Translate(#[source] common::Error),

    #[error("cannot apply workload translation: {0}")]
    ApplyTranslation(#[source] common::Error),

    #[error("cannot get package for workload reference in trait: {0}")]
    GetPackage(#[source] common::Error),

    #[error("cannot apply trait modification: {0}")]
    Modify(#[source] common::Error),

    #[error("cannot apply trait modification to workload package: {0}")]
    ApplyModification(#[source] common::Error),

    #[error("cannot update status: {0}")]
    UpdateStatus(#[source] common::Error),
}
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    #[must_use]
    pub fn metric_label(&self) -> String {
        format!("{self:?}").to_lowercase()
    }
}

/// One reconciliation attempt for the object (namespace, name) of a managed kind.
///
/// Domain failures end up in the object status; only a failing status write is
/// returned as an error.
#[async_trait]
pub trait Reconciler: Send + Sync {
    async fn reconcile(&self, store: &dyn Store, ns: &str, name: &str) -> Result<Action>;
    /// Delay before retrying after a hard error
    fn retry_after(&self) -> Duration;
}

pub mod config;
pub use config::{Config, Timing};
pub mod events;
pub mod outcome;
pub mod registry;
pub use registry::Registry;

pub mod oamtrait;
pub use oamtrait::{TraitReconciler, TraitReconcilerConfig};
pub mod workload;
pub use workload::{WorkloadReconciler, WorkloadReconcilerConfig};

/// State machinery for kube, as exposeable to actix
pub mod manager;
pub use manager::Manager;

/// Metrics
mod metrics;
pub use metrics::Metrics;
