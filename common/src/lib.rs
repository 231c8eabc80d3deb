use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("SerializationError: {0}")]
    SerializationError(#[source] serde_json::Error),

    #[error("K8s error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("object of kind {found} is not a {expected}")]
    TypeMismatch { expected: String, found: String },

    #[error("object passed to the {expected} accessor is not a {expected} but a {found}")]
    WrongCarrierType { expected: String, found: String },

    #[error("no {kind} named {name} found for trait in KubernetesApplication")]
    NotFoundForTrait { kind: String, name: String },

    #[error("object to be modified is not a {expected} but a {found}")]
    NotRunnableUnit { expected: String, found: String },

    #[error("trait has no workload reference: {0}")]
    MissingWorkloadReference(String),

    #[error("unable to wrap objects in KubernetesApplication: {0}")]
    WrapFailure(#[source] serde_json::Error),

    #[error("unable to inject Service in objects: {0}")]
    InjectFailure(String),

    #[error("existing {kind} {name} has a different (or no) controller")]
    ControllerConflict { kind: String, name: String },

    #[error("cannot merge KubernetesApplicationResourceTemplates: {0}")]
    MergeFailure(String),

    #[error("cannot get KubernetesApplication: {0}")]
    GetFailure(#[source] Box<Error>),

    #[error("cannot create KubernetesApplication: {0}")]
    CreateFailure(#[source] Box<Error>),

    #[error("cannot patch existing KubernetesApplication: {0}")]
    PatchFailure(#[source] Box<Error>),

    #[error("Error: {0}")]
    Other(String),
}
impl Error {
    #[must_use]
    pub fn metric_label(&self) -> String {
        format!("{self:?}").to_lowercase()
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub mod application;
pub mod apply;
pub mod condition;
pub mod containerized;
pub mod manualscaler;
pub mod merge;
pub mod modify;
pub mod object;
pub mod resource;
pub mod store;
pub mod storemock;
pub mod translate;
pub mod workload;

pub use application::{KubernetesApplication, KubernetesApplicationResourceTemplate};
pub use condition::{ApplicationCondition, ConditionsStatus, ConditionsType};
pub use manualscaler::ManualScalerTrait;
pub use object::{Object, ObjectFactory};
pub use store::Store;
pub use workload::ContainerizedWorkload;

/// Label binding every template of a KubernetesApplication to the workload it was derived from.
pub static LABEL_KEY: &str = "workload.oam.dev/uid";
