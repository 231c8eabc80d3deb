use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::{
    runtime::events::{Event, EventType, Recorder as KubeEventRecorder, Reporter},
    Client,
};
use tracing::warn;

pub static REASON_WORKLOAD_TRANSLATED: &str = "WorkloadTranslated";
pub static REASON_CANNOT_TRANSLATE: &str = "CannotTranslateWorkload";
pub static REASON_CANNOT_APPLY_TRANSLATION: &str = "CannotApplyWorkloadTranslation";
pub static REASON_WAITING_FOR_PACKAGE: &str = "WaitingForWorkloadPackage";
pub static REASON_PACKAGE_MODIFIED: &str = "PackageModified";
pub static REASON_CANNOT_GET_PACKAGE: &str = "CannotGetReferencedWorkloadPackage";
pub static REASON_CANNOT_MODIFY: &str = "CannotModifyPackage";
pub static REASON_CANNOT_APPLY_MODIFICATION: &str = "CannotApplyModification";

/// Where reconcilers report what they did
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Failures are logged, never returned
    async fn publish(&self, ev: Event, oref: ObjectReference);
}

pub struct NoopRecorder;

#[async_trait]
impl Recorder for NoopRecorder {
    async fn publish(&self, _ev: Event, _oref: ObjectReference) {}
}

/// Publish events to the cluster, with one kube recorder per reported object
pub struct KubeRecorder {
    client: Client,
    reporter: Reporter,
}

impl KubeRecorder {
    #[must_use]
    pub fn new(client: Client, reporter: &str) -> Self {
        Self {
            client,
            reporter: Reporter {
                controller: reporter.to_string(),
                instance: std::env::var("POD_NAME").ok(),
            },
        }
    }
}

#[async_trait]
impl Recorder for KubeRecorder {
    async fn publish(&self, ev: Event, oref: ObjectReference) {
        let reason = ev.reason.clone();
        let name = oref.name.clone();
        let recorder = KubeEventRecorder::new(self.client.clone(), self.reporter.clone(), oref);
        if let Err(e) = recorder.publish(ev).await {
            warn!("cannot publish event {reason} for {name:?}: {e}");
        }
    }
}

fn normal(reason: &str, action: &str, note: String) -> Event {
    Event {
        type_: EventType::Normal,
        reason: reason.to_string(),
        note: Some(note),
        action: action.to_string(),
        secondary: None,
    }
}

fn warning(reason: &str, action: &str, note: String) -> Event {
    Event {
        type_: EventType::Warning,
        reason: reason.to_string(),
        note: Some(note),
        action: action.to_string(),
        secondary: None,
    }
}

#[must_use]
pub fn workload_translated(name: &str) -> Event {
    normal(
        REASON_WORKLOAD_TRANSLATED,
        "Translating",
        format!("Successfully translated `{name}` into a workload package"),
    )
}

#[must_use]
pub fn cannot_translate(err: &crate::Error) -> Event {
    warning(REASON_CANNOT_TRANSLATE, "Translating", err.to_string())
}

#[must_use]
pub fn cannot_apply_translation(err: &crate::Error) -> Event {
    warning(REASON_CANNOT_APPLY_TRANSLATION, "Applying", err.to_string())
}

#[must_use]
pub fn waiting_for_package(workload: &str) -> Event {
    normal(
        REASON_WAITING_FOR_PACKAGE,
        "Modifying",
        format!("Waiting for the package of workload `{workload}` to exist"),
    )
}

#[must_use]
pub fn package_modified(workload: &str) -> Event {
    normal(
        REASON_PACKAGE_MODIFIED,
        "Modifying",
        format!("Successfully modified the package of workload `{workload}`"),
    )
}

#[must_use]
pub fn cannot_get_package(err: &crate::Error) -> Event {
    warning(REASON_CANNOT_GET_PACKAGE, "Modifying", err.to_string())
}

#[must_use]
pub fn cannot_modify(err: &crate::Error) -> Event {
    warning(REASON_CANNOT_MODIFY, "Modifying", err.to_string())
}

#[must_use]
pub fn cannot_apply_modification(err: &crate::Error) -> Event {
    warning(REASON_CANNOT_APPLY_MODIFICATION, "Applying", err.to_string())
}

/// Keeps the reasons of every published event
#[cfg(test)]
#[derive(Default)]
pub struct MemoryRecorder {
    pub reasons: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MemoryRecorder {
    pub fn reasons(&self) -> Vec<String> {
        self.reasons.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Recorder for MemoryRecorder {
    async fn publish(&self, ev: Event, _oref: ObjectReference) {
        self.reasons.lock().unwrap().push(ev.reason);
    }
}
