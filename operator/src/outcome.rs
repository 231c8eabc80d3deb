use crate::{events::Recorder, Error, Result};
use common::{resource::condition_patch, ApplicationCondition, Store};
use kube::{
    api::{ApiResource, DynamicObject},
    runtime::{controller::Action, events::Event},
    Resource, ResourceExt,
};
use std::time::Duration;
use tracing::{info, warn};

/// What one reconciliation attempt ended with, before anything is persisted
pub struct Outcome {
    pub requeue_after: Duration,
    pub condition: ApplicationCondition,
    pub event: Event,
}

impl Outcome {
    #[must_use]
    pub fn ready(event: Event, requeue_after: Duration) -> Self {
        Self {
            requeue_after,
            condition: ApplicationCondition::reconcile_success(),
            event,
        }
    }

    #[must_use]
    pub fn failed(err: &Error, event: Event, requeue_after: Duration) -> Self {
        Self {
            requeue_after,
            condition: ApplicationCondition::reconcile_error(&err.to_string()),
            event,
        }
    }

    #[must_use]
    pub fn waiting(message: &str, event: Event, requeue_after: Duration) -> Self {
        Self {
            requeue_after,
            condition: ApplicationCondition::waiting(message),
            event,
        }
    }

    /// Write the condition to the object status, then report the event.
    ///
    /// A failed status write is the only error surfaced to the controller.
    pub async fn persist(
        self,
        store: &dyn Store,
        recorder: &dyn Recorder,
        ar: &ApiResource,
        obj: &DynamicObject,
    ) -> Result<Action> {
        let ns = obj.namespace().unwrap_or_default();
        let name = obj.name_any();
        let patch = condition_patch(obj, self.condition.clone()).map_err(Error::UpdateStatus)?;
        store
            .update_status(ar, &ns, &name, &patch)
            .await
            .map_err(Error::UpdateStatus)?;
        if self.condition.reason == common::condition::REASON_ERROR {
            warn!("{} {}/{}: {}", ar.kind, ns, name, self.condition.message);
        } else {
            info!("{} {}/{}: {}", ar.kind, ns, name, self.event.reason);
        }
        recorder.publish(self.event, obj.object_ref(ar)).await;
        Ok(Action::requeue(self.requeue_after))
    }
}
