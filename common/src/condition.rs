use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema, Default)]
pub enum ConditionsType {
    #[default]
    Ready,
}

#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema, Default)]
pub enum ConditionsStatus {
    #[default]
    True,
    False,
}

pub static REASON_SUCCESS: &str = "ReconcileSuccess";
pub static REASON_ERROR: &str = "ReconcileError";
pub static REASON_WAITING: &str = "Waiting";

/// ApplicationCondition contains details about the last reconciliation of a workload or a trait
#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationCondition {
    /// LastTransitionTime is the time the condition last changed
    pub last_transition_time: Option<DateTime<Utc>>,
    /// Machine readable reason of the condition
    pub reason: String,
    /// Message contains human-readable message indicating details about condition
    #[serde(default)]
    pub message: String,
    /// Type is a condition type
    #[serde(rename = "type")]
    pub condition_type: ConditionsType,
    /// Status ("True" or "False") describe if the condition is enabled
    pub status: ConditionsStatus,
}

impl ApplicationCondition {
    #[must_use]
    pub fn new(
        reason: &str,
        message: &str,
        status: ConditionsStatus,
        condition_type: ConditionsType,
    ) -> ApplicationCondition {
        ApplicationCondition {
            last_transition_time: Some(chrono::offset::Utc::now()),
            reason: reason.to_string(),
            message: message.to_string(),
            condition_type,
            status,
        }
    }

    pub fn reconcile_success() -> ApplicationCondition {
        ApplicationCondition::new(REASON_SUCCESS, "", ConditionsStatus::True, ConditionsType::Ready)
    }

    pub fn reconcile_error(message: &str) -> ApplicationCondition {
        ApplicationCondition::new(REASON_ERROR, message, ConditionsStatus::False, ConditionsType::Ready)
    }

    pub fn waiting(message: &str) -> ApplicationCondition {
        ApplicationCondition::new(REASON_WAITING, message, ConditionsStatus::True, ConditionsType::Ready)
    }

    /// Same condition, regardless of when it was observed.
    #[must_use]
    pub fn equivalent(&self, other: &ApplicationCondition) -> bool {
        self.condition_type == other.condition_type
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

/// Replace the condition of the same type, keeping the transition time when nothing changed.
pub fn set_condition(conditions: &mut Vec<ApplicationCondition>, cond: ApplicationCondition) {
    match conditions
        .iter_mut()
        .find(|c| c.condition_type == cond.condition_type)
    {
        Some(existing) if existing.equivalent(&cond) => {}
        Some(existing) => *existing = cond,
        None => conditions.push(cond),
    }
}
