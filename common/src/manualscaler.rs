use crate::condition::ApplicationCondition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Set the replica count of the workload it references
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(
    kind = "ManualScalerTrait",
    status = "TraitStatus",
    shortname = "manualscaler",
    group = "core.oam.dev",
    version = "v1alpha2",
    namespaced,
    derive = "PartialEq"
)]
#[kube(
    doc = "Custom resource representing an OAM manual scaler trait",
    printcolumn = r#"
    {"name":"replicas", "type":"integer", "description":"Replicas", "jsonPath":".spec.replicaCount"},
    {"name":"workload", "type":"string", "description":"Workload", "jsonPath":".spec.workloadRef.name"},
    {"name":"ready",    "type":"string", "description":"Ready", "jsonPath":".status.conditions[?(@.type == 'Ready')].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ManualScalerTraitSpec {
    /// Number of replicas the workload should run
    pub replica_count: i32,
    /// Workload this trait applies to
    pub workload_ref: WorkloadReference,
}

/// WorkloadReference identifies the workload a trait targets
#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
}

/// The status object shared by every trait kind
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct TraitStatus {
    /// Trait conditions
    #[serde(default)]
    pub conditions: Vec<ApplicationCondition>,
}
