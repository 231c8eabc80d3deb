use crate::{
    condition::{set_condition, ApplicationCondition},
    manualscaler::WorkloadReference,
    object::describe,
    Error, Result,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{api::DynamicObject, ResourceExt};
use serde_json::{json, Value};

/// Conditions currently recorded on a workload or a trait
pub fn conditions(obj: &DynamicObject) -> Vec<ApplicationCondition> {
    obj.data
        .get("status")
        .and_then(|s| s.get("conditions"))
        .cloned()
        .and_then(|c| serde_json::from_value(c).ok())
        .unwrap_or_default()
}

/// Status patch setting `cond` among the conditions already recorded on `obj`
pub fn condition_patch(obj: &DynamicObject, cond: ApplicationCondition) -> Result<Value> {
    let mut conds = conditions(obj);
    set_condition(&mut conds, cond);
    let conds = serde_json::to_value(conds).map_err(Error::SerializationError)?;
    Ok(json!({ "status": { "conditions": conds } }))
}

/// The workload a trait points at
pub fn workload_reference(tr: &DynamicObject) -> Result<WorkloadReference> {
    match tr.data.get("spec").and_then(|s| s.get("workloadRef")) {
        Some(r) => serde_json::from_value(r.clone()).map_err(Error::SerializationError),
        None => Err(Error::MissingWorkloadReference(format!(
            "{} {}",
            describe(tr.types.as_ref()),
            tr.name_any()
        ))),
    }
}

/// Controller reference pointing at `obj`, or None when it lacks a type or a uid
#[must_use]
pub fn controller_ref(obj: &DynamicObject) -> Option<OwnerReference> {
    let types = obj.types.as_ref()?;
    Some(OwnerReference {
        api_version: types.api_version.clone(),
        kind: types.kind.clone(),
        name: obj.name_any(),
        uid: obj.uid()?,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}
