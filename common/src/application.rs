use crate::{condition::ApplicationCondition, Error, Result};
use kube::{CustomResource, ResourceExt};
use schemars::{
    gen::SchemaGenerator,
    schema::{InstanceType, Schema, SchemaObject},
    JsonSchema,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn preserve_unknown_fields(_: &mut SchemaGenerator) -> Schema {
    SchemaObject {
        instance_type: Some(InstanceType::Object.into()),
        extensions: [(
            "x-kubernetes-preserve-unknown-fields".to_string(),
            serde_json::Value::Bool(true),
        )]
        .into_iter()
        .collect(),
        ..Default::default()
    }
    .into()
}

/// Bundle of objects to be submitted to a remote cluster
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema, Default)]
#[kube(
    kind = "KubernetesApplication",
    status = "KubernetesApplicationStatus",
    shortname = "kubeapp",
    group = "workload.crossplane.io",
    version = "v1alpha1",
    namespaced,
    derive = "PartialEq"
)]
#[kube(
    doc = "Custom resource bundling every object derived from one workload",
    printcolumn = r#"
    {"name":"state",     "type":"string",  "description":"State", "jsonPath":".status.state"},
    {"name":"desired",   "type":"integer", "description":"Desired resources", "jsonPath":".status.desiredResources"},
    {"name":"submitted", "type":"integer", "description":"Submitted resources", "jsonPath":".status.submittedResources"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesApplicationSpec {
    /// Selects the templates belonging to this application
    #[serde(default)]
    pub resource_selector: ResourceSelector,
    /// Objects to submit
    #[serde(default)]
    pub resource_templates: Vec<KubernetesApplicationResourceTemplate>,
}

/// Label query matching every template of an application
#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSelector {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema, Default)]
pub struct TemplateMeta {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// One embedded object of a KubernetesApplication
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug, JsonSchema)]
pub struct KubernetesApplicationResourceTemplate {
    pub metadata: TemplateMeta,
    pub spec: KubernetesApplicationResourceSpec,
}

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug, JsonSchema)]
pub struct KubernetesApplicationResourceSpec {
    /// The embedded object
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub template: serde_json::Value,
}

/// Identity of a template: embedded apiVersion and kind, plus the template name
#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub struct TemplateKey {
    pub api_version: String,
    pub kind: String,
    pub name: String,
}

impl KubernetesApplicationResourceTemplate {
    #[must_use]
    pub fn new(name: &str, labels: BTreeMap<String, String>, template: serde_json::Value) -> Self {
        Self {
            metadata: TemplateMeta {
                name: name.to_string(),
                labels,
            },
            spec: KubernetesApplicationResourceSpec { template },
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// apiVersion of the embedded object, empty when unset
    #[must_use]
    pub fn api_version(&self) -> &str {
        self.spec.template["apiVersion"].as_str().unwrap_or_default()
    }

    /// kind of the embedded object, empty when unset
    #[must_use]
    pub fn kind(&self) -> &str {
        self.spec.template["kind"].as_str().unwrap_or_default()
    }

    pub fn key(&self) -> Result<TemplateKey> {
        if !self.spec.template.is_object() {
            return Err(Error::MergeFailure(format!(
                "template {} does not embed an object",
                self.name()
            )));
        }
        Ok(TemplateKey {
            api_version: self.api_version().to_string(),
            kind: self.kind().to_string(),
            name: self.name().to_string(),
        })
    }
}

#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema)]
pub enum ApplicationState {
    Pending,
    Scheduled,
    Submitted,
    Failed,
}

/// The status object of `KubernetesApplication`, owned by the remote agent
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesApplicationStatus {
    pub state: Option<ApplicationState>,
    #[serde(default)]
    pub conditions: Vec<ApplicationCondition>,
    pub desired_resources: Option<i32>,
    pub submitted_resources: Option<i32>,
}

impl KubernetesApplication {
    /// UID of the controlling owner, if any
    #[must_use]
    pub fn controller_uid(&self) -> Option<String> {
        self.owner_references()
            .iter()
            .find(|o| o.controller == Some(true))
            .map(|o| o.uid.clone())
    }

    /// Objects without a controller are never considered to share one.
    #[must_use]
    pub fn have_same_controller(&self, other: &KubernetesApplication) -> bool {
        match (self.controller_uid(), other.controller_uid()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
    use serde_json::json;

    fn owned_by(uid: &str) -> KubernetesApplication {
        let mut app = KubernetesApplication::new("cool-kapp", KubernetesApplicationSpec::default());
        app.metadata.owner_references = Some(vec![OwnerReference {
            api_version: "core.oam.dev/v1alpha2".to_string(),
            kind: "ContainerizedWorkload".to_string(),
            name: "cool-workload".to_string(),
            uid: uid.to_string(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }]);
        app
    }

    #[test]
    fn test_template_key_uses_embedded_kind_and_template_name() {
        let t = KubernetesApplicationResourceTemplate::new(
            "cool-temp",
            BTreeMap::new(),
            json!({"apiVersion": "apps/v1", "kind": "Deployment", "metadata": {"name": "other"}}),
        );
        let key = t.key().unwrap();
        assert_eq!(key.api_version, "apps/v1");
        assert_eq!(key.kind, "Deployment");
        assert_eq!(key.name, "cool-temp");
    }

    #[test]
    fn test_template_key_rejects_non_object() {
        let t = KubernetesApplicationResourceTemplate::new("cool-temp", BTreeMap::new(), json!("nope"));
        assert!(matches!(t.key(), Err(Error::MergeFailure(_))));
    }

    #[test]
    fn test_same_controller() {
        assert!(owned_by("a").have_same_controller(&owned_by("a")));
        assert!(!owned_by("a").have_same_controller(&owned_by("b")));
    }

    #[test]
    fn test_no_controller_is_never_the_same() {
        let bare = KubernetesApplication::new("cool-kapp", KubernetesApplicationSpec::default());
        assert!(!bare.have_same_controller(&bare));
        assert!(!bare.have_same_controller(&owned_by("a")));
    }
}
