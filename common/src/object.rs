use crate::{application::KubernetesApplication, Error, Result};
use k8s_openapi::{
    api::{apps::v1::Deployment, core::v1::Service},
    Resource as _,
};
use kube::{
    api::{DynamicObject, TypeMeta},
    Resource,
};
use std::collections::HashMap;

/// An object produced by a translation, or handed to a trait modifier.
#[derive(Clone, Debug)]
pub enum Object {
    Deployment(Deployment),
    Service(Service),
    Application(KubernetesApplication),
    Dynamic(DynamicObject),
}

impl Object {
    #[must_use]
    pub fn api_version(&self) -> String {
        match self {
            Object::Deployment(_) => Deployment::API_VERSION.to_string(),
            Object::Service(_) => Service::API_VERSION.to_string(),
            Object::Application(_) => KubernetesApplication::api_version(&()).to_string(),
            Object::Dynamic(o) => o.types.as_ref().map(|t| t.api_version.clone()).unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> String {
        match self {
            Object::Deployment(_) => Deployment::KIND.to_string(),
            Object::Service(_) => Service::KIND.to_string(),
            Object::Application(_) => KubernetesApplication::kind(&()).to_string(),
            Object::Dynamic(o) => o.types.as_ref().map(|t| t.kind.clone()).unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Object::Deployment(o) => o.metadata.name.clone(),
            Object::Service(o) => o.metadata.name.clone(),
            Object::Application(o) => o.metadata.name.clone(),
            Object::Dynamic(o) => o.metadata.name.clone(),
        }
        .unwrap_or_default()
    }

    /// Portable (unstructured) form of the object, always carrying apiVersion and kind
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Object::Deployment(o) => serde_json::to_value(o),
            Object::Service(o) => serde_json::to_value(o),
            Object::Application(o) => serde_json::to_value(o),
            Object::Dynamic(o) => serde_json::to_value(o),
        }
    }
}

type Constructor = fn(serde_json::Value) -> Result<Object>;

fn deployment(v: serde_json::Value) -> Result<Object> {
    serde_json::from_value(v).map(Object::Deployment).map_err(Error::SerializationError)
}

fn service(v: serde_json::Value) -> Result<Object> {
    serde_json::from_value(v).map(Object::Service).map_err(Error::SerializationError)
}

fn application(v: serde_json::Value) -> Result<Object> {
    serde_json::from_value(v).map(Object::Application).map_err(Error::SerializationError)
}

/// Builds typed objects from raw stored ones, keyed by (apiVersion, kind)
#[derive(Clone)]
pub struct ObjectFactory {
    constructors: HashMap<(String, String), Constructor>,
}

impl Default for ObjectFactory {
    fn default() -> Self {
        let mut factory = Self {
            constructors: HashMap::new(),
        };
        factory.register(Deployment::API_VERSION, Deployment::KIND, deployment);
        factory.register(Service::API_VERSION, Service::KIND, service);
        factory.register(
            &KubernetesApplication::api_version(&()),
            &KubernetesApplication::kind(&()),
            application,
        );
        factory
    }
}

impl ObjectFactory {
    pub fn register(&mut self, api_version: &str, kind: &str, constructor: Constructor) {
        self.constructors
            .insert((api_version.to_string(), kind.to_string()), constructor);
    }

    /// Unknown kinds are kept as they are, in their dynamic form.
    pub fn build(&self, obj: DynamicObject) -> Result<Object> {
        let key = obj
            .types
            .as_ref()
            .map(|t| (t.api_version.clone(), t.kind.clone()))
            .unwrap_or_default();
        match self.constructors.get(&key) {
            Some(constructor) => constructor(serde_json::to_value(&obj).map_err(Error::SerializationError)?),
            None => Ok(Object::Dynamic(obj)),
        }
    }
}

/// Whether the raw object is of the typed kind `K`
#[must_use]
pub fn is_kind<K: Resource<DynamicType = ()>>(obj: &DynamicObject) -> bool {
    obj.types
        .as_ref()
        .is_some_and(|t| t.api_version == K::api_version(&()) && t.kind == K::kind(&()))
}

/// Parse a raw object into the typed kind `K`, refusing any other kind
pub fn parse_as<K>(obj: &DynamicObject) -> Result<K>
where
    K: Resource<DynamicType = ()> + serde::de::DeserializeOwned,
{
    if !is_kind::<K>(obj) {
        return Err(Error::TypeMismatch {
            expected: K::kind(&()).to_string(),
            found: describe(obj.types.as_ref()),
        });
    }
    let v = serde_json::to_value(obj).map_err(Error::SerializationError)?;
    serde_json::from_value(v).map_err(Error::SerializationError)
}

#[must_use]
pub fn describe(types: Option<&TypeMeta>) -> String {
    match types {
        Some(t) => format!("{}/{}", t.api_version, t.kind),
        None => "untyped object".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContainerizedWorkload;
    use kube::api::ApiResource;
    use serde_json::json;

    fn raw(api_version: &str, kind: &str, name: &str) -> DynamicObject {
        serde_json::from_value(json!({
            "apiVersion": api_version,
            "kind": kind,
            "metadata": {"name": name, "namespace": "test-namespace"},
            "spec": {"selector": {}, "template": {}}
        }))
        .unwrap()
    }

    #[test]
    fn test_factory_builds_known_kinds() {
        let factory = ObjectFactory::default();
        let obj = factory.build(raw("apps/v1", "Deployment", "d")).unwrap();
        assert!(matches!(obj, Object::Deployment(_)));
        assert_eq!(obj.name(), "d");
        let obj = factory
            .build(raw("workload.crossplane.io/v1alpha1", "KubernetesApplication", "app"))
            .unwrap();
        assert!(matches!(obj, Object::Application(_)));
    }

    #[test]
    fn test_factory_keeps_unknown_kinds_dynamic() {
        let factory = ObjectFactory::default();
        let obj = factory.build(raw("example.com/v1", "Widget", "w")).unwrap();
        assert!(matches!(obj, Object::Dynamic(_)));
        assert_eq!(obj.kind(), "Widget");
        assert_eq!(obj.api_version(), "example.com/v1");
    }

    #[test]
    fn test_parse_as_refuses_other_kinds() {
        let obj = raw("apps/v1", "Deployment", "d");
        let err = parse_as::<ContainerizedWorkload>(&obj).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_parse_as_accepts_its_kind() {
        let ar = ApiResource::erase::<ContainerizedWorkload>(&());
        let obj = DynamicObject::new("cw", &ar)
            .within("test-namespace")
            .data(json!({"spec": {"containers": []}}));
        let cw = parse_as::<ContainerizedWorkload>(&obj).unwrap();
        assert_eq!(cw.metadata.name.as_deref(), Some("cw"));
        assert!(cw.spec.containers.is_empty());
    }

    #[test]
    fn test_object_value_carries_type() {
        let v = Object::Deployment(Deployment::default()).to_value().unwrap();
        assert_eq!(v["apiVersion"], "apps/v1");
        assert_eq!(v["kind"], "Deployment");
    }
}
