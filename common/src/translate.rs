use crate::{
    application::{
        KubernetesApplication, KubernetesApplicationResourceTemplate, KubernetesApplicationSpec, ResourceSelector,
    },
    object::Object,
    resource::controller_ref,
    Error, Result, LABEL_KEY,
};
use k8s_openapi::{
    api::{
        apps::v1::Deployment,
        core::v1::{Service, ServicePort, ServiceSpec},
    },
    apimachinery::pkg::{apis::meta::v1::ObjectMeta, util::intstr::IntOrString},
    Resource as _,
};
use kube::{api::DynamicObject, ResourceExt};
use std::{collections::BTreeMap, sync::Arc};
use tracing::debug;

/// Port every injected Service listens on
pub const SERVICE_PORT: i32 = 8080;

/// Turns a workload into the objects that run it.
pub trait Translator: Send + Sync {
    fn translate(&self, workload: &DynamicObject) -> Result<Vec<Object>>;
}

impl<F> Translator for F
where
    F: Fn(&DynamicObject) -> Result<Vec<Object>> + Send + Sync,
{
    fn translate(&self, workload: &DynamicObject) -> Result<Vec<Object>> {
        self(workload)
    }
}

/// Post-processing step of a translation: adds objects or wraps them.
pub type TranslationWrapper = fn(&DynamicObject, Vec<Object>) -> Result<Vec<Object>>;

/// A translator followed by its wrappers, applied in order
#[derive(Clone)]
pub struct WrappedTranslator {
    base: Arc<dyn Translator>,
    wrappers: Vec<TranslationWrapper>,
}

impl WrappedTranslator {
    pub fn new(base: impl Translator + 'static, wrappers: Vec<TranslationWrapper>) -> Self {
        Self {
            base: Arc::new(base),
            wrappers,
        }
    }
}

impl Translator for WrappedTranslator {
    fn translate(&self, workload: &DynamicObject) -> Result<Vec<Object>> {
        let mut objs = self.base.translate(workload)?;
        for wrap in &self.wrappers {
            if objs.is_empty() {
                debug!("nothing to wrap for {}", workload.name_any());
                return Ok(Vec::new());
            }
            objs = wrap(workload, objs)?;
        }
        Ok(objs)
    }
}

/// Produces nothing, so no later wrapper runs.
pub fn noop_translate(_workload: &DynamicObject) -> Result<Vec<Object>> {
    Ok(Vec::new())
}

pub fn noop_wrapper(_workload: &DynamicObject, objs: Vec<Object>) -> Result<Vec<Object>> {
    Ok(objs)
}

/// Labels tying an object to the workload it was derived from
#[must_use]
pub fn uid_labels(workload: &DynamicObject) -> BTreeMap<String, String> {
    BTreeMap::from([(LABEL_KEY.to_string(), workload.uid().unwrap_or_default())])
}

/// Port of the first container declaring any
fn first_port(d: &Deployment) -> Option<i32> {
    d.spec
        .as_ref()?
        .template
        .spec
        .as_ref()?
        .containers
        .iter()
        .find_map(|c| c.ports.as_ref().and_then(|p| p.first()))
        .map(|p| p.container_port)
}

fn service_for(workload: &DynamicObject, d: &Deployment, port: i32) -> Service {
    let name = d.name_any();
    Service {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            labels: Some(uid_labels(workload)),
            ..ObjectMeta::default()
        },
        spec: Some(ServiceSpec {
            selector: d.spec.as_ref().and_then(|s| s.selector.match_labels.clone()),
            ports: Some(vec![ServicePort {
                name: Some(name),
                port: SERVICE_PORT,
                target_port: Some(IntOrString::Int(port)),
                ..ServicePort::default()
            }]),
            type_: Some("LoadBalancer".to_string()),
            ..ServiceSpec::default()
        }),
        ..Service::default()
    }
}

/// Add one Service per Deployment exposing a port, bound to the first port
/// of its first container that declares any.
pub fn service_injector(workload: &DynamicObject, mut objs: Vec<Object>) -> Result<Vec<Object>> {
    let mut services = Vec::new();
    for o in &objs {
        let port = match o {
            Object::Deployment(d) => first_port(d).map(|p| (d, p)),
            Object::Dynamic(_) if o.api_version() == Deployment::API_VERSION && o.kind() == Deployment::KIND => {
                return Err(Error::InjectFailure(format!("Deployment {} is not typed", o.name())));
            }
            _ => None,
        };
        if let Some((d, port)) = port {
            debug!("injecting Service for Deployment {} on port {}", d.name_any(), port);
            services.push(Object::Service(service_for(workload, d, port)));
        }
    }
    objs.extend(services);
    Ok(objs)
}

/// Bundle every object in one KubernetesApplication named after the workload
/// and controlled by it.
pub fn application_wrapper(workload: &DynamicObject, objs: Vec<Object>) -> Result<Vec<Object>> {
    if objs.is_empty() {
        return Ok(Vec::new());
    }
    let name = workload.name_any();
    let labels = uid_labels(workload);
    let resource_templates = objs
        .iter()
        .map(|o| {
            o.to_value()
                .map(|v| KubernetesApplicationResourceTemplate::new(&name, labels.clone(), v))
                .map_err(Error::WrapFailure)
        })
        .collect::<Result<Vec<_>>>()?;
    let mut app = KubernetesApplication::new(
        &name,
        KubernetesApplicationSpec {
            resource_selector: ResourceSelector { match_labels: labels },
            resource_templates,
        },
    );
    app.metadata.namespace = workload.namespace();
    app.metadata.owner_references = controller_ref(workload).map(|o| vec![o]);
    Ok(vec![Object::Application(app)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContainerizedWorkload;
    use k8s_openapi::api::{
        apps::v1::DeploymentSpec,
        core::v1::{Container, ContainerPort, PodSpec, PodTemplateSpec},
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
    use kube::api::ApiResource;
    use serde_json::json;

    fn workload() -> DynamicObject {
        let ar = ApiResource::erase::<ContainerizedWorkload>(&());
        let mut w = DynamicObject::new("cool-workload", &ar)
            .within("cool-namespace")
            .data(json!({"spec": {"containers": []}}));
        w.metadata.uid = Some("cool-uid".to_string());
        w
    }

    fn container(name: &str, ports: &[i32]) -> Container {
        Container {
            name: name.to_string(),
            ports: if ports.is_empty() {
                None
            } else {
                Some(
                    ports
                        .iter()
                        .map(|p| ContainerPort {
                            container_port: *p,
                            ..ContainerPort::default()
                        })
                        .collect(),
                )
            },
            ..Container::default()
        }
    }

    fn deployment(name: &str, containers: Vec<Container>) -> Object {
        let labels = BTreeMap::from([(LABEL_KEY.to_string(), "cool-uid".to_string())]);
        Object::Deployment(Deployment {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..ObjectMeta::default()
            },
            spec: Some(DeploymentSpec {
                selector: LabelSelector {
                    match_labels: Some(labels),
                    ..LabelSelector::default()
                },
                template: PodTemplateSpec {
                    spec: Some(PodSpec {
                        containers,
                        ..PodSpec::default()
                    }),
                    ..PodTemplateSpec::default()
                },
                ..DeploymentSpec::default()
            }),
            ..Deployment::default()
        })
    }

    fn services(objs: &[Object]) -> Vec<&Service> {
        objs.iter()
            .filter_map(|o| match o {
                Object::Service(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    fn target_port(s: &Service) -> Option<IntOrString> {
        s.spec.as_ref()?.ports.as_ref()?[0].target_port.clone()
    }

    #[test]
    fn test_injector_one_deployment_one_port() {
        let objs = service_injector(&workload(), vec![deployment("d", vec![container("c", &[3000])])]).unwrap();
        assert_eq!(objs.len(), 2);
        let svcs = services(&objs);
        assert_eq!(svcs[0].metadata.name.as_deref(), Some("d"));
        let spec = svcs[0].spec.as_ref().unwrap();
        assert_eq!(spec.type_.as_deref(), Some("LoadBalancer"));
        assert_eq!(spec.ports.as_ref().unwrap()[0].port, SERVICE_PORT);
        assert_eq!(
            spec.selector.as_ref().unwrap().get(LABEL_KEY).map(String::as_str),
            Some("cool-uid")
        );
        assert_eq!(target_port(svcs[0]), Some(IntOrString::Int(3000)));
    }

    #[test]
    fn test_injector_first_port_of_first_container_with_ports() {
        let d = deployment(
            "d",
            vec![
                container("none", &[]),
                container("a", &[3000, 3001]),
                container("b", &[4000, 4001]),
            ],
        );
        let objs = service_injector(&workload(), vec![d]).unwrap();
        let svcs = services(&objs);
        assert_eq!(svcs.len(), 1);
        assert_eq!(target_port(svcs[0]), Some(IntOrString::Int(3000)));
    }

    #[test]
    fn test_injector_one_service_per_deployment() {
        let objs = service_injector(
            &workload(),
            vec![
                deployment("a", vec![container("c", &[3000])]),
                deployment("b", vec![container("c", &[4000])]),
            ],
        )
        .unwrap();
        let svcs = services(&objs);
        assert_eq!(svcs.len(), 2);
        assert_eq!(svcs[1].metadata.name.as_deref(), Some("b"));
    }

    #[test]
    fn test_injector_no_ports() {
        let objs = service_injector(&workload(), vec![deployment("d", vec![container("c", &[])])]).unwrap();
        assert_eq!(objs.len(), 1);
        assert!(services(&objs).is_empty());
    }

    #[test]
    fn test_chain_short_circuits_on_empty() {
        fn exploding(_: &DynamicObject, _: Vec<Object>) -> Result<Vec<Object>> {
            Err(Error::Other("should not run".to_string()))
        }
        let t = WrappedTranslator::new(noop_translate, vec![exploding as TranslationWrapper]);
        assert!(t.translate(&workload()).unwrap().is_empty());
    }

    #[test]
    fn test_chain_applies_wrappers_in_order() {
        let base = |_: &DynamicObject| -> Result<Vec<Object>> {
            Ok(vec![deployment("cool-workload", vec![container("c", &[3000])])])
        };
        let t = WrappedTranslator::new(base, vec![noop_wrapper, service_injector, application_wrapper]);
        let objs = t.translate(&workload()).unwrap();
        assert_eq!(objs.len(), 1);
        let Object::Application(app) = &objs[0] else {
            panic!("expected a KubernetesApplication");
        };
        let kinds: Vec<&str> = app.spec.resource_templates.iter().map(|t| t.kind()).collect();
        assert_eq!(kinds, vec!["Deployment", "Service"]);
    }

    #[test]
    fn test_wrapper_output() {
        let objs =
            application_wrapper(&workload(), vec![deployment("cool-workload", vec![container("c", &[])])]).unwrap();
        let Object::Application(app) = &objs[0] else {
            panic!("expected a KubernetesApplication");
        };
        assert_eq!(app.metadata.name.as_deref(), Some("cool-workload"));
        assert_eq!(app.metadata.namespace.as_deref(), Some("cool-namespace"));
        assert_eq!(app.controller_uid().as_deref(), Some("cool-uid"));
        assert_eq!(
            app.spec.resource_selector.match_labels.get(LABEL_KEY).map(String::as_str),
            Some("cool-uid")
        );
        let t = &app.spec.resource_templates[0];
        assert_eq!(t.name(), "cool-workload");
        assert_eq!(t.metadata.labels, app.spec.resource_selector.match_labels);
        assert_eq!(t.api_version(), "apps/v1");
        assert_eq!(t.spec.template["metadata"]["name"], "cool-workload");
    }

    #[test]
    fn test_wrapper_empty() {
        assert!(application_wrapper(&workload(), Vec::new()).unwrap().is_empty());
    }
}
