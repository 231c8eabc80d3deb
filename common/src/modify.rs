use crate::{object::Object, resource::workload_reference, Error, KubernetesApplication, Result};
use k8s_openapi::{api::apps::v1::Deployment, Resource as _};
use kube::{api::DynamicObject, Resource};
use std::sync::Arc;
use tracing::debug;

/// Changes one object on behalf of a trait.
pub trait Modifier: Send + Sync {
    fn modify(&self, obj: &mut Object, tr: &DynamicObject) -> Result<()>;
}

impl<F> Modifier for F
where
    F: Fn(&mut Object, &DynamicObject) -> Result<()> + Send + Sync,
{
    fn modify(&self, obj: &mut Object, tr: &DynamicObject) -> Result<()> {
        self(obj, tr)
    }
}

pub struct NoopModifier;

impl Modifier for NoopModifier {
    fn modify(&self, _obj: &mut Object, _tr: &DynamicObject) -> Result<()> {
        Ok(())
    }
}

/// Finds the object a modifier should change inside a carrier, and writes it back.
pub trait Accessor: Send + Sync {
    fn access(&self, carrier: &mut Object, tr: &DynamicObject, m: &dyn Modifier) -> Result<()>;
}

/// Hands the carrier itself to the modifier
pub struct NoopAccessor;

impl Accessor for NoopAccessor {
    fn access(&self, carrier: &mut Object, tr: &DynamicObject, m: &dyn Modifier) -> Result<()> {
        m.modify(carrier, tr)
    }
}

/// Reaches the Deployment template named after the trait's workload
/// in a KubernetesApplication.
pub struct DeploymentAccessor;

impl Accessor for DeploymentAccessor {
    fn access(&self, carrier: &mut Object, tr: &DynamicObject, m: &dyn Modifier) -> Result<()> {
        let found = carrier.kind();
        let Object::Application(app) = carrier else {
            return Err(Error::WrongCarrierType {
                expected: KubernetesApplication::kind(&()).to_string(),
                found,
            });
        };
        let name = workload_reference(tr)?.name;
        let Some(template) = app
            .spec
            .resource_templates
            .iter_mut()
            .find(|t| t.name() == name && t.kind() == Deployment::KIND)
        else {
            return Err(Error::NotFoundForTrait {
                kind: Deployment::KIND.to_string(),
                name,
            });
        };
        let d: Deployment =
            serde_json::from_value(template.spec.template.clone()).map_err(Error::SerializationError)?;
        let mut obj = Object::Deployment(d);
        m.modify(&mut obj, tr)?;
        template.spec.template = obj.to_value().map_err(Error::SerializationError)?;
        debug!("modified Deployment template {} in {}", name, app.metadata.name.as_deref().unwrap_or_default());
        Ok(())
    }
}

/// A modifier reaching its target through an accessor
#[derive(Clone)]
pub struct AccessingModifier {
    modifier: Arc<dyn Modifier>,
    accessor: Arc<dyn Accessor>,
}

impl AccessingModifier {
    pub fn new(modifier: impl Modifier + 'static, accessor: impl Accessor + 'static) -> Self {
        Self {
            modifier: Arc::new(modifier),
            accessor: Arc::new(accessor),
        }
    }
}

impl Default for AccessingModifier {
    fn default() -> Self {
        Self::new(NoopModifier, NoopAccessor)
    }
}

impl Modifier for AccessingModifier {
    fn modify(&self, obj: &mut Object, tr: &DynamicObject) -> Result<()> {
        self.accessor.access(obj, tr, self.modifier.as_ref())
    }
}
