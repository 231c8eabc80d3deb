use crate::{merge::merge_templates, object::Object, store::Store, Error, KubernetesApplication, Result};
use async_trait::async_trait;
use kube::{
    api::{ApiResource, DynamicObject},
    Resource, ResourceExt,
};
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, Default)]
pub struct ApplyOptions {
    /// Refuse to touch an existing object controlled by someone else
    pub controllers_must_match: bool,
}

impl ApplyOptions {
    #[must_use]
    pub fn controllers_must_match() -> Self {
        Self {
            controllers_must_match: true,
        }
    }
}

/// Writes a desired object to the store.
#[async_trait]
pub trait Applicator: Send + Sync {
    async fn apply(&self, store: &dyn Store, obj: &Object, opts: &ApplyOptions) -> Result<()>;
}

/// Creates a KubernetesApplication, or merges it into the stored one.
///
/// Stored and desired templates are merged pairwise before the result is
/// sent as a merge patch, so fields set on the stored templates by someone
/// else (a scaler trait for instance) survive.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApplicationApplicator;

fn to_dynamic(app: &KubernetesApplication) -> Result<DynamicObject> {
    serde_json::to_value(app)
        .and_then(serde_json::from_value)
        .map_err(Error::SerializationError)
}

fn from_dynamic(obj: &DynamicObject) -> Result<KubernetesApplication> {
    serde_json::to_value(obj)
        .and_then(serde_json::from_value)
        .map_err(Error::SerializationError)
}

#[async_trait]
impl Applicator for ApplicationApplicator {
    async fn apply(&self, store: &dyn Store, obj: &Object, opts: &ApplyOptions) -> Result<()> {
        let Object::Application(desired) = obj else {
            return Err(Error::WrongCarrierType {
                expected: KubernetesApplication::kind(&()).to_string(),
                found: obj.kind(),
            });
        };
        let ar = ApiResource::erase::<KubernetesApplication>(&());
        let ns = desired.namespace().unwrap_or_default();
        let name = desired.name_any();

        let Some(stored) = store
            .get(&ar, &ns, &name)
            .await
            .map_err(|e| Error::GetFailure(Box::new(e)))?
        else {
            info!("creating KubernetesApplication {}/{}", ns, name);
            store
                .create(&ar, &ns, &to_dynamic(desired)?)
                .await
                .map_err(|e| Error::CreateFailure(Box::new(e)))?;
            return Ok(());
        };
        let stored = from_dynamic(&stored)?;
        if opts.controllers_must_match && !stored.have_same_controller(desired) {
            return Err(Error::ControllerConflict {
                kind: ar.kind.clone(),
                name,
            });
        }

        let mut merged = desired.clone();
        merge_templates(&stored, &mut merged)?;
        let patch = serde_json::to_value(&merged).map_err(Error::SerializationError)?;
        debug!("patching KubernetesApplication {}/{}", ns, name);
        store
            .patch(&ar, &ns, &name, &patch)
            .await
            .map_err(|e| Error::PatchFailure(Box::new(e)))?;
        Ok(())
    }
}
