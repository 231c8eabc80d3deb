use crate::Result;
use async_trait::async_trait;
use kube::{
    api::{Api, ApiResource, DynamicObject, Patch, PatchParams, PostParams},
    Client,
};
use serde_json::Value;
use tracing::debug;

/// Access to the objects of the cluster this operator runs against.
///
/// Objects are addressed by their `ApiResource` and (namespace, name). Patches
/// are RFC 7386 merge patches: each key replaces the stored value, arrays included.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch an object, None when it does not exist
    async fn get(&self, ar: &ApiResource, ns: &str, name: &str) -> Result<Option<DynamicObject>>;
    async fn create(&self, ar: &ApiResource, ns: &str, obj: &DynamicObject) -> Result<DynamicObject>;
    async fn patch(&self, ar: &ApiResource, ns: &str, name: &str, patch: &Value) -> Result<DynamicObject>;
    /// Merge patch on the status subresource
    async fn update_status(&self, ar: &ApiResource, ns: &str, name: &str, patch: &Value) -> Result<()>;
}

#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, ar: &ApiResource, ns: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), ns, ar)
    }
}

#[async_trait]
impl Store for KubeStore {
    async fn get(&self, ar: &ApiResource, ns: &str, name: &str) -> Result<Option<DynamicObject>> {
        debug!("get {} {}/{}", ar.kind, ns, name);
        Ok(self.api(ar, ns).get_opt(name).await?)
    }

    async fn create(&self, ar: &ApiResource, ns: &str, obj: &DynamicObject) -> Result<DynamicObject> {
        debug!("create {} in {}", ar.kind, ns);
        Ok(self.api(ar, ns).create(&PostParams::default(), obj).await?)
    }

    async fn patch(&self, ar: &ApiResource, ns: &str, name: &str, patch: &Value) -> Result<DynamicObject> {
        debug!("patch {} {}/{}", ar.kind, ns, name);
        Ok(self
            .api(ar, ns)
            .patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await?)
    }

    async fn update_status(&self, ar: &ApiResource, ns: &str, name: &str, patch: &Value) -> Result<()> {
        debug!("patch status of {} {}/{}", ar.kind, ns, name);
        self.api(ar, ns)
            .patch_status(name, &PatchParams::default(), &Patch::Merge(patch))
            .await?;
        Ok(())
    }
}
