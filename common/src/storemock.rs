use crate::{store::Store, Error, Result};
use async_trait::async_trait;
use kube::api::{ApiResource, DynamicObject};
use serde_json::Value;
use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operation {
    Get,
    Create,
    Patch,
    UpdateStatus,
}

type Key = (String, String, String, String);

fn key(ar: &ApiResource, ns: &str, name: &str) -> Key {
    (ar.api_version.clone(), ar.kind.clone(), ns.to_string(), name.to_string())
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory object store.
///
/// Patches follow RFC 7386 like the API server does for merge patches.
/// Any operation can be made to fail, and every write is recorded.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<Key, Value>>,
    failing: Mutex<Vec<(Operation, Option<String>)>>,
    writes: Mutex<Vec<(Operation, String, Value)>>,
    uids: Mutex<u64>,
    latency: Mutex<Option<Duration>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without recording a write
    pub fn insert(&self, ar: &ApiResource, obj: &DynamicObject) -> Result<()> {
        let ns = obj.metadata.namespace.clone().unwrap_or_default();
        let name = obj.metadata.name.clone().unwrap_or_default();
        let mut value = serde_json::to_value(obj).map_err(Error::SerializationError)?;
        value["apiVersion"] = Value::String(ar.api_version.clone());
        value["kind"] = Value::String(ar.kind.clone());
        lock(&self.objects).insert(key(ar, &ns, &name), value);
        Ok(())
    }

    #[must_use]
    pub fn object(&self, ar: &ApiResource, ns: &str, name: &str) -> Option<DynamicObject> {
        lock(&self.objects)
            .get(&key(ar, ns, name))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn fail(&self, op: Operation) {
        lock(&self.failing).push((op, None));
    }

    /// Delay every operation by `latency`
    pub fn slow(&self, latency: Duration) {
        *lock(&self.latency) = Some(latency);
    }

    /// Fail `op` only for objects of the given kind
    pub fn fail_kind(&self, op: Operation, kind: &str) {
        lock(&self.failing).push((op, Some(kind.to_string())));
    }

    pub fn recover(&self, op: Operation) {
        lock(&self.failing).retain(|(o, _)| *o != op);
    }

    /// Documents sent for every recorded write of the given kind of operation
    #[must_use]
    pub fn writes(&self, op: Operation) -> Vec<Value> {
        lock(&self.writes)
            .iter()
            .filter(|(o, _, _)| *o == op)
            .map(|(_, _, v)| v.clone())
            .collect()
    }

    fn check(&self, op: Operation, ar: &ApiResource, name: &str) -> Result<()> {
        let refused = lock(&self.failing)
            .iter()
            .any(|(o, kind)| *o == op && kind.as_ref().map_or(true, |k| *k == ar.kind));
        if refused {
            Err(Error::Other(format!("{op:?} {} {name} refused by the store", ar.kind)))
        } else {
            Ok(())
        }
    }

    async fn wait(&self) {
        let latency = *lock(&self.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn record(&self, op: Operation, ar: &ApiResource, name: &str, doc: &Value) {
        lock(&self.writes).push((op, format!("{}/{name}", ar.kind), doc.clone()));
    }

    fn next_uid(&self) -> String {
        let mut uids = lock(&self.uids);
        *uids += 1;
        format!("memory-uid-{}", *uids)
    }

    fn merge(&self, ar: &ApiResource, ns: &str, name: &str, patch: &Value) -> Result<Value> {
        let mut objects = lock(&self.objects);
        let stored = objects
            .get_mut(&key(ar, ns, name))
            .ok_or_else(|| Error::Other(format!("{} {ns}/{name} not found", ar.kind)))?;
        json_patch::merge(stored, patch);
        Ok(stored.clone())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, ar: &ApiResource, ns: &str, name: &str) -> Result<Option<DynamicObject>> {
        self.wait().await;
        self.check(Operation::Get, ar, name)?;
        Ok(self.object(ar, ns, name))
    }

    async fn create(&self, ar: &ApiResource, ns: &str, obj: &DynamicObject) -> Result<DynamicObject> {
        self.wait().await;
        let name = obj.metadata.name.clone().unwrap_or_default();
        self.check(Operation::Create, ar, &name)?;
        if lock(&self.objects).contains_key(&key(ar, ns, &name)) {
            return Err(Error::Other(format!("{} {ns}/{name} already exists", ar.kind)));
        }
        let mut created = obj.clone();
        created.metadata.namespace = Some(ns.to_string());
        if created.metadata.uid.is_none() {
            created.metadata.uid = Some(self.next_uid());
        }
        self.insert(ar, &created)?;
        self.record(
            Operation::Create,
            ar,
            &name,
            &serde_json::to_value(&created).map_err(Error::SerializationError)?,
        );
        self.object(ar, ns, &name)
            .ok_or_else(|| Error::Other(format!("{} {ns}/{name} vanished", ar.kind)))
    }

    async fn patch(&self, ar: &ApiResource, ns: &str, name: &str, patch: &Value) -> Result<DynamicObject> {
        self.wait().await;
        self.check(Operation::Patch, ar, name)?;
        let merged = self.merge(ar, ns, name, patch)?;
        self.record(Operation::Patch, ar, name, patch);
        serde_json::from_value(merged).map_err(Error::SerializationError)
    }

    async fn update_status(&self, ar: &ApiResource, ns: &str, name: &str, patch: &Value) -> Result<()> {
        self.wait().await;
        self.check(Operation::UpdateStatus, ar, name)?;
        let status = serde_json::json!({ "status": patch.get("status").cloned().unwrap_or(Value::Null) });
        self.merge(ar, ns, name, &status)?;
        self.record(Operation::UpdateStatus, ar, name, patch);
        Ok(())
    }
}
