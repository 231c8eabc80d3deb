use crate::{application::TemplateKey, KubernetesApplication, Result};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Fill `desired` with the fields of `stored` it does not set.
///
/// Objects are merged key by key. Any other value set in `desired` wins as a
/// whole, arrays included: arrays are never merged item by item.
pub fn merge_missing(desired: &mut Value, stored: &Value) {
    let (Value::Object(desired), Value::Object(stored)) = (desired, stored) else {
        return;
    };
    for (key, stored_value) in stored {
        match desired.get_mut(key) {
            None => {
                desired.insert(key.clone(), stored_value.clone());
            }
            Some(value) if value.is_null() => *value = stored_value.clone(),
            Some(value) if value.is_object() => merge_missing(value, stored_value),
            Some(_) => {}
        }
    }
}

/// Merge the templates of the stored application into the desired one.
///
/// Templates are paired by key (embedded apiVersion and kind, template name).
/// The desired templates stay the definitive set: stored templates without a
/// desired counterpart are dropped.
pub fn merge_templates(stored: &KubernetesApplication, desired: &mut KubernetesApplication) -> Result<()> {
    let mut index: HashMap<TemplateKey, usize> = HashMap::new();
    for (i, t) in desired.spec.resource_templates.iter().enumerate() {
        index.entry(t.key()?).or_insert(i);
    }
    for t in &stored.spec.resource_templates {
        let key = t.key()?;
        match index.get(&key) {
            Some(&i) => merge_missing(&mut desired.spec.resource_templates[i].spec.template, &t.spec.template),
            None => debug!("dropping template {} ({}/{})", key.name, key.api_version, key.kind),
        }
    }
    Ok(())
}
