use crate::{
    object::{parse_as, Object},
    translate::uid_labels,
    workload::{Container, ContainerizedWorkload, TransportProtocol},
    Error, ManualScalerTrait, Result,
};
use k8s_openapi::{
    api::{
        apps::v1::{Deployment, DeploymentSpec},
        core::v1::{self as core, PodSpec, PodTemplateSpec, ResourceRequirements},
    },
    apimachinery::pkg::{
        api::resource::Quantity,
        apis::meta::v1::{LabelSelector, ObjectMeta},
    },
    Resource as _,
};
use kube::{api::DynamicObject, ResourceExt};
use std::collections::BTreeMap;

fn container(c: &Container) -> core::Container {
    let mut requests = BTreeMap::new();
    if let Some(res) = &c.resources {
        if let Some(cpu) = &res.cpu {
            requests.insert("cpu".to_string(), Quantity(cpu.required.clone()));
        }
        if let Some(memory) = &res.memory {
            requests.insert("memory".to_string(), Quantity(memory.required.clone()));
        }
    }
    core::Container {
        name: c.name.clone(),
        image: Some(c.image.clone()),
        command: c.command.clone(),
        args: c.args.clone(),
        env: c.env.as_ref().map(|env| {
            env.iter()
                .map(|e| core::EnvVar {
                    name: e.name.clone(),
                    value: e.value.clone(),
                    ..core::EnvVar::default()
                })
                .collect()
        }),
        ports: c.ports.as_ref().map(|ports| {
            ports
                .iter()
                .map(|p| core::ContainerPort {
                    name: Some(p.name.clone()),
                    container_port: p.container_port,
                    protocol: Some(
                        match p.protocol.clone().unwrap_or_default() {
                            TransportProtocol::Tcp => "TCP",
                            TransportProtocol::Udp => "UDP",
                        }
                        .to_string(),
                    ),
                    ..core::ContainerPort::default()
                })
                .collect()
        }),
        resources: (!requests.is_empty()).then(|| ResourceRequirements {
            requests: Some(requests),
            ..ResourceRequirements::default()
        }),
        ..core::Container::default()
    }
}

/// Translate a ContainerizedWorkload into the Deployment running its containers.
///
/// Replicas are left unset so the count chosen by a scaler trait survives re-translation.
pub fn containerized_translator(workload: &DynamicObject) -> Result<Vec<Object>> {
    let cw: ContainerizedWorkload = parse_as(workload)?;
    let labels = uid_labels(workload);
    let mut node_selector = BTreeMap::new();
    if let Some(os) = &cw.spec.os_type {
        node_selector.insert("kubernetes.io/os".to_string(), os.as_str().to_string());
    }
    if let Some(arch) = &cw.spec.arch {
        node_selector.insert("kubernetes.io/arch".to_string(), arch.as_str().to_string());
    }
    let d = Deployment {
        metadata: ObjectMeta {
            name: Some(cw.name_any()),
            labels: Some(labels.clone()),
            ..ObjectMeta::default()
        },
        spec: Some(DeploymentSpec {
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..LabelSelector::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..ObjectMeta::default()
                }),
                spec: Some(PodSpec {
                    containers: cw.spec.containers.iter().map(container).collect(),
                    node_selector: (!node_selector.is_empty()).then_some(node_selector),
                    ..PodSpec::default()
                }),
            },
            ..DeploymentSpec::default()
        }),
        ..Deployment::default()
    };
    Ok(vec![Object::Deployment(d)])
}

/// Set the replica count of a Deployment from a ManualScalerTrait
pub fn manual_scaler_modifier(obj: &mut Object, tr: &DynamicObject) -> Result<()> {
    let Object::Deployment(d) = &mut *obj else {
        return Err(Error::NotRunnableUnit {
            expected: Deployment::KIND.to_string(),
            found: obj.kind(),
        });
    };
    let ms: ManualScalerTrait = parse_as(tr)?;
    d.spec.get_or_insert_with(DeploymentSpec::default).replicas = Some(ms.spec.replica_count);
    Ok(())
}
