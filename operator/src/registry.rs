use common::{
    containerized::{containerized_translator, manual_scaler_modifier},
    modify::{AccessingModifier, DeploymentAccessor},
    translate::{application_wrapper, service_injector, WrappedTranslator},
    ContainerizedWorkload, KubernetesApplication, ManualScalerTrait, ObjectFactory,
};
use kube::api::ApiResource;

/// A workload kind and how to package it
#[derive(Clone)]
pub struct WorkloadKind {
    pub resource: ApiResource,
    pub translator: WrappedTranslator,
}

/// A trait kind, the package kind it modifies, and how
#[derive(Clone)]
pub struct TraitKind {
    pub resource: ApiResource,
    pub package: ApiResource,
    pub modifier: AccessingModifier,
}

/// Every kind the operator manages, resolved once at start-up
#[derive(Clone, Default)]
pub struct Registry {
    pub workloads: Vec<WorkloadKind>,
    pub traits: Vec<TraitKind>,
    pub factory: ObjectFactory,
}

impl Registry {
    #[must_use]
    pub fn standard() -> Self {
        Self::default()
            .with_workload(
                ApiResource::erase::<ContainerizedWorkload>(&()),
                WrappedTranslator::new(containerized_translator, vec![service_injector, application_wrapper]),
            )
            .with_trait(
                ApiResource::erase::<ManualScalerTrait>(&()),
                ApiResource::erase::<KubernetesApplication>(&()),
                AccessingModifier::new(manual_scaler_modifier, DeploymentAccessor),
            )
    }

    #[must_use]
    pub fn with_workload(mut self, resource: ApiResource, translator: WrappedTranslator) -> Self {
        self.workloads.push(WorkloadKind { resource, translator });
        self
    }

    #[must_use]
    pub fn with_trait(mut self, resource: ApiResource, package: ApiResource, modifier: AccessingModifier) -> Self {
        self.traits.push(TraitKind {
            resource,
            package,
            modifier,
        });
        self
    }
}
