use crate::condition::ApplicationCondition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Describe a containerized application component
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(
    kind = "ContainerizedWorkload",
    status = "WorkloadStatus",
    shortname = "cw",
    group = "core.oam.dev",
    version = "v1alpha2",
    namespaced,
    derive = "PartialEq"
)]
#[kube(
    doc = "Custom resource representing an OAM containerized workload",
    printcolumn = r#"
    {"name":"ready",  "type":"string", "description":"Ready", "jsonPath":".status.conditions[?(@.type == 'Ready')].status"},
    {"name":"reason", "type":"string", "description":"Reason", "jsonPath":".status.conditions[?(@.type == 'Ready')].reason"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ContainerizedWorkloadSpec {
    /// Operating system the containers require
    pub os_type: Option<OperatingSystem>,
    /// CPU architecture the containers require
    pub arch: Option<CpuArchitecture>,
    /// Containers of the workload
    #[serde(default)]
    pub containers: Vec<Container>,
}

#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    Linux,
    Windows,
}

impl OperatingSystem {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingSystem::Linux => "linux",
            OperatingSystem::Windows => "windows",
        }
    }
}

#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CpuArchitecture {
    I386,
    Amd64,
    Arm,
    Arm64,
}

impl CpuArchitecture {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CpuArchitecture::I386 => "i386",
            CpuArchitecture::Amd64 => "amd64",
            CpuArchitecture::Arm => "arm",
            CpuArchitecture::Arm64 => "arm64",
        }
    }
}

#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Name of the container
    pub name: String,
    /// Image the container runs
    pub image: String,
    /// Entrypoint override
    pub command: Option<Vec<String>>,
    /// Arguments to the entrypoint
    pub args: Option<Vec<String>>,
    /// Environment variables
    pub env: Option<Vec<ContainerEnvVar>>,
    /// Ports exposed by the container
    pub ports: Option<Vec<ContainerPort>>,
    /// Compute resources required by the container
    pub resources: Option<ContainerResources>,
}

#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema)]
pub struct ContainerEnvVar {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema, Default)]
pub enum TransportProtocol {
    #[default]
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "UDP")]
    Udp,
}

#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    pub name: String,
    pub container_port: i32,
    pub protocol: Option<TransportProtocol>,
}

#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema)]
pub struct ContainerResources {
    pub cpu: Option<ResourceRequirement>,
    pub memory: Option<ResourceRequirement>,
}

#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema)]
pub struct ResourceRequirement {
    /// Quantity required, in kubernetes quantity notation
    pub required: String,
}

/// The status object shared by every workload kind
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct WorkloadStatus {
    /// Workload conditions
    #[serde(default)]
    pub conditions: Vec<ApplicationCondition>,
}
