use serde::{Deserialize, Serialize};

/// Kinds of managed system VMs the agent will accept requests for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplianceKind {
    DomainRouter,
    ConsoleProxy,
    SecondaryStorageVm,
}

/// A known appliance as seen by the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appliance {
    pub id: String,
    pub kind: ApplianceKind,
    #[serde(default = "default_running")]
    pub running: bool,
}

fn default_running() -> bool {
    true
}
