use std::collections::HashMap;
use vd_core::{AgentConfig, Appliance};

/// Lookup seam for the control plane's view of known appliances.
pub trait TargetRegistry: Send + Sync {
    fn lookup(&self, target_id: &str) -> Option<Appliance>;
}

/// Registry backed by a fixed appliance list, typically the agent config.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    appliances: HashMap<String, Appliance>,
}

impl StaticRegistry {
    pub fn new(appliances: impl IntoIterator<Item = Appliance>) -> Self {
        Self {
            appliances: appliances
                .into_iter()
                .map(|a| (a.id.clone(), a))
                .collect(),
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(config.appliances.iter().cloned())
    }
}

impl TargetRegistry for StaticRegistry {
    fn lookup(&self, target_id: &str) -> Option<Appliance> {
        self.appliances.get(target_id).cloned()
    }
}
