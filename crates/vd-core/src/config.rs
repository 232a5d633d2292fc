use crate::appliance::{Appliance, ApplianceKind};
use crate::request::RetrievalType;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Agent configuration, loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Directory archives and generated captures are written to.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// Leading component of archive filenames.
    #[serde(default = "default_archive_prefix")]
    pub archive_prefix: String,
    /// Upper bound for a single spawned command, in seconds.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    #[serde(default)]
    pub gc: GcConfig,
    #[serde(default)]
    pub retrieval_defaults: RetrievalDefaults,
    /// Appliances the agent will accept requests for.
    #[serde(default)]
    pub appliances: Vec<Appliance>,
}

/// Stale-bundle garbage collection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcConfig {
    #[serde(default = "default_gc_enabled")]
    pub enabled: bool,
    #[serde(default = "default_max_file_age_secs")]
    pub max_file_age_secs: u64,
}

/// Item lists applied when a retrieval request names no items, keyed by
/// appliance kind and retrieval type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalDefaults {
    #[serde(default)]
    pub domain_router: KindDefaults,
    #[serde(default)]
    pub console_proxy: KindDefaults,
    #[serde(default)]
    pub secondary_storage_vm: KindDefaults,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KindDefaults {
    #[serde(default)]
    pub logfiles: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

impl AgentConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse agent config YAML")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read agent config from {:?}", path))?;
        Self::from_yaml(&content)
    }

    /// Load from `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn command_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.command_timeout_secs)
    }

    pub fn max_file_age(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.gc.max_file_age_secs)
    }
}

impl RetrievalDefaults {
    pub fn for_kind(&self, kind: ApplianceKind, retrieval_type: RetrievalType) -> &[String] {
        let defaults = match kind {
            ApplianceKind::DomainRouter => &self.domain_router,
            ApplianceKind::ConsoleProxy => &self.console_proxy,
            ApplianceKind::SecondaryStorageVm => &self.secondary_storage_vm,
        };
        match retrieval_type {
            RetrievalType::LogFiles => &defaults.logfiles,
            RetrievalType::Files => &defaults.files,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            archive_prefix: default_archive_prefix(),
            command_timeout_secs: default_command_timeout_secs(),
            gc: GcConfig::default(),
            retrieval_defaults: RetrievalDefaults::default(),
            appliances: vec![],
        }
    }
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            enabled: default_gc_enabled(),
            max_file_age_secs: default_max_file_age_secs(),
        }
    }
}

impl Default for RetrievalDefaults {
    fn default() -> Self {
        let network_captures = || {
            vec![
                "[IPTABLES]".to_string(),
                "[IFCONFIG]".to_string(),
                "[ROUTES]".to_string(),
            ]
        };
        Self {
            domain_router: KindDefaults {
                logfiles: vec!["/var/log/cloud.log".to_string()],
                files: network_captures(),
            },
            console_proxy: KindDefaults {
                logfiles: vec!["/var/log/cloud/agent.log".to_string()],
                files: network_captures(),
            },
            secondary_storage_vm: KindDefaults {
                logfiles: vec![
                    "/var/log/cloud/agent.log".to_string(),
                    "/var/log/cloud/cloud.log".to_string(),
                ],
                files: network_captures(),
            },
        }
    }
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

fn default_archive_prefix() -> String {
    "diagnostics".to_string()
}

fn default_command_timeout_secs() -> u64 {
    60
}

fn default_gc_enabled() -> bool {
    true
}

fn default_max_file_age_secs() -> u64 {
    86_400
}
