use crate::error::DiagnosticsError;
use serde::{Deserialize, Serialize};

/// One inbound control-plane request targeting a single appliance.
///
/// The payload is tagged by `kind`, so a payload can never disagree with the
/// request kind after decoding. The nested type selectors stay as plain
/// strings here and are validated against the whitelist/alias tables before
/// anything is executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsRequest {
    pub target_id: String,
    #[serde(flatten)]
    pub payload: RequestPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestPayload {
    /// Run a whitelisted network probe and return its output inline.
    LiveCommand {
        command_type: String,
        address: String,
        #[serde(default)]
        extra_args: Option<String>,
    },
    /// Bundle the named files and alias tokens into a downloadable archive.
    /// `items` is a comma-separated list; empty means "use the defaults
    /// configured for this appliance kind".
    FileRetrieval {
        retrieval_type: String,
        #[serde(default)]
        items: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    LiveCommand,
    FileRetrieval,
}

impl DiagnosticsRequest {
    pub fn kind(&self) -> RequestKind {
        match self.payload {
            RequestPayload::LiveCommand { .. } => RequestKind::LiveCommand,
            RequestPayload::FileRetrieval { .. } => RequestKind::FileRetrieval,
        }
    }
}

/// Retrieval categories accepted by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrievalType {
    LogFiles,
    Files,
}

impl RetrievalType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOGFILES" => Some(RetrievalType::LogFiles),
            "FILES" => Some(RetrievalType::Files),
            _ => None,
        }
    }
}

/// Structured outcome of one request.
///
/// `name` doubles as the short human status the control plane matches on;
/// `detail` carries command output or the archive reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Response {
    pub fn ok(name: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            success: true,
            name: name.into(),
            detail,
        }
    }

    pub fn failure(err: &DiagnosticsError) -> Self {
        Self {
            success: false,
            name: err.to_string(),
            detail: None,
        }
    }
}

/// Split a comma-separated item list, dropping empty entries.
pub fn split_items(items: &str) -> Vec<String> {
    items
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
