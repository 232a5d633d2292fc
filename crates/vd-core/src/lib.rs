pub mod appliance;
pub mod config;
pub mod error;
pub mod request;
pub mod whitelist;

pub use appliance::{Appliance, ApplianceKind};
pub use config::{AgentConfig, GcConfig, RetrievalDefaults};
pub use error::DiagnosticsError;
pub use request::{
    split_items, DiagnosticsRequest, RequestKind, RequestPayload, Response, RetrievalType,
};
pub use whitelist::{CommandSpec, CommandType, CommandWhitelist};
