pub mod registry;
pub mod reporter;
pub mod service;

pub use registry::{StaticRegistry, TargetRegistry};
pub use reporter::{ArchiveUploader, ResultReporter, RETRIEVAL_SUCCESS};
pub use service::DiagnosticsService;
