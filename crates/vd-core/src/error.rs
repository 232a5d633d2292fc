use thiserror::Error;

/// Failure taxonomy for diagnostics requests.
///
/// The `Display` strings of the first three variants are the exact status
/// names the control plane matches on; do not reword them.
#[derive(Debug, Error)]
pub enum DiagnosticsError {
    #[error("Diagnostic type specified is not supported.")]
    UnsupportedDiagnosticType,

    #[error("Failed to find the system vm specified.")]
    TargetNotFound,

    #[error("Failed to locate files from the system vm, check if the directory specified is correct.")]
    FilesNotFound,

    #[error("Optional parameters contain unwanted characters.")]
    InvalidParameters,

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("alias generation failed for {0}")]
    AliasGenerationFailed(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
