use std::path::Path;
use tracing::warn;
use vd_archive::ArchiveManifest;
use vd_core::Response;
use vd_exec::ExecutionResult;

/// Fixed status the control plane matches on for successful retrievals.
pub const RETRIEVAL_SUCCESS: &str = "Log file downloaded successfully";

/// Handoff seam for pushing a finished archive to secondary storage.
/// Returns the remote reference the control plane can download from.
pub trait ArchiveUploader: Send + Sync {
    fn upload(&self, archive: &Path) -> anyhow::Result<String>;
}

/// Shapes the final `Response` for each request kind.
pub struct ResultReporter;

impl ResultReporter {
    /// Live commands return their captured output inline. The assembled
    /// command line is echoed back in `name`.
    pub fn live(result: &ExecutionResult) -> Response {
        let mut detail = result.stdout.clone();
        if !result.stderr.is_empty() {
            if !detail.is_empty() && !detail.ends_with('\n') {
                detail.push('\n');
            }
            detail.push_str(&result.stderr);
        }
        if !result.duration_ok {
            detail.push_str("command timed out");
        }

        Response {
            success: result.succeeded(),
            name: result.command.clone(),
            detail: Some(detail),
        }
    }

    /// Retrievals return the archive reference: the uploaded URL when an
    /// uploader is configured, the local path otherwise. Missing items are
    /// informational and already recorded on the manifest.
    pub fn retrieval(
        manifest: &ArchiveManifest,
        uploader: Option<&dyn ArchiveUploader>,
    ) -> Response {
        let local = manifest.archive_path.display().to_string();
        let detail = match uploader {
            Some(uploader) => match uploader.upload(&manifest.archive_path) {
                Ok(url) => url,
                Err(e) => {
                    warn!(error = %e, archive = %local, "upload handoff failed, returning local path");
                    local
                }
            },
            None => local,
        };

        if !manifest.missing.is_empty() {
            warn!(missing = ?manifest.missing, "some requested items were not found");
        }

        Response::ok(RETRIEVAL_SUCCESS, Some(detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn result(exit_code: i32, duration_ok: bool) -> ExecutionResult {
        ExecutionResult {
            exit_code,
            stdout: "4 packets transmitted\n".to_string(),
            stderr: String::new(),
            command: "ping 192.0.2.1 -c 4".to_string(),
            duration_ok,
        }
    }

    fn manifest() -> ArchiveManifest {
        ArchiveManifest {
            archive_path: PathBuf::from("/tmp/diagnostics_r-42_20250101-000000.zip"),
            included: vec!["a.log".to_string()],
            missing: vec![],
        }
    }

    struct FakeUploader {
        fail: bool,
    }

    impl ArchiveUploader for FakeUploader {
        fn upload(&self, archive: &Path) -> anyhow::Result<String> {
            if self.fail {
                anyhow::bail!("secondary storage unreachable");
            }
            Ok(format!(
                "http://sec-storage/diagnostics/{}",
                archive.file_name().unwrap().to_str().unwrap()
            ))
        }
    }

    #[test]
    fn live_success_maps_exit_zero() {
        let response = ResultReporter::live(&result(0, true));
        assert!(response.success);
        assert_eq!(response.name, "ping 192.0.2.1 -c 4");
        assert!(response.detail.unwrap().contains("4 packets"));
    }

    #[test]
    fn live_nonzero_exit_is_reported_as_failure() {
        let response = ResultReporter::live(&result(1, true));
        assert!(!response.success);
    }

    #[test]
    fn live_timeout_is_reported() {
        let response = ResultReporter::live(&result(-1, false));
        assert!(!response.success);
        assert!(response.detail.unwrap().contains("timed out"));
    }

    #[test]
    fn retrieval_without_uploader_returns_local_path() {
        let response = ResultReporter::retrieval(&manifest(), None);
        assert!(response.success);
        assert_eq!(response.name, RETRIEVAL_SUCCESS);
        assert_eq!(
            response.detail.as_deref(),
            Some("/tmp/diagnostics_r-42_20250101-000000.zip")
        );
    }

    #[test]
    fn retrieval_with_uploader_returns_remote_url() {
        let uploader = FakeUploader { fail: false };
        let response = ResultReporter::retrieval(&manifest(), Some(&uploader));
        assert_eq!(
            response.detail.as_deref(),
            Some("http://sec-storage/diagnostics/diagnostics_r-42_20250101-000000.zip")
        );
    }

    #[test]
    fn failed_upload_falls_back_to_local_path() {
        let uploader = FakeUploader { fail: true };
        let response = ResultReporter::retrieval(&manifest(), Some(&uploader));
        assert!(response.success);
        assert_eq!(
            response.detail.as_deref(),
            Some("/tmp/diagnostics_r-42_20250101-000000.zip")
        );
    }
}
