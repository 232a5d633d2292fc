use anyhow::Result;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

/// Remove stale agent output from `dir`: archives carrying `prefix` and
/// generated `.capture` files older than `max_age`.
///
/// Only files this agent produced are touched; anything else in the
/// directory is left alone. Returns the number of files removed.
pub fn purge_stale(dir: &Path, prefix: &str, max_age: Duration) -> Result<usize> {
    let Some(cutoff) = SystemTime::now().checked_sub(max_age) else {
        return Ok(0);
    };
    if !dir.is_dir() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let ours = (name.starts_with(prefix) && name.ends_with(".zip"))
            || name.ends_with(".capture");
        if !ours {
            continue;
        }

        let modified = entry.metadata()?.modified()?;
        if modified < cutoff {
            debug!(path = %path.display(), "removing stale diagnostics file");
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }

    if removed > 0 {
        info!(removed, dir = %dir.display(), "purged stale diagnostics files");
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_only_agent_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("diagnostics_r-42_20250101-000000.zip"), b"z").unwrap();
        std::fs::write(dir.path().join("iptables_abc123.capture"), b"c").unwrap();
        std::fs::write(dir.path().join("unrelated.zip"), b"keep").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

        // Let mtimes fall behind the cutoff taken at purge time.
        std::thread::sleep(Duration::from_millis(50));

        let removed = purge_stale(dir.path(), "diagnostics", Duration::ZERO).unwrap();
        assert_eq!(removed, 2);

        let mut left: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        left.sort();
        assert_eq!(left, vec!["notes.txt", "unrelated.zip"]);
    }

    #[test]
    fn fresh_files_survive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("diagnostics_r-42_20250101-000000.zip"), b"z").unwrap();

        let removed =
            purge_stale(dir.path(), "diagnostics", Duration::from_secs(3600)).unwrap();
        assert_eq!(removed, 0);
    }

    #[test]
    fn missing_directory_is_a_noop() {
        let removed = purge_stale(
            Path::new("/nonexistent/vmdiag"),
            "diagnostics",
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(removed, 0);
    }
}
