use crate::executor::Executor;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use vd_core::DiagnosticsError;

/// How a registered alias token materialises into a file.
#[derive(Debug, Clone)]
pub enum AliasEntry {
    /// The alias names a fixed file on disk.
    LiteralPath(PathBuf),
    /// The alias runs a command and captures its stdout into a fresh file.
    GeneratorCommand(Vec<String>),
}

/// Resolves requested item tokens to concrete files.
///
/// A token is either a literal filesystem path or a bracketed alias such as
/// `[IPTABLES]`. Alias names are matched case-insensitively. The table is
/// built once at startup and never mutated afterwards.
pub struct AliasResolver {
    table: HashMap<String, AliasEntry>,
    work_dir: PathBuf,
}

impl AliasResolver {
    /// Build the resolver with the stock alias table: current firewall
    /// rules, interface configuration, and routing table snapshots.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        let mut table = HashMap::new();
        table.insert(
            "iptables".to_string(),
            AliasEntry::GeneratorCommand(vec!["iptables-save".to_string()]),
        );
        table.insert(
            "ifconfig".to_string(),
            AliasEntry::GeneratorCommand(vec![
                "ip".to_string(),
                "addr".to_string(),
                "show".to_string(),
            ]),
        );
        table.insert(
            "routes".to_string(),
            AliasEntry::GeneratorCommand(vec![
                "ip".to_string(),
                "route".to_string(),
                "show".to_string(),
            ]),
        );
        Self {
            table,
            work_dir: work_dir.into(),
        }
    }

    /// Register an additional alias. Intended for construction time only;
    /// the table is read-only once the agent starts serving requests.
    pub fn register(&mut self, name: impl Into<String>, entry: AliasEntry) {
        self.table.insert(name.into().to_ascii_lowercase(), entry);
    }

    pub fn is_alias(token: &str) -> bool {
        token.len() > 2 && token.starts_with('[') && token.ends_with(']')
    }

    /// Resolve one requested token to a file on disk.
    ///
    /// Generator aliases run their command through `executor` and capture
    /// stdout to a uniquely named file under the work dir. Failures are
    /// per-token: the caller records them as missing items.
    pub async fn resolve(
        &self,
        token: &str,
        executor: &Executor,
    ) -> Result<PathBuf, DiagnosticsError> {
        if Self::is_alias(token) {
            let name = token[1..token.len() - 1].to_ascii_lowercase();
            match self.table.get(&name) {
                None => Err(DiagnosticsError::UnsupportedDiagnosticType),
                Some(AliasEntry::LiteralPath(path)) => self.verify_literal(path),
                Some(AliasEntry::GeneratorCommand(argv)) => {
                    self.generate(&name, argv, executor).await
                }
            }
        } else {
            self.verify_literal(Path::new(token))
        }
    }

    fn verify_literal(&self, path: &Path) -> Result<PathBuf, DiagnosticsError> {
        if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(DiagnosticsError::FileNotFound(path.display().to_string()))
        }
    }

    async fn generate(
        &self,
        name: &str,
        argv: &[String],
        executor: &Executor,
    ) -> Result<PathBuf, DiagnosticsError> {
        let result = executor.run(argv).await?;
        if !result.succeeded() || result.stdout.is_empty() {
            return Err(DiagnosticsError::AliasGenerationFailed(name.to_string()));
        }

        let mut file = tempfile::Builder::new()
            .prefix(&format!("{name}_"))
            .suffix(".capture")
            .tempfile_in(&self.work_dir)?;
        file.write_all(result.stdout.as_bytes())?;
        let (_, path) = file.keep().map_err(|e| DiagnosticsError::Io(e.error))?;

        debug!(alias = name, path = %path.display(), "captured alias output");
        Ok(path)
    }
}
