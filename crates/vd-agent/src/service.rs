use crate::registry::TargetRegistry;
use crate::reporter::{ArchiveUploader, ResultReporter};
use tracing::{debug, warn};
use vd_archive::Archiver;
use vd_core::{
    split_items, AgentConfig, Appliance, CommandType, CommandWhitelist, DiagnosticsError,
    DiagnosticsRequest, RequestPayload, Response, RetrievalType,
};
use vd_exec::{AliasResolver, Executor};

/// Lifecycle stages of one request. Validation failures short-circuit from
/// `Validated` straight to `Failed`; there is no retry inside the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Validated,
    Executing,
    Completed,
    Failed,
}

/// Orchestrates one diagnostics request end-to-end.
///
/// The service owns the read-only whitelist and alias tables; everything
/// else (results, manifests, responses) is created fresh per request, so
/// concurrent requests share no mutable state.
pub struct DiagnosticsService<R: TargetRegistry> {
    config: AgentConfig,
    registry: R,
    whitelist: CommandWhitelist,
    aliases: AliasResolver,
    executor: Executor,
    uploader: Option<Box<dyn ArchiveUploader>>,
}

impl<R: TargetRegistry> DiagnosticsService<R> {
    pub fn new(config: AgentConfig, registry: R) -> Self {
        let aliases = AliasResolver::new(config.work_dir.clone());
        let executor = Executor::new(config.command_timeout());
        Self {
            config,
            registry,
            whitelist: CommandWhitelist::new(),
            aliases,
            executor,
            uploader: None,
        }
    }

    /// Attach an upload handoff for produced archives.
    pub fn with_uploader(mut self, uploader: Box<dyn ArchiveUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Handle one request and produce exactly one response. Failures never
    /// escape as errors; they become a structured failure response so one
    /// hostile request cannot take the agent down.
    pub async fn handle(&self, request: &DiagnosticsRequest) -> Response {
        debug!(
            target = %request.target_id,
            state = ?RequestState::Received,
            "diagnostics request received"
        );
        match self.process(request).await {
            Ok(response) => {
                debug!(target = %request.target_id, state = ?RequestState::Completed, "request completed");
                response
            }
            Err(err) => {
                warn!(target = %request.target_id, state = ?RequestState::Failed, error = %err, "request failed");
                Response::failure(&err)
            }
        }
    }

    async fn process(&self, request: &DiagnosticsRequest) -> Result<Response, DiagnosticsError> {
        let appliance = self.validate_target(&request.target_id)?;
        debug!(target = %appliance.id, state = ?RequestState::Validated, "target validated");

        match &request.payload {
            RequestPayload::LiveCommand {
                command_type,
                address,
                extra_args,
            } => {
                let command_type = CommandType::parse(command_type)
                    .ok_or(DiagnosticsError::UnsupportedDiagnosticType)?;
                let argv =
                    self.whitelist
                        .resolve(command_type, address, extra_args.as_deref())?;

                debug!(target = %appliance.id, state = ?RequestState::Executing, command = ?argv, "running live command");
                let result = self.executor.run(&argv).await?;
                Ok(ResultReporter::live(&result))
            }
            RequestPayload::FileRetrieval {
                retrieval_type,
                items,
            } => {
                let retrieval_type = RetrievalType::parse(retrieval_type)
                    .ok_or(DiagnosticsError::UnsupportedDiagnosticType)?;
                let tokens = self.effective_items(&appliance, retrieval_type, items);
                if tokens.is_empty() {
                    return Err(DiagnosticsError::FilesNotFound);
                }

                debug!(target = %appliance.id, state = ?RequestState::Executing, items = tokens.len(), "resolving retrieval items");
                let mut resolved = Vec::new();
                let mut missing = Vec::new();
                for token in &tokens {
                    match self.aliases.resolve(token, &self.executor).await {
                        Ok(path) => resolved.push(path),
                        Err(err) => {
                            debug!(item = %token, error = %err, "item did not resolve");
                            missing.push(token.clone());
                        }
                    }
                }

                let archiver = Archiver::new(
                    self.config.work_dir.clone(),
                    format!("{}_{}", self.config.archive_prefix, appliance.id),
                );
                let mut manifest = archiver.build(&resolved)?;
                // Resolver misses come first: they preserve request order.
                missing.extend(manifest.missing);
                manifest.missing = missing;

                Ok(ResultReporter::retrieval(&manifest, self.uploader.as_deref()))
            }
        }
    }

    /// A target must be known and running before anything is executed.
    fn validate_target(&self, target_id: &str) -> Result<Appliance, DiagnosticsError> {
        self.registry
            .lookup(target_id)
            .filter(|appliance| appliance.running)
            .ok_or(DiagnosticsError::TargetNotFound)
    }

    /// An empty item list falls back to the defaults configured for this
    /// appliance kind and retrieval type.
    fn effective_items(
        &self,
        appliance: &Appliance,
        retrieval_type: RetrievalType,
        items: &str,
    ) -> Vec<String> {
        let requested = split_items(items);
        if requested.is_empty() {
            self.config
                .retrieval_defaults
                .for_kind(appliance.kind, retrieval_type)
                .to_vec()
        } else {
            requested
        }
    }
}
