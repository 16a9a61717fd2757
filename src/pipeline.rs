//! Result/error reporter: drives one request through every stage and turns
//! the result into an [`OperationOutcome`].

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{PipelineError, Stage};
use crate::model::{OperationOutcome, RunOutput};
use crate::writer::workspace::Workspace;
use crate::{parser, processor, runner, writer};

/// Where a request is.
///
/// `Idle → Parsing → Validating → Assembling → Building → Executing → Done`,
/// with `Failed` reachable from any stage. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running(Stage),
    Done,
    Failed { stage: Stage, message: String },
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed { .. })
    }

    fn advance(&mut self, stage: Stage) {
        if self.is_terminal() {
            return;
        }
        info!(%stage, "entering stage");
        *self = RunState::Running(stage);
    }

    fn finish(&mut self, result: &Result<RunOutput, PipelineError>) {
        if self.is_terminal() {
            return;
        }
        *self = match (result, &*self) {
            (Ok(_), _) => RunState::Done,
            (Err(e), RunState::Running(stage)) => RunState::Failed {
                stage: *stage,
                message: e.to_string(),
            },
            (Err(e), _) => RunState::Failed {
                stage: e.stage(),
                message: e.to_string(),
            },
        };
    }
}

/// Everything known about one finished request.
#[derive(Debug)]
pub struct RunReport {
    pub request_id: String,
    pub state: RunState,
    pub result: Result<RunOutput, PipelineError>,
}

impl RunReport {
    pub fn outcome(&self) -> OperationOutcome {
        match &self.result {
            Ok(run) => OperationOutcome::succeeded(run.clone()),
            Err(e) => OperationOutcome::failed(e),
        }
    }
}

/// Shared entry point. Safe to call concurrently: each request stages its
/// files in its own workspace, and builds/runs are capped by a semaphore.
#[derive(Debug)]
pub struct Pipeline {
    config: EngineConfig,
    permits: Arc<Semaphore>,
}

impl Pipeline {
    pub fn new(config: EngineConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_runs.max(1)));
        Self { config, permits }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `script` end to end and report success or the first failure.
    pub async fn process(&self, script: &str) -> OperationOutcome {
        self.run(script).await.outcome()
    }

    pub async fn run(&self, script: &str) -> RunReport {
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!("request", id = %request_id);

        async {
            let mut state = RunState::Idle;
            let result = self.drive(&request_id, script, &mut state).await;
            state.finish(&result);

            match &result {
                Ok(run) => info!(
                    output_len = run.stdout.len(),
                    warnings = run.warnings.is_some(),
                    "request succeeded"
                ),
                Err(e) => warn!(code = e.code(), stage = %e.stage(), "request failed: {e}"),
            }

            RunReport {
                request_id: request_id.clone(),
                state,
                result,
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        request_id: &str,
        script: &str,
        state: &mut RunState,
    ) -> Result<RunOutput, PipelineError> {
        let config = &self.config;

        state.advance(Stage::Parsing);
        let commands = parser::commands(script);
        let calls = processor::parse(&commands)?;

        state.advance(Stage::Validating);
        let statements = processor::validate(&calls)?;

        state.advance(Stage::Assembling);
        let program = writer::cpp::assemble(&statements);
        debug!(statements = program.statement_count, source = %program.source, "assembled program");

        // the semaphore is never closed, so a permit is always granted
        let _permit = self.permits.acquire().await.ok();

        state.advance(Stage::Building);
        let workspace = Workspace::create(
            &config.workspace_root,
            request_id,
            config.keep_workspaces,
        )?;
        let artifact = runner::build::compile(config, &workspace, &program).await?;

        state.advance(Stage::Executing);
        runner::sandbox::execute(config, &artifact).await
    }
}
