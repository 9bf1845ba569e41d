use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use serde::{Deserialize, Serialize};
use testgen_core::{ExportRequest, LlmConfig, RunId};
use thiserror::Error;

use crate::api::{ApiError, ApiSettings, Backend, HttpBackend, Project, StatusReply};
use crate::channel::{ChannelHandlers, JobHandle};
use crate::driver::start_mock_run;
use crate::export::export_to_dir;
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::stream::{start_stream_run, EventStreamSource, StreamError, StreamSettings};
use crate::EngineEvent;

/// Where run events come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunSource {
    /// Timed simulation, no backend involved.
    #[default]
    Mock,
    /// The backend's streaming endpoint.
    Stream,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub api: ApiSettings,
    pub stream: StreamSettings,
    pub source: RunSource,
    pub project_id: String,
    pub output_dir: PathBuf,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            api: ApiSettings::default(),
            stream: StreamSettings::default(),
            source: RunSource::Mock,
            project_id: "1".to_string(),
            output_dir: PathBuf::from("./exports"),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("backend client: {0}")]
    Api(#[from] ApiError),
    #[error("event stream: {0}")]
    Stream(#[from] StreamError),
}

enum EngineCommand {
    StartRun { run_id: RunId },
    CancelRun { run_id: RunId },
    LoadTestCases,
    Export { request: ExportRequest },
}

/// Owns the async runtime on a worker thread. Commands go in, [`EngineEvent`]s
/// come out; dropping the handle cancels live runs and stops the thread.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Runtime::new()?;
        let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(settings.api.clone())?);
        let stream = match settings.source {
            RunSource::Stream => Some(Arc::new(EventStreamSource::new(StreamSettings {
                project_id: settings.project_id.clone(),
                ..settings.stream.clone()
            })?)),
            RunSource::Mock => None,
        };
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let worker = Worker {
                scheduler: Arc::new(TokioScheduler::new(runtime.handle().clone())),
                runtime,
                backend,
                stream,
                settings,
                event_tx,
                runs: HashMap::new(),
            };
            worker.serve(cmd_rx);
        });

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn start_run(&self, run_id: RunId) {
        self.send(EngineCommand::StartRun { run_id });
    }

    pub fn cancel_run(&self, run_id: RunId) {
        self.send(EngineCommand::CancelRun { run_id });
    }

    pub fn load_test_cases(&self) {
        self.send(EngineCommand::LoadTestCases);
    }

    pub fn export(&self, request: ExportRequest) {
        self.send(EngineCommand::Export { request });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Waits up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            engine_warn!("Engine thread is gone; command dropped");
        }
    }
}

struct Worker {
    runtime: tokio::runtime::Runtime,
    scheduler: Arc<dyn Scheduler>,
    backend: Arc<dyn Backend>,
    stream: Option<Arc<EventStreamSource>>,
    settings: EngineSettings,
    event_tx: mpsc::Sender<EngineEvent>,
    runs: HashMap<RunId, JobHandle>,
}

impl Worker {
    fn serve(mut self, cmd_rx: mpsc::Receiver<EngineCommand>) {
        while let Ok(command) = cmd_rx.recv() {
            self.handle(command);
        }
        for (run_id, handle) in self.runs.drain() {
            engine_debug!("Engine shutting down; cancelling run {run_id}");
            handle.cancel();
        }
    }

    fn handle(&mut self, command: EngineCommand) {
        prune_finished(&mut self.runs);
        match command {
            EngineCommand::StartRun { run_id } => {
                let handlers = Arc::new(ChannelHandlers::new(run_id, self.event_tx.clone()));
                let handle = match &self.stream {
                    Some(source) => {
                        engine_info!("Run {run_id}: streaming from backend");
                        start_stream_run(self.runtime.handle(), Arc::clone(source), handlers)
                    }
                    None => {
                        engine_info!("Run {run_id}: mock generation");
                        start_mock_run(Arc::clone(&self.scheduler), handlers)
                    }
                };
                if let Some(previous) = self.runs.insert(run_id, handle) {
                    previous.cancel();
                }
            }
            EngineCommand::CancelRun { run_id } => match self.runs.remove(&run_id) {
                Some(handle) => {
                    engine_info!("Run {run_id}: cancelled");
                    handle.cancel();
                }
                None => engine_debug!("Run {run_id}: nothing to cancel"),
            },
            EngineCommand::LoadTestCases => {
                let backend = Arc::clone(&self.backend);
                let project_id = self.settings.project_id.clone();
                let event_tx = self.event_tx.clone();
                self.runtime.spawn(async move {
                    let result = backend.list_test_cases(&project_id).await;
                    let _ = event_tx.send(EngineEvent::TestCasesLoaded(result));
                });
            }
            EngineCommand::Export { request } => {
                let output_dir = self.settings.output_dir.clone();
                let event_tx = self.event_tx.clone();
                self.runtime.spawn_blocking(move || {
                    let result = export_to_dir(&request, &output_dir, chrono::Utc::now())
                        .map_err(|err| err.to_string());
                    let _ = event_tx.send(EngineEvent::ExportFinished(result));
                });
            }
        }
    }
}

/// Drops handles of runs that already delivered their terminal event.
fn prune_finished(runs: &mut HashMap<RunId, JobHandle>) {
    runs.retain(|run_id, handle| {
        let finished = handle.is_finished();
        if finished {
            engine_debug!("Run {run_id}: finished; releasing handle");
        }
        !finished
    });
}

/// Blocking facade over [`Backend`] for one-shot calls outside the engine loop.
pub struct BackendClient {
    runtime: tokio::runtime::Runtime,
    backend: Arc<dyn Backend>,
}

impl BackendClient {
    pub fn new(settings: ApiSettings) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            runtime,
            backend: Arc::new(HttpBackend::new(settings)?),
        })
    }

    pub fn health(&self) -> Result<StatusReply, ApiError> {
        self.runtime.block_on(self.backend.health())
    }

    pub fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.runtime.block_on(self.backend.list_projects())
    }

    pub fn get_config(&self) -> Result<LlmConfig, ApiError> {
        self.runtime.block_on(self.backend.get_config())
    }

    pub fn test_connection(&self) -> Result<StatusReply, ApiError> {
        self.runtime.block_on(self.backend.test_connection())
    }
}
