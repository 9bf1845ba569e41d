use std::path::PathBuf;

use testgen_core::{JobEvent, RunId, TestCase};

use crate::api::ApiError;

/// Everything the engine reports back to the app's message loop.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The event source of a run is live.
    RunOpened { run_id: RunId },
    /// One event delivered through a run's channel.
    Run { run_id: RunId, event: JobEvent },
    TestCasesLoaded(Result<Vec<TestCase>, ApiError>),
    /// Export artifact written (path) or the reason it was not.
    ExportFinished(Result<PathBuf, String>),
}
