//! Test generator engine: event sources, backend client and effect execution.
mod api;
mod channel;
mod driver;
mod engine;
mod export;
mod mock_data;
mod persist;
mod scheduler;
mod stream;
mod types;
mod uploads;

pub use api::{ApiError, ApiSettings, Backend, HttpBackend, Project, StatusReply, DEFAULT_API_BASE_URL};
pub use channel::{ChannelHandlers, JobHandle, RunChannel, RunHandlers};
pub use driver::{
    mock_run_duration, start_mock_run, MockStep, INITIAL_DELAY, MOCK_KB_COMPLIANCE_SCORE,
    MOCK_STEPS, MOCK_TEST_CASE_COUNT,
};
pub use engine::{BackendClient, EngineError, EngineHandle, EngineSettings, RunSource};
pub use export::{export_to_dir, ExportArtifact, ExportError, MOCK_EXCEL_CONTENT};
pub use persist::{OutputDir, PersistError};
pub use scheduler::{Scheduler, TimerId, TimerTask, TokioScheduler, VirtualScheduler};
pub use stream::{
    start_stream_run, EventStreamDecoder, EventStreamSource, KbNotePolicy, StreamError,
    StreamSettings,
};
pub use types::EngineEvent;
pub use uploads::{mime_type_for, sha256_hex, LoadedFile, UploadError};
