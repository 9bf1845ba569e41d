//! Test generator core: pure state machine, event vocabulary and view-model helpers.
mod config;
mod effect;
mod event;
mod export;
mod generation;
mod inputs;
mod knowledge_base;
mod msg;
mod state;
mod test_case;
mod update;
mod validation;
mod view_model;

pub use config::{
    check_kb_max_docs, check_kb_threshold, ConfigError, LlmConfig, LlmProvider,
    KB_MAX_DOCS_RANGE, KB_THRESHOLD_RANGE, MAX_TOKENS_RANGE, TEMPERATURE_RANGE,
};
pub use effect::Effect;
pub use event::{JobEvent, RunId};
pub use export::{render_markdown, ExportFormat, ExportRequest, ExportSettings};
pub use generation::{
    GenerationViewState, CANCEL_NOTICE, CANCEL_NOTICE_LIFETIME, CANCEL_SETTLE_DELAY,
    COMPLETION_DISPLAY_WINDOW,
};
pub use inputs::{
    format_file_size, RequirementInputs, UploadFile, UploadLimits, UploadRejection, KB_LIMITS,
    REQUIREMENT_LIMITS,
};
pub use knowledge_base::{
    KbAddOutcome, KbDocument, KbDocumentKind, KbSettings, KbUpload, KnowledgeBase,
};
pub use msg::Msg;
pub use state::{AppState, Notification, NotificationKind, LONG_NOTIFICATION, SHORT_NOTIFICATION};
pub use test_case::{Priority, SortBy, TestCase, TestCaseBoard, TestCaseFilter, TestCasePatch};
pub use update::update;
pub use validation::{validate_generation, ValidationError};
pub use view_model::{
    format_time_remaining, Agent, AgentBadge, AppViewModel, BadgeState, CancelButtonView,
    CompletionView, ExportView, FileRowView, KbDocumentRowView, KbPanelView, KnowledgeBaseView,
    Phase, ProgressView, TestCaseListView, TestCaseRowView, WORKING_HINT,
};
