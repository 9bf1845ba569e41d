use std::collections::BTreeSet;
use std::time::Duration;

use crate::generation::GenerationViewState;
use crate::view_model::AppViewModel;
use crate::{
    Effect, ExportSettings, KnowledgeBase, Msg, RequirementInputs, RunId, TestCaseBoard,
};

/// How long validation notifications stay up.
pub const SHORT_NOTIFICATION: Duration = Duration::from_secs(3);
/// How long export results stay up.
pub const LONG_NOTIFICATION: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub(crate) inputs: RequirementInputs,
    pub(crate) kb: KnowledgeBase,
    pub(crate) generation: GenerationViewState,
    pub(crate) active_run: Option<RunId>,
    pub(crate) cancelled_run: Option<RunId>,
    pub(crate) run_kb_enabled: bool,
    next_run_id: RunId,
    pub(crate) board: TestCaseBoard,
    pub(crate) is_loading_test_cases: bool,
    pub(crate) export: ExportSettings,
    pub(crate) export_selection: BTreeSet<String>,
    pub(crate) pending_export: Option<String>,
    pub(crate) last_export_path: Option<String>,
    pub(crate) notification: Option<Notification>,
    next_notification_id: u64,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel::build(self)
    }

    pub fn generation(&self) -> &GenerationViewState {
        &self.generation
    }

    pub fn inputs(&self) -> &RequirementInputs {
        &self.inputs
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn test_cases(&self) -> &TestCaseBoard {
        &self.board
    }

    pub fn export_settings(&self) -> &ExportSettings {
        &self.export
    }

    pub fn export_selection(&self) -> &BTreeSet<String> {
        &self.export_selection
    }

    pub fn active_run(&self) -> Option<RunId> {
        self.active_run
    }

    pub fn is_exporting(&self) -> bool {
        self.pending_export.is_some()
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    /// Nothing in flight: no run, no test-case load, no export.
    pub fn is_settled(&self) -> bool {
        self.active_run.is_none()
            && !self.generation.is_running
            && !self.is_loading_test_cases
            && self.pending_export.is_none()
    }

    /// Returns whether anything changed since the last call and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn allocate_run_id(&mut self) -> RunId {
        self.next_run_id += 1;
        self.next_run_id
    }

    /// Replaces the current notification and schedules its expiry.
    pub(crate) fn notify(
        &mut self,
        kind: NotificationKind,
        message: impl Into<String>,
        lifetime: Duration,
    ) -> Effect {
        self.next_notification_id += 1;
        let id = self.next_notification_id;
        self.notification = Some(Notification {
            id,
            kind,
            message: message.into(),
        });
        self.mark_dirty();
        Effect::ScheduleMsg {
            after: lifetime,
            msg: Msg::NotificationExpired { id },
        }
    }
}
