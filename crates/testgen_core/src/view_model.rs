//! Read-only projections of [`AppState`] for the presentation layer.
//!
//! Nothing here is stored: phase, badges and labels are recomputed from the
//! progress value on every call to [`AppState::view`].

use crate::inputs::format_file_size;
use crate::state::Notification;
use crate::{AppState, ExportSettings, SortBy, TestCase, TestCaseFilter};

/// Progress at which the percent label fits inside the bar.
const PERCENT_LABEL_MIN: f64 = 8.0;

pub const WORKING_HINT: &str = "AI agents are working on your test cases...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Planner,
    Generator,
    Executor,
    Complete,
}

impl Phase {
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 100.0 {
            Phase::Complete
        } else if percent >= 66.0 {
            Phase::Executor
        } else if percent >= 33.0 {
            Phase::Generator
        } else {
            Phase::Planner
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agent {
    Planner,
    Generator,
    Executor,
}

impl Agent {
    pub const ALL: [Agent; 3] = [Agent::Planner, Agent::Generator, Agent::Executor];

    pub fn label(self) -> &'static str {
        match self {
            Agent::Planner => "Planner",
            Agent::Generator => "Generator",
            Agent::Executor => "Executor",
        }
    }

    fn active_caption(self) -> &'static str {
        match self {
            Agent::Planner => "Analyzing...",
            Agent::Generator => "Creating...",
            Agent::Executor => "Validating...",
        }
    }

    fn phase(self) -> Phase {
        match self {
            Agent::Planner => Phase::Planner,
            Agent::Generator => Phase::Generator,
            Agent::Executor => Phase::Executor,
        }
    }

    /// Percent at which this agent's work is done.
    fn done_at(self) -> f64 {
        match self {
            Agent::Planner => 33.0,
            Agent::Generator => 66.0,
            Agent::Executor => 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeState {
    Pending,
    Active,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentBadge {
    pub agent: Agent,
    pub state: BadgeState,
    pub caption: &'static str,
}

impl AgentBadge {
    pub fn derive(agent: Agent, percent: f64) -> Self {
        let state = if percent >= agent.done_at() {
            BadgeState::Done
        } else if Phase::from_percent(percent) == agent.phase() {
            BadgeState::Active
        } else {
            BadgeState::Pending
        };
        let caption = match state {
            BadgeState::Active => agent.active_caption(),
            BadgeState::Done => "Complete",
            BadgeState::Pending => "Pending",
        };
        Self {
            agent,
            state,
            caption,
        }
    }
}

/// `None` or a non-positive estimate reads as still calculating.
pub fn format_time_remaining(seconds: Option<f64>) -> String {
    let seconds = match seconds {
        Some(s) if s > 0.0 => s,
        _ => return "Calculating...".to_string(),
    };
    if seconds < 60.0 {
        format!("~{}s remaining", seconds.round())
    } else {
        let minutes = (seconds / 60.0).floor();
        let secs = (seconds % 60.0).round();
        format!("~{minutes}m {secs}s remaining")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelButtonView {
    pub label: &'static str,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionView {
    pub test_case_count: u32,
    pub kb_compliance_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KbPanelView {
    pub document_count: usize,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    pub percent: f64,
    pub percent_label: Option<String>,
    pub phase: Phase,
    pub agents: Vec<AgentBadge>,
    pub step_message: String,
    /// Present once the run has reported an estimate.
    pub time_remaining: Option<String>,
    pub kb_panel: Option<KbPanelView>,
    pub cancel: CancelButtonView,
    pub working_hint: Option<&'static str>,
    pub completion: Option<CompletionView>,
    pub test_cases_received: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRowView {
    pub name: String,
    pub size_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KbDocumentRowView {
    pub id: String,
    pub name: String,
    pub size_label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeBaseView {
    pub enabled: bool,
    pub documents: Vec<KbDocumentRowView>,
    pub selected_count: usize,
    pub total_size_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseRowView {
    pub id: String,
    pub title: String,
    pub category: String,
    pub priority: &'static str,
    pub kb_compliant: Option<bool>,
    pub selected_for_export: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseListView {
    pub rows: Vec<TestCaseRowView>,
    /// "{visible} of {total}" counter.
    pub counter: String,
    pub categories: Vec<String>,
    pub filter: TestCaseFilter,
    pub sort_by: SortBy,
    pub selected: Option<TestCase>,
    pub is_loading: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportView {
    pub settings: ExportSettings,
    pub selected_count: usize,
    /// KB options only make sense while the Knowledge Base is in use.
    pub kb_options_available: bool,
    pub is_exporting: bool,
    pub last_export_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppViewModel {
    pub progress: Option<ProgressView>,
    /// Step line shown outside a run, e.g. the cancellation notice.
    pub status_line: Option<String>,
    pub error: Option<String>,
    pub files: Vec<FileRowView>,
    pub files_total_label: String,
    pub requirements_text: String,
    pub knowledge_base: KnowledgeBaseView,
    pub test_cases: TestCaseListView,
    pub export: ExportView,
    pub notification: Option<Notification>,
    pub can_generate: bool,
    pub dirty: bool,
}

impl AppViewModel {
    pub(crate) fn build(state: &AppState) -> Self {
        let generation = &state.generation;
        let status_line = (!generation.is_running && !generation.current_step_message.is_empty())
            .then(|| generation.current_step_message.clone());

        Self {
            progress: progress_view(state),
            status_line,
            error: generation.error.clone(),
            files: state
                .inputs
                .files()
                .iter()
                .map(|f| FileRowView {
                    name: f.name.clone(),
                    size_label: format_file_size(f.size),
                })
                .collect(),
            files_total_label: format_file_size(state.inputs.total_size()),
            requirements_text: state.inputs.text().to_string(),
            knowledge_base: knowledge_base_view(state),
            test_cases: test_case_list_view(state),
            export: ExportView {
                settings: state.export,
                selected_count: state.export_selection.len(),
                kb_options_available: state.kb.is_enabled(),
                is_exporting: state.pending_export.is_some(),
                last_export_path: state.last_export_path.clone(),
            },
            notification: state.notification.clone(),
            can_generate: !generation.is_running,
            dirty: state.is_dirty(),
        }
    }
}

fn progress_view(state: &AppState) -> Option<ProgressView> {
    let generation = &state.generation;
    if !generation.is_running {
        return None;
    }
    let percent = generation.progress_percent;
    let kb_panel = (state.kb.is_enabled() && !state.kb.documents().is_empty()).then(|| {
        KbPanelView {
            document_count: state.kb.documents().len(),
            notes: generation.kb_notes.clone(),
        }
    });
    let completion = generation.is_complete.then(|| CompletionView {
        test_case_count: generation.final_test_case_count,
        kb_compliance_score: generation.final_kb_compliance_score,
    });

    Some(ProgressView {
        percent,
        percent_label: (percent > PERCENT_LABEL_MIN).then(|| format!("{}%", percent.round())),
        phase: Phase::from_percent(percent),
        agents: Agent::ALL
            .iter()
            .map(|agent| AgentBadge::derive(*agent, percent))
            .collect(),
        step_message: generation.current_step_message.clone(),
        time_remaining: generation
            .estimated_seconds_remaining
            .map(|secs| format_time_remaining(Some(secs))),
        kb_panel,
        cancel: CancelButtonView {
            label: if generation.is_cancelling {
                "Cancelling..."
            } else {
                "Cancel"
            },
            enabled: !generation.is_cancelling && !generation.is_complete,
        },
        working_hint: (!generation.is_complete).then_some(WORKING_HINT),
        completion,
        test_cases_received: generation.test_cases_received,
    })
}

fn knowledge_base_view(state: &AppState) -> KnowledgeBaseView {
    let kb = &state.kb;
    KnowledgeBaseView {
        enabled: kb.is_enabled(),
        documents: kb
            .documents()
            .iter()
            .map(|doc| KbDocumentRowView {
                id: doc.id.clone(),
                name: doc.name.clone(),
                size_label: format_file_size(doc.size),
                selected: kb.is_selected(&doc.id),
            })
            .collect(),
        selected_count: kb.selected_documents().count(),
        total_size_label: format_file_size(kb.total_size()),
    }
}

fn test_case_list_view(state: &AppState) -> TestCaseListView {
    let board = &state.board;
    let visible = board.visible();
    TestCaseListView {
        counter: format!("{} of {}", visible.len(), board.len()),
        rows: visible
            .into_iter()
            .map(|case| TestCaseRowView {
                id: case.id.clone(),
                title: case.title.clone(),
                category: case.category.clone(),
                priority: case.priority.as_str(),
                kb_compliant: case.kb_compliant,
                selected_for_export: state.export_selection.contains(&case.id),
            })
            .collect(),
        categories: board.categories(),
        filter: board.filter().clone(),
        sort_by: board.sort_by(),
        selected: board.selected().cloned(),
        is_loading: state.is_loading_test_cases,
    }
}
