use testgen_core::{
    AgentBadge, AppViewModel, BadgeState, NotificationKind, Phase, ProgressView, TestCaseListView,
};

const BAR_WIDTH: usize = 30;

pub fn render(view: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(progress) = &view.progress {
        render_progress(progress, &mut lines);
    }
    if let Some(status) = &view.status_line {
        lines.push(status.clone());
    }
    if let Some(error) = &view.error {
        lines.push(format!("Error: {error}"));
    }
    if let Some(notification) = &view.notification {
        let tag = match notification.kind {
            NotificationKind::Info => "info",
            NotificationKind::Success => "ok",
            NotificationKind::Error => "error",
        };
        lines.push(format!("[{tag}] {}", notification.message));
    }
    if view.test_cases.is_loading {
        lines.push("Loading test cases...".to_string());
    }
    lines
}

fn render_progress(progress: &ProgressView, lines: &mut Vec<String>) {
    let filled = ((progress.percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    lines.push(format!(
        "[{}{}] {:>4}  {}",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        progress.percent_label.as_deref().unwrap_or(""),
        phase_label(progress.phase)
    ));
    lines.push(
        progress
            .agents
            .iter()
            .map(badge_label)
            .collect::<Vec<_>>()
            .join(" | "),
    );
    if !progress.step_message.is_empty() {
        lines.push(progress.step_message.clone());
    }
    if let Some(remaining) = &progress.time_remaining {
        lines.push(remaining.clone());
    }
    if let Some(kb) = &progress.kb_panel {
        lines.push(format!("Knowledge Base: {} document(s)", kb.document_count));
        lines.extend(kb.notes.iter().map(|note| format!("  - {note}")));
    }
    match &progress.completion {
        Some(done) => {
            let score = done
                .kb_compliance_score
                .map(|s| format!(", KB compliance {s:.0}%"))
                .unwrap_or_default();
            lines.push(format!(
                "Generated {} test cases{score}",
                done.test_case_count
            ));
        }
        None => {
            if let Some(hint) = progress.working_hint {
                lines.push(hint.to_string());
            }
            lines.push(format!("({})", progress.cancel.label));
        }
    }
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Planner => "Planning",
        Phase::Generator => "Generating",
        Phase::Executor => "Validating",
        Phase::Complete => "Complete",
    }
}

fn badge_label(badge: &AgentBadge) -> String {
    let mark = match badge.state {
        BadgeState::Done => "✓",
        BadgeState::Active => "›",
        BadgeState::Pending => " ",
    };
    format!("{mark} {}: {}", badge.agent.label(), badge.caption)
}

/// One line per visible row plus the "{visible} of {total}" counter.
pub fn render_test_cases(list: &TestCaseListView) -> Vec<String> {
    let mut lines = vec![format!("Test cases ({})", list.counter)];
    for row in &list.rows {
        let kb = match row.kb_compliant {
            Some(true) => " [KB ✓]",
            Some(false) => " [KB ✗]",
            None => "",
        };
        lines.push(format!(
            "{:>4}  {:<6}  {}  ({}){kb}",
            row.id, row.priority, row.title, row.category
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use testgen_core::{update, AppState, JobEvent, Msg};

    use super::*;

    fn running_at(percent: f64) -> AppState {
        let (state, _) = update(
            AppState::new(),
            Msg::RequirementsTextChanged("Login must lock after 3 failures".to_string()),
        );
        let (mut state, _) = update(state, Msg::GenerateClicked);
        let run_id = state.active_run().unwrap();
        for event in [
            JobEvent::Progress {
                percent,
                estimated_seconds_remaining: Some(12.0),
            },
            JobEvent::Step {
                message: "Generator Agent: Creating test cases...".to_string(),
            },
        ] {
            state = update(state, Msg::RunEvent { run_id, event }).0;
        }
        state
    }

    #[test]
    fn progress_renders_bar_agents_and_eta() {
        let lines = render(&running_at(40.0).view());
        assert_eq!(
            lines,
            vec![
                format!("[{}{}]  40%  Generating", "#".repeat(12), ".".repeat(18)),
                "✓ Planner: Complete | › Generator: Creating... |   Executor: Pending".to_string(),
                "Generator Agent: Creating test cases...".to_string(),
                "~12s remaining".to_string(),
                "AI agents are working on your test cases...".to_string(),
                "(Cancel)".to_string(),
            ]
        );
    }

    #[test]
    fn idle_state_renders_nothing() {
        assert!(render(&AppState::new().view()).is_empty());
    }

    #[test]
    fn validation_error_is_shown() {
        let (state, _) = update(AppState::new(), Msg::GenerateClicked);
        let lines = render(&state.view());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Error: "));
    }
}
