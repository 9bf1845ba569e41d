use std::sync::Once;

use pretty_assertions::assert_eq;
use testgen_core::{
    update, AppState, Effect, ExportFormat, KbUpload, Msg, NotificationKind, Priority, SortBy,
    TestCase, TestCasePatch, LONG_NOTIFICATION,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn case(id: &str, category: &str, priority: Priority) -> TestCase {
    TestCase {
        id: id.to_string(),
        title: format!("{category} case {id}"),
        description: String::new(),
        category: category.to_string(),
        priority,
        steps: vec!["Do it".to_string()],
        expected_results: vec!["It works".to_string()],
        validation_table: None,
        kb_compliant: Some(true),
        kb_references: vec!["CRM_User_Guide.pdf (Section 2.1)".to_string()],
    }
}

fn loaded() -> AppState {
    let (state, _) = update(
        AppState::new(),
        Msg::TestCasesLoaded(vec![
            case("1", "Authentication", Priority::High),
            case("2", "Customer Management", Priority::Medium),
            case("3", "Search", Priority::Low),
        ]),
    );
    state
}

#[test]
fn export_requires_a_selection() {
    init_logging();
    let (state, effects) = update(loaded(), Msg::ExportClicked);
    assert_eq!(effects.len(), 1);
    assert!(!state.is_exporting());
    let notification = state.notification().expect("notification");
    assert_eq!(notification.kind, NotificationKind::Error);
    assert_eq!(
        notification.message,
        "Please select at least one test case to export"
    );
}

#[test]
fn export_builds_request_from_selection_in_board_order() {
    init_logging();
    let (state, _) = update(loaded(), Msg::ExportSelectionToggled("3".into()));
    let (state, _) = update(state, Msg::ExportSelectionToggled("1".into()));
    let (state, _) = update(state, Msg::ExportSelectionToggled("missing".into()));
    let (state, _) = update(state, Msg::ExportFormatChanged(ExportFormat::Markdown));
    let (state, effects) = update(state, Msg::ExportClicked);

    let request = match effects.as_slice() {
        [Effect::Export { request }] => request.clone(),
        other => panic!("unexpected effects {other:?}"),
    };
    let ids: Vec<_> = request.test_cases.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);
    assert_eq!(request.format, ExportFormat::Markdown);
    // Knowledge Base is off, so KB columns are dropped.
    assert!(!request.include_kb_references);
    assert!(state.is_exporting());

    let (state, again) = update(state, Msg::ExportClicked);
    assert!(again.is_empty());

    let (state, effects) = update(
        state,
        Msg::ExportFinished(Ok("out/test-cases-1.md".to_string())),
    );
    assert!(!state.is_exporting());
    assert_eq!(
        effects,
        vec![Effect::ScheduleMsg {
            after: LONG_NOTIFICATION,
            msg: Msg::NotificationExpired { id: 1 },
        }]
    );
    let notification = state.notification().expect("notification");
    assert_eq!(notification.kind, NotificationKind::Success);
    assert_eq!(
        notification.message,
        "Successfully exported 2 test cases to MARKDOWN"
    );
    assert_eq!(
        state.view().export.last_export_path.as_deref(),
        Some("out/test-cases-1.md")
    );
}

#[test]
fn kb_flags_follow_knowledge_base() {
    init_logging();
    let (state, _) = update(loaded(), Msg::KnowledgeBaseToggled(true));
    let (state, _) = update(
        state,
        Msg::KbDocumentsAdded(vec![KbUpload::new("guide.pdf", 10)]),
    );
    let (state, _) = update(state, Msg::ExportSelectAll);
    let (state, _) = update(state, Msg::ExportKbScoresToggled(false));
    let (_, effects) = update(state, Msg::ExportClicked);

    let [Effect::Export { request }] = effects.as_slice() else {
        panic!("expected export effect, got {effects:?}");
    };
    assert_eq!(request.test_cases.len(), 3);
    assert!(request.include_kb_references);
    assert!(!request.include_kb_scores);
}

#[test]
fn failed_export_reports_reason() {
    init_logging();
    let (state, _) = update(loaded(), Msg::ExportSelectAll);
    let (state, _) = update(state, Msg::ExportClicked);
    let (state, _) = update(state, Msg::ExportFinished(Err("disk full".into())));
    assert_eq!(
        state.notification().map(|n| n.message.as_str()),
        Some("Export failed: disk full")
    );
}

#[test]
fn board_edits_filters_and_selection() {
    init_logging();
    let (state, _) = update(loaded(), Msg::ExportSelectAll);
    let (state, _) = update(state, Msg::TestCaseDeleted("2".into()));
    assert_eq!(state.export_selection().len(), 2);

    let (state, _) = update(
        state,
        Msg::TestCaseEdited {
            id: "3".into(),
            patch: TestCasePatch {
                priority: Some(Priority::High),
                ..TestCasePatch::default()
            },
        },
    );
    let (state, _) = update(state, Msg::PriorityFilterChanged(Some(Priority::High)));
    let (state, _) = update(state, Msg::SortChanged(SortBy::Category));
    let view = state.view().test_cases;
    let ids: Vec<_> = view.rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);
    assert_eq!(view.counter, "2 of 2");

    let (state, _) = update(state, Msg::SearchTextChanged("search".into()));
    assert_eq!(state.view().test_cases.counter, "1 of 2");
    let (state, _) = update(state, Msg::FiltersCleared);
    let (state, _) = update(state, Msg::TestCaseSelected(Some("1".into())));
    let view = state.view().test_cases;
    assert_eq!(view.counter, "2 of 2");
    assert_eq!(view.selected.map(|c| c.id), Some("1".to_string()));
}
