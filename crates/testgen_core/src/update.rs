use engine_logging::{engine_debug, engine_info, engine_warn};

use crate::generation::{
    CANCEL_NOTICE_LIFETIME, CANCEL_SETTLE_DELAY, COMPLETION_DISPLAY_WINDOW,
};
use crate::state::{NotificationKind, LONG_NOTIFICATION, SHORT_NOTIFICATION};
use crate::validation::validate_generation;
use crate::{AppState, Effect, ExportRequest, JobEvent, Msg, RunId, TestCase, UploadRejection};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::RequirementsTextChanged(text) => {
            state.inputs.set_text(text);
            clear_stale_error(&mut state);
            state.mark_dirty();
            Vec::new()
        }
        Msg::FilesAdded(files) => {
            let rejections = state.inputs.add_files(files);
            clear_stale_error(&mut state);
            state.mark_dirty();
            notify_rejections(&mut state, &rejections)
        }
        Msg::FileRemoved(name) => {
            if state.inputs.remove_file(&name) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::KnowledgeBaseToggled(enabled) => {
            state.kb.set_enabled(enabled);
            clear_stale_error(&mut state);
            state.mark_dirty();
            Vec::new()
        }
        Msg::KbDocumentsAdded(uploads) => {
            let outcome = state.kb.add_documents(uploads);
            engine_debug!(
                "KB upload: added={} duplicates={} rejected={}",
                outcome.added,
                outcome.duplicates,
                outcome.rejections.len()
            );
            clear_stale_error(&mut state);
            state.mark_dirty();
            let mut effects = notify_rejections(&mut state, &outcome.rejections);
            if effects.is_empty() && outcome.duplicates > 0 {
                let plural = if outcome.duplicates == 1 { "" } else { "s" };
                effects.push(state.notify(
                    NotificationKind::Info,
                    format!("Skipped {} duplicate document{plural}", outcome.duplicates),
                    SHORT_NOTIFICATION,
                ));
            }
            effects
        }
        Msg::KbDocumentRemoved(id) => {
            if state.kb.remove_document(&id) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::KbDocumentSelectionToggled(id) => {
            state.kb.toggle_selection(&id);
            state.mark_dirty();
            Vec::new()
        }
        Msg::GenerateClicked => start_generation(&mut state),
        Msg::CancelClicked => begin_cancel(&mut state),
        Msg::RunOpened { run_id } => {
            if state.active_run == Some(run_id) {
                engine_info!("Run {run_id} opened");
            } else {
                engine_debug!("Ignoring open of stale run {run_id}");
            }
            Vec::new()
        }
        Msg::RunEvent { run_id, event } => apply_run_event(&mut state, run_id, event),
        Msg::CancelSettled { run_id } => {
            if state.cancelled_run == Some(run_id) && state.generation.is_cancelling {
                state.generation.finish_cancel();
                state.active_run = None;
                state.mark_dirty();
                engine_info!("Run {run_id} cancelled");
                vec![Effect::ScheduleMsg {
                    after: CANCEL_NOTICE_LIFETIME,
                    msg: Msg::CancelNoticeExpired { run_id },
                }]
            } else {
                Vec::new()
            }
        }
        Msg::CancelNoticeExpired { run_id } => {
            if state.cancelled_run == Some(run_id) {
                state.cancelled_run = None;
                state.generation.clear_cancel_notice();
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::CompletionWindowElapsed { run_id } => {
            if state.active_run == Some(run_id) && state.generation.is_complete {
                state.generation.end_run();
                state.active_run = None;
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::TestCasesLoaded(cases) => {
            engine_info!("Loaded {} test cases", cases.len());
            state.is_loading_test_cases = false;
            state.board.set_all(cases);
            let board = &state.board;
            state.export_selection.retain(|id| board.get(id).is_some());
            state.mark_dirty();
            Vec::new()
        }
        Msg::TestCasesLoadFailed(reason) => {
            engine_warn!("Loading test cases failed: {reason}");
            state.is_loading_test_cases = false;
            vec![state.notify(
                NotificationKind::Error,
                format!("Failed to load test cases: {reason}"),
                LONG_NOTIFICATION,
            )]
        }
        Msg::TestCaseSelected(id) => {
            state.board.select(id.as_deref());
            state.mark_dirty();
            Vec::new()
        }
        Msg::TestCaseEdited { id, patch } => {
            if state.board.update(&id, &patch) {
                state.mark_dirty();
            } else {
                engine_warn!("Edit for unknown test case {id}");
            }
            Vec::new()
        }
        Msg::TestCaseDeleted(id) => {
            if state.board.delete(&id) {
                state.export_selection.remove(&id);
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::CategoryFilterChanged(category) => {
            state.board.set_category_filter(category);
            state.mark_dirty();
            Vec::new()
        }
        Msg::PriorityFilterChanged(priority) => {
            state.board.set_priority_filter(priority);
            state.mark_dirty();
            Vec::new()
        }
        Msg::KbCompliantFilterToggled(only) => {
            state.board.set_kb_compliant_only(only);
            state.mark_dirty();
            Vec::new()
        }
        Msg::SearchTextChanged(search) => {
            state.board.set_search(search);
            state.mark_dirty();
            Vec::new()
        }
        Msg::FiltersCleared => {
            state.board.clear_filters();
            state.mark_dirty();
            Vec::new()
        }
        Msg::SortChanged(sort_by) => {
            state.board.set_sort_by(sort_by);
            state.mark_dirty();
            Vec::new()
        }
        Msg::ExportFormatChanged(format) => {
            state.export.format = format;
            state.mark_dirty();
            Vec::new()
        }
        Msg::ExportKbReferencesToggled(include) => {
            state.export.include_kb_references = include;
            state.mark_dirty();
            Vec::new()
        }
        Msg::ExportKbScoresToggled(include) => {
            state.export.include_kb_scores = include;
            state.mark_dirty();
            Vec::new()
        }
        Msg::ExportSelectionToggled(id) => {
            if !state.export_selection.remove(&id) && state.board.get(&id).is_some() {
                state.export_selection.insert(id);
            }
            state.mark_dirty();
            Vec::new()
        }
        Msg::ExportSelectAll => {
            state.export_selection = state.board.all().iter().map(|c| c.id.clone()).collect();
            state.mark_dirty();
            Vec::new()
        }
        Msg::ExportSelectionCleared => {
            state.export_selection.clear();
            state.mark_dirty();
            Vec::new()
        }
        Msg::ExportClicked => start_export(&mut state),
        Msg::ExportFinished(result) => {
            let success = state.pending_export.take();
            match result {
                Ok(path) => {
                    engine_info!("Export written to {path}");
                    state.last_export_path = Some(path);
                    let message = success.unwrap_or_else(|| "Export finished".to_string());
                    vec![state.notify(NotificationKind::Success, message, LONG_NOTIFICATION)]
                }
                Err(reason) => {
                    engine_warn!("Export failed: {reason}");
                    vec![state.notify(
                        NotificationKind::Error,
                        format!("Export failed: {reason}"),
                        LONG_NOTIFICATION,
                    )]
                }
            }
        }
        Msg::NotificationExpired { id } => {
            if state.notification.as_ref().is_some_and(|n| n.id == id) {
                state.notification = None;
                state.mark_dirty();
            }
            Vec::new()
        }
    };

    (state, effects)
}

fn start_generation(state: &mut AppState) -> Vec<Effect> {
    if state.generation.is_running {
        engine_warn!("Generate clicked while a run is active; ignoring");
        return Vec::new();
    }
    if let Err(err) = validate_generation(&state.inputs, &state.kb) {
        engine_info!("Generation refused: {err}");
        state.generation.set_validation_error(err.to_string());
        state.mark_dirty();
        return Vec::new();
    }

    let run_id = state.allocate_run_id();
    state.generation.begin_run();
    state.active_run = Some(run_id);
    state.cancelled_run = None;
    state.run_kb_enabled = state.kb.is_enabled();
    state.mark_dirty();
    engine_info!(
        "Starting run {run_id} (files={}, kb={})",
        state.inputs.files().len(),
        state.run_kb_enabled
    );
    vec![Effect::StartRun { run_id }]
}

fn begin_cancel(state: &mut AppState) -> Vec<Effect> {
    let Some(run_id) = state.active_run else {
        return Vec::new();
    };
    if !state.generation.begin_cancel() {
        return Vec::new();
    }
    state.cancelled_run = Some(run_id);
    state.mark_dirty();
    engine_info!("Cancelling run {run_id}");
    vec![
        Effect::CancelRun { run_id },
        Effect::ScheduleMsg {
            after: CANCEL_SETTLE_DELAY,
            msg: Msg::CancelSettled { run_id },
        },
    ]
}

fn apply_run_event(state: &mut AppState, run_id: RunId, event: JobEvent) -> Vec<Effect> {
    if state.active_run != Some(run_id) {
        engine_debug!("Dropping {} from stale run {run_id}", event.kind());
        return Vec::new();
    }
    if state.generation.is_cancelling || state.generation.is_complete {
        engine_debug!("Dropping {} from settling run {run_id}", event.kind());
        return Vec::new();
    }

    let effects = match event {
        JobEvent::Progress {
            percent,
            estimated_seconds_remaining,
        } => {
            state
                .generation
                .apply_progress(percent, estimated_seconds_remaining);
            Vec::new()
        }
        JobEvent::Step { message } => {
            state.generation.apply_step(message);
            Vec::new()
        }
        JobEvent::KbNote { message } => {
            if state.run_kb_enabled {
                state.generation.apply_kb_note(message);
            }
            Vec::new()
        }
        JobEvent::TestCaseArrived { payload } => {
            state.generation.apply_test_case_arrived();
            match serde_json::from_value::<TestCase>(payload) {
                Ok(case) => state.board.upsert(case),
                Err(err) => engine_debug!("Test case payload not shown on board: {err}"),
            }
            Vec::new()
        }
        JobEvent::Complete {
            test_case_count,
            kb_compliance_score,
        } => {
            engine_info!("Run {run_id} complete: {test_case_count} test cases");
            state
                .generation
                .apply_complete(test_case_count, kb_compliance_score);
            state.is_loading_test_cases = true;
            vec![
                Effect::ScheduleMsg {
                    after: COMPLETION_DISPLAY_WINDOW,
                    msg: Msg::CompletionWindowElapsed { run_id },
                },
                Effect::LoadTestCases,
            ]
        }
        JobEvent::Failed { reason } => {
            engine_warn!("Run {run_id} failed: {reason}");
            state.generation.apply_failed(reason);
            state.active_run = None;
            Vec::new()
        }
    };
    state.mark_dirty();
    effects
}

fn start_export(state: &mut AppState) -> Vec<Effect> {
    if state.pending_export.is_some() {
        engine_debug!("Export already in progress");
        return Vec::new();
    }
    match ExportRequest::build(
        state.board.all(),
        &state.export_selection,
        &state.export,
        state.kb.is_enabled(),
    ) {
        Ok(request) => {
            engine_info!(
                "Exporting {} test cases as {}",
                request.test_cases.len(),
                request.format.label()
            );
            state.pending_export = Some(request.success_message());
            state.mark_dirty();
            vec![Effect::Export { request }]
        }
        Err(err) => vec![state.notify(NotificationKind::Error, err.to_string(), SHORT_NOTIFICATION)],
    }
}

/// A previous validation message goes away once the inputs change.
fn clear_stale_error(state: &mut AppState) {
    if !state.generation.is_running {
        state.generation.error = None;
    }
}

fn notify_rejections(state: &mut AppState, rejections: &[UploadRejection]) -> Vec<Effect> {
    if rejections.is_empty() {
        return Vec::new();
    }
    for rejection in rejections {
        engine_warn!("Upload rejected: {rejection}");
    }
    let message = rejections
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    vec![state.notify(NotificationKind::Error, message, SHORT_NOTIFICATION)]
}
