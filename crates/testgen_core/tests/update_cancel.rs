use std::sync::Once;

use pretty_assertions::assert_eq;
use testgen_core::{
    update, AppState, Effect, JobEvent, Msg, CANCEL_NOTICE, CANCEL_NOTICE_LIFETIME,
    CANCEL_SETTLE_DELAY,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn running() -> AppState {
    let (state, _) = update(AppState::new(), Msg::RequirementsTextChanged("Login".into()));
    let (state, _) = update(state, Msg::GenerateClicked);
    let (state, _) = update(
        state,
        Msg::RunEvent {
            run_id: 1,
            event: JobEvent::Progress {
                percent: 20.0,
                estimated_seconds_remaining: Some(16.0),
            },
        },
    );
    state
}

#[test]
fn cancel_stops_run_after_settle_delay() {
    init_logging();
    let (state, effects) = update(running(), Msg::CancelClicked);
    assert_eq!(
        effects,
        vec![
            Effect::CancelRun { run_id: 1 },
            Effect::ScheduleMsg {
                after: CANCEL_SETTLE_DELAY,
                msg: Msg::CancelSettled { run_id: 1 },
            },
        ]
    );
    assert!(state.generation().is_cancelling);
    let progress = state.view().progress.expect("still visible while cancelling");
    assert_eq!(progress.cancel.label, "Cancelling...");
    assert!(!progress.cancel.enabled);

    // Events still in flight are dropped.
    let (state, _) = update(
        state,
        Msg::RunEvent {
            run_id: 1,
            event: JobEvent::Step {
                message: "Planner Agent: Test plan created".into(),
            },
        },
    );
    assert_ne!(
        state.generation().current_step_message,
        "Planner Agent: Test plan created"
    );

    let (state, effects) = update(state, Msg::CancelSettled { run_id: 1 });
    assert_eq!(
        effects,
        vec![Effect::ScheduleMsg {
            after: CANCEL_NOTICE_LIFETIME,
            msg: Msg::CancelNoticeExpired { run_id: 1 },
        }]
    );
    assert!(!state.generation().is_running);
    assert!(!state.generation().is_cancelling);
    assert!(state.view().progress.is_none());
    assert_eq!(state.view().status_line.as_deref(), Some(CANCEL_NOTICE));
    assert!(state.is_settled());

    let (state, _) = update(state, Msg::CancelNoticeExpired { run_id: 1 });
    assert_eq!(state.view().status_line, None);
}

#[test]
fn second_cancel_is_a_noop() {
    init_logging();
    let (state, _) = update(running(), Msg::CancelClicked);
    let (_, effects) = update(state, Msg::CancelClicked);
    assert!(effects.is_empty());
}

#[test]
fn cancel_without_a_run_is_a_noop() {
    init_logging();
    let state = AppState::new();
    let (next, effects) = update(state.clone(), Msg::CancelClicked);
    assert!(effects.is_empty());
    assert_eq!(next, state);
}

#[test]
fn notice_from_old_cancel_does_not_clear_new_run() {
    init_logging();
    let (state, _) = update(running(), Msg::CancelClicked);
    let (state, _) = update(state, Msg::CancelSettled { run_id: 1 });
    let (state, effects) = update(state, Msg::GenerateClicked);
    assert_eq!(effects, vec![Effect::StartRun { run_id: 2 }]);
    let (state, _) = update(
        state,
        Msg::RunEvent {
            run_id: 2,
            event: JobEvent::Step {
                message: "Planner Agent: Analyzing requirements...".into(),
            },
        },
    );

    let (state, _) = update(state, Msg::CancelNoticeExpired { run_id: 1 });
    assert_eq!(
        state.generation().current_step_message,
        "Planner Agent: Analyzing requirements..."
    );
    assert!(state.generation().is_running);
}
