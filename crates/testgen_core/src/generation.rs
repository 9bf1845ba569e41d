use std::time::Duration;

/// Delay between the cancel click and the run being shown as stopped.
pub const CANCEL_SETTLE_DELAY: Duration = Duration::from_millis(500);
/// How long the cancellation notice stays in the step line.
pub const CANCEL_NOTICE_LIFETIME: Duration = Duration::from_secs(3);
/// How long a completed run keeps showing before it resets.
pub const COMPLETION_DISPLAY_WINDOW: Duration = Duration::from_secs(2);

pub const CANCEL_NOTICE: &str = "Generation cancelled";

/// Observable projection of the current run.
///
/// Mutated only by [`crate::update`] in response to run events and user actions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerationViewState {
    pub is_running: bool,
    pub progress_percent: f64,
    pub current_step_message: String,
    pub kb_notes: Vec<String>,
    pub estimated_seconds_remaining: Option<f64>,
    pub is_cancelling: bool,
    pub is_complete: bool,
    pub final_test_case_count: u32,
    pub final_kb_compliance_score: Option<f64>,
    pub test_cases_received: usize,
    pub error: Option<String>,
}

impl GenerationViewState {
    /// Resets the per-run fields. Returns `false` (and changes nothing) while
    /// a run is already active.
    pub fn begin_run(&mut self) -> bool {
        if self.is_running {
            return false;
        }
        *self = Self {
            is_running: true,
            ..Self::default()
        };
        true
    }

    /// Percent is clamped to `[0, 100]` and never moves backwards.
    pub fn apply_progress(&mut self, percent: f64, estimated_seconds_remaining: Option<f64>) {
        if percent.is_finite() {
            let clamped = percent.clamp(0.0, 100.0);
            if clamped > self.progress_percent {
                self.progress_percent = clamped;
            }
        }
        self.estimated_seconds_remaining = estimated_seconds_remaining
            .filter(|secs| secs.is_finite())
            .map(|secs| secs.max(0.0));
    }

    pub fn apply_step(&mut self, message: impl Into<String>) {
        self.current_step_message = message.into();
    }

    pub fn apply_kb_note(&mut self, message: impl Into<String>) {
        self.kb_notes.push(message.into());
    }

    pub fn apply_test_case_arrived(&mut self) {
        self.test_cases_received += 1;
    }

    /// The run stays visible (`is_running`) until [`Self::end_run`].
    pub fn apply_complete(&mut self, test_case_count: u32, kb_compliance_score: Option<f64>) {
        self.final_test_case_count = test_case_count;
        self.final_kb_compliance_score = kb_compliance_score
            .filter(|score| score.is_finite())
            .map(|score| score.clamp(0.0, 100.0));
        self.progress_percent = 100.0;
        self.estimated_seconds_remaining = None;
        self.is_complete = true;
    }

    /// Stops immediately and drops partial progress.
    pub fn apply_failed(&mut self, reason: impl Into<String>) {
        self.is_running = false;
        self.is_cancelling = false;
        self.is_complete = false;
        self.progress_percent = 0.0;
        self.estimated_seconds_remaining = None;
        self.current_step_message.clear();
        self.error = Some(reason.into());
    }

    /// Returns `true` if a cancellation was started by this call.
    pub fn begin_cancel(&mut self) -> bool {
        if !self.is_running || self.is_cancelling || self.is_complete {
            return false;
        }
        self.is_cancelling = true;
        true
    }

    pub fn finish_cancel(&mut self) {
        self.is_running = false;
        self.is_cancelling = false;
        self.estimated_seconds_remaining = None;
        self.current_step_message = CANCEL_NOTICE.to_string();
    }

    /// Clears the cancellation notice unless something else replaced it.
    pub fn clear_cancel_notice(&mut self) {
        if !self.is_running && self.current_step_message == CANCEL_NOTICE {
            self.current_step_message.clear();
        }
    }

    pub fn end_run(&mut self) {
        self.is_running = false;
        self.is_cancelling = false;
    }

    pub fn set_validation_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running() -> GenerationViewState {
        let mut state = GenerationViewState::default();
        assert!(state.begin_run());
        state
    }

    #[test]
    fn begin_run_resets_previous_results() {
        let mut state = running();
        state.apply_kb_note("note");
        state.apply_complete(12, Some(92.0));
        state.end_run();
        state.error = Some("old".to_string());

        assert!(state.begin_run());
        assert!(state.kb_notes.is_empty());
        assert_eq!(state.final_test_case_count, 0);
        assert_eq!(state.final_kb_compliance_score, None);
        assert_eq!(state.progress_percent, 0.0);
        assert_eq!(state.error, None);
        assert!(state.is_running);
    }

    #[test]
    fn begin_run_is_refused_while_running() {
        let mut state = running();
        state.apply_progress(40.0, None);
        assert!(!state.begin_run());
        assert_eq!(state.progress_percent, 40.0);
    }

    #[test]
    fn progress_is_clamped_and_monotonic() {
        let mut state = running();
        state.apply_progress(50.0, Some(10.0));
        state.apply_progress(20.0, Some(8.0));
        assert_eq!(state.progress_percent, 50.0);
        assert_eq!(state.estimated_seconds_remaining, Some(8.0));

        state.apply_progress(250.0, None);
        assert_eq!(state.progress_percent, 100.0);
        assert_eq!(state.estimated_seconds_remaining, None);

        let mut state = running();
        state.apply_progress(-5.0, Some(-3.0));
        assert_eq!(state.progress_percent, 0.0);
        assert_eq!(state.estimated_seconds_remaining, Some(0.0));
        state.apply_progress(f64::NAN, None);
        assert_eq!(state.progress_percent, 0.0);
    }

    #[test]
    fn failure_drops_partial_progress() {
        let mut state = running();
        state.apply_progress(66.0, Some(6.0));
        state.apply_step("Generator Agent: Test cases generated");
        state.apply_failed("connection reset");

        assert!(!state.is_running);
        assert_eq!(state.progress_percent, 0.0);
        assert!(state.current_step_message.is_empty());
        assert_eq!(state.error.as_deref(), Some("connection reset"));
    }

    #[test]
    fn cancel_notice_clears_only_itself() {
        let mut state = running();
        assert!(state.begin_cancel());
        assert!(!state.begin_cancel());
        state.finish_cancel();
        assert_eq!(state.current_step_message, CANCEL_NOTICE);
        state.clear_cancel_notice();
        assert!(state.current_step_message.is_empty());

        let mut state = running();
        state.apply_step("Planner Agent: Analyzing requirements...");
        state.clear_cancel_notice();
        assert_eq!(
            state.current_step_message,
            "Planner Agent: Analyzing requirements..."
        );
    }

    #[test]
    fn completed_run_cannot_be_cancelled() {
        let mut state = running();
        state.apply_complete(3, Some(140.0));
        assert_eq!(state.final_kb_compliance_score, Some(100.0));
        assert!(!state.begin_cancel());
        assert!(state.is_running);
    }
}
