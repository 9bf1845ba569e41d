//! Mock job driver: replays a fixed three-phase pipeline on a timer queue.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use testgen_core::JobEvent;

use crate::channel::{lock, JobHandle, RunChannel, RunHandlers};
use crate::scheduler::{Scheduler, TimerId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockStep {
    pub percent: f64,
    pub message: &'static str,
    /// Wait before the next step fires.
    pub delay: Duration,
    pub kb_note: Option<&'static str>,
}

const fn step(
    percent: f64,
    message: &'static str,
    delay_ms: u64,
    kb_note: Option<&'static str>,
) -> MockStep {
    MockStep {
        percent,
        message,
        delay: Duration::from_millis(delay_ms),
        kb_note,
    }
}

pub const MOCK_STEPS: [MockStep; 10] = [
    step(10.0, "Planner Agent: Analyzing requirements...", 500, None),
    step(
        20.0,
        "Planner Agent: Identifying test scenarios...",
        800,
        Some("Using CRM_User_Guide.pdf for field names"),
    ),
    step(33.0, "Planner Agent: Test plan created", 600, None),
    step(40.0, "Generator Agent: Creating test cases...", 700, None),
    step(
        50.0,
        "Generator Agent: Generating test steps...",
        900,
        Some("Referencing Case_Management_Guide.pdf for workflows"),
    ),
    step(66.0, "Generator Agent: Test cases generated", 600, None),
    step(75.0, "Executor Agent: Validating test cases...", 700, None),
    step(85.0, "Executor Agent: Cross-system validation...", 800, None),
    step(95.0, "Executor Agent: Final refinements...", 600, None),
    step(100.0, "Generation complete!", 500, None),
];

pub const INITIAL_DELAY: Duration = Duration::from_millis(100);
const SECONDS_PER_STEP: f64 = 2.0;
pub const MOCK_TEST_CASE_COUNT: u32 = 12;
pub const MOCK_KB_COMPLIANCE_SCORE: f64 = 92.0;

struct MockRun {
    channel: RunChannel,
    scheduler: Arc<dyn Scheduler>,
    pending: Mutex<Option<TimerId>>,
}

/// Starts a simulated run. Events flow to `handlers` through a [`RunChannel`];
/// the returned handle stops the run and clears its pending timer.
///
/// KB notes are always emitted; whether they are shown is up to the consumer.
pub fn start_mock_run(scheduler: Arc<dyn Scheduler>, handlers: Arc<dyn RunHandlers>) -> JobHandle {
    let run = Arc::new(MockRun {
        channel: RunChannel::new(handlers),
        scheduler,
        pending: Mutex::new(None),
    });
    engine_info!("Starting mock generation");
    run.channel.open();
    schedule_step(&run, 0, INITIAL_DELAY);

    let stopped = run.channel.stop_flag();
    let finished = run.channel.finished_flag();
    JobHandle::new(stopped, move || {
        // Holding `pending` orders this against a concurrent `schedule_step`.
        let mut pending = lock(&run.pending);
        if let Some(id) = pending.take() {
            run.scheduler.cancel(id);
        }
        engine_debug!("Mock generation released");
    })
    .with_finished(finished)
}

/// The stop flag is read under `pending`, so a timer is either never
/// scheduled or recorded where the release closure will find it.
fn schedule_step(run: &Arc<MockRun>, index: usize, after: Duration) {
    let mut pending = lock(&run.pending);
    if run.channel.is_stopped() {
        return;
    }
    let next = Arc::clone(run);
    let id = run
        .scheduler
        .schedule(after, Box::new(move || fire_step(&next, index)));
    *pending = Some(id);
}

fn fire_step(run: &Arc<MockRun>, index: usize) {
    if run.channel.is_closed() {
        return;
    }
    let Some(step) = MOCK_STEPS.get(index) else {
        run.channel.emit(JobEvent::Complete {
            test_case_count: MOCK_TEST_CASE_COUNT,
            kb_compliance_score: Some(MOCK_KB_COMPLIANCE_SCORE),
        });
        lock(&run.pending).take();
        return;
    };

    let steps_left = (MOCK_STEPS.len() - index) as f64;
    run.channel.emit(JobEvent::Progress {
        percent: step.percent,
        estimated_seconds_remaining: Some(steps_left * SECONDS_PER_STEP),
    });
    run.channel.emit(JobEvent::Step {
        message: step.message.to_string(),
    });
    if let Some(note) = step.kb_note {
        run.channel.emit(JobEvent::KbNote {
            message: note.to_string(),
        });
    }
    if !run.channel.is_closed() {
        schedule_step(run, index + 1, step.delay);
    }
}

/// Total simulated duration from start to completion.
pub fn mock_run_duration() -> Duration {
    MOCK_STEPS
        .iter()
        .fold(INITIAL_DELAY, |total, step| total + step.delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_run_takes_six_point_eight_seconds() {
        assert_eq!(mock_run_duration(), Duration::from_millis(6_800));
    }

    #[test]
    fn notes_sit_on_twenty_and_fifty_percent() {
        let noted: Vec<f64> = MOCK_STEPS
            .iter()
            .filter(|s| s.kb_note.is_some())
            .map(|s| s.percent)
            .collect();
        assert_eq!(noted, vec![20.0, 50.0]);
    }
}
