use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};

use engine_logging::{engine_debug, engine_trace};
use serde_json::Value;
use testgen_core::{JobEvent, RunId};

use crate::EngineEvent;

/// Typed callbacks for one run. Every callback is optional.
pub trait RunHandlers: Send + Sync {
    fn on_open(&self) {}
    fn on_progress(&self, _percent: f64, _estimated_seconds_remaining: Option<f64>) {}
    fn on_step(&self, _message: &str) {}
    fn on_kb_note(&self, _message: &str) {}
    fn on_test_case(&self, _payload: &Value) {}
    fn on_complete(&self, _test_case_count: u32, _kb_compliance_score: Option<f64>) {}
    fn on_failed(&self, _reason: &str) {}
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct Gate {
    opened: bool,
    terminated: bool,
    reached_full_progress: bool,
}

/// Emission gate shared by every event source.
///
/// Guarantees for the handlers behind it:
/// - `on_open` fires once, before anything else;
/// - nothing is delivered once the run is stopped or has terminated;
/// - at most one of `on_complete` / `on_failed` fires;
/// - `on_complete` is always preceded by a 100 percent progress report.
pub struct RunChannel {
    handlers: Arc<dyn RunHandlers>,
    stopped: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    gate: Mutex<Gate>,
}

impl RunChannel {
    pub fn new(handlers: Arc<dyn RunHandlers>) -> Self {
        Self {
            handlers,
            stopped: Arc::new(AtomicBool::new(false)),
            finished: Arc::new(AtomicBool::new(false)),
            gate: Mutex::new(Gate::default()),
        }
    }

    /// Flag checked before every emission; setting it silences the channel.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stopped)
    }

    /// Set once a terminal event has been delivered.
    pub fn finished_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.finished)
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// True once nothing more will be delivered.
    pub fn is_closed(&self) -> bool {
        self.is_stopped() || lock(&self.gate).terminated
    }

    /// Fires `on_open` if it has not fired yet.
    pub fn open(&self) {
        let mut gate = lock(&self.gate);
        if self.is_stopped() || gate.terminated {
            return;
        }
        self.open_locked(&mut gate);
    }

    /// Returns whether the event reached the handlers.
    pub fn emit(&self, event: JobEvent) -> bool {
        let mut gate = lock(&self.gate);
        if self.is_stopped() || gate.terminated {
            engine_trace!("Channel closed; dropping {}", event.kind());
            return false;
        }
        self.open_locked(&mut gate);

        match event {
            JobEvent::Progress {
                percent,
                estimated_seconds_remaining,
            } => {
                if percent >= 100.0 {
                    gate.reached_full_progress = true;
                }
                self.handlers
                    .on_progress(percent, estimated_seconds_remaining);
            }
            JobEvent::Step { message } => self.handlers.on_step(&message),
            JobEvent::KbNote { message } => self.handlers.on_kb_note(&message),
            JobEvent::TestCaseArrived { payload } => self.handlers.on_test_case(&payload),
            JobEvent::Complete {
                test_case_count,
                kb_compliance_score,
            } => {
                if !gate.reached_full_progress {
                    engine_debug!("Completion without full progress; reporting 100% first");
                    gate.reached_full_progress = true;
                    self.handlers.on_progress(100.0, None);
                }
                gate.terminated = true;
                self.finished.store(true, Ordering::SeqCst);
                self.handlers
                    .on_complete(test_case_count, kb_compliance_score);
            }
            JobEvent::Failed { reason } => {
                gate.terminated = true;
                self.finished.store(true, Ordering::SeqCst);
                self.handlers.on_failed(&reason);
            }
        }
        true
    }

    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.emit(JobEvent::Failed {
            reason: reason.into(),
        })
    }

    fn open_locked(&self, gate: &mut Gate) {
        if !gate.opened {
            gate.opened = true;
            self.handlers.on_open();
        }
    }
}

/// Forwards every callback, tagged with its run id, into the engine's event queue.
pub struct ChannelHandlers {
    run_id: RunId,
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelHandlers {
    pub fn new(run_id: RunId, tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { run_id, tx }
    }

    fn forward(&self, event: JobEvent) {
        let _ = self.tx.send(EngineEvent::Run {
            run_id: self.run_id,
            event,
        });
    }
}

impl RunHandlers for ChannelHandlers {
    fn on_open(&self) {
        let _ = self.tx.send(EngineEvent::RunOpened {
            run_id: self.run_id,
        });
    }

    fn on_progress(&self, percent: f64, estimated_seconds_remaining: Option<f64>) {
        self.forward(JobEvent::Progress {
            percent,
            estimated_seconds_remaining,
        });
    }

    fn on_step(&self, message: &str) {
        self.forward(JobEvent::Step {
            message: message.to_string(),
        });
    }

    fn on_kb_note(&self, message: &str) {
        self.forward(JobEvent::KbNote {
            message: message.to_string(),
        });
    }

    fn on_test_case(&self, payload: &Value) {
        self.forward(JobEvent::TestCaseArrived {
            payload: payload.clone(),
        });
    }

    fn on_complete(&self, test_case_count: u32, kb_compliance_score: Option<f64>) {
        self.forward(JobEvent::Complete {
            test_case_count,
            kb_compliance_score,
        });
    }

    fn on_failed(&self, reason: &str) {
        self.forward(JobEvent::Failed {
            reason: reason.to_string(),
        });
    }
}

type Release = Box<dyn FnOnce() + Send>;

/// Cancellation capability for a started run.
///
/// The first [`JobHandle::cancel`] stops emission and releases pending
/// timers or transport; later calls do nothing.
pub struct JobHandle {
    stopped: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    release: Mutex<Option<Release>>,
}

impl JobHandle {
    pub fn new(stopped: Arc<AtomicBool>, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            stopped,
            finished: Arc::new(AtomicBool::new(false)),
            release: Mutex::new(Some(Box::new(release))),
        }
    }

    /// Ties [`JobHandle::is_finished`] to a channel's terminal flag.
    pub fn with_finished(mut self, finished: Arc<AtomicBool>) -> Self {
        self.finished = finished;
        self
    }

    pub fn cancel(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let release = lock(&self.release).take();
        if let Some(release) = release {
            release();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// True once the run delivered its terminal event.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("cancelled", &self.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}
