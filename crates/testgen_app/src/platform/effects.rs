use std::sync::mpsc;
use std::thread;

use engine_logging::{engine_debug, engine_info, engine_warn};
use testgen_core::{Effect, Msg};
use testgen_engine::{EngineEvent, EngineHandle};

/// Executes effects against the engine and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
    msg_tx: mpsc::Sender<Msg>,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, msg_tx: mpsc::Sender<Msg>) -> Self {
        Self { engine, msg_tx }
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartRun { run_id } => {
                    engine_info!("StartRun run_id={run_id}");
                    self.engine.start_run(run_id);
                }
                Effect::CancelRun { run_id } => {
                    engine_info!("CancelRun run_id={run_id}");
                    self.engine.cancel_run(run_id);
                }
                Effect::ScheduleMsg { after, msg } => {
                    engine_debug!("Scheduling {msg:?} in {}ms", after.as_millis());
                    let tx = self.msg_tx.clone();
                    thread::spawn(move || {
                        thread::sleep(after);
                        let _ = tx.send(msg);
                    });
                }
                Effect::LoadTestCases => self.engine.load_test_cases(),
                Effect::Export { request } => {
                    engine_info!(
                        "Export {} test cases as {}",
                        request.test_cases.len(),
                        request.format.label()
                    );
                    self.engine.export(request);
                }
            }
        }
    }

    /// Drains pending engine events without blocking.
    pub fn poll_engine(&self) -> Vec<Msg> {
        std::iter::from_fn(|| self.engine.try_recv())
            .map(map_event)
            .collect()
    }
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::RunOpened { run_id } => Msg::RunOpened { run_id },
        EngineEvent::Run { run_id, event } => Msg::RunEvent { run_id, event },
        EngineEvent::TestCasesLoaded(Ok(cases)) => Msg::TestCasesLoaded(cases),
        EngineEvent::TestCasesLoaded(Err(err)) => {
            engine_warn!("Loading test cases failed: {err}");
            Msg::TestCasesLoadFailed(err.to_string())
        }
        EngineEvent::ExportFinished(result) => {
            Msg::ExportFinished(result.map(|path| path.display().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use testgen_core::JobEvent;
    use testgen_engine::ApiError;

    use super::*;

    #[test]
    fn engine_events_map_onto_messages() {
        assert_eq!(
            map_event(EngineEvent::Run {
                run_id: 2,
                event: JobEvent::Step {
                    message: "Planner".to_string()
                },
            }),
            Msg::RunEvent {
                run_id: 2,
                event: JobEvent::Step {
                    message: "Planner".to_string()
                },
            }
        );
        assert_eq!(
            map_event(EngineEvent::TestCasesLoaded(Err(ApiError {
                status: Some(500),
                message: "HTTP error 500".to_string(),
            }))),
            Msg::TestCasesLoadFailed("HTTP error 500".to_string())
        );
        assert_eq!(
            map_event(EngineEvent::ExportFinished(Ok(PathBuf::from("out/a.md")))),
            Msg::ExportFinished(Ok("out/a.md".to_string()))
        );
    }
}
