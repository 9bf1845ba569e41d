use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use engine_logging::{engine_info, engine_warn};
use testgen_core::{update, AppState, ExportFormat, Msg};
use testgen_engine::{EngineHandle, LoadedFile};

use super::cli::GenerateArgs;
use super::effects::EffectRunner;
use super::settings::Settings;
use super::ui;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How a generation run ended, read off the settled state.
#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    Completed {
        test_case_count: u32,
        kb_compliance_score: Option<f64>,
    },
    Cancelled,
    Failed(String),
}

impl Outcome {
    fn of(state: &AppState) -> Self {
        let generation = state.generation();
        if let Some(error) = &generation.error {
            Outcome::Failed(error.clone())
        } else if generation.is_complete {
            Outcome::Completed {
                test_case_count: generation.final_test_case_count,
                kb_compliance_score: generation.final_kb_compliance_score,
            }
        } else {
            Outcome::Cancelled
        }
    }
}

pub fn run_generate(settings: &Settings, args: GenerateArgs) -> anyhow::Result<ExitCode> {
    let files = read_all(&args.files)?;
    let kb_documents = read_all(&args.kb_documents)?;

    let engine = EngineHandle::new(settings.engine_settings()).context("failed to start engine")?;
    let (msg_tx, msg_rx) = mpsc::channel();
    let mut app = App::new(EffectRunner::new(engine, msg_tx.clone()), msg_rx);

    if !files.is_empty() {
        app.dispatch(Msg::FilesAdded(files.iter().map(LoadedFile::as_upload).collect()));
    }
    if let Some(text) = args.text {
        app.dispatch(Msg::RequirementsTextChanged(text));
    }
    if !kb_documents.is_empty() {
        app.dispatch(Msg::KnowledgeBaseToggled(true));
        app.dispatch(Msg::KbDocumentsAdded(
            kb_documents.iter().map(LoadedFile::as_kb_upload).collect(),
        ));
    }

    app.dispatch(Msg::GenerateClicked);
    if app.state.active_run().is_none() {
        return Ok(ExitCode::FAILURE);
    }
    if let Some(ms) = args.cancel_after_ms {
        let tx = msg_tx.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(ms));
            let _ = tx.send(Msg::CancelClicked);
        });
    }
    app.run_until_settled();

    let outcome = Outcome::of(&app.state);
    engine_info!("Generation finished: {outcome:?}");
    match &outcome {
        Outcome::Completed {
            test_case_count,
            kb_compliance_score,
        } => {
            let score = kb_compliance_score
                .map(|s| format!(" (KB compliance {s:.0}%)"))
                .unwrap_or_default();
            println!("Done: {test_case_count} test cases generated{score}");
        }
        Outcome::Cancelled => println!("Generation cancelled"),
        Outcome::Failed(reason) => {
            eprintln!("Generation failed: {reason}");
            return Ok(ExitCode::FAILURE);
        }
    }

    if !app.state.test_cases().is_empty() {
        for line in ui::render::render_test_cases(&app.state.view().test_cases) {
            println!("{line}");
        }
    }

    if let Some(format) = args.export {
        if !app.export_all(format.into()) {
            return Ok(ExitCode::FAILURE);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn read_all(paths: &[std::path::PathBuf]) -> anyhow::Result<Vec<LoadedFile>> {
    paths
        .iter()
        .map(|path| LoadedFile::read(path).with_context(|| format!("cannot load {}", path.display())))
        .collect()
}

struct App {
    state: AppState,
    runner: EffectRunner,
    msg_rx: mpsc::Receiver<Msg>,
    last_frame: Vec<String>,
}

impl App {
    fn new(runner: EffectRunner, msg_rx: mpsc::Receiver<Msg>) -> Self {
        Self {
            state: AppState::new(),
            runner,
            msg_rx,
            last_frame: Vec::new(),
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        self.state = state;
        self.runner.enqueue(effects);
        if was_dirty {
            self.draw();
        }
    }

    fn draw(&mut self) {
        let frame = ui::render::render(&self.state.view());
        if frame != self.last_frame {
            for line in &frame {
                println!("{line}");
            }
            if !frame.is_empty() {
                println!();
            }
            self.last_frame = frame;
        }
    }

    fn run_until_settled(&mut self) {
        while !self.state.is_settled() {
            for msg in self.runner.poll_engine() {
                self.dispatch(msg);
            }
            match self.msg_rx.recv_timeout(POLL_INTERVAL) {
                Ok(msg) => self.dispatch(msg),
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    engine_warn!("Message queue closed before the run settled");
                    break;
                }
            }
        }
    }

    /// Returns whether the export succeeded.
    fn export_all(&mut self, format: ExportFormat) -> bool {
        self.dispatch(Msg::ExportFormatChanged(format));
        self.dispatch(Msg::ExportSelectAll);
        self.dispatch(Msg::ExportClicked);
        if !self.state.is_exporting() {
            return false;
        }
        self.run_until_settled();
        match &self.state.view().export.last_export_path {
            Some(path) => {
                println!("Exported to {path}");
                true
            }
            None => false,
        }
    }
}
