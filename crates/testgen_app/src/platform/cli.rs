use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use testgen_core::ExportFormat;
use testgen_engine::{KbNotePolicy, RunSource};

use super::logging::LogDestination;

#[derive(Debug, Parser)]
#[command(name = "testgen", version, about = "Generate test cases from requirement documents")]
pub struct Cli {
    /// Settings file (RON). Defaults to ./testgen.ron when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Backend API root, e.g. http://localhost:8000/api/v1
    #[arg(long, global = true)]
    pub api_url: Option<String>,
    #[arg(long, global = true)]
    pub project: Option<String>,
    /// Directory that receives exported files.
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,
    /// Fail instead of serving canned data when the backend is unreachable.
    #[arg(long, global = true)]
    pub no_mock_fallback: bool,
    #[arg(long, global = true, value_enum)]
    pub log: Option<LogArg>,
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a generation and follow its progress.
    Generate(GenerateArgs),
    /// Check that the backend answers.
    Health,
    /// List backend projects.
    Projects,
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the backend's LLM configuration.
    Show,
    /// Ask the backend to test its LLM connection.
    Test,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Requirement document (.pdf, .xlsx, .xls). Repeatable.
    #[arg(long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,
    /// Free-text requirements.
    #[arg(long)]
    pub text: Option<String>,
    /// Knowledge Base document (.pdf, .txt, .md). Enables the Knowledge Base.
    #[arg(long = "kb", value_name = "PATH")]
    pub kb_documents: Vec<PathBuf>,
    #[arg(long, value_enum)]
    pub source: Option<SourceArg>,
    #[arg(long, value_enum)]
    pub kb_notes: Option<KbNotesArg>,
    /// Press Cancel this many milliseconds after the run starts.
    #[arg(long, value_name = "MS")]
    pub cancel_after_ms: Option<u64>,
    /// Export every loaded test case once the run completes.
    #[arg(long, value_enum)]
    pub export: Option<FormatArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogArg {
    File,
    Terminal,
    Both,
}

impl From<LogArg> for LogDestination {
    fn from(arg: LogArg) -> Self {
        match arg {
            LogArg::File => LogDestination::File,
            LogArg::Terminal => LogDestination::Terminal,
            LogArg::Both => LogDestination::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    Mock,
    Stream,
}

impl From<SourceArg> for RunSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Mock => RunSource::Mock,
            SourceArg::Stream => RunSource::Stream,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KbNotesArg {
    Forward,
    Suppress,
}

impl From<KbNotesArg> for KbNotePolicy {
    fn from(arg: KbNotesArg) -> Self {
        match arg {
            KbNotesArg::Forward => KbNotePolicy::Forward,
            KbNotesArg::Suppress => KbNotePolicy::Suppress,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Markdown,
    Excel,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Markdown => ExportFormat::Markdown,
            FormatArg::Excel => ExportFormat::Excel,
        }
    }
}

/// Global flags that override settings, in CLI-agnostic form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub project: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub no_mock_fallback: bool,
    pub log: Option<LogDestination>,
    pub log_level: Option<String>,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            api_url: self.api_url.clone(),
            project: self.project.clone(),
            output_dir: self.output_dir.clone(),
            no_mock_fallback: self.no_mock_fallback,
            log: self.log.map(LogDestination::from),
            log_level: self.log_level.clone(),
        }
    }
}
