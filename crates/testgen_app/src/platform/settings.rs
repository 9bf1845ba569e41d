use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use testgen_engine::{
    ApiSettings, EngineSettings, KbNotePolicy, RunSource, StreamSettings, DEFAULT_API_BASE_URL,
};

use super::cli::{GenerateArgs, Overrides};
use super::logging::LogDestination;

pub const DEFAULT_SETTINGS_FILE: &str = "testgen.ron";

pub const ENV_API_URL: &str = "TESTGEN_API_URL";
pub const ENV_USE_MOCK: &str = "TESTGEN_USE_MOCK";
pub const ENV_OUTPUT_DIR: &str = "TESTGEN_OUTPUT_DIR";

/// Resolved from defaults, then the RON file, then the environment, then flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base_url: String,
    pub use_mock_fallback: bool,
    pub project_id: String,
    pub output_dir: PathBuf,
    pub log_destination: LogDestination,
    pub log_level: String,
    pub source: RunSource,
    pub kb_note_policy: KbNotePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            use_mock_fallback: true,
            project_id: "1".to_string(),
            output_dir: PathBuf::from("./exports"),
            log_destination: LogDestination::File,
            log_level: "info".to_string(),
            source: RunSource::Mock,
            kb_note_policy: KbNotePolicy::Forward,
        }
    }
}

impl Settings {
    /// An explicit path must exist; the default file is optional.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("cannot read settings file {}", path.display()))?;
                Self::parse(&text, path)
            }
            None => Self::load_optional(Path::new(DEFAULT_SETTINGS_FILE)),
        }
    }

    fn load_optional(path: &Path) -> anyhow::Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, path),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => {
                Err(err).with_context(|| format!("cannot read settings file {}", path.display()))
            }
        }
    }

    fn parse(text: &str, path: &Path) -> anyhow::Result<Self> {
        ron::from_str(text).with_context(|| format!("invalid settings in {}", path.display()))
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(raw) = lookup(ENV_USE_MOCK) {
            self.use_mock_fallback = parse_flag(&raw)
                .with_context(|| format!("{ENV_USE_MOCK} must be true or false"))?;
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.trim().is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(url) = &overrides.api_url {
            self.api_base_url = url.clone();
        }
        if let Some(project) = &overrides.project {
            self.project_id = project.clone();
        }
        if let Some(dir) = &overrides.output_dir {
            self.output_dir = dir.clone();
        }
        if overrides.no_mock_fallback {
            self.use_mock_fallback = false;
        }
        if let Some(destination) = overrides.log {
            self.log_destination = destination;
        }
        if let Some(level) = &overrides.log_level {
            self.log_level = level.clone();
        }
    }

    pub fn apply_generate_overrides(&mut self, args: &GenerateArgs) {
        if let Some(source) = args.source {
            self.source = source.into();
        }
        if let Some(policy) = args.kb_notes {
            self.kb_note_policy = policy.into();
        }
    }

    /// `None` for an unknown level name; the caller falls back to `info`
    /// and reports it once logging is up.
    pub fn level_filter(&self) -> Option<LevelFilter> {
        self.log_level.trim().parse().ok()
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.api_base_url.clone(),
            use_mock_fallback: self.use_mock_fallback,
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            api: self.api_settings(),
            stream: StreamSettings {
                base_url: self.api_base_url.clone(),
                project_id: self.project_id.clone(),
                kb_note_policy: self.kb_note_policy,
                ..StreamSettings::default()
            },
            source: self.source,
            project_id: self.project_id.clone(),
            output_dir: self.output_dir.clone(),
        }
    }
}

fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("unrecognised value `{other}`"),
    }
}
