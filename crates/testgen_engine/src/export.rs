use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use engine_logging::engine_info;
use testgen_core::{render_markdown, ExportFormat, ExportRequest};
use thiserror::Error;

use crate::persist::{OutputDir, PersistError};

/// Placeholder body for Excel exports; real workbook generation lives in the backend.
pub const MOCK_EXCEL_CONTENT: &str =
    "Mock Excel file content (binary data would go here in production)";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not save export: {0}")]
    Persist(#[from] PersistError),
}

/// A finished export file, not yet written anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    pub fn build(request: &ExportRequest, now: DateTime<Utc>) -> Self {
        let bytes = match request.format {
            ExportFormat::Markdown => {
                let exported_at = now.format("%Y-%m-%d %H:%M:%S UTC").to_string();
                render_markdown(request, &exported_at).into_bytes()
            }
            ExportFormat::Excel => MOCK_EXCEL_CONTENT.as_bytes().to_vec(),
        };
        Self {
            filename: format!(
                "test-cases-{}.{}",
                now.timestamp_millis(),
                request.format.extension()
            ),
            mime_type: request.format.mime_type(),
            bytes,
        }
    }

    pub fn save(&self, dir: &OutputDir) -> Result<PathBuf, ExportError> {
        Ok(dir.write_atomic(&self.filename, &self.bytes)?)
    }
}

/// Builds the artifact for `request` and writes it into `output_dir`.
pub fn export_to_dir(
    request: &ExportRequest,
    output_dir: &Path,
    now: DateTime<Utc>,
) -> Result<PathBuf, ExportError> {
    let dir = OutputDir::prepare(output_dir)?;
    let artifact = ExportArtifact::build(request, now);
    let path = artifact.save(&dir)?;
    engine_info!(
        "Exported {} test cases to {}",
        request.test_cases.len(),
        path.display()
    );
    Ok(path)
}
