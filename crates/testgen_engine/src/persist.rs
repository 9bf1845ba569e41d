use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use engine_logging::engine_debug;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory {path} is not usable: {reason}")]
    OutputDir { path: PathBuf, reason: String },
    #[error("refusing to write `{0}`: not a plain file name")]
    InvalidFileName(String),
    #[error("{0} already exists")]
    AlreadyExists(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Directory that receives export artifacts.
#[derive(Debug, Clone)]
pub struct OutputDir {
    path: PathBuf,
}

impl OutputDir {
    /// Creates the directory if missing and checks that it accepts new files.
    pub fn prepare(path: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let path = path.into();
        let unusable = |reason: String| PersistError::OutputDir {
            path: path.clone(),
            reason,
        };
        match fs::metadata(&path) {
            Ok(meta) if !meta.is_dir() => return Err(unusable("not a directory".to_string())),
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(&path).map_err(|e| unusable(e.to_string()))?;
            }
            Err(err) => return Err(unusable(err.to_string())),
        }
        NamedTempFile::new_in(&path).map_err(|e| unusable(e.to_string()))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes through a temp file in the same directory, then links it into
    /// place. An existing file of the same name is left untouched.
    pub fn write_atomic(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename.starts_with('.') {
            return Err(PersistError::InvalidFileName(filename.to_string()));
        }
        let target = self.path.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.path)?;
        tmp.write_all(content)?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist_noclobber(&target).map_err(|e| {
            if e.error.kind() == ErrorKind::AlreadyExists {
                PersistError::AlreadyExists(target.clone())
            } else {
                PersistError::Io(e.error)
            }
        })?;
        engine_debug!("Wrote {} bytes to {}", content.len(), target.display());
        Ok(target)
    }
}
