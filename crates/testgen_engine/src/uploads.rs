use std::fmt::Write;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use testgen_core::{KbUpload, UploadFile};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0} does not name a file")]
    NoFileName(PathBuf),
}

/// A document read from disk, ready for screening and upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl LoadedFile {
    pub fn read(path: &Path) -> Result<Self, UploadError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UploadError::NoFileName(path.to_path_buf()))?
            .to_string();
        let bytes = fs::read(path).map_err(|source| UploadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            mime_type: mime_type_for(&name).to_string(),
            name,
            bytes,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn as_upload(&self) -> UploadFile {
        UploadFile::new(self.name.clone(), self.size())
    }

    /// KB documents carry a content hash so re-uploads are recognised.
    pub fn as_kb_upload(&self) -> KbUpload {
        KbUpload::new(self.name.clone(), self.size()).with_hash(sha256_hex(&self.bytes))
    }
}

pub fn mime_type_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xls" => "application/vnd.ms-excel",
        "md" => "text/markdown",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
