use serde::{Deserialize, Serialize};
use thiserror::Error;

const MIB: u64 = 1024 * 1024;

/// A file picked by the user. Only the name and size cross into the core;
/// bytes stay with the engine until upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFile {
    pub name: String,
    pub size: u64,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("{name}: unsupported file type")]
    UnsupportedType { name: String },
    #[error("{name}: file is larger than the {} limit", format_file_size(*limit))]
    FileTooLarge { name: String, size: u64, limit: u64 },
    #[error("{label} exceeds the {} limit", format_file_size(*limit))]
    TotalTooLarge { label: &'static str, limit: u64 },
}

/// Size and type limits for one upload zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub per_file: u64,
    pub total: u64,
    pub extensions: &'static [&'static str],
    pub total_label: &'static str,
}

pub const REQUIREMENT_LIMITS: UploadLimits = UploadLimits {
    per_file: 10 * MIB,
    total: 50 * MIB,
    extensions: &["pdf", "xlsx", "xls"],
    total_label: "Total file size",
};

pub const KB_LIMITS: UploadLimits = UploadLimits {
    per_file: 20 * MIB,
    total: 100 * MIB,
    extensions: &["pdf", "txt", "md"],
    total_label: "Total KB storage",
};

impl UploadLimits {
    pub fn accepts_name(&self, name: &str) -> bool {
        extension_of(name)
            .map(|ext| self.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    /// Per-file checks drop individual files; if the survivors would push the
    /// zone over its total budget the whole batch is refused.
    pub fn screen<T>(
        &self,
        existing_total: u64,
        incoming: Vec<T>,
        describe: impl Fn(&T) -> (&str, u64),
    ) -> (Vec<T>, Vec<UploadRejection>) {
        let mut accepted = Vec::with_capacity(incoming.len());
        let mut rejections = Vec::new();
        for item in incoming {
            let (name, size) = describe(&item);
            if !self.accepts_name(name) {
                rejections.push(UploadRejection::UnsupportedType {
                    name: name.to_string(),
                });
            } else if size > self.per_file {
                rejections.push(UploadRejection::FileTooLarge {
                    name: name.to_string(),
                    size,
                    limit: self.per_file,
                });
            } else {
                accepted.push(item);
            }
        }

        let incoming_total: u64 = accepted.iter().map(|item| describe(item).1).sum();
        if existing_total.saturating_add(incoming_total) > self.total {
            rejections.push(UploadRejection::TotalTooLarge {
                label: self.total_label,
                limit: self.total,
            });
            accepted.clear();
        }
        (accepted, rejections)
    }
}

fn extension_of(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// Requirement documents and free text feeding a generation run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequirementInputs {
    files: Vec<UploadFile>,
    text: String,
}

impl RequirementInputs {
    pub fn files(&self) -> &[UploadFile] {
        &self.files
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: String) {
        self.text = text;
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    pub fn add_files(&mut self, files: Vec<UploadFile>) -> Vec<UploadRejection> {
        let (accepted, rejections) =
            REQUIREMENT_LIMITS.screen(self.total_size(), files, |f| (f.name.as_str(), f.size));
        self.files.extend(accepted);
        rejections
    }

    pub fn remove_file(&mut self, name: &str) -> bool {
        let before = self.files.len();
        self.files.retain(|f| f.name != name);
        self.files.len() != before
    }

    pub fn has_content(&self) -> bool {
        !self.files.is_empty() || !self.text.trim().is_empty()
    }
}

pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < MIB {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_size_formatting() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(10 * MIB), "10.0 MB");
    }

    #[test]
    fn rejects_wrong_type_and_oversized_files() {
        let mut inputs = RequirementInputs::default();
        let rejections = inputs.add_files(vec![
            UploadFile::new("spec.pdf", 1_000),
            UploadFile::new("notes.docx", 1_000),
            UploadFile::new("huge.xlsx", 11 * MIB),
            UploadFile::new("sheet.XLS", 2_000),
        ]);

        let names: Vec<_> = inputs.files().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["spec.pdf", "sheet.XLS"]);
        assert_eq!(rejections.len(), 2);
        assert_eq!(rejections[0].to_string(), "notes.docx: unsupported file type");
        assert_eq!(
            rejections[1].to_string(),
            "huge.xlsx: file is larger than the 10.0 MB limit"
        );
    }

    #[test]
    fn batch_over_total_budget_is_refused() {
        let mut inputs = RequirementInputs::default();
        assert!(inputs
            .add_files(vec![
                UploadFile::new("a.pdf", 9 * MIB),
                UploadFile::new("b.pdf", 9 * MIB),
                UploadFile::new("c.pdf", 9 * MIB),
                UploadFile::new("d.pdf", 9 * MIB),
                UploadFile::new("e.pdf", 9 * MIB),
            ])
            .is_empty());

        let rejections = inputs.add_files(vec![
            UploadFile::new("f.pdf", 3 * MIB),
            UploadFile::new("g.pdf", 3 * MIB),
        ]);
        assert_eq!(inputs.files().len(), 5);
        assert_eq!(
            rejections,
            vec![UploadRejection::TotalTooLarge {
                label: "Total file size",
                limit: 50 * MIB
            }]
        );
        assert_eq!(
            rejections[0].to_string(),
            "Total file size exceeds the 50.0 MB limit"
        );
    }

    #[test]
    fn content_requires_files_or_non_blank_text() {
        let mut inputs = RequirementInputs::default();
        assert!(!inputs.has_content());
        inputs.set_text("   \n".to_string());
        assert!(!inputs.has_content());
        inputs.set_text("Users can reset passwords".to_string());
        assert!(inputs.has_content());

        let mut inputs = RequirementInputs::default();
        inputs.add_files(vec![UploadFile::new("req.pdf", 10)]);
        assert!(inputs.has_content());
        assert!(inputs.remove_file("req.pdf"));
        assert!(!inputs.remove_file("req.pdf"));
        assert!(!inputs.has_content());
    }

    #[test]
    fn names_without_extension_are_refused() {
        assert!(!KB_LIMITS.accepts_name("README"));
        assert!(!KB_LIMITS.accepts_name(".md"));
        assert!(KB_LIMITS.accepts_name("guide.MD"));
    }
}
