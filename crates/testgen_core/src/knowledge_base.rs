use serde::{Deserialize, Serialize};

use crate::config::{check_kb_max_docs, check_kb_threshold, ConfigError};
use crate::inputs::{UploadRejection, KB_LIMITS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KbDocumentKind {
    Pdf,
    Txt,
    Md,
}

impl KbDocumentKind {
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            KbDocumentKind::Pdf
        } else if lower.ends_with(".md") {
            KbDocumentKind::Md
        } else {
            KbDocumentKind::Txt
        }
    }
}

/// A KB document as offered by the file picker, optionally with a content
/// hash computed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KbUpload {
    pub name: String,
    pub size: u64,
    pub content_hash: Option<String>,
}

impl KbUpload {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            content_hash: None,
        }
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KbDocument {
    pub id: String,
    pub name: String,
    pub kind: KbDocumentKind,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KbSettings {
    pub threshold: f64,
    pub max_docs: u32,
}

impl Default for KbSettings {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            max_docs: 5,
        }
    }
}

impl KbSettings {
    pub fn new(threshold: f64, max_docs: u32) -> Result<Self, ConfigError> {
        check_kb_threshold(threshold)?;
        check_kb_max_docs(max_docs)?;
        Ok(Self {
            threshold,
            max_docs,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct KbAddOutcome {
    pub added: usize,
    pub duplicates: usize,
    pub rejections: Vec<UploadRejection>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct KnowledgeBase {
    documents: Vec<KbDocument>,
    enabled: bool,
    selected_ids: Vec<String>,
    settings: KbSettings,
    next_id: u64,
}

impl KnowledgeBase {
    pub fn documents(&self) -> &[KbDocument] {
        &self.documents
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn settings(&self) -> KbSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: KbSettings) {
        self.settings = settings;
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected_ids.iter().any(|s| s == id)
    }

    pub fn selected_documents(&self) -> impl Iterator<Item = &KbDocument> {
        self.documents.iter().filter(|d| self.is_selected(&d.id))
    }

    pub fn total_size(&self) -> u64 {
        self.documents.iter().map(|d| d.size).sum()
    }

    /// New documents are selected as they are added. Uploads whose hash
    /// matches a stored document are skipped.
    pub fn add_documents(&mut self, uploads: Vec<KbUpload>) -> KbAddOutcome {
        let mut outcome = KbAddOutcome::default();
        let mut fresh: Vec<KbDocument> = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let duplicate = upload.content_hash.as_deref().is_some_and(|hash| {
                self.documents
                    .iter()
                    .chain(fresh.iter())
                    .any(|d| d.content_hash.as_deref() == Some(hash))
            });
            if duplicate {
                outcome.duplicates += 1;
                continue;
            }
            let doc = KbDocument {
                id: String::new(),
                kind: KbDocumentKind::from_name(&upload.name),
                name: upload.name,
                size: upload.size,
                content_hash: upload.content_hash,
            };
            fresh.push(doc);
        }

        let (accepted, rejections) = KB_LIMITS.screen(
            self.total_size(),
            fresh,
            |doc| (doc.name.as_str(), doc.size),
        );
        outcome.rejections = rejections;
        for mut doc in accepted {
            self.next_id += 1;
            doc.id = format!("kb-{}", self.next_id);
            self.selected_ids.push(doc.id.clone());
            self.documents.push(doc);
            outcome.added += 1;
        }
        outcome
    }

    pub fn remove_document(&mut self, id: &str) -> bool {
        let before = self.documents.len();
        self.documents.retain(|d| d.id != id);
        self.selected_ids.retain(|s| s != id);
        self.documents.len() != before
    }

    pub fn clear_documents(&mut self) {
        self.documents.clear();
        self.selected_ids.clear();
    }

    pub fn toggle_selection(&mut self, id: &str) {
        if self.is_selected(id) {
            self.selected_ids.retain(|s| s != id);
        } else if self.documents.iter().any(|d| d.id == id) {
            self.selected_ids.push(id.to_string());
        }
    }

    pub fn select_all(&mut self) {
        self.selected_ids = self.documents.iter().map(|d| d.id.clone()).collect();
    }

    pub fn deselect_all(&mut self) {
        self.selected_ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn added_documents_get_ids_kinds_and_selection() {
        let mut kb = KnowledgeBase::default();
        let outcome = kb.add_documents(vec![
            KbUpload::new("CRM_User_Guide.pdf", 2_000),
            KbUpload::new("workflows.md", 300),
            KbUpload::new("glossary.txt", 100),
        ]);
        assert_eq!(outcome.added, 3);

        let kinds: Vec<_> = kb.documents().iter().map(|d| (d.id.as_str(), d.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("kb-1", KbDocumentKind::Pdf),
                ("kb-2", KbDocumentKind::Md),
                ("kb-3", KbDocumentKind::Txt),
            ]
        );
        assert_eq!(kb.selected_documents().count(), 3);
    }

    #[test]
    fn duplicate_hashes_are_skipped() {
        let mut kb = KnowledgeBase::default();
        kb.add_documents(vec![KbUpload::new("a.pdf", 10).with_hash("abc")]);
        let outcome = kb.add_documents(vec![
            KbUpload::new("copy-of-a.pdf", 10).with_hash("abc"),
            KbUpload::new("b.pdf", 10).with_hash("def"),
            KbUpload::new("b-again.pdf", 10).with_hash("def"),
        ]);
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.duplicates, 2);
        assert_eq!(kb.documents().len(), 2);
    }

    #[test]
    fn removing_a_document_deselects_it() {
        let mut kb = KnowledgeBase::default();
        kb.add_documents(vec![KbUpload::new("a.pdf", 10), KbUpload::new("b.md", 10)]);
        assert!(kb.remove_document("kb-1"));
        assert!(!kb.is_selected("kb-1"));
        assert!(!kb.remove_document("kb-1"));

        kb.toggle_selection("kb-2");
        assert_eq!(kb.selected_documents().count(), 0);
        kb.select_all();
        assert!(kb.is_selected("kb-2"));
        kb.toggle_selection("kb-missing");
        assert!(!kb.is_selected("kb-missing"));
    }

    #[test]
    fn settings_are_range_checked() {
        assert!(KbSettings::new(0.5, 3).is_ok());
        assert!(KbSettings::new(1.5, 3).is_err());
        assert!(KbSettings::new(0.5, 0).is_err());
    }
}
