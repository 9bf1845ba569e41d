use crate::{
    ExportFormat, JobEvent, KbUpload, Priority, RunId, SortBy, TestCase, TestCasePatch,
    UploadFile,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User edited the requirements text box.
    RequirementsTextChanged(String),
    /// User picked or dropped requirement documents.
    FilesAdded(Vec<UploadFile>),
    /// User removed a requirement document by name.
    FileRemoved(String),
    /// User switched Knowledge Base usage on or off.
    KnowledgeBaseToggled(bool),
    KbDocumentsAdded(Vec<KbUpload>),
    KbDocumentRemoved(String),
    KbDocumentSelectionToggled(String),
    /// User clicked Generate.
    GenerateClicked,
    /// User clicked Cancel on the progress panel.
    CancelClicked,
    /// The event source for a run is live.
    RunOpened { run_id: RunId },
    /// Event delivered by the event source of a run.
    RunEvent { run_id: RunId, event: JobEvent },
    /// Cancellation acknowledgement window is over.
    CancelSettled { run_id: RunId },
    CancelNoticeExpired { run_id: RunId },
    /// Completed run has been on screen long enough.
    CompletionWindowElapsed { run_id: RunId },
    TestCasesLoaded(Vec<TestCase>),
    TestCasesLoadFailed(String),
    TestCaseSelected(Option<String>),
    TestCaseEdited { id: String, patch: TestCasePatch },
    TestCaseDeleted(String),
    CategoryFilterChanged(Option<String>),
    PriorityFilterChanged(Option<Priority>),
    KbCompliantFilterToggled(bool),
    SearchTextChanged(String),
    FiltersCleared,
    SortChanged(SortBy),
    ExportFormatChanged(ExportFormat),
    ExportKbReferencesToggled(bool),
    ExportKbScoresToggled(bool),
    ExportSelectionToggled(String),
    ExportSelectAll,
    ExportSelectionCleared,
    ExportClicked,
    /// Engine finished writing an export: saved path, or the failure text.
    ExportFinished(Result<String, String>),
    NotificationExpired { id: u64 },
}
