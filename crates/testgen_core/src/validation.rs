use thiserror::Error;

use crate::inputs::RequirementInputs;
use crate::knowledge_base::KnowledgeBase;

/// Problems caught before any work is scheduled. Shown to the user as a
/// single message; never escalated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please provide files or text describing the requirements before generating")]
    MissingRequirements,
    #[error("Knowledge Base is enabled but has no documents. Upload KB documents or disable the Knowledge Base")]
    KnowledgeBaseEmpty,
    #[error("Please select at least one test case to export")]
    EmptyExportSelection,
}

pub fn validate_generation(
    inputs: &RequirementInputs,
    kb: &KnowledgeBase,
) -> Result<(), ValidationError> {
    if !inputs.has_content() {
        return Err(ValidationError::MissingRequirements);
    }
    if kb.is_enabled() && kb.documents().is_empty() {
        return Err(ValidationError::KnowledgeBaseEmpty);
    }
    Ok(())
}
