use std::collections::BTreeSet;
use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::test_case::TestCase;
use crate::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Excel,
    Markdown,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Excel => "xlsx",
            ExportFormat::Markdown => "md",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Markdown => "text/markdown",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Excel => "EXCEL",
            ExportFormat::Markdown => "MARKDOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSettings {
    pub format: ExportFormat,
    pub include_kb_references: bool,
    pub include_kb_scores: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Excel,
            include_kb_references: true,
            include_kb_scores: true,
        }
    }
}

/// Body of the export call. The KB flags are already resolved against
/// whether the Knowledge Base is in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub test_cases: Vec<TestCase>,
    pub format: ExportFormat,
    #[serde(rename = "includeKBReferences")]
    pub include_kb_references: bool,
    #[serde(rename = "includeKBScores")]
    pub include_kb_scores: bool,
}

impl ExportRequest {
    /// Keeps board order; ids in `selection` that no longer exist are ignored.
    pub fn build(
        cases: &[TestCase],
        selection: &BTreeSet<String>,
        settings: &ExportSettings,
        kb_enabled: bool,
    ) -> Result<Self, ValidationError> {
        let test_cases: Vec<TestCase> = cases
            .iter()
            .filter(|c| selection.contains(&c.id))
            .cloned()
            .collect();
        if test_cases.is_empty() {
            return Err(ValidationError::EmptyExportSelection);
        }
        Ok(Self {
            test_cases,
            format: settings.format,
            include_kb_references: kb_enabled && settings.include_kb_references,
            include_kb_scores: kb_enabled && settings.include_kb_scores,
        })
    }

    pub fn success_message(&self) -> String {
        let count = self.test_cases.len();
        let plural = if count == 1 { "" } else { "s" };
        let kb_suffix = if self.include_kb_references {
            " with KB references"
        } else {
            ""
        };
        format!(
            "Successfully exported {count} test case{plural} to {}{kb_suffix}",
            self.format.label()
        )
    }
}

/// Markdown document for an export, `exported_at` is printed verbatim.
pub fn render_markdown(request: &ExportRequest, exported_at: &str) -> String {
    let mut md = String::from("# Test Cases Export\n\n");
    let _ = writeln!(md, "**Exported:** {exported_at}");
    md.push_str("**Format:** Markdown\n");
    let _ = writeln!(md, "**Total Test Cases:** {}\n", request.test_cases.len());

    if request.include_kb_references {
        md.push_str("**KB References:** Included\n");
    }
    if request.include_kb_scores {
        md.push_str("**KB Compliance Scores:** Included\n");
    }
    md.push_str("\n---\n\n");

    for (index, case) in request.test_cases.iter().enumerate() {
        let _ = writeln!(md, "## {}. {}\n", index + 1, case.title);
        let _ = writeln!(md, "**ID:** {}", case.id);
        let _ = writeln!(md, "**Category:** {}", case.category);
        let _ = writeln!(md, "**Priority:** {}\n", case.priority.as_str());
        let _ = writeln!(md, "**Description:** {}\n", case.description);

        write_numbered(&mut md, "Steps", &case.steps);
        write_numbered(&mut md, "Expected Results", &case.expected_results);

        if request.include_kb_references && !case.kb_references.is_empty() {
            md.push_str("### KB References:\n");
            for reference in &case.kb_references {
                let _ = writeln!(md, "- {reference}");
            }
            md.push('\n');
        }

        if request.include_kb_scores {
            if let Some(compliant) = case.kb_compliant {
                let mark = if compliant { "✓ Yes" } else { "✗ No" };
                let _ = writeln!(md, "**KB Compliant:** {mark}\n");
            }
        }

        md.push_str("---\n\n");
    }
    md
}

fn write_numbered(md: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(md, "### {heading}:");
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(md, "{}. {item}", i + 1);
    }
    md.push('\n');
}
