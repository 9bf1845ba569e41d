//! Canned backend replies used when the backend is unreachable and mock
//! fallback is enabled.

use serde_json::Value;
use testgen_core::{LlmConfig, TestCase};

use crate::api::{Project, StatusReply};

const TEST_CASES_JSON: &str = include_str!("test_cases.json");

pub fn health() -> StatusReply {
    StatusReply {
        status: "ok".to_string(),
        message: Some("Mock API running".to_string()),
    }
}

pub fn projects() -> Vec<Project> {
    vec![
        Project {
            id: "1".to_string(),
            name: "CRM System Test Cases".to_string(),
            description: "Test cases for CRM user management module".to_string(),
            created_at: "2025-11-01T10:00:00Z".to_string(),
            test_case_count: 12,
        },
        Project {
            id: "2".to_string(),
            name: "Case Management Testing".to_string(),
            description: "Comprehensive test suite for case workflows".to_string(),
            created_at: "2025-11-05T14:30:00Z".to_string(),
            test_case_count: 8,
        },
    ]
}

pub fn created_project(created_at: String) -> Project {
    Project {
        id: "3".to_string(),
        name: "New Project".to_string(),
        description: "Mock created project".to_string(),
        created_at,
        test_case_count: 0,
    }
}

pub fn config() -> LlmConfig {
    LlmConfig::default()
}

pub fn connection() -> StatusReply {
    StatusReply {
        status: "connected".to_string(),
        message: Some("Mock LLM connection successful".to_string()),
    }
}

pub fn empty() -> Value {
    Value::Object(Default::default())
}

/// The five sample cases the dashboard shows while prototyping.
pub fn test_cases() -> Result<Vec<TestCase>, serde_json::Error> {
    serde_json::from_str(TEST_CASES_JSON)
}
