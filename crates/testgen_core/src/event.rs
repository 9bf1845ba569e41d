use serde::{Deserialize, Serialize};

/// Identifies one generation run. Allocated by the state machine, never reused.
pub type RunId = u64;

/// Progress vocabulary shared by every event source (mock driver or backend stream).
///
/// On the wire each event is one JSON object with a `type` discriminator.
/// The aliases accept the field and tag names the dashboard backend used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    Progress {
        #[serde(alias = "progress")]
        percent: f64,
        #[serde(
            default,
            alias = "estimatedTime",
            skip_serializing_if = "Option::is_none"
        )]
        estimated_seconds_remaining: Option<f64>,
    },
    Step {
        message: String,
    },
    #[serde(alias = "kb_message")]
    KbNote {
        #[serde(alias = "kbMessage")]
        message: String,
    },
    #[serde(alias = "test_case")]
    TestCaseArrived {
        #[serde(alias = "testCase")]
        payload: serde_json::Value,
    },
    Complete {
        #[serde(alias = "testCasesCount")]
        test_case_count: u32,
        #[serde(
            default,
            alias = "kbComplianceScore",
            skip_serializing_if = "Option::is_none"
        )]
        kb_compliance_score: Option<f64>,
    },
    #[serde(alias = "error")]
    Failed {
        #[serde(alias = "error")]
        reason: String,
    },
}

impl JobEvent {
    /// `Complete` and `Failed` end a run; nothing may follow them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobEvent::Complete { .. } | JobEvent::Failed { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            JobEvent::Progress { .. } => "progress",
            JobEvent::Step { .. } => "step",
            JobEvent::KbNote { .. } => "kb_note",
            JobEvent::TestCaseArrived { .. } => "test_case_arrived",
            JobEvent::Complete { .. } => "complete",
            JobEvent::Failed { .. } => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::JobEvent;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_canonical_tags() {
        let event: JobEvent =
            serde_json::from_str(r#"{"type":"progress","percent":40,"estimated_seconds_remaining":12}"#)
                .unwrap();
        assert_eq!(
            event,
            JobEvent::Progress {
                percent: 40.0,
                estimated_seconds_remaining: Some(12.0),
            }
        );

        let event: JobEvent = serde_json::from_str(r#"{"type":"kb_note","message":"m"}"#).unwrap();
        assert_eq!(
            event,
            JobEvent::KbNote {
                message: "m".to_string()
            }
        );
    }

    #[test]
    fn decodes_dashboard_backend_names() {
        let event: JobEvent =
            serde_json::from_str(r#"{"type":"progress","progress":20,"estimatedTime":16}"#).unwrap();
        assert_eq!(
            event,
            JobEvent::Progress {
                percent: 20.0,
                estimated_seconds_remaining: Some(16.0),
            }
        );

        let event: JobEvent =
            serde_json::from_str(r#"{"type":"kb_message","kbMessage":"Using guide"}"#).unwrap();
        assert_eq!(
            event,
            JobEvent::KbNote {
                message: "Using guide".to_string()
            }
        );

        let event: JobEvent = serde_json::from_str(
            r#"{"type":"complete","progress":100,"testCasesCount":12,"kbComplianceScore":92}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            JobEvent::Complete {
                test_case_count: 12,
                kb_compliance_score: Some(92.0),
            }
        );

        let event: JobEvent = serde_json::from_str(r#"{"type":"error","error":"boom"}"#).unwrap();
        assert_eq!(
            event,
            JobEvent::Failed {
                reason: "boom".to_string()
            }
        );
    }

    #[test]
    fn step_ignores_extra_fields() {
        let event: JobEvent =
            serde_json::from_str(r#"{"type":"step","message":"Planning","progress":10}"#).unwrap();
        assert_eq!(
            event,
            JobEvent::Step {
                message: "Planning".to_string()
            }
        );
        assert!(!event.is_terminal());
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(serde_json::from_str::<JobEvent>(r#"{"type":"heartbeat"}"#).is_err());
    }

    #[test]
    fn encodes_with_type_tag() {
        let json = serde_json::to_value(JobEvent::Complete {
            test_case_count: 3,
            kb_compliance_score: None,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"type": "complete", "test_case_count": 3}));
    }
}
