use std::sync::{mpsc, Arc, Once};
use std::time::Duration;

use pretty_assertions::assert_eq;
use testgen_core::JobEvent;
use testgen_engine::{
    start_stream_run, ChannelHandlers, EngineEvent, EventStreamSource, KbNotePolicy,
    RunChannel, StreamSettings,
};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static INIT: Once = Once::new();

const SSE_BODY: &str = "\
data: {\"type\":\"progress\",\"progress\":20,\"estimatedTime\":16}\n\n\
data: {\"type\":\"step\",\"message\":\"Planner Agent: Identifying test scenarios...\"}\n\n\
data: {\"type\":\"kb_message\",\"kbMessage\":\"Using CRM_User_Guide.pdf for field names\"}\n\n\
data: {\"type\":\"complete\",\"progress\":100,\"testCasesCount\":12,\"kbComplianceScore\":92}\n\n\
data: {\"type\":\"step\",\"message\":\"after the end\"}\n\n";

fn settings(server: &MockServer, policy: KbNotePolicy) -> StreamSettings {
    StreamSettings {
        base_url: format!("{}/api/v1", server.uri()),
        project_id: "7".to_string(),
        kb_note_policy: policy,
        ..StreamSettings::default()
    }
}

async fn serve(body: &str, status: u16) -> MockServer {
    INIT.call_once(engine_logging::initialize_for_tests);
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/generate/7/stream"))
        .respond_with(
            ResponseTemplate::new(status).set_body_raw(body.to_string(), "text/event-stream"),
        )
        .mount(&server)
        .await;
    server
}

async fn collect(source: EventStreamSource) -> Vec<EngineEvent> {
    let (tx, rx) = mpsc::channel();
    let channel = RunChannel::new(Arc::new(ChannelHandlers::new(4, tx)));
    source.run(&channel, &CancellationToken::new()).await;
    drop(channel);
    rx.try_iter().collect()
}

fn run_events(events: Vec<EngineEvent>) -> Vec<JobEvent> {
    events
        .into_iter()
        .filter_map(|event| match event {
            EngineEvent::Run { event, .. } => Some(event),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn stream_events_reach_the_handlers_in_order() {
    let server = serve(SSE_BODY, 200).await;
    let source = EventStreamSource::new(settings(&server, KbNotePolicy::Forward)).unwrap();
    assert_eq!(
        source.stream_url(),
        format!("{}/api/v1/generate/7/stream", server.uri())
    );

    let events = collect(source).await;
    assert_eq!(events.first(), Some(&EngineEvent::RunOpened { run_id: 4 }));
    assert_eq!(
        run_events(events),
        vec![
            JobEvent::Progress {
                percent: 20.0,
                estimated_seconds_remaining: Some(16.0),
            },
            JobEvent::Step {
                message: "Planner Agent: Identifying test scenarios...".to_string(),
            },
            JobEvent::KbNote {
                message: "Using CRM_User_Guide.pdf for field names".to_string(),
            },
            JobEvent::Progress {
                percent: 100.0,
                estimated_seconds_remaining: None,
            },
            JobEvent::Complete {
                test_case_count: 12,
                kb_compliance_score: Some(92.0),
            },
        ]
    );
}

#[tokio::test]
async fn suppressed_kb_notes_are_dropped() {
    let server = serve(SSE_BODY, 200).await;
    let source = EventStreamSource::new(settings(&server, KbNotePolicy::Suppress)).unwrap();
    let events = run_events(collect(source).await);
    assert!(!events
        .iter()
        .any(|event| matches!(event, JobEvent::KbNote { .. })));
    assert!(events.last().is_some_and(JobEvent::is_terminal));
}

#[tokio::test]
async fn malformed_line_fails_the_run() {
    let body = "data: {\"type\":\"step\",\"message\":\"ok\"}\n\ndata: {broken\n\n";
    let server = serve(body, 200).await;
    let source = EventStreamSource::new(settings(&server, KbNotePolicy::Forward)).unwrap();
    let events = run_events(collect(source).await);
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[1], JobEvent::Failed { reason } if reason.starts_with("malformed event")));
}

#[tokio::test]
async fn http_error_fails_the_run() {
    let server = serve("", 500).await;
    let source = EventStreamSource::new(settings(&server, KbNotePolicy::Forward)).unwrap();
    let events = collect(source).await;
    assert_eq!(
        events,
        vec![
            EngineEvent::RunOpened { run_id: 4 },
            EngineEvent::Run {
                run_id: 4,
                event: JobEvent::Failed {
                    reason: "stream request failed with HTTP status 500".to_string(),
                },
            },
        ]
    );
}

#[tokio::test]
async fn body_ending_early_is_a_failure() {
    let body = "data: {\"type\":\"progress\",\"progress\":40}\n\n";
    let server = serve(body, 200).await;
    let source = EventStreamSource::new(settings(&server, KbNotePolicy::Forward)).unwrap();
    let events = run_events(collect(source).await);
    assert_eq!(
        events.last(),
        Some(&JobEvent::Failed {
            reason: "event stream ended before the run completed".to_string(),
        })
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_stream_delivers_nothing_more() {
    INIT.call_once(engine_logging::initialize_for_tests);
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/generate/7/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(SSE_BODY, "text/event-stream")
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    let source = Arc::new(EventStreamSource::new(settings(&server, KbNotePolicy::Forward)).unwrap());
    let (tx, rx) = mpsc::channel();
    let handle = start_stream_run(
        &tokio::runtime::Handle::current(),
        source,
        Arc::new(ChannelHandlers::new(9, tx)),
    );
    handle.cancel();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(rx.try_iter().next().is_none());
}
