//! Tests for the span processor

use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use super::*;
use crate::domain::traces::attrs::{AttrMap, AttrValue};
use crate::domain::traces::project::{ProjectError, StaticProjects};
use crate::domain::traces::span::{SpanKind, SpanType, StatusCode};

const TRACE: &str = "0af7651916cd43dd8448eb211c80319c";

fn processor() -> SpanProcessor {
    SpanProcessor::new(Arc::new(StaticProjects::new([Project {
        id: 1,
        ..Default::default()
    }])))
}

fn make_span(name: &str, attrs: serde_json::Value) -> Span {
    Span {
        project_id: 1,
        trace_id: TraceId::parse(TRACE).unwrap(),
        id: 42,
        parent_id: 7,
        name: name.to_string(),
        attrs: serde_json::from_value::<AttrMap>(attrs).unwrap(),
        ..Default::default()
    }
}

// ============================================================================
// IDENTITY
// ============================================================================

#[test]
fn test_standalone_span_synthesis() {
    let mut span = make_span("job", json!({}));
    span.trace_id = TraceId::default();

    assert!(processor().init_span_or_event(&mut span));
    assert!(!span.trace_id.is_zero());
    assert_eq!(span.id, 0);
    assert_eq!(span.parent_id, 0);
    assert!(span.standalone);
}

#[test]
fn test_missing_id_is_generated() {
    let mut span = make_span("job", json!({}));
    span.id = 0;
    processor().init_span_or_event(&mut span);
    assert_ne!(span.id, 0);
    assert!(!span.standalone);
    assert_eq!(span.parent_id, 7);
}

#[test]
fn test_time_defaults_to_now() {
    let mut span = make_span("job", json!({}));
    let before = Utc::now();
    processor().init_span_or_event(&mut span);
    assert!(span.time.unwrap() >= before);
}

#[test]
fn test_trace_context_from_log_message() {
    let mut span = make_span("", json!({
        "log.message": format!("request done trace_id={TRACE} span_id=00f067aa0ba902b7"),
    }));
    span.event_name = keys::EVENT_LOG.to_string();
    span.trace_id = TraceId::default();
    span.parent_id = 0;

    processor().init_span_or_event(&mut span);

    assert_eq!(span.trace_id.to_string(), TRACE);
    assert_eq!(span.parent_id, 0x00f067aa0ba902b7);
    assert!(!span.standalone);
    assert_ne!(span.id, 0);
}

// ============================================================================
// PROJECT LOOKUP
// ============================================================================

#[test]
fn test_missing_project_leaves_record_unclassified() {
    let mut span = make_span("job", json!({"service": "api"}));
    span.project_id = 99;

    assert!(!processor().init_span_or_event(&mut span));
    assert!(span.span_type.is_none());
    assert!(span.system.is_empty());
    assert_eq!(span.group_id, 0);
    assert_eq!(span.attrs.str("service"), Some("api"));
}

struct CountingResolver {
    calls: AtomicUsize,
}

impl ProjectResolver for CountingResolver {
    fn resolve(&self, project_id: u32) -> Result<Arc<Project>, ProjectError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Project {
            id: project_id,
            ..Default::default()
        }))
    }
}

#[test]
fn test_project_lookup_is_cached() {
    let resolver = Arc::new(CountingResolver {
        calls: AtomicUsize::new(0),
    });
    let mut processor = SpanProcessor::new(resolver.clone());
    for _ in 0..3 {
        let mut span = make_span("job", json!({}));
        processor.init_span_or_event(&mut span);
    }
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// ATTRIBUTES
// ============================================================================

#[test]
fn test_attrs_normalized_before_classification() {
    let mut span = make_span("GET /cart", json!({
        "service": "checkout",
        "http.route": "/cart",
    }));
    processor().init_span_or_event(&mut span);

    assert_eq!(span.span_type, Some(SpanType::Http));
    assert_eq!(span.system, "http:checkout");
    assert_eq!(span.attrs.str(keys::SERVICE_NAME), Some("checkout"));
    assert_eq!(span.attrs.str(keys::HTTP_ROUTE), Some("/cart"));
}

#[test]
fn test_json_statement_kept_verbatim() {
    let stmt = r#"{"find":"users","filter":{"id":"?"}}"#;
    let mut span = make_span("find", json!({
        "db.system": "mongodb",
        "db.statement": stmt,
    }));
    processor().init_span_or_event(&mut span);

    assert_eq!(span.span_type, Some(SpanType::Db));
    assert_eq!(span.system, "db:mongodb");
    assert_eq!(span.attrs.str(keys::DB_STATEMENT), Some(stmt));
    assert!(!span.attrs.has("db.statement.find"));
    assert_eq!(span.display_name, stmt);
}

#[test]
fn test_json_statement_without_db_system() {
    let stmt = r#"{"aggregate":"orders"}"#;
    let mut span = make_span("aggregate", json!({ "db.statement": stmt }));
    processor().init_span_or_event(&mut span);

    assert_eq!(span.span_type, Some(SpanType::Db));
    assert_eq!(span.attrs.str(keys::DB_STATEMENT), Some(stmt));
    assert_eq!(span.display_name, stmt);
}

#[test]
fn test_json_string_attrs_not_expanded() {
    let mut span = make_span("job", json!({ "payload": r#"{"a":1}"# }));
    processor().init_span_or_event(&mut span);

    assert_eq!(span.attrs.str("payload"), Some(r#"{"a":1}"#));
    assert!(!span.attrs.has("payload.a"));
}

#[test]
fn test_user_agent_expanded() {
    let mut span = make_span("GET /", json!({
        "http.route": "/",
        "http.user_agent": "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                            (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    }));
    processor().init_span_or_event(&mut span);
    assert_eq!(span.attrs.str(keys::HTTP_USER_AGENT_NAME), Some("Chrome"));
    assert_eq!(span.attrs.str(keys::HTTP_USER_AGENT_VERSION), Some("120.0.0.0"));
}

// ============================================================================
// DISPLAY NAME
// ============================================================================

#[test]
fn test_display_name_attribute_wins() {
    let mut span = make_span("query", json!({
        "db.system": "postgresql",
        "db.statement": "SELECT 1",
        "display.name": "health check",
    }));
    processor().init_span_or_event(&mut span);

    assert_eq!(span.display_name, "health check");
    assert!(!span.attrs.has(keys::DISPLAY_NAME));
}

#[test]
fn test_display_name_from_classifier() {
    let mut span = make_span("query", json!({"db.statement": "SELECT 1"}));
    processor().init_span_or_event(&mut span);
    assert_eq!(span.display_name, "SELECT 1");
}

#[test]
fn test_display_name_falls_back_to_name() {
    let mut span = make_span("work", json!({}));
    processor().init_span_or_event(&mut span);
    assert_eq!(span.display_name, "work");
}

#[test]
fn test_display_name_never_empty() {
    let mut span = make_span("", json!({}));
    processor().init_span_or_event(&mut span);
    assert_eq!(span.display_name, "funcs");
}

#[test]
fn test_names_truncated() {
    let long = "é".repeat(300);
    let mut span = make_span(&long, json!({}));
    processor().init_span_or_event(&mut span);

    assert!(span.name.len() <= 200);
    assert!(span.display_name.len() <= 255);
    assert!(span.name.chars().all(|c| c == 'é'));
}

// ============================================================================
// EVENT EXPANSION
// ============================================================================

#[test]
fn test_events_expanded_after_host() {
    let mut span = make_span("GET /cart", json!({
        "http.route": "/cart",
        "service.name": "checkout",
        "user": "alice",
    }));
    span.kind = SpanKind::Server;
    span.status_code = StatusCode::Error;
    span.events = vec![
        SpanEvent {
            name: keys::EVENT_LOG.to_string(),
            time: None,
            attrs: serde_json::from_value(json!({
                "log.message": "cart empty",
                "user": "bob",
            }))
            .unwrap(),
        },
        SpanEvent {
            name: keys::EVENT_ERROR.to_string(),
            time: None,
            attrs: serde_json::from_value(json!({
                "exception.type": "KeyError",
                "exception.message": "'sku'",
            }))
            .unwrap(),
        },
    ];

    let records = processor().process(span);
    assert_eq!(records.len(), 3);

    let host = &records[0];
    assert!(host.events.is_empty());
    assert_eq!(host.system, "http:checkout");

    let log = &records[1];
    assert_eq!(log.event_name, keys::EVENT_LOG);
    assert_eq!(log.parent_id, host.id);
    assert_eq!(log.trace_id, host.trace_id);
    assert_ne!(log.id, 0);
    assert_eq!(log.name, "GET /cart");
    assert_eq!(log.kind, SpanKind::Server);
    assert_eq!(log.status_code, StatusCode::Error);
    assert_eq!(log.attrs.str("user"), Some("bob"));
    assert_eq!(log.attrs.str(keys::SERVICE_NAME), Some("checkout"));
    assert_eq!(log.attrs.str(keys::LOG_SEVERITY), Some("INFO"));
    assert_eq!(log.system, "log:info");
    assert_eq!(log.display_name, "INFO cart empty");

    let exception = &records[2];
    assert_eq!(exception.event_name, keys::EVENT_EXCEPTION);
    assert_eq!(exception.system, "log:exception");
    assert_eq!(exception.display_name, "KeyError: 'sku'");
}

#[test]
fn test_log_events_group_by_template() {
    let host = make_span("worker", json!({}));
    let event = |msg: &str| SpanEvent {
        name: keys::EVENT_LOG.to_string(),
        time: None,
        attrs: [(keys::LOG_MESSAGE.to_string(), AttrValue::from(msg))]
            .into_iter()
            .collect(),
    };

    let mut processor = processor();
    let mut a = init_event_from_host_span(event("user 1 logged in"), &host);
    let mut b = init_event_from_host_span(event("user 2 logged in"), &host);
    let mut c = init_event_from_host_span(event("user 1 logged out"), &host);
    processor.init_span_or_event(&mut a);
    processor.init_span_or_event(&mut b);
    processor.init_span_or_event(&mut c);

    assert_eq!(a.group_id, b.group_id);
    assert_ne!(a.group_id, c.group_id);
}
