//! OTLP conversion
//!
//! Turns `ExportTraceServiceRequest` payloads into engine `Span` records:
//! - AnyValue to AttrValue conversion (native types preserved, bytes as hex)
//! - Resource attributes merged under span attributes
//! - Project id taken from the resource, else the configured default

use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::{AnyValue, KeyValue, any_value};
use opentelemetry_proto::tonic::trace::v1::{Span as OtlpSpan, span, status};
use thiserror::Error;

use crate::domain::traces::keys;
use crate::domain::traces::{
    AttrMap, AttrValue, Span, SpanEvent, SpanKind, SpanLink, StatusCode, TraceId,
};
use crate::utils::time::nanos_to_datetime;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OtlpError {
    #[error("invalid trace id length: {0} bytes")]
    TraceIdLength(usize),
    #[error("invalid span id length: {0} bytes")]
    SpanIdLength(usize),
}

// ============================================================================
// REQUEST CONVERSION
// ============================================================================

/// Convert every span in a trace export request.
///
/// Spans with malformed ids are logged and skipped.
pub fn spans_from_request(
    request: &ExportTraceServiceRequest,
    default_project_id: u32,
) -> Vec<Span> {
    let mut spans = Vec::new();
    for resource_spans in &request.resource_spans {
        let resource_attrs = resource_spans
            .resource
            .as_ref()
            .map(|r| attrs_from_otlp(&r.attributes))
            .unwrap_or_default();
        let project_id = resource_project_id(&resource_attrs).unwrap_or(default_project_id);

        for otlp_span in resource_spans.scope_spans.iter().flat_map(|ss| &ss.spans) {
            match span_from_otlp(otlp_span, project_id, &resource_attrs) {
                Ok(span) => spans.push(span),
                Err(e) => {
                    tracing::warn!(name = %otlp_span.name, error = %e, "Skipping malformed span")
                }
            }
        }
    }
    spans
}

/// Convert a single OTLP span. Resource attributes fill keys the span lacks.
pub fn span_from_otlp(
    otlp: &OtlpSpan,
    project_id: u32,
    resource_attrs: &AttrMap,
) -> Result<Span, OtlpError> {
    let mut attrs = attrs_from_otlp(&otlp.attributes);
    for (key, value) in resource_attrs.iter() {
        if key != keys::PROJECT_ID {
            attrs.insert_if_absent(key, value.clone());
        }
    }

    Ok(Span {
        project_id,
        trace_id: trace_id_from_bytes(&otlp.trace_id)?,
        id: span_id_from_bytes(&otlp.span_id)?,
        parent_id: span_id_from_bytes(&otlp.parent_span_id)?,
        name: otlp.name.clone(),
        kind: span_kind_from_otlp(otlp.kind),
        time: time_from_nanos(otlp.start_time_unix_nano),
        status_code: status_code_from_otlp(otlp.status.as_ref().map(|s| s.code)),
        attrs,
        events: otlp.events.iter().map(span_event_from_otlp).collect(),
        links: otlp
            .links
            .iter()
            .filter_map(|link| match span_link_from_otlp(link) {
                Ok(link) => Some(link),
                Err(e) => {
                    tracing::debug!(error = %e, "Dropping malformed span link");
                    None
                }
            })
            .collect(),
        ..Default::default()
    })
}

fn span_event_from_otlp(event: &span::Event) -> SpanEvent {
    SpanEvent {
        name: event.name.clone(),
        time: time_from_nanos(event.time_unix_nano),
        attrs: attrs_from_otlp(&event.attributes),
    }
}

fn span_link_from_otlp(link: &span::Link) -> Result<SpanLink, OtlpError> {
    Ok(SpanLink {
        trace_id: trace_id_from_bytes(&link.trace_id)?,
        span_id: span_id_from_bytes(&link.span_id)?,
        attrs: attrs_from_otlp(&link.attributes),
    })
}

fn resource_project_id(attrs: &AttrMap) -> Option<u32> {
    match attrs.get(keys::PROJECT_ID)? {
        AttrValue::Int(id) => u32::try_from(*id).ok(),
        AttrValue::Str(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ============================================================================
// FIELD CONVERSION
// ============================================================================

fn trace_id_from_bytes(bytes: &[u8]) -> Result<TraceId, OtlpError> {
    match bytes.len() {
        0 => Ok(TraceId::default()),
        16 => {
            let mut buf = [0u8; 16];
            buf.copy_from_slice(bytes);
            Ok(TraceId::new(u128::from_be_bytes(buf)))
        }
        n => Err(OtlpError::TraceIdLength(n)),
    }
}

fn span_id_from_bytes(bytes: &[u8]) -> Result<u64, OtlpError> {
    match bytes.len() {
        0 => Ok(0),
        8 => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(bytes);
            Ok(u64::from_be_bytes(buf))
        }
        n => Err(OtlpError::SpanIdLength(n)),
    }
}

fn time_from_nanos(nanos: u64) -> Option<chrono::DateTime<chrono::Utc>> {
    (nanos != 0).then(|| nanos_to_datetime(nanos))
}

fn span_kind_from_otlp(kind: i32) -> SpanKind {
    match span::SpanKind::try_from(kind) {
        Ok(span::SpanKind::Server) => SpanKind::Server,
        Ok(span::SpanKind::Client) => SpanKind::Client,
        Ok(span::SpanKind::Producer) => SpanKind::Producer,
        Ok(span::SpanKind::Consumer) => SpanKind::Consumer,
        _ => SpanKind::Internal,
    }
}

fn status_code_from_otlp(code: Option<i32>) -> StatusCode {
    match code.map(status::StatusCode::try_from) {
        Some(Ok(status::StatusCode::Ok)) => StatusCode::Ok,
        Some(Ok(status::StatusCode::Error)) => StatusCode::Error,
        _ => StatusCode::Unset,
    }
}

// ============================================================================
// ATTRIBUTE CONVERSION
// ============================================================================

/// Build an attribute map from OTLP key-values. Keys without a value are skipped.
pub fn attrs_from_otlp(attrs: &[KeyValue]) -> AttrMap {
    attrs
        .iter()
        .filter_map(|kv| {
            kv.value
                .as_ref()
                .map(|v| (kv.key.clone(), any_value_to_attr(v)))
        })
        .collect()
}

/// Convert AnyValue to AttrValue (preserves native types)
pub fn any_value_to_attr(value: &AnyValue) -> AttrValue {
    match &value.value {
        Some(any_value::Value::StringValue(s)) => AttrValue::Str(s.clone()),
        Some(any_value::Value::BoolValue(b)) => AttrValue::Bool(*b),
        Some(any_value::Value::IntValue(i)) => AttrValue::Int(*i),
        Some(any_value::Value::DoubleValue(d)) => AttrValue::Float(*d),
        Some(any_value::Value::ArrayValue(arr)) => {
            AttrValue::Array(arr.values.iter().map(any_value_to_attr).collect())
        }
        Some(any_value::Value::KvlistValue(kvlist)) => AttrValue::Map(
            kvlist
                .values
                .iter()
                .filter_map(|kv| {
                    kv.value
                        .as_ref()
                        .map(|v| (kv.key.clone(), any_value_to_attr(v)))
                })
                .collect(),
        ),
        Some(any_value::Value::BytesValue(b)) => AttrValue::Str(hex::encode(b)),
        None => AttrValue::Null,
    }
}
