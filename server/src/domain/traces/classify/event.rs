//! Span-event rules
//!
//! Events are matched by name first (log, exception, message). Unnamed or
//! custom events fall back to the attributes they carry.

use super::{Rule, always, apply_first, join, join_type_message};
use crate::domain::traces::fingerprint::Fingerprint;
use crate::domain::traces::keys;
use crate::domain::traces::normalize::INFO_SEVERITY;
use crate::domain::traces::project::Project;
use crate::domain::traces::span::{Span, SpanKind, SpanType};

const EXCEPTION_SUBSYSTEM: &str = "exception";
const UNKNOWN_SUBSYSTEM: &str = "unknown";

/// Event rules in precedence order.
pub const EVENT_RULES: &[Rule] = &[
    Rule {
        name: "log_event",
        guard: is_log_event,
        apply: log,
    },
    Rule {
        name: "exception_event",
        guard: is_exception_event,
        apply: exception,
    },
    Rule {
        name: "message_event",
        guard: is_message_event,
        apply: message,
    },
    Rule {
        name: "log_message",
        guard: has_log_message,
        apply: log,
    },
    Rule {
        name: "exception_message",
        guard: has_exception_message,
        apply: exception,
    },
    Rule {
        name: "other",
        guard: always,
        apply: other,
    },
];

/// Assign type, system, group id and display name to a span-event.
pub fn assign_event_system_and_group_id(
    fp: &mut Fingerprint,
    project: &Project,
    span: &mut Span,
) {
    if span.event_name == keys::EVENT_ERROR {
        span.event_name = keys::EVENT_EXCEPTION.to_string();
    }
    apply_first(EVENT_RULES, fp, project, span);
}

fn is_log_event(_: &Project, span: &Span) -> bool {
    span.event_name == keys::EVENT_LOG
}

fn is_exception_event(_: &Project, span: &Span) -> bool {
    span.event_name == keys::EVENT_EXCEPTION
}

fn is_message_event(_: &Project, span: &Span) -> bool {
    span.event_name == keys::EVENT_MESSAGE
}

fn has_log_message(_: &Project, span: &Span) -> bool {
    span.attrs.has(keys::LOG_MESSAGE)
}

fn has_exception_message(_: &Project, span: &Span) -> bool {
    span.attrs.has(keys::EXCEPTION_MESSAGE)
}

// ============================================================================
// LOG
// ============================================================================

fn log(fp: &mut Fingerprint, project: &Project, span: &mut Span) {
    let severity = span
        .attrs
        .str(keys::LOG_SEVERITY)
        .filter(|sev| !sev.is_empty())
        .unwrap_or(INFO_SEVERITY)
        .to_lowercase();

    span.span_type = Some(SpanType::Log);
    span.system = SpanType::Log.system(&severity);

    let message_hash = span.log_message_hash;
    let group_id = fp.compute(|d| {
        d.hash_span(project, span, &[keys::LOG_SEVERITY]);
        if message_hash != 0 {
            d.write_str(&message_hash.to_string());
        }
    });
    span.group_id = group_id;
    span.display_name = log_display_name(span);
}

fn log_display_name(span: &Span) -> String {
    if let Some(msg) = span.attrs.str(keys::LOG_MESSAGE).filter(|m| !m.is_empty()) {
        return match span.attrs.str(keys::LOG_SEVERITY) {
            Some(sev) if !sev.is_empty() && !msg.starts_with(sev) => format!("{sev} {msg}"),
            _ => msg.to_string(),
        };
    }

    let name = exception_display_name(span);
    if name != span.event_name {
        return name;
    }

    serde_json::to_string(&span.attrs).unwrap_or(name)
}

fn exception_display_name(span: &Span) -> String {
    let typ = span.attrs.str(keys::EXCEPTION_TYPE).unwrap_or("");
    let msg = span.attrs.str(keys::EXCEPTION_MESSAGE).unwrap_or("");
    if typ.is_empty() && msg.is_empty() {
        return span.event_name.clone();
    }
    join_type_message(typ, msg)
}

// ============================================================================
// EXCEPTION
// ============================================================================

fn exception(fp: &mut Fingerprint, project: &Project, span: &mut Span) {
    span.span_type = Some(SpanType::Log);
    span.system = SpanType::Log.system(EXCEPTION_SUBSYSTEM);

    let group_id = fp.compute(|d| {
        d.hash_span(project, span, &[keys::EXCEPTION_TYPE]);
        if let Some(msg) = span.attrs.str(keys::EXCEPTION_MESSAGE).filter(|m| !m.is_empty()) {
            d.hash_message(msg);
        }
    });
    span.group_id = group_id;
    span.display_name = join_type_message(
        &span.attrs.text(keys::EXCEPTION_TYPE),
        &span.attrs.text(keys::EXCEPTION_MESSAGE),
    );
}

// ============================================================================
// MESSAGE
// ============================================================================

fn message(fp: &mut Fingerprint, project: &Project, span: &mut Span) {
    span.span_type = Some(SpanType::Message);
    span.system = SpanType::Message.system(&event_message_system(span));

    let group_id = fp.compute(|d| {
        d.hash_span(
            project,
            span,
            &[
                keys::RPC_SYSTEM,
                keys::RPC_SERVICE,
                keys::RPC_METHOD,
                keys::MESSAGE_TYPE,
            ],
        )
    });
    span.group_id = group_id;
    span.display_name = event_message_display_name(span);
}

fn event_message_system(span: &Span) -> String {
    [keys::RPC_SYSTEM, keys::MESSAGING_SYSTEM]
        .into_iter()
        .map(|key| span.attrs.text(key))
        .find(|system| !system.is_empty())
        .unwrap_or_else(|| UNKNOWN_SUBSYSTEM.to_string())
}

fn event_message_display_name(span: &Span) -> String {
    let op = span.attrs.text(keys::MESSAGING_OPERATION);
    if !op.is_empty() {
        return join(&span.name, &op);
    }
    let typ = span.attrs.text(keys::MESSAGE_TYPE);
    if !typ.is_empty() {
        return join(&span.name, &typ);
    }
    if span.kind != SpanKind::Internal {
        return join(&span.name, span.kind.as_str());
    }
    span.event_name.clone()
}

// ============================================================================
// OTHER
// ============================================================================

fn other(fp: &mut Fingerprint, project: &Project, span: &mut Span) {
    span.span_type = Some(SpanType::Other);
    span.system = SpanType::Other.to_string();
    let group_id = fp.compute(|d| d.hash_span(project, span, &[]));
    span.group_id = group_id;
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
