//! Span rules

use super::{Rule, always, apply_first, service_name_or_unknown};
use crate::domain::traces::fingerprint::Fingerprint;
use crate::domain::traces::keys;
use crate::domain::traces::project::Project;
use crate::domain::traces::span::{Span, SpanKind, SpanType};

const UNKNOWN_DB: &str = "unknown_db";

/// Span rules in precedence order.
pub const SPAN_RULES: &[Rule] = &[
    Rule {
        name: "rpc",
        guard: is_rpc,
        apply: rpc,
    },
    Rule {
        name: "messaging",
        guard: is_messaging,
        apply: messaging,
    },
    Rule {
        name: "db",
        guard: is_db,
        apply: db,
    },
    Rule {
        name: "http",
        guard: is_http,
        apply: http,
    },
    Rule {
        name: "funcs_by_service",
        guard: is_service_func,
        apply: funcs_by_service,
    },
    Rule {
        name: "funcs",
        guard: always,
        apply: funcs,
    },
];

/// Assign type, system and group id to a span.
pub fn assign_span_system_and_group_id(fp: &mut Fingerprint, project: &Project, span: &mut Span) {
    apply_first(SPAN_RULES, fp, project, span);
}

fn is_rpc(_: &Project, span: &Span) -> bool {
    !span.attrs.text(keys::RPC_SYSTEM).is_empty()
}

fn rpc(fp: &mut Fingerprint, project: &Project, span: &mut Span) {
    span.span_type = Some(SpanType::Rpc);
    span.system = SpanType::Rpc.system(&service_name_or_unknown(project, span));
    let group_id = fp.compute(|d| {
        d.hash_span(
            project,
            span,
            &[keys::RPC_SYSTEM, keys::RPC_SERVICE, keys::RPC_METHOD],
        )
    });
    span.group_id = group_id;
}

fn is_messaging(_: &Project, span: &Span) -> bool {
    !span.attrs.text(keys::MESSAGING_SYSTEM).is_empty()
}

fn messaging(fp: &mut Fingerprint, project: &Project, span: &mut Span) {
    span.span_type = Some(SpanType::Messaging);
    span.system = SpanType::Messaging.system(&span.attrs.text(keys::MESSAGING_SYSTEM));
    let group_id = fp.compute(|d| {
        d.hash_span(
            project,
            span,
            &[
                keys::MESSAGING_SYSTEM,
                keys::MESSAGING_OPERATION,
                keys::MESSAGING_DESTINATION_NAME,
                keys::MESSAGING_DESTINATION_KIND,
            ],
        )
    });
    span.group_id = group_id;
}

fn is_db(_: &Project, span: &Span) -> bool {
    !span.attrs.text(keys::DB_SYSTEM).is_empty() || span.attrs.has(keys::DB_STATEMENT)
}

fn db(fp: &mut Fingerprint, project: &Project, span: &mut Span) {
    let db_system = match span.attrs.text(keys::DB_SYSTEM) {
        system if system.is_empty() => UNKNOWN_DB.to_string(),
        system => system,
    };
    span.span_type = Some(SpanType::Db);
    span.system = SpanType::Db.system(&db_system);

    let stmt = span
        .attrs
        .str(keys::DB_STATEMENT)
        .filter(|stmt| !stmt.is_empty())
        .map(str::to_string);
    let group_id = fp.compute(|d| {
        d.hash_span(
            project,
            span,
            &[keys::DB_NAME, keys::DB_OPERATION, keys::DB_SQL_TABLE],
        );
        if let Some(stmt) = &stmt {
            d.hash_db_stmt(stmt);
        }
    });
    span.group_id = group_id;

    if let Some(stmt) = stmt {
        span.display_name = stmt;
    }
}

fn is_http(_: &Project, span: &Span) -> bool {
    span.attrs.has(keys::HTTP_ROUTE) || span.attrs.has(keys::HTTP_TARGET)
}

fn http(fp: &mut Fingerprint, project: &Project, span: &mut Span) {
    span.span_type = Some(SpanType::Http);
    span.system = SpanType::Http.system(&service_name_or_unknown(project, span));
    let group_id =
        fp.compute(|d| d.hash_span(project, span, &[keys::HTTP_METHOD, keys::HTTP_ROUTE]));
    span.group_id = group_id;
}

fn is_service_func(project: &Project, span: &Span) -> bool {
    project.group_funcs_by_service
        && (span.parent_id == 0
            || span.kind != SpanKind::Internal
            || span.attrs.has(keys::CODE_FUNCTION))
}

fn funcs_by_service(fp: &mut Fingerprint, project: &Project, span: &mut Span) {
    span.span_type = Some(SpanType::Funcs);
    span.system = SpanType::Funcs.system(&service_name_or_unknown(project, span));
    let group_id = fp.compute(|d| d.hash_span(project, span, &[]));
    span.group_id = group_id;
}

fn funcs(fp: &mut Fingerprint, project: &Project, span: &mut Span) {
    span.span_type = Some(SpanType::Funcs);
    span.system = SpanType::Funcs.to_string();
    let group_id = fp.compute(|d| d.hash_span(project, span, &[]));
    span.group_id = group_id;
}
