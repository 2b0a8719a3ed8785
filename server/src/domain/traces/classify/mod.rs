//! Span and event classification
//!
//! Classification is an ordered list of rules. Each rule pairs a guard with an
//! action; the first rule whose guard matches assigns the type, system, group id
//! and, for some rules, a display name. The last rule of each table always
//! matches.

mod event;
mod span;

pub use event::{EVENT_RULES, assign_event_system_and_group_id};
pub use span::{SPAN_RULES, assign_span_system_and_group_id};

use super::fingerprint::Fingerprint;
use super::keys;
use super::project::Project;
use super::span::Span;

/// One classification rule.
pub struct Rule {
    pub name: &'static str,
    pub guard: fn(&Project, &Span) -> bool,
    pub apply: fn(&mut Fingerprint, &Project, &mut Span),
}

/// First rule in `rules` whose guard accepts `span`.
pub fn matching_rule<'a>(rules: &'a [Rule], project: &Project, span: &Span) -> Option<&'a Rule> {
    rules.iter().find(|rule| (rule.guard)(project, span))
}

fn apply_first(rules: &[Rule], fp: &mut Fingerprint, project: &Project, span: &mut Span) {
    if let Some(rule) = matching_rule(rules, project, span) {
        tracing::trace!(rule = rule.name, "Classifying");
        (rule.apply)(fp, project, span);
    }
}

fn always(_: &Project, _: &Span) -> bool {
    true
}

/// Service name, or the project's fallback when missing.
fn service_name_or_unknown(project: &Project, span: &Span) -> String {
    match span.attrs.text(keys::SERVICE_NAME) {
        name if name.is_empty() => project.unknown_service.clone(),
        name => name,
    }
}

/// `type: message`, collapsing to whichever part is present.
pub fn join_type_message(typ: &str, msg: &str) -> String {
    if msg.is_empty() {
        return typ.to_string();
    }
    if msg.starts_with(typ) {
        return msg.to_string();
    }
    format!("{typ}: {msg}")
}

fn join(s1: &str, s2: &str) -> String {
    if s1.is_empty() {
        s2.to_string()
    } else {
        format!("{s1} {s2}")
    }
}
