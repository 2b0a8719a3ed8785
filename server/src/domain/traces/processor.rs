//! Per-worker span processor
//!
//! Runs a decoded record through the full engine: project lookup, attribute
//! normalization, log message parsing, identity synthesis, classification and
//! display-name finishing. Span-events attached to a host span are expanded
//! into their own records after the host has been processed.
//!
//! A `SpanProcessor` owns its fingerprint digest and must not be shared between
//! concurrent callers; create one per worker.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use super::classify::{assign_event_system_and_group_id, assign_span_system_and_group_id};
use super::fingerprint::Fingerprint;
use super::keys;
use super::message::parse_log_message;
use super::normalize::{INFO_SEVERITY, init_http_user_agent, norm_attrs};
use super::project::{Project, ProjectResolver};
use super::span::{Span, SpanEvent, TraceId};
use crate::utils::string::{trunc_low_cardinality, trunc_small};

pub struct SpanProcessor {
    projects: Arc<dyn ProjectResolver>,
    cache: HashMap<u32, Arc<Project>>,
    fingerprint: Fingerprint,
}

impl SpanProcessor {
    pub fn new(projects: Arc<dyn ProjectResolver>) -> Self {
        Self {
            projects,
            cache: HashMap::new(),
            fingerprint: Fingerprint::new(),
        }
    }

    /// Process a host span and its events.
    ///
    /// Returns the host followed by one record per attached event.
    pub fn process(&mut self, mut span: Span) -> Vec<Span> {
        let events = std::mem::take(&mut span.events);
        self.init_span_or_event(&mut span);

        let mut records = Vec::with_capacity(1 + events.len());
        for event in events {
            let mut record = init_event_from_host_span(event, &span);
            self.init_span_or_event(&mut record);
            records.push(record);
        }
        records.insert(0, span);
        records
    }

    /// Normalize and classify a single span or event record in place.
    ///
    /// Returns `false` when the project cannot be resolved; the record is then
    /// left unclassified.
    pub fn init_span_or_event(&mut self, span: &mut Span) -> bool {
        let Some(project) = self.project(span.project_id) else {
            return false;
        };

        self.process_attrs(span);

        if span.is_event() {
            assign_event_system_and_group_id(&mut self.fingerprint, &project, span);
            trunc_low_cardinality(&mut span.event_name);
        } else {
            assign_span_system_and_group_id(&mut self.fingerprint, &project, span);
            trunc_low_cardinality(&mut span.name);
        }

        finish_display_name(span);
        true
    }

    fn project(&mut self, project_id: u32) -> Option<Arc<Project>> {
        if let Some(project) = self.cache.get(&project_id) {
            return Some(project.clone());
        }
        match self.projects.resolve(project_id) {
            Ok(project) => {
                self.cache.insert(project_id, project.clone());
                Some(project)
            }
            Err(e) => {
                tracing::debug!(project_id, error = %e, "Skipping record, project lookup failed");
                None
            }
        }
    }

    fn process_attrs(&mut self, span: &mut Span) {
        norm_attrs(&mut span.attrs);

        if let Some(msg) = span
            .attrs
            .str(keys::LOG_MESSAGE)
            .filter(|msg| !msg.is_empty())
            .map(str::to_string)
        {
            parse_log_message(&mut self.fingerprint, span, &msg);
        }
        if let Some(ua) = span
            .attrs
            .str(keys::HTTP_USER_AGENT)
            .filter(|ua| !ua.is_empty())
            .map(str::to_string)
        {
            init_http_user_agent(&mut span.attrs, &ua);
        }

        if span.trace_id.is_zero() {
            span.trace_id = TraceId::random();
            span.id = 0;
            span.parent_id = 0;
            span.standalone = true;
        }
        if !span.standalone && span.id == 0 {
            span.id = rand::random();
        }
        if span.time.is_none() {
            span.time = Some(Utc::now());
        }

        if span.event_name == keys::EVENT_LOG {
            span.attrs
                .insert_if_absent(keys::LOG_SEVERITY, INFO_SEVERITY.into());
        }
    }
}

/// Build an event record from an event attached to an already processed host span.
pub fn init_event_from_host_span(event: SpanEvent, host: &Span) -> Span {
    let mut record = Span {
        event_name: event.name,
        time: event.time,
        attrs: event.attrs,

        project_id: host.project_id,
        trace_id: host.trace_id,
        id: rand::random(),
        parent_id: host.id,

        name: host.name.clone(),
        kind: host.kind,
        status_code: host.status_code,
        ..Default::default()
    };
    for (key, value) in host.attrs.iter() {
        record.attrs.insert_if_absent(key, value.clone());
    }
    record
}

/// `display.name` attribute, else the classifier's name, else the record name.
/// Never leaves the display name empty.
fn finish_display_name(span: &mut Span) {
    if let Some(name) = span
        .attrs
        .str(keys::DISPLAY_NAME)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
    {
        span.display_name = name;
        span.attrs.remove(keys::DISPLAY_NAME);
    }

    if span.display_name.is_empty() {
        span.display_name = span.event_or_span_name().to_string();
    }
    if span.display_name.is_empty()
        && let Some(span_type) = span.span_type
    {
        span.display_name = span_type.to_string();
    }

    trunc_small(&mut span.display_name);
    trunc_small(&mut span.system);
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
