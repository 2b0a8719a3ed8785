//! Span, span-event and span-link records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use super::attrs::AttrMap;

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// 128-bit trace identifier. Zero means unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TraceId(u128);

impl TraceId {
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    pub fn random() -> Self {
        Self(Uuid::new_v4().as_u128())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn as_u128(&self) -> u128 {
        self.0
    }

    /// Parse 32 hex digits or a hyphenated UUID.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s.trim()).map(|id| Self(id.as_u128()))
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl Serialize for TraceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TraceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Ok(Self::default());
        }
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// ENUMERATIONS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    #[default]
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

impl SpanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Internal => "internal",
            SpanKind::Server => "server",
            SpanKind::Client => "client",
            SpanKind::Producer => "producer",
            SpanKind::Consumer => "consumer",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusCode {
    #[default]
    Unset,
    Ok,
    Error,
}

/// Coarse category assigned by the classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanType {
    Rpc,
    Messaging,
    Db,
    Http,
    Funcs,
    Log,
    Message,
    Other,
}

impl SpanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanType::Rpc => "rpc",
            SpanType::Messaging => "messaging",
            SpanType::Db => "db",
            SpanType::Http => "http",
            SpanType::Funcs => "funcs",
            SpanType::Log => "log",
            SpanType::Message => "message",
            SpanType::Other => "other",
        }
    }

    /// `<type>:<subsystem>` composite.
    pub fn system(&self, subsystem: &str) -> String {
        format!("{}:{}", self.as_str(), subsystem)
    }
}

impl fmt::Display for SpanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// A span or a span-event flattened into span shape.
///
/// `event_name` is empty for true spans. The derived fields (`span_type`,
/// `system`, `group_id`, `display_name`) are written only by the processor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Span {
    pub project_id: u32,
    pub trace_id: TraceId,
    pub id: u64,
    pub parent_id: u64,

    pub name: String,
    pub event_name: String,
    pub kind: SpanKind,
    pub time: Option<DateTime<Utc>>,
    pub status_code: StatusCode,

    #[serde(rename = "type")]
    pub span_type: Option<SpanType>,
    pub system: String,
    pub group_id: u64,
    pub display_name: String,

    pub standalone: bool,
    #[serde(skip)]
    pub(crate) log_message_hash: u64,

    pub attrs: AttrMap,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SpanEvent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<SpanLink>,
}

impl Span {
    pub fn is_event(&self) -> bool {
        !self.event_name.is_empty()
    }

    pub fn event_or_span_name(&self) -> &str {
        if self.event_name.is_empty() {
            &self.name
        } else {
            &self.event_name
        }
    }
}

/// Point-in-time annotation as it arrives attached to a span.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEvent {
    pub name: String,
    pub time: Option<DateTime<Utc>>,
    pub attrs: AttrMap,
}

/// Cross-reference to another span. Carried through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanLink {
    pub trace_id: TraceId,
    pub span_id: u64,
    pub attrs: AttrMap,
}
