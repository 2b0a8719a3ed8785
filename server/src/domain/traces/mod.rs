//! Span normalization and grouping engine
//!
//! - `attrs` - Dynamically typed attribute container
//! - `keys` - Canonical attribute keys and event names
//! - `normalize` - Alias resolution, flattening, user agents
//! - `logparser` / `message` - Free-text and JSON log message parsing
//! - `sql` - SQL keyword skeletons for statement grouping
//! - `fingerprint` - Group id digest
//! - `classify` - Ordered span and event classification rules
//! - `processor` - Per-worker record processing
//! - `pipeline` - Batch fan-out over workers

pub mod attrs;
pub mod classify;
pub mod fingerprint;
pub mod keys;
pub mod logparser;
pub mod message;
pub mod normalize;
pub mod pipeline;
pub mod processor;
pub mod project;
pub mod span;
pub mod sql;

pub use attrs::{AttrMap, AttrValue};
pub use pipeline::TracePipeline;
pub use processor::SpanProcessor;
pub use project::{Project, ProjectError, ProjectResolver, StaticProjects};
pub use span::{Span, SpanEvent, SpanKind, SpanLink, SpanType, StatusCode, TraceId};
