//! Domain logic
//!
//! - `traces` - Span normalization, classification and grouping

pub mod traces;

pub use traces::TracePipeline;
