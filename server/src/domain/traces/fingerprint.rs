//! Group fingerprinting.
//!
//! A `Fingerprint` is a resettable streaming digest owned by one processing
//! context. Each grouping computation resets it, writes an ordered byte stream
//! and reduces the digest to a 64-bit group id.
//!
//! The write order is part of the stored data format: changing it changes every
//! group id ever produced, so `hash_span` must keep writing the environment,
//! system, kind, name and then the selected attributes, in that order.

use xxhash_rust::xxh3::Xxh3;

use super::keys;
use super::logparser::{TokenKind, Tokenizer};
use super::project::Project;
use super::span::Span;
use super::sql::statement_keywords;

/// Reusable 64-bit digest. Not shared between concurrent callers.
#[derive(Default)]
pub struct Fingerprint {
    hasher: Xxh3,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.hasher.reset();
    }

    pub fn write_str(&mut self, s: &str) {
        self.hasher.update(s.as_bytes());
    }

    /// 64-bit digest of everything written since the last reset.
    pub fn sum64(&self) -> u64 {
        self.hasher.digest()
    }

    /// Reset, let `f` write, and reduce.
    pub fn compute(&mut self, f: impl FnOnce(&mut Self)) -> u64 {
        self.reset();
        f(self);
        self.sum64()
    }

    /// Base span fields followed by each present attribute in `keys` order.
    pub fn hash_span(&mut self, project: &Project, span: &Span, attr_keys: &[&str]) {
        if project.group_by_env
            && let Some(env) = span
                .attrs
                .str(keys::DEPLOYMENT_ENVIRONMENT)
                .filter(|env| !env.is_empty())
        {
            self.write_str(env);
        }
        self.write_str(&span.system);
        self.write_str(span.kind.as_str());
        self.write_str(span.event_or_span_name());

        for key in attr_keys {
            if let Some(value) = span.attrs.get(key) {
                self.write_str(key);
                self.write_str(&value.to_string());
            }
        }
    }

    /// Append the keyword skeleton of a SQL statement.
    pub fn hash_db_stmt(&mut self, stmt: &str) {
        for keyword in statement_keywords(stmt) {
            self.write_str(keyword);
        }
    }

    /// Append the template words of a free-text message. Params are ignored.
    pub fn hash_message(&mut self, msg: &str) {
        for token in Tokenizer::new(msg) {
            match token.kind {
                TokenKind::Invalid => break,
                TokenKind::Word => self.write_str(token.text),
                TokenKind::Param => {}
            }
        }
    }
}
