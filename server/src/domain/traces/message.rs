//! Log and exception message parsing
//!
//! A log message is either a JSON object or free text. JSON payloads are
//! unpacked into params and their embedded message is parsed as text. Free
//! text is tokenized: template words feed the message hash, `key=value`
//! params are collected. Params then backfill span fields that are still unset
//! and the rest is merged into the span attributes.
//!
//! Every extraction is best-effort: a malformed value is skipped and leaves the
//! span untouched.

use thiserror::Error;

use super::attrs::{AttrMap, AttrValue};
use super::fingerprint::Fingerprint;
use super::keys;
use super::logparser::{TokenKind, Tokenizer, decode_logfmt, is_json};
use super::normalize::{flatten_attr_values, norm_params};
use super::span::{Span, TraceId};
use crate::utils::time::{parse_time, unix_to_datetime};

const MESSAGE_PARAMS: &[&str] = &["log", "message", "msg"];
const TIME_PARAMS: &[&str] = &["timestamp", "datetime", "time"];
const TRACE_ID_PARAMS: &[&str] = &["trace_id", "traceid"];
const SPAN_ID_PARAMS: &[&str] = &["span_id", "spanid"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpanIdError {
    #[error("invalid span id: {0:?}")]
    Invalid(String),
}

/// Parse a log message found on `span` and merge what it carries into the span.
pub fn parse_log_message(fp: &mut Fingerprint, span: &mut Span, msg: &str) {
    match is_json(msg) {
        Some(params) => parse_json_log_message(fp, span, params.into_iter().collect()),
        None => parse_text_log_message(fp, span, msg),
    }
}

fn parse_json_log_message(fp: &mut Fingerprint, span: &mut Span, mut params: AttrMap) {
    let msg = pop_log_message_param(&mut params);
    populate_span_from_params(span, params);

    if let Some(msg) = msg {
        span.attrs.insert(keys::LOG_MESSAGE, msg.as_str());
        parse_text_log_message(fp, span, &msg);
    }
}

fn parse_text_log_message(fp: &mut Fingerprint, span: &mut Span, msg: &str) {
    let (hash, params) = message_hash_and_params(fp, msg);
    if span.event_name == keys::EVENT_LOG {
        span.log_message_hash = hash;
    }
    populate_span_from_params(span, params);
}

/// First non-empty message param, removed from `params`.
fn pop_log_message_param(params: &mut AttrMap) -> Option<String> {
    let key = MESSAGE_PARAMS
        .iter()
        .copied()
        .find(|key| params.str(key).is_some_and(|v| !v.is_empty()))?;
    match params.remove(key) {
        Some(AttrValue::Str(msg)) => Some(msg),
        _ => None,
    }
}

/// Hash the template words of `msg` and collect its logfmt params.
///
/// The digest is reset first, so the returned hash covers this message only.
pub fn message_hash_and_params(fp: &mut Fingerprint, msg: &str) -> (u64, AttrMap) {
    let mut params = AttrMap::new();
    let hash = fp.compute(|d| {
        for token in Tokenizer::new(msg) {
            match token.kind {
                TokenKind::Invalid => break,
                TokenKind::Word => d.write_str(token.text),
                TokenKind::Param => {
                    if let Some((key, value)) = decode_logfmt(token.text) {
                        params.insert(key, value);
                    }
                }
            }
        }
    });
    (hash, params)
}

/// Backfill unset span fields from `params` and merge the remainder into the
/// span attributes without overwriting anything.
pub fn populate_span_from_params(span: &mut Span, mut params: AttrMap) {
    flatten_attr_values(&mut params);
    norm_params(&mut span.attrs, &mut params);

    if span.time.is_none()
        && let Some((key, time)) = TIME_PARAMS
            .iter()
            .find_map(|&key| param_time(&params, key).map(|t| (key, t)))
    {
        span.time = Some(time);
        params.remove(key);
    }

    if span.trace_id.is_zero()
        && let Some((key, trace_id)) = TRACE_ID_PARAMS.iter().find_map(|&key| {
            let value = params.str(key)?;
            TraceId::parse(value)
                .ok()
                .filter(|id| !id.is_zero())
                .map(|id| (key, id))
        })
    {
        span.trace_id = trace_id;
        params.remove(key);
    }

    if span.parent_id == 0
        && let Some((key, span_id)) = SPAN_ID_PARAMS.iter().find_map(|&key| {
            let value = params.str(key)?;
            parse_span_id(value)
                .ok()
                .filter(|&id| id != 0)
                .map(|id| (key, id))
        })
    {
        span.parent_id = span_id;
        params.remove(key);
    }

    for (key, value) in params {
        span.attrs.set_clashing_keys(&key, value);
    }
}

fn param_time(params: &AttrMap, key: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    match params.get(key)? {
        AttrValue::Str(s) => parse_time(s),
        AttrValue::Int(n) => unix_to_datetime(*n),
        _ => None,
    }
}

/// Parse a span id given as 16 hex characters (big-endian) or as a decimal integer.
pub fn parse_span_id(s: &str) -> Result<u64, SpanIdError> {
    if s.len() == 16
        && let Ok(bytes) = hex::decode(s)
        && let Ok(bytes) = <[u8; 8]>::try_from(bytes.as_slice())
    {
        return Ok(u64::from_be_bytes(bytes));
    }
    s.parse::<u64>()
        .map_err(|_| SpanIdError::Invalid(s.to_string()))
}
