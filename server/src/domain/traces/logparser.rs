//! Free-text log tokenizer.
//!
//! Splits a log line into the parts that identify its template (`Word`) and the
//! embedded `key=value` pairs (`Param`). Variable data such as numbers, ids,
//! quoted literals, paths and addresses is skipped so that two lines produced
//! by the same logging statement yield the same word sequence.
//!
//! ```text
//! user=alice msg="login failed" failed to open /var/db/12.sock after 3 retries
//! ^^^^^^^^^^ ^^^^^^^^^^^^^^^^^^ ^^^^^^ ^^ ^^^^                ^^^^^   ^^^^^^^
//!   Param          Param         Word  Word Word              Word     Word
//! ```

use std::collections::BTreeMap;

use super::attrs::AttrValue;

/// Pure hex runs at least this long are treated as identifiers, not words.
const MIN_HEX_ID_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Param,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, text: &'a str) -> Self {
        Self { kind, text }
    }
}

/// Lazy tokenizer over a single message. Ends at end of input or right after
/// yielding the first `Invalid` token.
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    done: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            done: false,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn invalid(&mut self, start: usize) -> Option<Token<'a>> {
        self.done = true;
        Some(Token::new(TokenKind::Invalid, &self.input[start..]))
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.done {
            return None;
        }

        loop {
            self.skip_whitespace();
            let Some(first) = self.peek() else {
                self.done = true;
                return None;
            };

            let start = self.pos;

            // Standalone quoted literal: variable data.
            if is_quote(first) {
                match closing_quote(self.input, start) {
                    Some(end) => {
                        self.pos = end;
                        continue;
                    }
                    None => return self.invalid(start),
                }
            }

            while let Some(c) = self.peek() {
                if c.is_whitespace() {
                    break;
                }
                if c == '=' && self.pos > start && self.input[self.pos + 1..].starts_with('"') {
                    match closing_quote(self.input, self.pos + 1) {
                        Some(end) => {
                            self.pos = end;
                            break;
                        }
                        None => return self.invalid(start),
                    }
                }
                self.pos += c.len_utf8();
            }

            let chunk = &self.input[start..self.pos];
            if is_param(chunk) {
                return Some(Token::new(TokenKind::Param, chunk));
            }
            if let Some(word) = clean_word(chunk) {
                return Some(Token::new(TokenKind::Word, word));
            }
        }
    }
}

fn is_quote(c: char) -> bool {
    matches!(c, '"' | '\'' | '`')
}

/// Byte offset just past the quote closing the one at `open`.
fn closing_quote(input: &str, open: usize) -> Option<usize> {
    let quote = input[open..].chars().next()?;
    let mut escaped = false;
    for (i, c) in input[open + quote.len_utf8()..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Some(open + quote.len_utf8() + i + c.len_utf8());
        }
    }
    None
}

fn is_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn is_param(chunk: &str) -> bool {
    chunk
        .split_once('=')
        .is_some_and(|(key, _)| is_key(key))
}

fn clean_word(chunk: &str) -> Option<&str> {
    let word = chunk.trim_matches(|c: char| !c.is_alphanumeric() && c != '_');
    if word.is_empty() {
        return None;
    }
    if word.chars().any(|c| c.is_numeric()) {
        return None;
    }
    if !word
        .chars()
        .all(|c| c.is_alphabetic() || matches!(c, '_' | '-' | '.' | '\''))
    {
        return None;
    }
    if word.len() >= MIN_HEX_ID_LEN && word.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(word)
}

/// Decode a `key=value` or `key="quoted value"` param token.
pub fn decode_logfmt(text: &str) -> Option<(String, String)> {
    let (key, value) = text.split_once('=')?;
    if !is_key(key) {
        return None;
    }
    let value = match value.strip_prefix('"') {
        Some(quoted) => unquote(quoted.strip_suffix('"')?)?,
        None => value.to_string(),
    };
    Some((key.to_string(), value))
}

fn unquote(s: &str) -> Option<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            _ => return None,
        }
    }
    Some(out)
}

/// Parse `s` as a JSON object. Anything else (arrays, scalars, invalid JSON) is `None`.
pub fn is_json(s: &str) -> Option<BTreeMap<String, AttrValue>> {
    let trimmed = s.trim();
    if !trimmed.starts_with('{') || !trimmed.ends_with('}') {
        return None;
    }
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(trimmed).ok()?;
    Some(
        map.into_iter()
            .map(|(k, v)| (k, AttrValue::from(v)))
            .collect(),
    )
}
