//! Attribute normalization
//!
//! Three independent passes over an `AttrMap`:
//!
//! - alias resolution: legacy and vendor-specific keys are moved onto the
//!   canonical vocabulary in `keys`
//! - flattening: nested maps and JSON-encoded strings are hoisted into dotted keys
//! - user-agent expansion: `http.user_agent` is parsed into sub-attributes
//!
//! Every pass is idempotent, and none depends on the iteration order of keys.

use super::attrs::{AttrMap, AttrValue};
use super::keys;
use super::logparser::is_json;
use crate::utils::useragent;

/// Canonical key plus the keys it may arrive under, in lookup order.
struct AliasRule {
    canonical: &'static str,
    aliases: &'static [&'static str],
    normalize: fn(&str) -> Option<String>,
}

impl AliasRule {
    /// First alias carrying a usable string value.
    fn find(&self, source: &AttrMap) -> Option<(&'static str, String)> {
        self.aliases.iter().find_map(|&key| {
            let value = source.str(key).filter(|v| !v.is_empty())?;
            (self.normalize)(value).map(|v| (key, v))
        })
    }
}

fn verbatim(s: &str) -> Option<String> {
    Some(s.to_string())
}

fn severity(s: &str) -> Option<String> {
    log_severity(s).map(str::to_string)
}

const ALIAS_RULES: &[AliasRule] = &[
    AliasRule {
        canonical: keys::SERVICE_NAME,
        aliases: &[keys::SERVICE_NAME, "service_name", "service"],
        normalize: verbatim,
    },
    AliasRule {
        canonical: keys::HTTP_ROUTE,
        aliases: &[keys::HTTP_ROUTE, "http_route"],
        normalize: verbatim,
    },
    AliasRule {
        canonical: keys::DB_SYSTEM,
        aliases: &[keys::DB_SYSTEM, "db_system", "db.type"],
        normalize: verbatim,
    },
    AliasRule {
        canonical: keys::DB_NAME,
        aliases: &[keys::DB_NAME, "db_name", "dbname"],
        normalize: verbatim,
    },
    AliasRule {
        canonical: keys::DB_STATEMENT,
        aliases: &[keys::DB_STATEMENT, "db_statement", "statement"],
        normalize: verbatim,
    },
    AliasRule {
        canonical: keys::LOG_SEVERITY,
        aliases: &[
            keys::LOG_SEVERITY,
            "log_severity",
            "severity",
            "error_severity",
            "log.level",
            "level",
        ],
        normalize: severity,
    },
];

/// Resolve aliases within a single map.
pub fn norm_attrs(attrs: &mut AttrMap) {
    for rule in ALIAS_RULES {
        if attrs.has(rule.canonical) {
            continue;
        }
        if let Some((key, value)) = rule.find(attrs) {
            attrs.remove(key);
            attrs.insert(rule.canonical, value);
        }
    }
}

/// Resolve aliases found in `params` onto `attrs`, consuming the matched params.
pub fn norm_params(attrs: &mut AttrMap, params: &mut AttrMap) {
    for rule in ALIAS_RULES {
        if attrs.has(rule.canonical) {
            continue;
        }
        if let Some((key, value)) = rule.find(params) {
            params.remove(key);
            attrs.insert(rule.canonical, value);
        }
    }
}

/// Replace nested values with dotted keys. Null values are removed.
///
/// Log and exception messages are kept verbatim even when they look like JSON.
pub fn flatten_attr_values(attrs: &mut AttrMap) {
    for key in attrs.key_list() {
        if keys::VERBATIM_KEYS.contains(&key.as_str()) {
            continue;
        }

        let nested = match attrs.get(&key) {
            Some(AttrValue::Null) => {
                attrs.remove(&key);
                continue;
            }
            Some(AttrValue::Map(_)) => match attrs.remove(&key) {
                Some(AttrValue::Map(map)) => map,
                _ => continue,
            },
            Some(AttrValue::Str(s)) => match is_json(s) {
                Some(map) => {
                    attrs.remove(&key);
                    map
                }
                None => continue,
            },
            _ => continue,
        };
        attrs.flatten(nested, &format!("{key}."));
    }
}

/// Severity assumed for log records that carry none
pub const INFO_SEVERITY: &str = "INFO";

/// Normalize a free-text severity onto the fixed level set.
///
/// Unrecognized severities return `None` and are dropped by callers.
pub fn log_severity(s: &str) -> Option<&'static str> {
    const NUMBERED: &[&str] = &[
        "TRACE2", "TRACE3", "TRACE4", "DEBUG2", "DEBUG3", "DEBUG4", "INFO2", "INFO3", "INFO4",
        "WARN2", "WARN3", "WARN4", "ERROR2", "ERROR3", "ERROR4", "FATAL2", "FATAL3", "FATAL4",
    ];
    if let Some(level) = NUMBERED.iter().copied().find(|level| *level == s) {
        return Some(level);
    }

    let level = match s.trim().to_ascii_lowercase().as_str() {
        "trace" => "TRACE",
        "debug" => "DEBUG",
        "info" | "information" | "informational" | "notice" | "log" => INFO_SEVERITY,
        "warn" | "warning" => "WARN",
        "error" | "err" | "alert" | "severe" => "ERROR",
        "fatal" | "crit" | "critical" | "emerg" | "emergency" | "panic" => "FATAL",
        _ => return None,
    };
    Some(level)
}

/// Expand `http.user_agent` into name, version, OS, device and bot attributes.
/// Fields that cannot be recognized are not written.
pub fn init_http_user_agent(attrs: &mut AttrMap, ua: &str) {
    let agent = useragent::parse(ua);

    let fields = [
        (keys::HTTP_USER_AGENT_NAME, agent.name),
        (keys::HTTP_USER_AGENT_VERSION, agent.version),
        (keys::HTTP_USER_AGENT_OS, agent.os),
        (keys::HTTP_USER_AGENT_OS_VERSION, agent.os_version),
        (keys::HTTP_USER_AGENT_DEVICE, agent.device),
    ];
    for (key, value) in fields {
        if !value.is_empty() {
            attrs.insert(key, value);
        }
    }

    if agent.bot {
        attrs.insert(keys::HTTP_USER_AGENT_BOT, 1i64);
    }
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
