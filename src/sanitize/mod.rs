//! Input sanitization.
//!
//! Pure, recursive cleaning of request payloads: whitespace trimming,
//! length bounding, HTML entity encoding with an optional safe-tag
//! allowlist. Operates on `serde_json::Value` trees and never mutates
//! its input.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::config::SanitizeConfig;

/// Options controlling one sanitization pass.
#[derive(Debug, Clone)]
pub struct SanitizeOptions {
    pub allow_html: bool,
    pub strip_tags: bool,
    pub max_length: usize,
    pub trim_whitespace: bool,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            allow_html: false,
            strip_tags: false,
            max_length: 10_000,
            trim_whitespace: true,
        }
    }
}

impl From<&SanitizeConfig> for SanitizeOptions {
    fn from(config: &SanitizeConfig) -> Self {
        Self {
            allow_html: config.allow_html,
            strip_tags: config.strip_tags,
            max_length: config.max_length,
            trim_whitespace: config.trim_whitespace,
        }
    }
}

impl SanitizeOptions {
    /// Options applied to object keys: aggressive stripping, short cap.
    fn for_keys() -> Self {
        Self {
            allow_html: false,
            strip_tags: true,
            max_length: 100,
            trim_whitespace: true,
        }
    }
}

/// Tags preserved when `allow_html` is set.
const ALLOWED_TAGS: [&str; 15] = [
    "p", "br", "strong", "em", "u", "ol", "ul", "li", "h1", "h2", "h3", "h4", "h5", "h6", "a",
];

/// Attributes preserved on allowed tags.
const ALLOWED_ATTRIBUTES: [&str; 3] = ["href", "target", "rel"];

/// Sanitize an arbitrary JSON value, returning a new value.
///
/// Strings are cleaned per `opts`; arrays and objects recurse into every
/// element, with object keys sanitized under the key policy to prevent
/// key-based injection. Other primitives pass through unchanged.
pub fn sanitize_value(value: &Value, opts: &SanitizeOptions) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_str(s, opts)),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| sanitize_value(v, opts)).collect())
        }
        Value::Object(fields) => {
            let key_opts = SanitizeOptions::for_keys();
            let mut out = Map::with_capacity(fields.len());
            for (key, val) in fields {
                out.insert(sanitize_str(key, &key_opts), sanitize_value(val, opts));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Sanitize a JSON value while leaving excluded subtrees untouched.
///
/// `section` names the payload root ("body", "query"); `exclusions`
/// holds exact dotted paths. Excluded prose fields reach the downstream
/// handler byte-identical.
pub fn sanitize_value_excluding(
    section: &str,
    value: &Value,
    opts: &SanitizeOptions,
    exclusions: &HashSet<String>,
) -> Value {
    walk_excluding(value, section, opts, exclusions)
}

fn walk_excluding(
    value: &Value,
    path: &str,
    opts: &SanitizeOptions,
    exclusions: &HashSet<String>,
) -> Value {
    if exclusions.contains(path) {
        return value.clone();
    }
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| walk_excluding(v, &format!("{path}[{i}]"), opts, exclusions))
                .collect(),
        ),
        Value::Object(fields) => {
            let key_opts = SanitizeOptions::for_keys();
            let mut out = Map::with_capacity(fields.len());
            for (key, val) in fields {
                let child = format!("{path}.{key}");
                out.insert(
                    sanitize_str(key, &key_opts),
                    walk_excluding(val, &child, opts, exclusions),
                );
            }
            Value::Object(out)
        }
        leaf => sanitize_value(leaf, opts),
    }
}

/// Sanitize a single string.
pub fn sanitize_str(input: &str, opts: &SanitizeOptions) -> String {
    let mut s: &str = input;
    if opts.trim_whitespace {
        s = s.trim();
    }

    // Prefix cut on a character boundary.
    let bounded: String = if s.chars().count() > opts.max_length {
        s.chars().take(opts.max_length).collect()
    } else {
        s.to_string()
    };

    if opts.allow_html {
        return clean_allowed_html(&bounded);
    }

    let encoded = encode_entities(&bounded);
    if opts.strip_tags {
        strip_encoded_tags(&encoded)
    } else {
        encoded
    }
}

/// The entities this encoder produces; anything already spelled this way
/// is left alone so the pass is idempotent on its own output.
const KNOWN_ENTITIES: [&str; 5] = ["amp;", "lt;", "gt;", "quot;", "#x27;"];

/// Entity-encode `< > " ' &`, skipping ampersands that already start one
/// of the produced entities.
fn encode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(c) = rest.chars().next() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '&' => {
                let tail = &rest[1..];
                if KNOWN_ENTITIES.iter().any(|e| tail.starts_with(e)) {
                    out.push('&');
                } else {
                    out.push_str("&amp;");
                }
            }
            other => out.push(other),
        }
        rest = &rest[c.len_utf8()..];
    }
    out
}

static ENCODED_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&lt;.*?&gt;").expect("encoded tag pattern is valid")
});

/// Remove encoded tag-like substrings (`&lt;...&gt;`) left behind by
/// entity encoding.
fn strip_encoded_tags(input: &str) -> String {
    ENCODED_TAG.replace_all(input, "").into_owned()
}

static HTML_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<\s*(/?)\s*([a-zA-Z][a-zA-Z0-9]*)((?:\s[^<>]*)?)\s*(/?)>")
        .expect("html tag pattern is valid")
});

static HTML_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([a-zA-Z][a-zA-Z0-9-]*)\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#)
        .expect("html attribute pattern is valid")
});

/// Keep only allowlisted tags and attributes; everything else is
/// dropped, keeping inner text. Heuristic tag-level cleaning, not an
/// HTML parser.
fn clean_allowed_html(input: &str) -> String {
    HTML_TAG
        .replace_all(input, |caps: &Captures<'_>| {
            let closing = &caps[1];
            let name = caps[2].to_ascii_lowercase();
            if !ALLOWED_TAGS.contains(&name.as_str()) {
                return String::new();
            }
            if closing == "/" {
                return format!("</{name}>");
            }

            let mut kept = String::new();
            for attr in HTML_ATTRIBUTE.captures_iter(&caps[3]) {
                let attr_name = attr[1].to_ascii_lowercase();
                if attr_name.starts_with("data-") {
                    continue;
                }
                if ALLOWED_ATTRIBUTES.contains(&attr_name.as_str()) {
                    kept.push(' ');
                    kept.push_str(&attr_name);
                    kept.push('=');
                    kept.push_str(&attr[2]);
                }
            }
            let self_close = if &caps[4] == "/" { " /" } else { "" };
            format!("<{name}{kept}{self_close}>")
        })
        .into_owned()
}
