use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tsd1_contracts::{DEFAULT_WORKERS_TYPES_VERSION, WORKERS_TYPES_PACKAGE};

use crate::diagnostics::{Diagnostic, DiagnosticCode};

/// Plugin options, parsed once from the raw payload sqlc hands over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Version segment of the `@cloudflare/workers-types` import path. Empty means no segment.
    pub workers_types: String,
    /// Targets workers-types v3: no import line, and `results` may be undefined.
    pub workers_types_v3: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            workers_types: DEFAULT_WORKERS_TYPES_VERSION.to_string(),
            workers_types_v3: false,
        }
    }
}

impl Options {
    /// Accepts an empty payload, a JSON object of strings, or a quoted `k=v,k=v` string.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let pairs = parse_pairs(raw)?;
        let mut options = Options::default();
        for (key, value) in pairs {
            match key.as_str() {
                "workers-types" => options.workers_types = value,
                "workers-types-v3" => options.workers_types_v3 = value == "1",
                _ => log::warn!("ignoring unknown plugin option {key:?}"),
            }
        }
        Ok(options)
    }

    pub fn workers_types_package(&self) -> String {
        if self.workers_types.is_empty() {
            WORKERS_TYPES_PACKAGE.to_string()
        } else {
            format!("{WORKERS_TYPES_PACKAGE}/{}", self.workers_types)
        }
    }
}

fn parse_pairs(raw: &[u8]) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    if raw.is_empty() {
        return Ok(out);
    }

    if raw.starts_with(b"{") {
        let obj: BTreeMap<String, serde_json::Value> = serde_json::from_slice(raw).map_err(|e| {
            Diagnostic::error(
                DiagnosticCode::TSD0100OptionsMalformed,
                format!("options JSON: {e}"),
            )
        })?;
        for (key, value) in obj {
            match value {
                serde_json::Value::String(s) => {
                    out.insert(key, s);
                }
                other => {
                    return Err(Diagnostic::error(
                        DiagnosticCode::TSD0101OptionValueNotString,
                        format!("option {key:?} must be a string, got {other}"),
                    )
                    .into())
                }
            }
        }
        return Ok(out);
    }

    let text = std::str::from_utf8(raw).map_err(|e| {
        Diagnostic::error(
            DiagnosticCode::TSD0100OptionsMalformed,
            format!("options are not UTF-8: {e}"),
        )
    })?;
    let body = unquote(text).ok_or_else(|| {
        Diagnostic::error(
            DiagnosticCode::TSD0100OptionsMalformed,
            format!("options must be a quoted string or a JSON object, got {text:?}"),
        )
    })?;
    for kv in body.split(',') {
        if kv.is_empty() {
            continue;
        }
        let (k, v) = kv.split_once('=').unwrap_or((kv, ""));
        out.insert(k.to_string(), v.to_string());
    }
    Ok(out)
}

/// Interprets a double-quoted (with escapes) or back-quoted (raw) string literal.
fn unquote(s: &str) -> Option<String> {
    if s.len() >= 2 && s.starts_with('`') && s.ends_with('`') {
        let inner = &s[1..s.len() - 1];
        if inner.contains('`') {
            return None;
        }
        return Some(inner.replace('\r', ""));
    }
    if s.len() < 2 || !s.starts_with('"') || !s.ends_with('"') {
        return None;
    }

    let inner = &s[1..s.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' | '\n' => return None,
            '\\' => {
                let esc = chars.next()?;
                match esc {
                    '\\' => out.push('\\'),
                    '"' => out.push('"'),
                    '\'' => out.push('\''),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'a' => out.push('\u{07}'),
                    'b' => out.push('\u{08}'),
                    'f' => out.push('\u{0c}'),
                    'v' => out.push('\u{0b}'),
                    'x' => out.push(hex_char(&mut chars, 2)?),
                    'u' => out.push(hex_char(&mut chars, 4)?),
                    'U' => out.push(hex_char(&mut chars, 8)?),
                    _ => return None,
                }
            }
            _ => out.push(c),
        }
    }
    Some(out)
}

fn hex_char(chars: &mut std::str::Chars<'_>, digits: usize) -> Option<char> {
    let mut n: u32 = 0;
    for _ in 0..digits {
        n = n * 16 + chars.next()?.to_digit(16)?;
    }
    char::from_u32(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::find_diagnostic;

    #[test]
    fn empty_payload_gives_defaults() {
        let o = Options::parse(b"").unwrap();
        assert_eq!(o, Options::default());
        assert_eq!(
            o.workers_types_package(),
            "@cloudflare/workers-types/2022-11-30"
        );
    }

    #[test]
    fn quoted_pairs() {
        let o = Options::parse(br#""workers-types=2023-07-01,workers-types-v3=1""#).unwrap();
        assert_eq!(o.workers_types, "2023-07-01");
        assert!(o.workers_types_v3);
    }

    #[test]
    fn json_object() {
        let o = Options::parse(br#"{"workers-types":"","workers-types-v3":"0"}"#).unwrap();
        assert_eq!(o.workers_types, "");
        assert!(!o.workers_types_v3);
        assert_eq!(o.workers_types_package(), "@cloudflare/workers-types");
    }

    #[test]
    fn only_exact_one_enables_v3() {
        let o = Options::parse(br#"{"workers-types-v3":"true"}"#).unwrap();
        assert!(!o.workers_types_v3);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let o = Options::parse(br#""emit-foo=bar""#).unwrap();
        assert_eq!(o, Options::default());
    }

    #[test]
    fn unquoted_payload_is_rejected() {
        let err = Options::parse(b"workers-types=x").unwrap_err();
        let d = find_diagnostic(&err).expect("diagnostic");
        assert_eq!(d.code, DiagnosticCode::TSD0100OptionsMalformed);
    }

    #[test]
    fn non_string_json_value_is_rejected() {
        let err = Options::parse(br#"{"workers-types-v3":1}"#).unwrap_err();
        let d = find_diagnostic(&err).expect("diagnostic");
        assert_eq!(d.code, DiagnosticCode::TSD0101OptionValueNotString);
    }

    #[test]
    fn broken_json_is_rejected() {
        let err = Options::parse(b"{\"workers-types\":").unwrap_err();
        let d = find_diagnostic(&err).expect("diagnostic");
        assert_eq!(d.code, DiagnosticCode::TSD0100OptionsMalformed);
    }

    #[test]
    fn unquote_handles_escapes_and_raw_strings() {
        assert_eq!(unquote(r#""a\"b\\cA""#).as_deref(), Some("a\"b\\cA"));
        assert_eq!(unquote("`a\\nb`").as_deref(), Some("a\\nb"));
        assert_eq!(unquote(r#""dangling\""#), None);
        assert_eq!(unquote("\"a\"b\""), None);
    }
}
