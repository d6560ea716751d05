use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Decode,
    Options,
    Rewrite,
    Resolve,
    Emit,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticCode {
    TSD0001RequestDecode,
    TSD0002UnknownCommand,
    TSD0100OptionsMalformed,
    TSD0101OptionValueNotString,
    TSD0200EmbedTableMissing,
    TSD0201EmbedColumnsNotFound,
    TSD0901InternalBug,
}

impl DiagnosticCode {
    pub fn code_str(self) -> &'static str {
        match self {
            DiagnosticCode::TSD0001RequestDecode => "TSD0001",
            DiagnosticCode::TSD0002UnknownCommand => "TSD0002",
            DiagnosticCode::TSD0100OptionsMalformed => "TSD0100",
            DiagnosticCode::TSD0101OptionValueNotString => "TSD0101",
            DiagnosticCode::TSD0200EmbedTableMissing => "TSD0200",
            DiagnosticCode::TSD0201EmbedColumnsNotFound => "TSD0201",
            DiagnosticCode::TSD0901InternalBug => "TSD0901",
        }
    }

    pub fn phase(self) -> Phase {
        match self {
            DiagnosticCode::TSD0001RequestDecode | DiagnosticCode::TSD0002UnknownCommand => {
                Phase::Decode
            }
            DiagnosticCode::TSD0100OptionsMalformed
            | DiagnosticCode::TSD0101OptionValueNotString => Phase::Options,
            DiagnosticCode::TSD0200EmbedTableMissing => Phase::Resolve,
            DiagnosticCode::TSD0201EmbedColumnsNotFound => Phase::Rewrite,
            DiagnosticCode::TSD0901InternalBug => Phase::Internal,
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            DiagnosticCode::TSD0001RequestDecode => "failed to decode the code generation request",
            DiagnosticCode::TSD0002UnknownCommand => "unknown query command",
            DiagnosticCode::TSD0100OptionsMalformed => "plugin options are malformed",
            DiagnosticCode::TSD0101OptionValueNotString => "plugin option value is not a string",
            DiagnosticCode::TSD0200EmbedTableMissing => "embedded table is not in the catalog",
            DiagnosticCode::TSD0201EmbedColumnsNotFound => {
                "embedded column list not found in query text"
            }
            DiagnosticCode::TSD0901InternalBug => "internal sqlc-gen-ts-d1 bug",
        }
    }

    pub fn default_help(self) -> Option<&'static str> {
        match self {
            DiagnosticCode::TSD0002UnknownCommand => {
                Some("Supported commands are :exec, :one and :many.")
            }
            DiagnosticCode::TSD0100OptionsMalformed => Some(
                "Pass options as a JSON object of strings or as a quoted \"key=value,key=value\" string.",
            ),
            DiagnosticCode::TSD0200EmbedTableMissing | DiagnosticCode::TSD0201EmbedColumnsNotFound => {
                Some("The query and the schema disagree; regenerate with the same sqlc version that parsed the schema.")
            }
            DiagnosticCode::TSD0901InternalBug => Some(
                "This is a bug in sqlc-gen-ts-d1. Please report it with the sqlc configuration and queries.",
            ),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub phase: Phase,
    pub severity: Severity,
    pub message: String,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            phase: code.phase(),
            severity: Severity::Error,
            message: message.into(),
            help: code.default_help().map(|s| s.to_string()),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?} {:?}: {}",
            self.code.code_str(),
            self.phase,
            self.severity,
            self.message
        )?;
        if let Some(help) = &self.help {
            write!(f, "\n  help: {help}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Finds the diagnostic carried by an error chain, if any.
pub fn find_diagnostic(err: &anyhow::Error) -> Option<&Diagnostic> {
    err.chain().find_map(|e| e.downcast_ref::<Diagnostic>())
}

pub fn render_diagnostics_md() -> String {
    let mut rows: Vec<(&'static str, Phase, &'static str, &'static str)> = all_codes()
        .iter()
        .map(|&code| {
            (
                code.code_str(),
                code.phase(),
                code.default_message(),
                code.default_help().unwrap_or(""),
            )
        })
        .collect();
    rows.sort_by(|a, b| a.0.cmp(b.0));

    let mut out = String::new();
    out.push_str("# sqlc-gen-ts-d1 diagnostics catalog\n\n");
    out.push_str("This document is generated from `crates/tsd1gen-core/src/diagnostics.rs`.\n\n");
    out.push_str("| Code | Phase | Message | Help |\n");
    out.push_str("| ---- | ----- | ------- | ---- |\n");
    for (code, phase, msg, help) in rows {
        out.push_str(&format!("| {code} | {phase:?} | {msg} | {help} |\n"));
    }
    out
}

fn all_codes() -> &'static [DiagnosticCode] {
    &[
        DiagnosticCode::TSD0001RequestDecode,
        DiagnosticCode::TSD0002UnknownCommand,
        DiagnosticCode::TSD0100OptionsMalformed,
        DiagnosticCode::TSD0101OptionValueNotString,
        DiagnosticCode::TSD0200EmbedTableMissing,
        DiagnosticCode::TSD0201EmbedColumnsNotFound,
        DiagnosticCode::TSD0901InternalBug,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_help() {
        let d = Diagnostic::error(DiagnosticCode::TSD0200EmbedTableMissing, "table \"users\"");
        let s = d.to_string();
        assert!(s.starts_with("TSD0200 Resolve Error: table \"users\""), "{s}");
        assert!(s.contains("\n  help: "), "{s}");
    }

    #[test]
    fn diagnostic_survives_anyhow_context() {
        let err = anyhow::Error::from(Diagnostic::error(
            DiagnosticCode::TSD0100OptionsMalformed,
            "bad",
        ))
        .context("parse options");
        let d = find_diagnostic(&err).expect("diagnostic in chain");
        assert_eq!(d.code, DiagnosticCode::TSD0100OptionsMalformed);
        assert_eq!(d.phase, Phase::Options);
    }

    #[test]
    fn catalog_lists_every_code_once() {
        let md = render_diagnostics_md();
        for code in all_codes() {
            assert_eq!(md.matches(&format!("| {} |", code.code_str())).count(), 1);
        }
    }
}
