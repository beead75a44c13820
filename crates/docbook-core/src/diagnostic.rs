use serde::Serialize;

use crate::ast::NodePath;

pub const W_REF_UNRESOLVED: &str = "W_REF_UNRESOLVED";
pub const W_ANCHOR_DUP: &str = "W_ANCHOR_DUP";
pub const W_NODE_UNKNOWN: &str = "W_NODE_UNKNOWN";
pub const W_ADMONITION_UNKNOWN: &str = "W_ADMONITION_UNKNOWN";
pub const W_SECTION_DEPTH: &str = "W_SECTION_DEPTH";
pub const W_TABLE_RAGGED: &str = "W_TABLE_RAGGED";
pub const W_TABLE_EMPTY: &str = "W_TABLE_EMPTY";
pub const W_BLOCK_IN_INLINE: &str = "W_BLOCK_IN_INLINE";
pub const W_TITLE_EXTRA: &str = "W_TITLE_EXTRA";
pub const W_LIST_ITEM: &str = "W_LIST_ITEM";
pub const W_TEXT_CONTROL: &str = "W_TEXT_CONTROL";

pub const I_NODE_SKIPPED: &str = "I_NODE_SKIPPED";

/// A recoverable condition met while converting one document.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Diagnostic {
    pub path: NodePath,
    pub severity: DiagnosticSeverity,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<RelatedDiagnostic>,
}

impl Diagnostic {
    pub fn new(
        path: NodePath,
        severity: DiagnosticSeverity,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path,
            severity,
            code,
            message: message.into(),
            related: Vec::new(),
        }
    }

    pub fn warning(path: NodePath, code: &'static str, message: impl Into<String>) -> Self {
        Self::new(path, DiagnosticSeverity::Warning, code, message)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Warning,
    Info,
}

impl DiagnosticSeverity {
    pub fn label(self) -> &'static str {
        match self {
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Info => "info",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RelatedDiagnostic {
    pub path: NodePath,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RelatedDiagnostic {
    pub fn new(path: NodePath, message: Option<String>) -> Self {
        Self { path, message }
    }
}
