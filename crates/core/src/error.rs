use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a diagnostic abandons the current file or only the merge it
/// was raised in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Abort this file; the batch continues with the next one.
    Fatal,
    /// Logged, the offending merge is skipped, compilation continues.
    Soft,
}

/// Compiler error codes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    StringExpected,
    FewerParametersExpected,
    VariableExpected,
    VariableValueExpected,
    VariableNameExpected,
    UndefinedVariable,
    RecursiveVariable,
    ImportTargetExpected,
    ImportSourceExpected,
    ImportNotFound,
    ImportCycle,
    ObjectIdentifierExpected,
    ObjectNameExpected,
    ObjectBaseNotFound,
    DuplicateOverride,
    UnexpectedToken,
    UnterminatedQuote,
    FileNotFound,
}

impl ErrorKind {
    pub fn severity(self) -> Severity {
        match self {
            ErrorKind::ObjectBaseNotFound | ErrorKind::DuplicateOverride => Severity::Soft,
            _ => Severity::Fatal,
        }
    }

    fn message(self) -> &'static str {
        match self {
            ErrorKind::StringExpected => "expected a string",
            ErrorKind::FewerParametersExpected => "expected fewer parameters",
            ErrorKind::VariableExpected => "expected a variable",
            ErrorKind::VariableValueExpected => "expected variable value",
            ErrorKind::VariableNameExpected => "expected variable name",
            ErrorKind::UndefinedVariable => "undefined variable",
            ErrorKind::RecursiveVariable => "recursive variable expansion",
            ErrorKind::ImportTargetExpected => "expected import target",
            ErrorKind::ImportSourceExpected => "expected import source",
            ErrorKind::ImportNotFound => "cannot load import source",
            ErrorKind::ImportCycle => "import cycle detected",
            ErrorKind::ObjectIdentifierExpected => "expected object identifier",
            ErrorKind::ObjectNameExpected => "expected object name",
            ErrorKind::ObjectBaseNotFound => "could not find base object",
            ErrorKind::DuplicateOverride => "duplicate override",
            ErrorKind::UnexpectedToken => "unexpected token",
            ErrorKind::UnterminatedQuote => "no matching '\"' found",
            ErrorKind::FileNotFound => "cannot read source file",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A compiler diagnostic: `(kind, offending token, file, line, detail)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, thiserror::Error)]
#[error("{kind} for '{token}' in {file}:{line}{}", detail_suffix(.detail))]
pub struct CompileError {
    pub kind: ErrorKind,
    pub token: String,
    pub file: String,
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(": {}", d),
        None => String::new(),
    }
}

impl CompileError {
    pub fn new(kind: ErrorKind, token: impl Into<String>, file: &str, line: u32) -> Self {
        CompileError {
            kind,
            token: token.into(),
            file: file.to_owned(),
            line,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// Serialize to JSON. Always includes every field (null for a missing
    /// detail) so machine consumers see a fixed shape.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "detail":   self.detail,
            "file":     self.file,
            "kind":     self.kind,
            "line":     self.line,
            "message":  self.to_string(),
            "severity": self.severity(),
            "token":    self.token,
        })
    }
}
