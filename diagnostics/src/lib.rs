//! Parses clang's stderr into structured, per-file diagnostic reports.
//!
//! Clang emits diagnostics as a location header followed by free-form body
//! lines (source excerpt, caret, fix-it notes). The parser walks the output
//! line by line, starts a new diagnostic at each header, and attaches
//! everything until the next header as the body. Nothing here ever fails:
//! output that matches no header at all still comes back as a single opaque
//! note, so callers always have something to show.

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Diagnostic severity, taken from the keyword in the header line. Anything
/// unrecognized is a [`Severity::Note`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Fatal,
    Error,
    Warning,
    Note,
}

impl Severity {
    /// Classifies a header message such as `fatal error: 'x.h' file not found`.
    fn classify(header: &str) -> Severity {
        if header.starts_with("fatal error:") {
            Severity::Fatal
        } else if header.starts_with("error:") {
            Severity::Error
        } else if header.starts_with("warning:") {
            Severity::Warning
        } else {
            Severity::Note
        }
    }

    /// True for severities that fail the compilation.
    pub fn is_error(self) -> bool {
        matches!(self, Severity::Fatal | Severity::Error)
    }

    pub fn is_note(self) -> bool {
        self == Severity::Note
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Severity::Fatal => "fatal error",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        };
        f.write_str(text)
    }
}

/// One diagnostic: the resolved location, the header message, and the body
/// lines that followed it, all preserved verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerError {
    pub file: PathBuf,
    /// 1-based; 0 means the diagnostic carries no location.
    pub line: u32,
    pub column: u32,
    /// The message after the location, e.g. `error: redefinition of 'func'`.
    pub header: String,
    /// The lines between this header and the next one, joined by newlines.
    pub body: String,
    pub severity: Severity,
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.file.display(),
            self.line,
            self.column,
            self.header
        )?;
        if !self.body.is_empty() {
            write!(f, "\n{}", self.body)?;
        }
        Ok(())
    }
}

/// All diagnostics reported against one file, in emission order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiagnostics {
    pub file: PathBuf,
    pub errors: Vec<CompilerError>,
}

impl FileDiagnostics {
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|e| e.severity.is_error())
    }

    /// A summary like `1 fatal error, 2 warnings`. Empty when only notes
    /// were reported.
    pub fn summary(&self) -> String {
        let count = |severity| {
            self.errors
                .iter()
                .filter(|e| e.severity == severity)
                .count()
        };
        let mut parts = Vec::new();
        for (severity, singular) in [
            (Severity::Fatal, "fatal error"),
            (Severity::Error, "error"),
            (Severity::Warning, "warning"),
        ] {
            let n = count(severity);
            if n == 1 {
                parts.push(format!("1 {singular}"));
            } else if n > 1 {
                parts.push(format!("{n} {singular}s"));
            }
        }
        parts.join(", ")
    }
}

impl fmt::Display for FileDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} has problems:", self.file.display())?;
        let summary = self.summary();
        if !summary.is_empty() {
            write!(f, "\nSummary: {summary}")?;
        }
        for error in &self.errors {
            write!(f, "\n{error}")?;
        }
        Ok(())
    }
}

/// A full parse of one compiler invocation: one group per distinct file, in
/// order of first appearance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub files: Vec<FileDiagnostics>,
}

impl Report {
    pub fn has_errors(&self) -> bool {
        self.files.iter().any(FileDiagnostics::has_errors)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for file in &self.files {
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "{file}")?;
        }
        Ok(())
    }
}

/// Parses raw clang stderr. `source_hint` replaces `<stdin>` locations, the
/// usual case when the program is piped into the compiler.
pub fn parse(raw: &str, source_hint: &Path) -> Report {
    let mut diagnostics: Vec<CompilerError> = Vec::new();
    let mut preamble: Vec<&str> = Vec::new();
    for line in raw.lines() {
        match parse_header(line, source_hint) {
            Some(mut diagnostic) => {
                if diagnostics.is_empty() && !preamble.is_empty() {
                    diagnostics.push(opaque_note(&preamble, source_hint));
                    preamble.clear();
                }
                diagnostic.severity = Severity::classify(&diagnostic.header);
                diagnostics.push(diagnostic);
            }
            None => match diagnostics.last_mut() {
                // Body lines extend the diagnostic they follow; trailing
                // summary lines join the last body.
                Some(current) => {
                    if !current.body.is_empty() {
                        current.body.push('\n');
                    }
                    current.body.push_str(line);
                }
                None => preamble.push(line),
            },
        }
    }
    if diagnostics.is_empty() && preamble.iter().any(|l| !l.trim().is_empty()) {
        diagnostics.push(opaque_note(&preamble, source_hint));
    }
    debug!(count = diagnostics.len(), "parsed compiler diagnostics");
    group_by_file(diagnostics)
}

/// Lines emitted before any header become one opaque note so they are never
/// silently dropped.
fn opaque_note(lines: &[&str], source_hint: &Path) -> CompilerError {
    CompilerError {
        file: source_hint.to_path_buf(),
        line: 0,
        column: 0,
        header: lines.first().map(|l| l.to_string()).unwrap_or_default(),
        body: lines.get(1..).unwrap_or(&[]).join("\n"),
        severity: Severity::Note,
    }
}

/// Matches `<file>:<line>:<column>: <message>` where the message itself
/// contains another colon, the shape of every clang location header.
fn parse_header(line: &str, source_hint: &Path) -> Option<CompilerError> {
    let mut parts = line.splitn(4, ':');
    let file = parts.next()?;
    let line_no: u32 = parts.next()?.parse().ok()?;
    let column: u32 = parts.next()?.parse().ok()?;
    let rest = parts.next()?;
    if !rest.contains(':') {
        return None;
    }
    let file = if file == "<stdin>" {
        source_hint.to_path_buf()
    } else {
        PathBuf::from(file)
    };
    Some(CompilerError {
        file,
        line: line_no,
        column,
        header: rest.trim().to_string(),
        body: String::new(),
        severity: Severity::Note,
    })
}

fn group_by_file(diagnostics: Vec<CompilerError>) -> Report {
    let mut files: Vec<FileDiagnostics> = Vec::new();
    for diagnostic in diagnostics {
        match files.iter_mut().find(|f| f.file == diagnostic.file) {
            Some(group) => group.errors.push(diagnostic),
            None => files.push(FileDiagnostics {
                file: diagnostic.file.clone(),
                errors: vec![diagnostic],
            }),
        }
    }
    Report { files }
}

/// Remediation hints for clang complaints with a known cause.
pub fn suggestions_for(error: &CompilerError) -> Vec<String> {
    let mut suggestions = Vec::new();
    if error
        .header
        .contains("'bits/libc-header-start.h' file not found")
    {
        suggestions.push("Try to install gcc-multilib".to_string());
    }
    if error.header.contains("'bpf_helpers.h' file not found") {
        suggestions.push(
            "Replace `#include \"bpf_helpers.h\"` with `#include <bpf/bpf_helpers.h>`".to_string(),
        );
    }
    suggestions
}
