// Structured diagnostics for the Nemesis front-end
// The semantic analyzer publishes every finding through this crate; nothing
// in the core writes to stderr directly.

use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Source code location (file, line, column, highlighted length).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub length: usize,
}

impl Span {
    pub fn new(file: impl Into<String>, line: usize, column: usize, length: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            length,
        }
    }

    pub fn unknown() -> Self {
        Self {
            file: "<unknown>".to_string(),
            line: 0,
            column: 0,
            length: 0,
        }
    }

    /// Compute line/column from a byte range inside `source`.
    pub fn from_source(file: &str, source: &str, range: std::ops::Range<usize>) -> Self {
        let before = &source[..range.start.min(source.len())];
        let line = before.chars().filter(|&c| c == '\n').count() + 1;
        let column = before
            .rfind('\n')
            .map_or(before.len() + 1, |pos| before.len() - pos);
        let length = range.end.saturating_sub(range.start).max(1);

        Self {
            file: file.to_string(),
            line,
            column,
            length,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Diagnostic severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "{}", "error".red().bold()),
            Severity::Warning => write!(f, "{}", "warning".yellow().bold()),
        }
    }
}

/// A secondary span attached to a diagnostic, optionally labeled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub span: Span,
    pub label: Option<String>,
}

/// Code suggestion: insert `insertion` at `span` to fix the problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub message: String,
    pub insertion: String,
    pub span: Span,
}

/// Structured diagnostic message published by the analyzer.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    pub span: Span,
    /// Longer prose shown below the message (`= note:` in rendering).
    pub explanation: Option<String>,
    pub highlights: Vec<Highlight>,
    pub notes: Vec<(Span, String)>,
    pub help: Option<String>,
    pub suggestions: Vec<Suggestion>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: &str, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity,
            code: code.to_string(),
            message: message.into(),
            span,
            explanation: None,
            highlights: Vec::new(),
            notes: Vec::new(),
            help: None,
            suggestions: Vec::new(),
        }
    }

    pub fn error(code: &str, message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Error, code, message, span)
    }

    pub fn warning(code: &str, message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Warning, code, message, span)
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn with_highlight(mut self, span: Span, label: Option<String>) -> Self {
        self.highlights.push(Highlight { span, label });
        self
    }

    pub fn with_note(mut self, span: Span, note: impl Into<String>) -> Self {
        self.notes.push((span, note.into()));
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_suggestion(
        mut self,
        message: impl Into<String>,
        insertion: impl Into<String>,
        span: Span,
    ) -> Self {
        self.suggestions.push(Suggestion {
            message: message.into(),
            insertion: insertion.into(),
            span,
        });
        self
    }

    /// Render without source context: header, location, notes and help.
    fn format_simple(&self) -> String {
        let mut output = String::new();

        if self.code.is_empty() {
            output.push_str(&format!("{}: {}\n", self.severity, self.message.bold()));
        } else {
            output.push_str(&format!(
                "{}[{}]: {}\n",
                self.severity,
                self.code,
                self.message.bold()
            ));
        }

        output.push_str(&format!(
            " {} {}:{}:{}\n",
            "-->".cyan().bold(),
            self.span.file,
            self.span.line,
            self.span.column
        ));

        for (span, note) in &self.notes {
            output.push_str(&format!(
                " {} {} ({})\n",
                "=".cyan().bold(),
                note.cyan(),
                span
            ));
        }

        if let Some(explanation) = &self.explanation {
            output.push_str(&format!(" {} {}\n", "=".cyan().bold(), explanation));
        }

        if let Some(help) = &self.help {
            output.push_str(&format!(" {} {}\n", "help:".green().bold(), help));
        }

        for suggestion in &self.suggestions {
            output.push_str(&format!(
                " {} {}: insert `{}` at {}\n",
                "help:".green().bold(),
                suggestion.message,
                suggestion.insertion,
                suggestion.span
            ));
        }

        output
    }

    /// Render with a source snippet and `^^^` underlining.
    pub fn format(&self, source_code: &str) -> String {
        let mut output = self.format_simple();

        if let Some(snippet) = self.source_snippet(source_code) {
            output.push_str(&snippet);
        }

        output
    }

    fn source_snippet(&self, source_code: &str) -> Option<String> {
        let lines: Vec<&str> = source_code.lines().collect();

        if self.span.line == 0 || self.span.line > lines.len() {
            return None;
        }

        let line = lines[self.span.line - 1];
        let line_num_width = self.span.line.to_string().len().max(2);
        let mut snippet = String::new();

        snippet.push_str(&format!(" {}\n", " ".repeat(line_num_width + 1)));
        snippet.push_str(&format!(
            " {} {} {}\n",
            format!("{:>width$}", self.span.line, width = line_num_width)
                .cyan()
                .bold(),
            "|".cyan().bold(),
            line
        ));

        let padding = " ".repeat(line_num_width + 3 + self.span.column.saturating_sub(1));
        let underline = "^".repeat(self.span.length.max(1));
        snippet.push_str(&format!(
            " {} {}{}\n",
            " ".repeat(line_num_width + 1),
            padding,
            underline.red().bold()
        ));

        Some(snippet)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

/// Collecting sink for diagnostics. The checker publishes into this and the
/// driver decides what to do with the stream afterwards.
#[derive(Debug, Default)]
pub struct DiagnosticEngine {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.error_count += 1,
            Severity::Warning => self.warning_count += 1,
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Print all diagnostics to stderr, with snippets from `source_code`.
    pub fn print_all(&self, source_code: &str) {
        for diag in &self.diagnostics {
            eprintln!("{}", diag.format(source_code));
        }
    }

    pub fn print_summary(&self) {
        if self.error_count > 0 {
            eprintln!(
                "{}: {} error{} emitted",
                "error".red().bold(),
                self.error_count,
                if self.error_count == 1 { "" } else { "s" }
            );
        }

        if self.warning_count > 0 {
            eprintln!(
                "{}: {} warning{} emitted",
                "warning".yellow().bold(),
                self.warning_count,
                if self.warning_count == 1 { "" } else { "s" }
            );
        }
    }
}

/// Diagnostic codes grouped by analysis area.
pub mod codes {
    // Name resolution (E04xx)
    pub const UNRESOLVED_NAME: &str = "E0425";
    pub const UNRESOLVED_TYPE: &str = "E0412";
    pub const DUPLICATE_DEFINITION: &str = "E0428";
    pub const AMBIGUOUS_IMPORT: &str = "E0659";
    pub const HIDDEN_NAME: &str = "E0603";

    // Types (E03xx, E00xx)
    pub const TYPE_MISMATCH: &str = "E0308";
    pub const NOT_CALLABLE: &str = "E0618";
    pub const ARGUMENT_COUNT: &str = "E0061";
    pub const GENERIC_ARITY: &str = "E0107";
    pub const MISSING_CONFORMANCE: &str = "E0277";
    pub const NO_SUCH_MEMBER: &str = "E0609";
    pub const INVALID_CAST: &str = "E0606";

    // Constant evaluation (E08xx)
    pub const CONST_OVERFLOW: &str = "E0080";
    pub const CONST_DIVIDE_BY_ZERO: &str = "E0081";
    pub const CONST_INVALID: &str = "E0082";
    pub const CONST_NOT_CONSTANT: &str = "E0083";
    pub const CONST_OUT_OF_RANGE: &str = "E0084";

    // Structure (E05xx)
    pub const CYCLIC_DEFINITION: &str = "E0391";
    pub const IMMUTABLE_ASSIGN: &str = "E0594";
    pub const UNASSIGNABLE: &str = "E0070";
    pub const ENTRY_POINT: &str = "E0601";

    // Patterns (E0004..)
    pub const NON_EXHAUSTIVE: &str = "E0004";
    pub const PATTERN_BINDINGS: &str = "E0408";
    pub const PATTERN_TYPE: &str = "E0029";

    // Warnings
    pub const UNUSED_IMPORT: &str = "W0002";
    pub const INEXACT_RESULT: &str = "W0010";
    pub const UNSAFE_COERCION: &str = "W0011";
    pub const UNREACHABLE_BRANCH: &str = "W0007";
}

/// Fuzzy matching for "did you mean?" suggestions.
pub mod fuzzy {
    use strsim::levenshtein;

    /// All candidates within edit distance 2 of `target`, best first,
    /// capped at three suggestions.
    pub fn similar_names(target: &str, candidates: &[String]) -> Vec<String> {
        let mut scored: Vec<(String, usize)> = candidates
            .iter()
            .map(|candidate| (candidate.clone(), levenshtein(target, candidate)))
            .filter(|(candidate, distance)| *distance <= 2 && candidate != target)
            .collect();

        scored.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        scored.into_iter().take(3).map(|(name, _)| name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_format() {
        let source = "val x: u8 = 255 + 1\n";
        let span = Span::new("test.ns", 1, 13, 7);
        let diag = Diagnostic::error(codes::CONST_OVERFLOW, "overflow for type `u8`", span.clone())
            .with_note(span, "this addition exceeds `u8.MAX`".to_string())
            .with_help("widen the type or reduce the value");

        let formatted = diag.format(source);
        assert!(formatted.contains("E0080"));
        assert!(formatted.contains("overflow for type `u8`"));
        assert!(formatted.contains("test.ns:1:13"));
    }

    #[test]
    fn test_engine_counts() {
        let mut engine = DiagnosticEngine::new();
        engine.publish(Diagnostic::error(
            codes::TYPE_MISMATCH,
            "mismatched types",
            Span::unknown(),
        ));
        engine.publish(Diagnostic::warning(
            codes::UNUSED_IMPORT,
            "unused import",
            Span::unknown(),
        ));

        assert!(engine.has_errors());
        assert_eq!(engine.error_count(), 1);
        assert_eq!(engine.warning_count(), 1);
        assert_eq!(engine.diagnostics().len(), 2);
    }

    #[test]
    fn test_similar_names() {
        let candidates = vec![
            "count".to_string(),
            "counter".to_string(),
            "account".to_string(),
            "wholly_unrelated".to_string(),
        ];
        let suggestions = fuzzy::similar_names("coutn", &candidates);
        assert!(suggestions.contains(&"count".to_string()));
        assert!(!suggestions.contains(&"wholly_unrelated".to_string()));
        assert!(suggestions.len() <= 3);
    }

    #[test]
    fn test_span_from_source() {
        let source = "line one\nline two\n";
        let span = Span::from_source("a.ns", source, 9..13);
        assert_eq!(span.line, 2);
        assert_eq!(span.column, 1);
        assert_eq!(span.length, 4);
    }
}
