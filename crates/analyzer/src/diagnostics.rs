use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static LOCATION_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<file>.+?)\((?P<line>\d+),(?P<col>\d+)(?:-(?P<end>\d+))?\): (?P<message>.*)$")
        .expect("diagnostic pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    fn classify(message: &str) -> Self {
        if message.starts_with("SyntaxError") || message.starts_with("TypeError") {
            Severity::Error
        } else if message.starts_with("Lint") || message.contains("Warning") {
            Severity::Warning
        } else {
            Severity::Error
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `file(line,col): message` report from the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_column: Option<u32>,
    pub message: String,
    pub severity: Severity,
}

impl Diagnostic {
    /// Key used to merge reports of the same problem from different runs.
    pub fn dedup_key(&self) -> (&str, u32, u32, &str) {
        (&self.file, self.line, self.column, &self.message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{}): ", self.file, self.line, self.column)?;
        let mut lines = self.message.lines();
        if let Some(first) = lines.next() {
            f.write_str(first)?;
        }
        for rest in lines {
            write!(f, "\n  {rest}")?;
        }
        Ok(())
    }
}

/// Parse analyzer text output.
///
/// Lines that follow a match are appended to its message until a blank line
/// or the next match. Text before the first match is ignored.
pub fn parse_output(text: &str) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut continuing = false;

    for raw in text.lines() {
        let line = strip_ansi(raw);
        let line = line.trim_end();

        if let Some(caps) = LOCATION_LINE.captures(line) {
            let number = |name: &str| caps.name(name).and_then(|m| m.as_str().parse::<u32>().ok());
            let message = caps["message"].to_string();
            diagnostics.push(Diagnostic {
                file: caps["file"].replace('\\', "/"),
                line: number("line").unwrap_or_default(),
                column: number("col").unwrap_or_default(),
                end_column: number("end"),
                severity: Severity::classify(&message),
                message,
            });
            continuing = true;
            continue;
        }

        if line.trim().is_empty() {
            continuing = false;
            continue;
        }
        if continuing {
            if let Some(last) = diagnostics.last_mut() {
                last.message.push('\n');
                last.message.push_str(line.trim());
            }
        }
    }

    diagnostics
}

/// Strip ANSI escape sequences (e.g. `\x1b[31m`) from a string.
pub fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // ESC '[' params final-letter
            if let Some(next) = chars.next() {
                if next == '[' {
                    for c in chars.by_ref() {
                        if c.is_ascii_alphabetic() {
                            break;
                        }
                    }
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_location_lines() {
        let out = "src/server/main.server.luau(12,5): TypeError: Type 'string' could not be converted into 'number'\n\
                   src/shared/util.luau(3,1-8): LintUnusedLocal: Variable 'x' is never used\n";
        let diags = parse_output(out);
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].file, "src/server/main.server.luau");
        assert_eq!((diags[0].line, diags[0].column), (12, 5));
        assert_eq!(diags[0].severity, Severity::Error);
        assert_eq!(diags[1].end_column, Some(8));
        assert_eq!(diags[1].severity, Severity::Warning);
    }

    #[test]
    fn continuation_lines_join_previous_message() {
        let out = "a.luau(1,1): TypeError: Type 'A' could not be converted into 'B'\n\
                   caused by:\n\
                   \x20 Property 'x' is missing\n\
                   \n\
                   stray text after a blank line\n\
                   b.luau(2,2): SyntaxError: Expected identifier\n";
        let diags = parse_output(out);
        assert_eq!(diags.len(), 2);
        assert_eq!(
            diags[0].message,
            "TypeError: Type 'A' could not be converted into 'B'\ncaused by:\nProperty 'x' is missing"
        );
        assert_eq!(diags[1].message, "SyntaxError: Expected identifier");
    }

    #[test]
    fn preamble_and_colours_are_ignored() {
        let out = "Analyzing 3 files\n\x1b[31msrc\\a.luau(4,2): Warning: deprecated\x1b[0m\n";
        let diags = parse_output(out);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].file, "src/a.luau");
        assert_eq!(diags[0].message, "Warning: deprecated");
        assert_eq!(diags[0].severity, Severity::Warning);
    }

    #[test]
    fn unknown_prefix_defaults_to_error() {
        let diags = parse_output("x.luau(1,1): something broke\n");
        assert_eq!(diags[0].severity, Severity::Error);
    }

    #[test]
    fn display_indents_continuations() {
        let diag = Diagnostic {
            file: "a.luau".into(),
            line: 1,
            column: 2,
            end_column: None,
            message: "TypeError: bad\nmore".into(),
            severity: Severity::Error,
        };
        assert_eq!(diag.to_string(), "a.luau(1,2): TypeError: bad\n  more");
    }
}
