// Structured error types and pretty-printed diagnostics.
//
// Three kinds, matching the three outcomes an interpret run can have:
// lexing/parsing failures and compile-time semantic failures are folded
// into `CompileError`; failures discovered while executing bytecode are
// `RuntimeError`. Both render through the same colored, arrow-to-source
// format.

use colored::Colorize;
use std::fmt;

/// A line (and, where known, column) in the original source buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: Option<usize>,
}

impl SourceLocation {
    pub fn new(line: usize) -> Self {
        Self { line, column: None }
    }

    pub fn with_column(line: usize, column: usize) -> Self {
        Self { line, column: Some(column) }
    }

    pub fn unknown() -> Self {
        Self { line: 0, column: None }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.column {
            Some(col) => write!(f, "line {}, column {}", self.line, col),
            None => write!(f, "line {}", self.line),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub location: SourceLocation,
    pub source_line: Option<String>,
    pub help: Option<String>,
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
            source_line: None,
            help: None,
            suggestion: None,
        }
    }

    pub fn with_source(mut self, line: impl Into<String>) -> Self {
        self.source_line = Some(line.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    fn render(&self, kind: &str, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}: {}", kind.red().bold(), self.message.bold())?;
        writeln!(f, "{}", format!("  --> {}", self.location).bright_blue())?;

        if let Some(ref source) = self.source_line {
            writeln!(f, "   {}", "|".bright_blue())?;
            writeln!(
                f,
                "{} {} {}",
                format!("{:3}", self.location.line).bright_blue(),
                "|".bright_blue(),
                source
            )?;
            if let Some(col) = self.location.column {
                writeln!(
                    f,
                    "   {} {}{}",
                    "|".bright_blue(),
                    " ".repeat(col.saturating_sub(1)),
                    "^".red().bold()
                )?;
            }
            writeln!(f, "   {}", "|".bright_blue())?;
        }

        if let Some(ref help) = self.help {
            writeln!(f, "   {} {}", "=".bright_yellow(), format!("help: {}", help).bright_yellow())?;
        }
        if let Some(ref suggestion) = self.suggestion {
            writeln!(
                f,
                "   {} {}",
                "=".bright_green(),
                format!("did you mean '{}'?", suggestion).bright_green()
            )?;
        }
        Ok(())
    }
}

/// Failure during lexing, parsing, or code generation — nothing ran.
#[derive(Debug, Clone)]
pub struct CompileError(pub Diagnostic);

impl CompileError {
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self(Diagnostic::new(message, location))
    }

    pub fn too_many_constants(location: SourceLocation) -> Self {
        Self(Diagnostic::new("too many constants in one chunk", location)
            .with_help("a single chunk may hold at most 256 constants"))
    }

    pub fn too_many_locals(location: SourceLocation) -> Self {
        Self(Diagnostic::new("too many local variables in function", location))
    }

    pub fn jump_too_large(location: SourceLocation) -> Self {
        Self(Diagnostic::new("loop body too large to jump over", location))
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.render("Compile Error", f)
    }
}

impl std::error::Error for CompileError {}

/// Failure while executing already-compiled bytecode.
#[derive(Debug, Clone)]
pub struct RuntimeError(pub Diagnostic);

impl RuntimeError {
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self(Diagnostic::new(message, location))
    }

    pub fn undefined_variable(name: &str, location: SourceLocation, suggestion: Option<&str>) -> Self {
        let mut diag = Diagnostic::new(format!("undefined identifier '{}'", name), location);
        if let Some(s) = suggestion {
            diag = diag.with_suggestion(s);
        }
        Self(diag)
    }

    pub fn type_error(message: impl Into<String>, location: SourceLocation) -> Self {
        Self(Diagnostic::new(message, location))
    }

    pub fn arity_mismatch(expected: usize, got: usize, location: SourceLocation) -> Self {
        Self(Diagnostic::new(
            format!("wrong number of args: expected {} but got {}", expected, got),
            location,
        ))
    }

    pub fn stack_overflow(location: SourceLocation) -> Self {
        Self(Diagnostic::new("stack overflow", location))
    }

    pub fn not_callable(location: SourceLocation) -> Self {
        Self(Diagnostic::new("value is not callable", location))
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.render("Runtime Error", f)
    }
}

impl std::error::Error for RuntimeError {}

/// Computes the Levenshtein distance between two strings, used for
/// "did you mean?" suggestions on undefined-identifier errors.
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();
    let (len1, len2) = (s1_chars.len(), s2_chars.len());

    if len1 == 0 {
        return len2;
    }
    if len2 == 0 {
        return len1;
    }

    let mut matrix = vec![vec![0usize; len2 + 1]; len1 + 1];
    for (i, row) in matrix.iter_mut().enumerate().take(len1 + 1) {
        row[0] = i;
    }
    for j in 0..=len2 {
        matrix[0][j] = j;
    }

    for i in 1..=len1 {
        for j in 1..=len2 {
            let cost = if s1_chars[i - 1] == s2_chars[j - 1] { 0 } else { 1 };
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }

    matrix[len1][len2]
}

/// Closest candidate by edit distance, or `None` if nothing is close enough.
pub fn find_closest_match<'a>(target: &str, candidates: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut best: Option<(&str, usize)> = None;
    for candidate in candidates {
        let distance = levenshtein_distance(target, candidate);
        if distance <= 3 && best.map(|(_, d)| distance < d).unwrap_or(true) {
            best = Some((candidate, distance));
        }
    }
    best.map(|(s, _)| s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_have_zero_distance() {
        assert_eq!(levenshtein_distance("print", "print"), 0);
    }

    #[test]
    fn closest_match_finds_single_typo() {
        let candidates = ["print".to_string(), "readFile".to_string()];
        let refs: Vec<&str> = candidates.iter().map(String::as_str).collect();
        assert_eq!(find_closest_match("prnit", refs.into_iter()), Some("print"));
    }

    #[test]
    fn closest_match_rejects_distant_candidates() {
        let candidates = ["writeTextToFile".to_string()];
        let refs: Vec<&str> = candidates.iter().map(String::as_str).collect();
        assert_eq!(find_closest_match("x", refs.into_iter()), None);
    }
}
