//! Terminal emphasis for file names, line numbers and pattern occurrences.

use crate::config::PatternSet;
use crate::errors::Result;
use regex::{Captures, Regex, RegexBuilder};
use std::fmt::Display;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const GREEN: &str = "\x1b[32m";
const BOLD_GREEN: &str = "\x1b[1;32m";

/// ANSI styling that can be switched off as a whole.
///
/// A disabled palette returns its input unchanged, which is what the
/// machine-readable output formats and non-terminal stdout use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Line numbers.
    pub fn bold(&self, value: impl Display) -> String {
        self.paint(BOLD, value)
    }

    /// Pattern occurrences and replacement counts.
    pub fn green(&self, value: impl Display) -> String {
        self.paint(GREEN, value)
    }

    /// File headers and summary numbers.
    pub fn bold_green(&self, value: impl Display) -> String {
        self.paint(BOLD_GREEN, value)
    }

    fn paint(&self, code: &str, value: impl Display) -> String {
        if self.enabled {
            format!("{code}{value}{RESET}")
        } else {
            value.to_string()
        }
    }
}

/// Wraps every occurrence of any pattern in a line with emphasis.
///
/// All patterns are matched in a single pass, longest first, so a pattern
/// that is a substring of another never produces nested escapes. In
/// ignore-case mode the matcher is case-insensitive and wraps the original
/// text, whatever its case.
#[derive(Debug, Clone)]
pub struct Highlighter {
    matcher: Option<Regex>,
    palette: Palette,
}

impl Highlighter {
    pub fn new(patterns: &PatternSet, palette: Palette) -> Result<Self> {
        if !palette.is_enabled() || patterns.is_empty() {
            return Ok(Self {
                matcher: None,
                palette,
            });
        }

        let mut literals: Vec<&str> = patterns.as_slice().iter().map(String::as_str).collect();
        literals.sort_by(|a, b| b.len().cmp(&a.len()));
        let alternation = literals
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join("|");

        let matcher = RegexBuilder::new(&alternation)
            .case_insensitive(patterns.ignore_case())
            .build()?;

        Ok(Self {
            matcher: Some(matcher),
            palette,
        })
    }

    /// Renders a raw line for display: trailing `\n`/`\r` removed, pattern
    /// occurrences wrapped.
    pub fn render(&self, line: &str) -> String {
        let line = strip_line_ending(line);
        match &self.matcher {
            Some(matcher) => matcher
                .replace_all(line, |caps: &Captures| self.palette.green(&caps[0]))
                .into_owned(),
            None => line.to_string(),
        }
    }
}

/// Removes trailing newline and carriage-return characters.
pub fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}
