use crate::config::{GrepConfig, Mode, PatternSet};
use crate::errors::{Error, Result};
use crate::highlight::{Highlighter, Palette, strip_line_ending};
use serde::Serialize;
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// A line on which every pattern occurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    /// 1-based line number.
    pub line_number: usize,
    /// The original line without its terminator.
    pub line: String,
    /// `line` with each pattern occurrence wrapped for display.
    #[serde(skip)]
    pub rendered: String,
}

/// The outcome of searching one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileResult {
    pub path: PathBuf,
    /// Number of qualifying lines.
    pub occurrences: usize,
    pub records: Vec<MatchRecord>,
}

/// The outcome of running a replacement over one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplacementOutcome {
    pub path: PathBuf,
    /// Number of source-pattern instances replaced.
    pub occurrences: usize,
    /// `true` if the file on disk was rewritten.
    pub mutated: bool,
}

/// What the engine produced for a file, depending on the mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FileOutcome {
    Search(FileResult),
    Replace(ReplacementOutcome),
}

impl FileOutcome {
    pub fn path(&self) -> &Path {
        match self {
            FileOutcome::Search(r) => &r.path,
            FileOutcome::Replace(r) => &r.path,
        }
    }

    pub fn occurrences(&self) -> usize {
        match self {
            FileOutcome::Search(r) => r.occurrences,
            FileOutcome::Replace(r) => r.occurrences,
        }
    }
}

/// The single-file matching and replacement engine.
///
/// An `Engine` is built once per run from a validated `GrepConfig` and then
/// applied to each file independently. Search mode never writes; replace
/// mode reads the file once and writes it at most once.
pub struct Engine {
    patterns: PatternSet,
    mode: Mode,
    dry_run: bool,
    highlighter: Highlighter,
}

impl Engine {
    /// Creates an engine for `config`. `palette` controls how matches are
    /// rendered in `MatchRecord::rendered`.
    pub fn new(config: &GrepConfig, palette: Palette) -> Result<Self> {
        Ok(Self {
            highlighter: Highlighter::new(&config.patterns, palette)?,
            patterns: config.patterns.clone(),
            mode: config.mode,
            dry_run: config.dry_run,
        })
    }

    /// Processes the file at `path` according to the configured mode.
    ///
    /// Every failure is returned as `Error::Processing` naming the file, so
    /// callers can report it and carry on with the next one.
    pub fn process(&self, path: &Path) -> Result<FileOutcome> {
        let outcome = match self.mode {
            Mode::Search => self.search_file(path).map(FileOutcome::Search),
            Mode::Replace => self.replace_file(path).map(FileOutcome::Replace),
        };
        outcome.map_err(|e| match e {
            Error::Processing { .. } => e,
            other => Error::processing(path, other),
        })
    }

    fn search_file(&self, path: &Path) -> Result<FileResult> {
        let patterns = self.patterns.as_slice();

        let records = if patterns.len() == 1 && !self.patterns.ignore_case() {
            debug!(path = %path.display(), "single pattern: whole-file check");
            let content = fs::read_to_string(path)?;
            self.search_content(&content)
        } else {
            debug!(path = %path.display(), patterns = patterns.len(), "line-by-line scan");
            self.search_reader(BufReader::new(File::open(path)?))?
        };

        Ok(FileResult {
            path: path.to_path_buf(),
            occurrences: records.len(),
            records,
        })
    }

    /// Searches in-memory content. A single case-sensitive pattern is first
    /// checked against the whole buffer so files without it are never split.
    pub fn search_content(&self, content: &str) -> Vec<MatchRecord> {
        let patterns = self.patterns.as_slice();
        if patterns.len() == 1 && !self.patterns.ignore_case() && !content.contains(&patterns[0]) {
            return Vec::new();
        }

        content
            .split_inclusive('\n')
            .enumerate()
            .filter_map(|(idx, line)| self.check_line(idx + 1, line))
            .collect()
    }

    /// Streams lines from `reader`, keeping only those on which every
    /// pattern occurs.
    pub fn search_reader<R: BufRead>(&self, mut reader: R) -> Result<Vec<MatchRecord>> {
        let mut records = Vec::new();
        let mut line = String::new();
        let mut line_number = 0;

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            line_number += 1;
            if let Some(record) = self.check_line(line_number, &line) {
                records.push(record);
            }
        }

        Ok(records)
    }

    /// AND test for a single raw line (terminator included). The folded copy
    /// is only used for the test; the record keeps the original text.
    fn check_line(&self, line_number: usize, line: &str) -> Option<MatchRecord> {
        let haystack = if self.patterns.ignore_case() {
            Cow::Owned(line.to_lowercase())
        } else {
            Cow::Borrowed(line)
        };

        let all_present = self
            .patterns
            .as_slice()
            .iter()
            .all(|p| haystack.contains(p.as_str()));
        if !all_present {
            return None;
        }

        Some(MatchRecord {
            line_number,
            line: strip_line_ending(line).to_string(),
            rendered: self.highlighter.render(line),
        })
    }

    fn replace_file(&self, path: &Path) -> Result<ReplacementOutcome> {
        let content = fs::read_to_string(path)?;

        let (occurrences, mutated) = match self.replace_content(&content) {
            Some((new_content, occurrences)) => {
                if !self.dry_run {
                    write_atomically(path, &new_content)?;
                }
                debug!(path = %path.display(), occurrences, dry_run = self.dry_run, "replaced");
                (occurrences, !self.dry_run)
            }
            None => (0, false),
        };

        Ok(ReplacementOutcome {
            path: path.to_path_buf(),
            occurrences,
            mutated,
        })
    }

    /// Replaces every occurrence of the first pattern with the second.
    ///
    /// Returns the new content and the number of replaced instances, or
    /// `None` when the content would not change.
    pub fn replace_content(&self, content: &str) -> Option<(String, usize)> {
        let [src, dst] = self.patterns.as_slice() else {
            return None;
        };

        let new_content = content.replace(src.as_str(), dst);
        if new_content == content {
            return None;
        }
        Some((new_content, content.matches(src.as_str()).count()))
    }
}

/// Writes `contents` to a temporary file next to the real file behind `path`,
/// copies the original permissions over and renames it into place.
///
/// Symlinks are resolved first so the link stays intact and its target gets
/// the new content.
fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    let target = fs::canonicalize(path)?;
    let parent = target.parent().unwrap_or_else(|| Path::new("."));

    let mut temp_file = NamedTempFile::new_in(parent)?;
    temp_file.write_all(contents.as_bytes())?;

    let perms = fs::metadata(&target)?.permissions();
    fs::set_permissions(temp_file.path(), perms)?;

    temp_file.persist(&target)?;
    Ok(())
}
