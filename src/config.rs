use crate::errors::Result;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// Extensions scanned when no `--exts` list is given.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "c", "h", "in", "ini", "md", "py", "rst", "txt", "yaml", "yml",
];

/// File names scanned regardless of their extension.
pub const SPECIAL_NAMES: &[&str] = &["README"];

/// Directory names skipped when they sit directly under the root.
pub const IGNORE_ROOT_DIRS: &[&str] = &[".git", "build", "dist"];

/// Packaging-metadata suffixes skipped at the top level (`foo.egg-info`).
pub const IGNORE_ROOT_SUFFIXES: &[&str] = &[".egg-info"];

/// The extension token meaning "every file".
pub const WILDCARD: &str = "*";

/// The default extension list as shown in the usage text, e.g. `c,h,in,...`.
pub fn default_extensions_display() -> String {
    DEFAULT_EXTENSIONS.join(",")
}

/// What the engine does with a file once the patterns are found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Report every line on which all patterns occur.
    Search,
    /// Substitute the first pattern with the second across the whole file.
    Replace,
}

/// Decides which files the walker hands to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionFilter {
    /// Wildcard mode: every file is a candidate.
    All,
    /// Extensions, each stored with its leading dot (`.py`).
    Only(BTreeSet<String>),
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::parse(DEFAULT_EXTENSIONS).unwrap_or(ExtensionFilter::All)
    }
}

impl ExtensionFilter {
    /// Builds a filter from user supplied tokens such as `py`, `.md` or `*`.
    ///
    /// A token may carry one leading dot; what remains must be a non-empty
    /// alphanumeric string. A lone `*` selects every file; mixed with other
    /// tokens it is rejected.
    pub fn parse<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut exts = BTreeSet::new();
        let mut wildcard = false;
        let mut count = 0;

        for token in tokens {
            let token = token.as_ref().trim();
            count += 1;
            if token == WILDCARD {
                wildcard = true;
                continue;
            }
            let bare = token.strip_prefix('.').unwrap_or(token);
            if bare.is_empty() || !bare.chars().all(char::is_alphanumeric) {
                return Err(format!("invalid extension {token}").into());
            }
            exts.insert(format!(".{bare}"));
        }

        if wildcard && count > 1 {
            Err(format!("invalid extension {WILDCARD}").into())
        } else if wildcard {
            Ok(ExtensionFilter::All)
        } else if exts.is_empty() {
            Err("no extensions given".into())
        } else {
            Ok(ExtensionFilter::Only(exts))
        }
    }

    /// Returns `true` if the file at `path` should be scanned.
    ///
    /// Extensions compare case-sensitively. Names listed in `SPECIAL_NAMES`
    /// always pass.
    pub fn accepts(&self, path: &Path) -> bool {
        let exts = match self {
            ExtensionFilter::All => return true,
            ExtensionFilter::Only(exts) => exts,
        };

        let special = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| SPECIAL_NAMES.contains(&n));
        if special {
            return true;
        }

        path.extension()
            .and_then(|os| os.to_str())
            .map(|e| exts.contains(&format!(".{e}")))
            .unwrap_or(false)
    }
}

/// An ordered, validated list of literal patterns.
///
/// When `ignore_case` is set the patterns are stored lowercased, which is the
/// form the engine compares against folded lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSet {
    patterns: Vec<String>,
    ignore_case: bool,
}

impl PatternSet {
    /// Validates and (optionally) case-folds the given patterns.
    ///
    /// Fails if the list is empty, if any pattern is empty, or if two
    /// patterns are equal after folding.
    pub fn new(patterns: Vec<String>, ignore_case: bool) -> Result<Self> {
        check_not_empty(&patterns)?;

        let patterns: Vec<String> = if ignore_case {
            patterns.iter().map(|p| p.to_lowercase()).collect()
        } else {
            patterns
        };

        let mut seen = HashSet::with_capacity(patterns.len());
        if !patterns.iter().all(|p| seen.insert(p.as_str())) {
            return Err("<pattern>s can't be equal".into());
        }

        Ok(Self {
            patterns,
            ignore_case,
        })
    }

    pub fn as_slice(&self) -> &[String] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }
}

fn check_not_empty(patterns: &[String]) -> Result<()> {
    if patterns.is_empty() {
        return Err("at least one <pattern> is required".into());
    }
    if patterns.iter().any(|p| p.is_empty()) {
        return Err("<pattern>s can't be empty".into());
    }
    Ok(())
}

/// A fully validated run configuration.
///
/// Constructing one performs every check that must fail before the first
/// file is opened.
#[derive(Debug, Clone)]
pub struct GrepConfig {
    /// Directory the traversal starts from.
    pub root: PathBuf,
    pub patterns: PatternSet,
    pub mode: Mode,
    /// Replace mode only: report counts without writing.
    pub dry_run: bool,
    pub extensions: ExtensionFilter,
    /// Extra top-level directory names to skip, on top of `IGNORE_ROOT_DIRS`.
    pub excluded_dirs: Vec<String>,
    /// Honour `.gitignore` and friends while walking.
    pub respect_gitignore: bool,
}

impl GrepConfig {
    /// Creates a configuration rooted at `.` with the default extension list.
    pub fn new(patterns: Vec<String>, mode: Mode, ignore_case: bool) -> Result<Self> {
        check_not_empty(&patterns)?;

        if mode == Mode::Replace {
            if ignore_case {
                return Err("can't use --ignore-case with --replace".into());
            }
            if patterns.len() != 2 {
                return Err("with --replace you must specify 2 <pattern>s".into());
            }
        }

        Ok(Self {
            root: PathBuf::from("."),
            patterns: PatternSet::new(patterns, ignore_case)?,
            mode,
            dry_run: false,
            extensions: ExtensionFilter::default(),
            excluded_dirs: Vec::new(),
            respect_gitignore: false,
        })
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_extensions(mut self, extensions: ExtensionFilter) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_excluded_dirs(mut self, dirs: Vec<String>) -> Self {
        self.excluded_dirs = dirs;
        self
    }

    pub fn with_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Returns `true` if a directory with this name directly under the root
    /// must not be descended into.
    pub fn is_ignored_root_dir(&self, name: &str) -> bool {
        IGNORE_ROOT_DIRS.contains(&name)
            || IGNORE_ROOT_SUFFIXES.iter().any(|s| name.ends_with(s))
            || self.excluded_dirs.iter().any(|d| d == name)
    }
}
