use crate::config::GrepConfig;
use crate::engine::{Engine, FileOutcome};
use crate::errors::{Error, Result};
use ignore::{DirEntry, WalkBuilder};
use serde::Serialize;
use tracing::debug;

/// Totals accumulated over a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Files handed to the engine, including those that failed.
    pub files_scanned: usize,
    /// Files with at least one occurrence.
    pub files_matching: usize,
    pub occurrences: usize,
    /// Files (or directory entries) that could not be processed.
    pub errors: usize,
}

impl Summary {
    fn record(&mut self, outcome: &FileOutcome) {
        let occurrences = outcome.occurrences();
        self.occurrences += occurrences;
        if occurrences > 0 {
            self.files_matching += 1;
        }
    }
}

/// Receives per-file results as the walk progresses.
pub trait Reporter {
    /// Called once for every successfully processed file, in traversal order.
    fn file(&mut self, outcome: &FileOutcome) -> Result<()>;

    /// Called for a file that could not be processed. The walk continues.
    fn file_error(&mut self, error: &Error);
}

/// Enumerates candidate files under the configured root and feeds them to
/// the engine one at a time.
///
/// Entries are visited depth first in file-name order so that output is
/// stable between runs. Ignored directories are only recognised directly
/// under the root.
pub struct Walker<'a> {
    config: &'a GrepConfig,
}

impl<'a> Walker<'a> {
    pub fn new(config: &'a GrepConfig) -> Self {
        Self { config }
    }

    fn builder(&self) -> WalkBuilder {
        let mut builder = WalkBuilder::new(&self.config.root);
        builder
            .standard_filters(self.config.respect_gitignore)
            .require_git(false)
            .hidden(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b));

        let config = self.config.clone();
        builder.filter_entry(move |entry| !is_ignored_root_dir(&config, entry));
        builder
    }

    /// Walks the tree, processes every candidate file with `engine` and
    /// reports each result.
    ///
    /// Per-file failures go to `reporter.file_error` and are counted; only a
    /// failing reporter aborts the walk.
    pub fn run<R: Reporter>(&self, engine: &Engine, reporter: &mut R) -> Result<Summary> {
        let mut summary = Summary::default();

        for entry in self.builder().build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    summary.errors += 1;
                    reporter.file_error(&Error::Walk(err));
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if !self.config.extensions.accepts(path) {
                debug!(path = %path.display(), "skipped by extension filter");
                continue;
            }

            summary.files_scanned += 1;
            match engine.process(path) {
                Ok(outcome) => {
                    summary.record(&outcome);
                    reporter.file(&outcome)?;
                }
                Err(err) if !err.is_fatal() => {
                    debug!(error = %err, "file skipped");
                    summary.errors += 1;
                    reporter.file_error(&err);
                }
                Err(err) => return Err(err),
            }
        }

        debug!(?summary, "walk finished");
        Ok(summary)
    }
}

fn is_ignored_root_dir(config: &GrepConfig, entry: &DirEntry) -> bool {
    if entry.depth() != 1 || !entry.file_type().is_some_and(|t| t.is_dir()) {
        return false;
    }
    let ignored = entry
        .file_name()
        .to_str()
        .is_some_and(|name| config.is_ignored_root_dir(name));
    if ignored {
        debug!(path = %entry.path().display(), "ignored directory");
    }
    ignored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtensionFilter, Mode};
    use crate::highlight::Palette;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Collect {
        outcomes: Vec<FileOutcome>,
        errors: Vec<String>,
    }

    impl Reporter for Collect {
        fn file(&mut self, outcome: &FileOutcome) -> Result<()> {
            self.outcomes.push(outcome.clone());
            Ok(())
        }

        fn file_error(&mut self, error: &Error) {
            self.errors.push(error.to_string());
        }
    }

    fn config(root: &Path, patterns: &[&str], exts: &[&str]) -> GrepConfig {
        GrepConfig::new(
            patterns.iter().map(|s| s.to_string()).collect(),
            Mode::Search,
            false,
        )
        .unwrap()
        .with_root(root)
        .with_extensions(ExtensionFilter::parse(exts).unwrap())
    }

    /// Runs the walk and returns the summary plus the processed files,
    /// relative to `root`, in traversal order.
    fn walk(cfg: &GrepConfig, root: &Path) -> (Summary, Vec<String>) {
        let engine = Engine::new(cfg, Palette::new(false)).unwrap();
        let mut reporter = Collect::default();
        let summary = Walker::new(cfg).run(&engine, &mut reporter).unwrap();
        let names = reporter
            .outcomes
            .iter()
            .map(|o| {
                o.path()
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        (summary, names)
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "needle\n").unwrap();
        fs::write(dir.path().join("b.txt"), "needle\n").unwrap();
        fs::write(dir.path().join("c.bin"), "needle\n").unwrap();
        dir
    }

    #[test]
    fn test_extension_filter_selects_files() {
        let dir = fixture();
        let cfg = config(dir.path(), &["needle"], &["py"]);
        let (summary, scanned) = walk(&cfg, dir.path());
        assert_eq!(scanned, vec!["a.py"]);
        assert_eq!(summary.occurrences, 1);
    }

    #[test]
    fn test_wildcard_selects_everything() {
        let dir = fixture();
        let cfg = config(dir.path(), &["needle"], &["*"]);
        let (summary, scanned) = walk(&cfg, dir.path());
        assert_eq!(scanned, vec!["a.py", "b.txt", "c.bin"]);
        assert_eq!(summary.files_matching, 3);
    }

    #[test]
    fn test_ignored_dirs_only_at_top_level() {
        let dir = fixture();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/config.txt"), "needle\n").unwrap();
        fs::create_dir_all(dir.path().join("pkg.egg-info")).unwrap();
        fs::write(dir.path().join("pkg.egg-info/PKG-INFO.txt"), "needle\n").unwrap();
        fs::create_dir_all(dir.path().join("src/build")).unwrap();
        fs::write(dir.path().join("src/build/gen.py"), "needle\n").unwrap();

        let cfg = config(dir.path(), &["needle"], &["*"]);
        let (summary, scanned) = walk(&cfg, dir.path());
        assert_eq!(scanned, vec!["a.py", "b.txt", "c.bin", "src/build/gen.py"]);
        assert_eq!(summary.occurrences, 4);
    }

    #[test]
    fn test_excluded_dirs() {
        let dir = fixture();
        fs::create_dir_all(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("vendor/lib.py"), "needle\n").unwrap();

        let cfg = config(dir.path(), &["needle"], &["py"]).with_excluded_dirs(vec!["vendor".into()]);
        let (_, scanned) = walk(&cfg, dir.path());
        assert_eq!(scanned, vec!["a.py"]);
    }

    #[test]
    fn test_special_names_included() {
        let dir = fixture();
        fs::write(dir.path().join("README"), "needle\n").unwrap();
        let cfg = config(dir.path(), &["needle"], &["py"]);
        let (summary, scanned) = walk(&cfg, dir.path());
        assert_eq!(scanned, vec!["README", "a.py"]);
        assert_eq!(summary.files_matching, 2);
    }

    #[test]
    fn test_run_aggregates_summary() {
        let dir = fixture();
        fs::write(dir.path().join("d.txt"), "needle\nneedle again\nhay\n").unwrap();
        fs::write(dir.path().join("e.txt"), "hay\n").unwrap();

        let cfg = config(dir.path(), &["needle"], &["txt"]);
        let (summary, scanned) = walk(&cfg, dir.path());

        assert_eq!(
            summary,
            Summary {
                files_scanned: 3,
                files_matching: 2,
                occurrences: 3,
                errors: 0,
            }
        );
        assert_eq!(scanned, vec!["b.txt", "d.txt", "e.txt"]);
    }

    #[test]
    fn test_unreadable_file_does_not_abort() {
        let dir = fixture();
        fs::write(dir.path().join("0-broken.txt"), [0xff, 0xfe, 0xfd]).unwrap();

        let cfg = config(dir.path(), &["needle"], &["txt"]);
        let engine = Engine::new(&cfg, Palette::new(false)).unwrap();
        let mut reporter = Collect::default();
        let summary = Walker::new(&cfg).run(&engine, &mut reporter).unwrap();

        assert_eq!(summary.errors, 1);
        assert_eq!(summary.occurrences, 1);
        assert_eq!(reporter.errors.len(), 1);
        assert!(reporter.errors[0].contains("0-broken.txt"));
    }

    #[test]
    fn test_run_replace_mode() {
        let dir = fixture();
        let cfg = GrepConfig::new(vec!["needle".into(), "pin".into()], Mode::Replace, false)
            .unwrap()
            .with_root(dir.path())
            .with_extensions(ExtensionFilter::parse(["py", "txt"]).unwrap());
        let (summary, _) = walk(&cfg, dir.path());

        assert_eq!(summary.files_matching, 2);
        assert_eq!(fs::read_to_string(dir.path().join("a.py")).unwrap(), "pin\n");
        assert_eq!(fs::read_to_string(dir.path().join("c.bin")).unwrap(), "needle\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_unwritable_file_does_not_abort_replace() {
        use std::os::unix::fs::PermissionsExt;

        let dir = fixture();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("c.txt"), "needle\n").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        // Permission bits do not bind a privileged user; nothing to check then.
        if fs::write(locked.join("canary"), "").is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let cfg = GrepConfig::new(vec!["needle".into(), "pin".into()], Mode::Replace, false)
            .unwrap()
            .with_root(dir.path())
            .with_extensions(ExtensionFilter::parse(["py", "txt"]).unwrap());
        let engine = Engine::new(&cfg, Palette::new(false)).unwrap();
        let mut reporter = Collect::default();
        let result = Walker::new(&cfg).run(&engine, &mut reporter);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let summary = result.unwrap();
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.files_matching, 2);
        assert!(reporter.errors[0].contains("c.txt"));
        assert_eq!(fs::read_to_string(dir.path().join("a.py")).unwrap(), "pin\n");
        assert_eq!(fs::read_to_string(dir.path().join("b.txt")).unwrap(), "pin\n");
        assert_eq!(fs::read_to_string(locked.join("c.txt")).unwrap(), "needle\n");
    }

    #[test]
    fn test_gitignore_respected_when_enabled() {
        let dir = fixture();
        fs::write(dir.path().join(".gitignore"), "b.txt\n").unwrap();

        let cfg = config(dir.path(), &["needle"], &["py", "txt"]);
        let (_, scanned) = walk(&cfg, dir.path());
        assert_eq!(scanned, vec!["a.py", "b.txt"]);

        let cfg = cfg.with_gitignore(true);
        let (_, scanned) = walk(&cfg, dir.path());
        assert_eq!(scanned, vec!["a.py"]);
    }
}
