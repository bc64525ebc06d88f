use crate::config::{ExtensionFilter, GrepConfig, Mode, default_extensions_display};
use crate::errors::Result;
use crate::output_formatter::OutputFormat;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

/// Recursively grep (or replace) literal patterns in a tree of text files.
///
/// Several patterns are combined with AND: a line is reported only when
/// every pattern occurs on it.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Recursively grep or replace literal patterns in dev files",
    long_about = "andgrep - recursively grep (or replace) occurrences of literal patterns in all
\"dev\" files under a directory. Very similar to ack, without regexes.

Several patterns are combined with AND: a line is reported only when every
pattern occurs on it.",
    after_help = "EXAMPLES:
  andgrep -e py,c,h pattern      # restrict to some extensions
  andgrep foo bar                # 'foo' AND 'bar' on the same line
  andgrep -i Foo                 # case-insensitive
  andgrep -r foo bar             # replace 'foo' with 'bar'
  andgrep -r -n foo bar          # preview a replacement"
)]
pub struct Args {
    #[arg(
        short = 'e',
        long = "exts",
        value_name = "EXTS",
        value_delimiter = ',',
        env = "ANDGREP_EXTS",
        help = exts_help()
    )]
    pub extensions: Vec<String>,

    /// Replace the first pattern with the second instead of reporting matches.
    #[arg(short, long)]
    pub replace: bool,

    /// Match case-insensitively (incompatible with --replace).
    #[arg(short, long)]
    pub ignore_case: bool,

    /// With --replace: report what would change without writing any file.
    #[arg(short = 'n', long, requires = "replace")]
    pub dry_run: bool,

    /// The directory to search.
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// A comma-separated list of extra top-level directories to skip.
    #[arg(short = 'x', long = "exclude", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Also skip files matched by .gitignore/.ignore rules.
    #[arg(long)]
    pub gitignore: bool,

    /// When to colour the output.
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// The output format for the results.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Print debug logging to stderr.
    #[arg(short, long)]
    pub verbose: bool,

    /// Literal patterns; exactly two with --replace (source, destination).
    #[arg(required = true, value_name = "PATTERN")]
    pub patterns: Vec<String>,
}

fn exts_help() -> String {
    format!(
        "Comma-separated list of extensions to scan, or '*' for all files [default: {}]",
        default_extensions_display()
    )
}

/// Controls terminal colours.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorChoice {
    /// Colour only when stdout is a terminal.
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    pub fn enabled(self) -> bool {
        match self {
            ColorChoice::Auto => std::io::stdout().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }
}

impl Args {
    pub fn mode(&self) -> Mode {
        if self.replace { Mode::Replace } else { Mode::Search }
    }

    /// Validates the arguments into a run configuration.
    ///
    /// Every invocation error is reported here, before any file is opened.
    pub fn build_config(&self) -> Result<GrepConfig> {
        let config = GrepConfig::new(self.patterns.clone(), self.mode(), self.ignore_case)?;

        let extensions = if self.extensions.is_empty() {
            ExtensionFilter::default()
        } else {
            ExtensionFilter::parse(&self.extensions)?
        };

        Ok(config
            .with_root(&self.dir)
            .with_extensions(extensions)
            .with_excluded_dirs(self.exclude.clone())
            .with_gitignore(self.gitignore)
            .with_dry_run(self.dry_run))
    }
}

/// Parses command-line arguments and returns the populated `Args` struct.
pub fn parse_args() -> Args {
    Args::parse()
}
