use crate::config::Mode;
use crate::engine::{FileOutcome, FileResult, ReplacementOutcome};
use crate::errors::{Error, Result};
use crate::highlight::Palette;
use crate::walker::{Reporter, Summary};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

/// Defines the possible output formats for results.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable, optionally coloured text streamed file by file.
    #[default]
    Text,
    /// A single JSON document, suitable for machine processing.
    Json,
    /// Comma-Separated Values, one row per match (or per replaced file).
    Csv,
}

/// Writes per-file results and the final summary.
///
/// Text output is written as soon as each file is processed. JSON and CSV
/// are buffered and emitted by `finish`, since both need the complete set.
pub struct OutputFormatter<W: Write> {
    writer: W,
    format: OutputFormat,
    mode: Mode,
    palette: Palette,
    matched: Vec<FileOutcome>,
}

impl<W: Write> OutputFormatter<W> {
    /// Creates a new `OutputFormatter`.
    ///
    /// `palette` only affects the text format; machine formats are always
    /// written without escape sequences.
    pub fn new(writer: W, format: OutputFormat, mode: Mode, palette: Palette) -> Self {
        Self {
            writer,
            format,
            mode,
            palette,
            matched: Vec::new(),
        }
    }

    /// Writes whatever the format still owes and the summary line.
    pub fn finish(&mut self, summary: &Summary) -> Result<()> {
        match self.format {
            OutputFormat::Text => self.write_text_summary(summary)?,
            OutputFormat::Json => self.write_json(summary)?,
            OutputFormat::Csv => self.write_csv()?,
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Consumes the formatter, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_text(&mut self, outcome: &FileOutcome) -> Result<()> {
        match outcome {
            FileOutcome::Search(result) => self.write_text_matches(result),
            FileOutcome::Replace(outcome) => self.write_text_replacement(outcome),
        }
    }

    fn write_text_matches(&mut self, result: &FileResult) -> Result<()> {
        if result.records.is_empty() {
            return Ok(());
        }
        writeln!(self.writer, "{}", self.palette.bold_green(result.path.display()))?;
        for record in &result.records {
            writeln!(
                self.writer,
                "{}: {}",
                self.palette.bold(record.line_number),
                record.rendered
            )?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_text_replacement(&mut self, outcome: &ReplacementOutcome) -> Result<()> {
        if outcome.occurrences == 0 {
            return Ok(());
        }
        let prefix = if outcome.mutated { "" } else { "DRY " };
        writeln!(
            self.writer,
            "{}{} ({} occurrences)",
            prefix,
            self.palette.bold_green(outcome.path.display()),
            self.palette.green(outcome.occurrences)
        )?;
        Ok(())
    }

    fn write_text_summary(&mut self, summary: &Summary) -> Result<()> {
        if summary.occurrences == 0 {
            return Ok(());
        }
        writeln!(
            self.writer,
            "occurrences={}, files-matching={}",
            self.palette.bold_green(summary.occurrences),
            self.palette.bold_green(summary.files_matching)
        )?;
        Ok(())
    }

    fn write_json(&mut self, summary: &Summary) -> Result<()> {
        #[derive(Serialize)]
        struct JsonOutput<'a> {
            tool: ToolInfo,
            generated_at: DateTime<Utc>,
            mode: Mode,
            files: &'a [FileOutcome],
            summary: &'a Summary,
        }

        #[derive(Serialize)]
        struct ToolInfo {
            name: &'static str,
            version: &'static str,
        }

        let output = JsonOutput {
            tool: ToolInfo {
                name: env!("CARGO_PKG_NAME"),
                version: env!("CARGO_PKG_VERSION"),
            },
            generated_at: Utc::now(),
            mode: self.mode,
            files: &self.matched,
            summary,
        };

        serde_json::to_writer_pretty(&mut self.writer, &output)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_csv(&mut self) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(&mut self.writer);

        match self.mode {
            Mode::Search => wtr.write_record(["File", "Line", "Content"])?,
            Mode::Replace => wtr.write_record(["File", "Occurrences", "Mutated"])?,
        }

        for outcome in &self.matched {
            match outcome {
                FileOutcome::Search(result) => {
                    let file = result.path.display().to_string();
                    for record in &result.records {
                        let line_number = record.line_number.to_string();
                        wtr.write_record([file.as_str(), line_number.as_str(), record.line.as_str()])?;
                    }
                }
                FileOutcome::Replace(outcome) => {
                    wtr.write_record([
                        outcome.path.display().to_string(),
                        outcome.occurrences.to_string(),
                        outcome.mutated.to_string(),
                    ])?;
                }
            }
        }

        wtr.flush()?;
        Ok(())
    }
}

impl<W: Write> Reporter for OutputFormatter<W> {
    fn file(&mut self, outcome: &FileOutcome) -> Result<()> {
        if outcome.occurrences() == 0 {
            return Ok(());
        }
        match self.format {
            OutputFormat::Text => self.write_text(outcome),
            OutputFormat::Json | OutputFormat::Csv => {
                self.matched.push(outcome.clone());
                Ok(())
            }
        }
    }

    fn file_error(&mut self, error: &Error) {
        eprintln!("warning: {error}");
    }
}
