//! The main entry point for the `andgrep` command-line application.
//!
//! This file parses the command line, sets up logging and hands the
//! validated configuration to the walker.

use andgrep::cli::{self, Args};
use andgrep::highlight::Palette;
use andgrep::output_formatter::OutputFormat;
use andgrep::{Engine, OutputFormatter, Walker};
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = cli::parse_args();
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = args.build_config()?;
    anyhow::ensure!(
        config.root.exists(),
        "no such file or directory: {}",
        config.root.display()
    );

    let palette = Palette::new(args.format == OutputFormat::Text && args.color.enabled());
    let engine = Engine::new(&config, palette)?;

    let mut formatter = OutputFormatter::new(io::stdout().lock(), args.format, config.mode, palette);
    let summary = Walker::new(&config).run(&engine, &mut formatter)?;
    formatter.finish(&summary)?;

    Ok(())
}

/// Logs go to stderr: warnings by default, this crate's debug output with
/// `--verbose`. `RUST_LOG` overrides both.
fn init_logging(verbose: bool) {
    let default = if verbose { "warn,andgrep=debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
