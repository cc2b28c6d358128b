//! Electron distribution packager CLI entrypoint.
//!
//! This binary resolves the run configuration from flags, `dist.toml` and the
//! checkout, then runs the packaging pipeline with the real build executor,
//! HTTP downloader and tarball extractor.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use electron_dist::builder::SystemCommandExecutor;
use electron_dist::cli::Cli;
use electron_dist::config::DistConfig;
use electron_dist::download::HttpDownloader;
use electron_dist::error::{DistError, Result};
use electron_dist::extraction::TarGzExtractor;
use electron_dist::logging;
use electron_dist::output::{DryRunInfo, success_message, write_stderr_line};
use electron_dist::pipeline::{Collaborators, Pipeline};
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    let mut stderr = std::io::stderr();
    if let Err(e) = logging::init(logging::level_for(cli.verbosity, cli.quiet)) {
        write_stderr_line(&mut stderr, format!("logging unavailable: {e}"));
    }
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let source_root = resolve_source_root(cli.source_root.as_deref())?;
    let config = DistConfig::resolve(&source_root, &cli.to_overrides()?)?;

    // Dry-run mode: show what would be done without side effects
    if cli.dry_run {
        write_stderr_line(stderr, DryRunInfo { config: &config }.display_text());
        return Ok(());
    }

    let downloader = HttpDownloader::new(config.download_timeout);
    let outcome = Pipeline::new(&config, Collaborators {
        executor: &SystemCommandExecutor,
        downloader: &downloader,
        extractor: &TarGzExtractor,
    })
    .run()?;

    if !cli.quiet {
        write_stderr_line(stderr, success_message(&outcome));
    }
    Ok(())
}

/// Resolves the checkout root to an absolute UTF-8 path.
fn resolve_source_root(requested: Option<&Utf8Path>) -> Result<Utf8PathBuf> {
    let root = match requested {
        Some(path) => path.to_owned(),
        None => {
            let cwd = std::env::current_dir()?;
            Utf8PathBuf::try_from(cwd).map_err(|e| DistError::NonUtf8Path {
                path: e.into_path_buf(),
            })?
        }
    };
    root.canonicalize_utf8().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DistError::MissingArtefact { path: root },
        _ => DistError::Io(e),
    })
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}
