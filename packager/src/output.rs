//! User-facing output for the packager CLI.
//!
//! Progress goes through the `log` facade; the summary printed at the end of
//! a run and the dry-run report are written here directly to stderr.

use crate::config::{DistConfig, LibrarySource};
use crate::pipeline::{PipelineOutcome, PipelineState};
use std::io::Write;

/// Write `message` and a newline, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Format the summary printed after a successful run.
#[must_use]
pub fn success_message(outcome: &PipelineOutcome) -> String {
    let mut message = format!(
        "Packaged {} ({} headers, sha256 {})",
        outcome.archive.path, outcome.headers, outcome.archive.sha256
    );
    if outcome.state == PipelineState::Archived {
        message.push_str("; staging tree was left in place");
    }
    message
}

/// Configuration information for dry-run output.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use electron_dist::config::{DistConfig, FileConfig, Overrides};
/// use electron_dist::output::DryRunInfo;
/// use electron_dist::platform::{Arch, Platform};
///
/// let overrides = Overrides {
///     platform: Some(Platform::Linux),
///     arch: Some(Arch::X64),
///     version: Some("1.2.3".to_owned()),
///     ..Overrides::default()
/// };
/// let root = std::env::temp_dir();
/// let root = Utf8Path::from_path(&root).expect("UTF-8 temp dir");
/// let config = DistConfig::from_parts(root, &FileConfig::default(), &overrides)
///     .expect("config");
///
/// let output = DryRunInfo { config: &config }.display_text();
/// assert!(output.contains("Dry run"));
/// assert!(output.contains("electron1.2.3.zip"));
/// ```
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// The fully resolved run configuration.
    pub config: &'a DistConfig,
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let config = self.config;
        let layout = &config.layout;
        let assets = config.assets();
        let build = if config.build.skip {
            "skipped".to_owned()
        } else {
            format!("{} {}", config.build.python, config.build.args().join(" "))
        };
        let library = match &config.library_source {
            LibrarySource::Local => format!(
                "local ({})",
                layout.build_dir.join(assets.import_library)
            ),
            LibrarySource::Remote { base_url } => format!("remote ({base_url})"),
        };

        let mut lines = vec![
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Source root: {}", layout.source_root),
            format!("Project: {}", config.metadata.project_name()),
            format!("Product: {}", config.metadata.product_name()),
            format!("Version: {}", config.version()),
            format!("Platform: {}", config.platform),
            format!("Arch: {}", config.arch),
            format!("Build: {build}"),
            format!("Library source: {library}"),
            format!("Staging directory: {}", layout.staging_dir),
            format!("Archive: {}", layout.archive_path),
        ];

        lines.push(String::new());
        lines.push("Binaries:".to_owned());
        for name in &assets.binaries {
            lines.push(format!("  - {name}"));
        }
        lines.push("Directories:".to_owned());
        for name in &assets.directories {
            lines.push(format!("  - {name}/"));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveOutput;
    use crate::config::{FileConfig, LibrarySourceKind, Overrides};
    use crate::platform::{Arch, Platform};
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn outcome() -> PipelineOutcome {
        PipelineOutcome {
            archive: ArchiveOutput {
                path: Utf8PathBuf::from("/src/eikon-3rdparty-dist/out/electron/electron1.2.3.zip"),
                sha256: "ab".repeat(32),
                entries: 42,
            },
            headers: 9,
            state: PipelineState::Cleaned,
        }
    }

    fn config(platform: Platform, source: LibrarySourceKind) -> (TempDir, DistConfig) {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        let overrides = Overrides {
            platform: Some(platform),
            arch: Some(Arch::Ia32),
            version: Some("1.2.3".to_owned()),
            library_source: Some(source),
            ..Overrides::default()
        };
        let config = DistConfig::from_parts(&root, &FileConfig::default(), &overrides)
            .expect("config");
        (temp, config)
    }

    #[rstest]
    fn success_message_names_archive(outcome: PipelineOutcome) {
        let msg = success_message(&outcome);
        assert!(msg.contains("electron1.2.3.zip"));
        assert!(msg.contains("9 headers"));
        assert!(!msg.contains("left in place"));
    }

    #[rstest]
    fn success_message_mentions_leftover_staging(outcome: PipelineOutcome) {
        let outcome = PipelineOutcome {
            state: PipelineState::Archived,
            ..outcome
        };
        assert!(success_message(&outcome).contains("left in place"));
    }

    #[test]
    fn dry_run_lists_platform_tables() {
        let (_temp, config) = config(Platform::Win32, LibrarySourceKind::Local);
        let text = DryRunInfo { config: &config }.display_text();

        assert!(text.contains("Platform: win32"));
        assert!(text.contains("Arch: ia32"));
        assert!(text.contains("  - electron.exe"));
        assert!(text.contains("  - locales/"));
        assert!(text.contains("node.dll.lib"));
    }

    #[test]
    fn dry_run_shows_remote_base_url() {
        let (_temp, config) = config(Platform::Darwin, LibrarySourceKind::Remote);
        let text = DryRunInfo { config: &config }.display_text();

        assert!(text.contains("remote (https://electronjs.org/headers)"));
        assert!(text.contains("  - Electron.app/"));
    }

    #[test]
    fn write_stderr_line_appends_newline() {
        let mut buffer = Vec::new();
        write_stderr_line(&mut buffer, "hello");
        assert_eq!(buffer, b"hello\n");
    }
}
