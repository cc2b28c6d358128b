//! Error types for the distribution packager.
//!
//! Every failure in the pipeline is fatal for the run. The variants below
//! classify what went wrong so the CLI can print an actionable message; the
//! only recovery anywhere is best-effort cleanup of the staging tree.

use crate::archive::ArchiveError;
use crate::download::DownloadError;
use crate::extraction::ExtractionError;
use camino::Utf8PathBuf;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while packaging a distribution.
#[derive(Debug, Error)]
pub enum DistError {
    /// The host operating system has no packaging table.
    #[error("unsupported host operating system \"{os}\"; expected macos, windows or linux")]
    UnsupportedPlatform {
        /// The value of `std::env::consts::OS`.
        os: String,
    },

    /// A platform override did not name a known platform.
    #[error("unknown platform \"{value}\"; expected one of: darwin, win32, linux")]
    InvalidPlatform {
        /// The rejected platform tag.
        value: String,
    },

    /// An architecture override did not name a known architecture.
    #[error("unknown target architecture \"{value}\"; expected one of: ia32, x64, arm, arm64")]
    InvalidArch {
        /// The rejected architecture tag.
        value: String,
    },

    /// Project metadata could not be read or lacked a required value.
    #[error("invalid project metadata in {path}: {reason}")]
    Metadata {
        /// The metadata file that was consulted.
        path: Utf8PathBuf,
        /// Description of what was missing or malformed.
        reason: String,
    },

    /// The `dist.toml` configuration file could not be read or parsed.
    #[error("invalid configuration file {path}: {reason}")]
    Config {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// Description of the parse error.
        reason: String,
    },

    /// The external build exited unsuccessfully.
    #[error("build failed ({status}): {reason}")]
    BuildFailed {
        /// Human-readable exit status (`exit code 2`, `terminated by signal`).
        status: String,
        /// Captured diagnostic output or context.
        reason: String,
    },

    /// The external build did not finish within the configured timeout.
    #[error("build timed out after {seconds} seconds")]
    BuildTimedOut {
        /// The timeout that elapsed.
        seconds: u64,
    },

    /// A file or directory required by the package does not exist.
    #[error("required artefact not found: {path}")]
    MissingArtefact {
        /// The absent path.
        path: Utf8PathBuf,
    },

    /// A staging filesystem operation failed.
    #[error("staging failed at {path}: {source}")]
    Staging {
        /// Path the operation was acting on.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A header component directory exists but contains no headers.
    #[error("no headers matching *.h found for {component} in {dir}")]
    NoHeaders {
        /// Component name (`v8`, `uv`, ...).
        component: &'static str,
        /// The directory that was searched.
        dir: Utf8PathBuf,
    },

    /// A path could not be represented as UTF-8.
    #[error("path is not valid UTF-8: {}", path.display())]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },

    /// Fetching the import library or source tarball failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Unpacking the downloaded source tarball failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Writing the zip archive failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl DistError {
    /// Wrap an I/O error raised while touching `path` during staging.
    pub fn staging(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Staging {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias using [`DistError`].
pub type Result<T> = std::result::Result<T, DistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_failed_includes_status_and_reason() {
        let err = DistError::BuildFailed {
            status: "exit code 2".to_owned(),
            reason: "ninja: build stopped".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exit code 2"));
        assert!(msg.contains("ninja: build stopped"));
    }

    #[test]
    fn missing_artefact_names_the_path() {
        let err = DistError::MissingArtefact {
            path: Utf8PathBuf::from("/src/out/R/libnode.so"),
        };
        assert!(err.to_string().contains("/src/out/R/libnode.so"));
    }

    #[test]
    fn staging_error_preserves_source() {
        let err = DistError::staging(
            "/dist/1.2.3",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/dist/1.2.3"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn download_errors_are_transparent() {
        let err = DistError::from(DownloadError::NotFound {
            url: "https://example.test/v1.2.3/node.lib".to_owned(),
        });
        assert_eq!(
            err.to_string(),
            "artefact not found: https://example.test/v1.2.3/node.lib"
        );
    }

    #[test]
    fn no_headers_names_component() {
        let err = DistError::NoHeaders {
            component: "uv",
            dir: Utf8PathBuf::from("/src/vendor/node/deps/uv/include"),
        };
        let msg = err.to_string();
        assert!(msg.contains("uv"));
        assert!(msg.contains("*.h"));
    }
}
