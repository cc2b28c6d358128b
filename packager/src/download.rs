//! HTTP retrieval of the prebuilt import library and the Node source tarball.
//!
//! Remote mode mirrors the layout of an Electron headers server:
//! `<base>/v<version>/node.lib` (ia32), `<base>/v<version>/<arch>/node.lib`
//! and `<base>/v<version>/node-v<version>.tar.gz`. Downloads go through the
//! [`ArtefactDownloader`] trait so tests never touch the network.

use crate::platform::Arch;
use log::{debug, warn};
use std::path::Path;
use std::time::Duration;

/// Attempts made for a single URL before giving up on transport failures.
const MAX_ATTEMPTS: u32 = 3;

/// Pause before the second attempt; doubles for each further attempt.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Trait for downloading remote artefacts to disk.
///
/// # Examples
///
/// ```
/// use electron_dist::download::HttpDownloader;
/// use std::time::Duration;
///
/// let downloader = HttpDownloader::new(Duration::from_secs(30));
/// // Use downloader.download_to_file(url, dest) in production
/// # let _ = downloader;
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArtefactDownloader {
    /// Fetch `url` and write the response body to `dest`.
    ///
    /// On failure no file is left at `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::NotFound`] for HTTP 404,
    /// [`DownloadError::HttpError`] for other HTTP or transport failures and
    /// [`DownloadError::Io`] if the destination cannot be written.
    fn download_to_file(&self, url: &str, dest: &Path) -> Result<(), DownloadError>;
}

/// Errors arising from artefact download operations.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested artefact was not found (HTTP 404).
    #[error("artefact not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// I/O error writing the downloaded file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}

/// URL of the prebuilt import library for `arch`.
///
/// # Examples
///
/// ```
/// use electron_dist::download::library_url;
/// use electron_dist::platform::Arch;
///
/// assert_eq!(
///     library_url("https://electronjs.org/headers", "1.2.3", Arch::Ia32),
///     "https://electronjs.org/headers/v1.2.3/node.lib"
/// );
/// assert_eq!(
///     library_url("https://electronjs.org/headers", "1.2.3", Arch::X64),
///     "https://electronjs.org/headers/v1.2.3/x64/node.lib"
/// );
/// ```
#[must_use]
pub fn library_url(base_url: &str, version: &str, arch: Arch) -> String {
    match arch {
        Arch::Ia32 => format!("{base_url}/v{version}/node.lib"),
        other => format!("{base_url}/v{version}/{other}/node.lib"),
    }
}

/// URL of the Node source tarball published alongside the library.
#[must_use]
pub fn source_tarball_url(base_url: &str, version: &str) -> String {
    format!("{base_url}/v{version}/node-v{version}.tar.gz")
}

/// File name of the source tarball for `version`.
#[must_use]
pub fn source_tarball_name(version: &str) -> String {
    format!("node-v{version}.tar.gz")
}

/// HTTP-based downloader using `ureq`.
pub struct HttpDownloader {
    agent: ureq::Agent,
}

impl HttpDownloader {
    /// Create a downloader whose requests each time out after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }

    fn fetch_once(&self, url: &str, dest: &Path) -> Result<(), Failure> {
        let response = self.agent.get(url).call().map_err(|e| Failure {
            transient: is_transient(&e),
            error: map_ureq_error(url, &e),
        })?;
        let mut file = std::fs::File::create(dest).map_err(|e| Failure {
            transient: false,
            error: DownloadError::Io(e),
        })?;
        std::io::copy(&mut response.into_body().as_reader(), &mut file).map_err(|e| Failure {
            transient: true,
            error: DownloadError::HttpError {
                url: url.to_owned(),
                reason: e.to_string(),
            },
        })?;
        Ok(())
    }
}

impl ArtefactDownloader for HttpDownloader {
    fn download_to_file(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        let mut attempt = 1;
        loop {
            debug!("GET {url} (attempt {attempt}/{MAX_ATTEMPTS})");
            match self.fetch_once(url, dest) {
                Ok(()) => return Ok(()),
                Err(failure) => {
                    remove_partial(dest);
                    if !failure.transient || attempt >= MAX_ATTEMPTS {
                        return Err(failure.error);
                    }
                    warn!("{}; retrying", failure.error);
                    std::thread::sleep(RETRY_BACKOFF * 2_u32.pow(attempt - 1));
                    attempt += 1;
                }
            }
        }
    }
}

/// A failed attempt and whether another attempt may succeed.
struct Failure {
    error: DownloadError,
    transient: bool,
}

fn remove_partial(dest: &Path) {
    match std::fs::remove_file(dest) {
        Ok(()) => debug!("removed partial download {}", dest.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("could not remove partial download {}: {e}", dest.display()),
    }
}

/// HTTP status errors are final; everything else is a transport problem.
fn is_transient(err: &ureq::Error) -> bool {
    !matches!(err, ureq::Error::StatusCode(_))
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
