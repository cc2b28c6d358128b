//! Run configuration.
//!
//! Everything a packaging run needs (source layout, platform, architecture,
//! metadata, library source, build and download settings) is resolved once
//! into a [`DistConfig`] and passed by reference into every stage. Values
//! come from, in order of precedence: command-line overrides, the optional
//! `dist.toml` file, project metadata and the environment, then defaults.

use crate::error::{DistError, Result};
use crate::metadata::ProjectMetadata;
use crate::platform::{Arch, Platform, PlatformAssets};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::Deserialize;
use std::time::Duration;

/// Name of the optional configuration file in the source root.
pub const CONFIG_FILE: &str = "dist.toml";

/// Default distribution directory, relative to the source root.
///
/// Holds the checked-in `includes/` headers, the staging trees and `out/`.
pub const DEFAULT_DIST_DIR: &str = "eikon-3rdparty-dist";

/// Default build output directory, relative to the source root.
pub const DEFAULT_BUILD_DIR: &str = "out/R";

/// Default build entry point, relative to the source root.
pub const DEFAULT_BUILD_SCRIPT: &str = "script/build.py";

/// Default interpreter for the build entry point.
pub const DEFAULT_PYTHON: &str = "python";

/// Build configuration passed to the build entry point.
pub const BUILD_CONFIGURATION: &str = "Release";

/// Default base URL for prebuilt import libraries and source tarballs.
pub const DEFAULT_BASE_URL: &str = "https://electronjs.org/headers";

/// Default timeout applied to each HTTP request.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Name of the version marker written into the staging tree.
pub const VERSION_FILE: &str = "version.txt";

/// How the library is selected in configuration files and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LibrarySourceKind {
    /// Use the locally built library and the vendored Node tree.
    Local,
    /// Download the library and the Node source tarball.
    Remote,
}

/// Where the import library and the Node header tree come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibrarySource {
    /// Copy from the build output and `vendor/node`.
    Local,
    /// Download from `<base_url>/v<version>/...`.
    Remote {
        /// Base URL without a trailing slash.
        base_url: String,
    },
}

impl LibrarySource {
    /// The selector this source was built from.
    #[must_use]
    pub const fn kind(&self) -> LibrarySourceKind {
        match self {
            Self::Local => LibrarySourceKind::Local,
            Self::Remote { .. } => LibrarySourceKind::Remote,
        }
    }
}

/// Contents of `dist.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Distribution directory relative to the source root.
    pub dist_dir: Option<String>,
    /// Build output directory relative to the source root.
    pub build_dir: Option<String>,
    /// Interpreter for the build script.
    pub python: Option<String>,
    /// Build script relative to the source root.
    pub build_script: Option<String>,
    /// Kill the build after this many seconds.
    pub build_timeout_secs: Option<u64>,
    /// Library source selector.
    pub library_source: Option<LibrarySourceKind>,
    /// Base URL for remote downloads.
    pub base_url: Option<String>,
    /// Per-request download timeout in seconds.
    pub download_timeout_secs: Option<u64>,
    /// Target platform override.
    pub platform: Option<Platform>,
    /// Target architecture.
    pub arch: Option<Arch>,
    /// Version override.
    pub version: Option<String>,
}

impl FileConfig {
    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::Config`] for malformed TOML or unknown keys.
    pub fn parse(path: &Utf8Path, contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| DistError::Config {
            path: path.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Load `path`. When `required` is false a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::Config`] if the file is required but absent or
    /// cannot be parsed.
    pub fn load(path: &Utf8Path, required: bool) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(path, &contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                Ok(Self::default())
            }
            Err(e) => Err(DistError::Config {
                path: path.to_owned(),
                reason: e.to_string(),
            }),
        }
    }
}

/// Command-line overrides applied on top of the file configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Explicit configuration file path.
    pub config_file: Option<Utf8PathBuf>,
    /// Target platform.
    pub platform: Option<Platform>,
    /// Target architecture.
    pub arch: Option<Arch>,
    /// Version string.
    pub version: Option<String>,
    /// Library source selector.
    pub library_source: Option<LibrarySourceKind>,
    /// Base URL for remote downloads.
    pub base_url: Option<String>,
    /// Skip the build stage.
    pub skip_build: bool,
}

/// Settings for invoking the external build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    /// Interpreter used to run the script.
    pub python: String,
    /// Absolute path to the build script.
    pub script: Utf8PathBuf,
    /// Working directory for the build.
    pub working_dir: Utf8PathBuf,
    /// Optional wall-clock limit.
    pub timeout: Option<Duration>,
    /// Whether the build stage is skipped entirely.
    pub skip: bool,
}

impl BuildSettings {
    /// Arguments passed to the interpreter.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        vec![
            self.script.to_string(),
            "-c".to_owned(),
            BUILD_CONFIGURATION.to_owned(),
        ]
    }
}

/// Every path a run reads from or writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistLayout {
    /// Root of the runtime checkout.
    pub source_root: Utf8PathBuf,
    /// Build output directory (`out/R`).
    pub build_dir: Utf8PathBuf,
    /// Distribution directory; holds checked-in headers and the output.
    pub dist_root: Utf8PathBuf,
    /// Versioned staging directory, `<dist>/<version>`.
    pub staging_dir: Utf8PathBuf,
    /// `<staging>/<arch>/bin`.
    pub bin_dir: Utf8PathBuf,
    /// `<staging>/<arch>/lib`.
    pub lib_dir: Utf8PathBuf,
    /// `<staging>/includes`.
    pub include_dir: Utf8PathBuf,
    /// `<staging>/version.txt`.
    pub version_file: Utf8PathBuf,
    /// `<dist>/out/<project>/<project><version>.zip`.
    pub archive_path: Utf8PathBuf,
}

impl DistLayout {
    /// Derive the layout for one run.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use electron_dist::config::{DEFAULT_DIST_DIR, DistLayout};
    /// use electron_dist::metadata::ProjectMetadata;
    /// use electron_dist::platform::Arch;
    ///
    /// let metadata = ProjectMetadata::new("electron", "Electron", "1.2.3");
    /// let layout = DistLayout::new(Utf8Path::new("/src"), DEFAULT_DIST_DIR, "out/R", Arch::X64, &metadata);
    /// assert_eq!(layout.bin_dir, "/src/eikon-3rdparty-dist/1.2.3/x64/bin");
    /// assert_eq!(
    ///     layout.archive_path,
    ///     "/src/eikon-3rdparty-dist/out/electron/electron1.2.3.zip"
    /// );
    /// ```
    #[must_use]
    pub fn new(
        source_root: &Utf8Path,
        dist_dir: &str,
        build_dir: &str,
        arch: Arch,
        metadata: &ProjectMetadata,
    ) -> Self {
        let dist_root = source_root.join(dist_dir);
        let staging_dir = dist_root.join(metadata.version());
        let arch_dir = staging_dir.join(arch.as_str());
        let archive_name = format!("{}{}.zip", metadata.project_name(), metadata.version());
        Self {
            source_root: source_root.to_owned(),
            build_dir: source_root.join(build_dir),
            bin_dir: arch_dir.join("bin"),
            lib_dir: arch_dir.join("lib"),
            include_dir: staging_dir.join("includes"),
            version_file: staging_dir.join(VERSION_FILE),
            archive_path: dist_root
                .join("out")
                .join(metadata.project_name())
                .join(archive_name),
            staging_dir,
            dist_root,
        }
    }

    /// Checked-in headers shipped alongside the component headers.
    #[must_use]
    pub fn checked_in_includes(&self) -> Utf8PathBuf {
        self.dist_root.join("includes")
    }

    /// The vendored Node tree used in local mode.
    #[must_use]
    pub fn vendored_node_tree(&self) -> Utf8PathBuf {
        self.source_root.join("vendor").join("node")
    }
}

/// Immutable configuration for a single packaging run.
#[derive(Debug, Clone)]
pub struct DistConfig {
    /// Target platform.
    pub platform: Platform,
    /// Target architecture.
    pub arch: Arch,
    /// Project names and version.
    pub metadata: ProjectMetadata,
    /// Import library and header tree source.
    pub library_source: LibrarySource,
    /// External build settings.
    pub build: BuildSettings,
    /// Per-request download timeout.
    pub download_timeout: Duration,
    /// Resolved paths.
    pub layout: DistLayout,
}

impl DistConfig {
    /// Resolve the configuration for `source_root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed, metadata is
    /// incomplete, or the platform or architecture cannot be determined.
    pub fn resolve(source_root: &Utf8Path, overrides: &Overrides) -> Result<Self> {
        let file = match &overrides.config_file {
            Some(path) => FileConfig::load(path, true)?,
            None => FileConfig::load(&source_root.join(CONFIG_FILE), false)?,
        };
        Self::from_parts(source_root, &file, overrides)
    }

    /// Combine an already-loaded file configuration with overrides.
    ///
    /// # Errors
    ///
    /// See [`DistConfig::resolve`].
    pub fn from_parts(
        source_root: &Utf8Path,
        file: &FileConfig,
        overrides: &Overrides,
    ) -> Result<Self> {
        let version = overrides.version.as_deref().or(file.version.as_deref());
        let metadata = ProjectMetadata::load(source_root, version)?;

        let platform = match overrides.platform.or(file.platform) {
            Some(platform) => platform,
            None => Platform::current()?,
        };
        let arch = match overrides.arch.or(file.arch) {
            Some(arch) => arch,
            None => Arch::from_env()?.unwrap_or_default(),
        };

        let library_source = match overrides
            .library_source
            .or(file.library_source)
            .unwrap_or(LibrarySourceKind::Local)
        {
            LibrarySourceKind::Local => LibrarySource::Local,
            LibrarySourceKind::Remote => {
                let base_url = overrides
                    .base_url
                    .as_deref()
                    .or(file.base_url.as_deref())
                    .unwrap_or(DEFAULT_BASE_URL);
                LibrarySource::Remote {
                    base_url: base_url.trim_end_matches('/').to_owned(),
                }
            }
        };

        let build = BuildSettings {
            python: file
                .python
                .clone()
                .unwrap_or_else(|| DEFAULT_PYTHON.to_owned()),
            script: source_root.join(
                file.build_script
                    .as_deref()
                    .unwrap_or(DEFAULT_BUILD_SCRIPT),
            ),
            working_dir: source_root.to_owned(),
            timeout: file.build_timeout_secs.map(Duration::from_secs),
            skip: overrides.skip_build,
        };

        let layout = DistLayout::new(
            source_root,
            file.dist_dir.as_deref().unwrap_or(DEFAULT_DIST_DIR),
            file.build_dir.as_deref().unwrap_or(DEFAULT_BUILD_DIR),
            arch,
            &metadata,
        );

        let config = Self {
            platform,
            arch,
            metadata,
            library_source,
            build,
            download_timeout: file
                .download_timeout_secs
                .map_or(DEFAULT_DOWNLOAD_TIMEOUT, Duration::from_secs),
            layout,
        };
        debug!("resolved configuration: {config:?}");
        Ok(config)
    }

    /// The asset tables for the configured platform.
    #[must_use]
    pub fn assets(&self) -> PlatformAssets {
        self.platform.assets(&self.metadata)
    }

    /// The version string for this run.
    #[must_use]
    pub fn version(&self) -> &str {
        self.metadata.version()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
