//! CLI argument definitions for the distribution packager.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::config::{LibrarySourceKind, Overrides};
use crate::error::Result;
use crate::platform::{Arch, Platform};
use camino::Utf8PathBuf;
use clap::Parser;

/// Package a built Electron runtime for native module consumers.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "electron-dist")]
#[command(version, about)]
#[command(long_about = concat!(
    "Package a built Electron runtime for native module consumers.\n\n",
    "Runs the runtime build, stages the platform binaries, the import library ",
    "and the third-party headers (node, v8, uv, zlib, http_parser, nan) into ",
    "<dist>/<version>, and zips the result to ",
    "<dist>/out/<project>/<project><version>.zip.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Build and package the checkout in the current directory:\n",
    "    $ electron-dist\n\n",
    "  Package an existing ia32 build with a prebuilt import library:\n",
    "    $ electron-dist --skip-build --arch ia32 --library-source remote\n\n",
    "  Preview the resolved configuration:\n",
    "    $ electron-dist --dry-run",
))]
pub struct Cli {
    /// Root of the runtime checkout [default: current directory].
    #[arg(short = 's', long, value_name = "DIR")]
    pub source_root: Option<Utf8PathBuf>,

    /// Configuration file [default: dist.toml in the source root, if present].
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Target platform (darwin, win32, linux) [default: host].
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Option<String>,

    /// Target architecture (ia32, x64, arm, arm64) [default: $TARGET_ARCH or x64].
    #[arg(long, value_name = "ARCH")]
    pub arch: Option<String>,

    /// Override the version read from electron.gyp.
    #[arg(long, value_name = "VERSION")]
    pub dist_version: Option<String>,

    /// Where the import library and Node headers come from.
    #[arg(long, value_enum, value_name = "SOURCE")]
    pub library_source: Option<LibrarySourceKind>,

    /// Base URL for remote downloads.
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Package the existing build output without running the build.
    #[arg(long)]
    pub skip_build: bool,

    /// Show the resolved configuration and exit without side effects.
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only report errors.
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Convert the flags into configuration overrides.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DistError::InvalidPlatform`] or
    /// [`crate::error::DistError::InvalidArch`] for unknown tags.
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::Parser;
    /// use electron_dist::cli::Cli;
    /// use electron_dist::platform::Arch;
    ///
    /// let cli = Cli::parse_from(["electron-dist", "--arch", "arm64", "--skip-build"]);
    /// let overrides = cli.to_overrides().expect("valid flags");
    /// assert_eq!(overrides.arch, Some(Arch::Arm64));
    /// assert!(overrides.skip_build);
    /// ```
    pub fn to_overrides(&self) -> Result<Overrides> {
        Ok(Overrides {
            config_file: self.config.clone(),
            platform: self.platform.as_deref().map(str::parse::<Platform>).transpose()?,
            arch: self.arch.as_deref().map(str::parse::<Arch>).transpose()?,
            version: self.dist_version.clone(),
            library_source: self.library_source,
            base_url: self.base_url.clone(),
            skip_build: self.skip_build,
        })
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
