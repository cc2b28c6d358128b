//! Platform and architecture selection with their fixed packaging tables.
//!
//! Each [`Platform`] maps to an immutable [`PlatformAssets`] record listing
//! the build outputs that must be shipped. Entries that depend on the
//! project or product name are expressed as [`AssetName`] variants and
//! rendered against [`ProjectMetadata`] when the record is built.

use crate::error::{DistError, Result};
use crate::metadata::ProjectMetadata;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// A packaging target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// macOS; ships the application bundle.
    Darwin,
    /// Windows.
    Win32,
    /// Linux.
    Linux,
}

/// A single entry in a platform table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetName {
    /// A filename used verbatim.
    Literal(&'static str),
    /// `<project>`, the bare executable name.
    ProjectBinary,
    /// `<project>.exe`.
    ProjectExe,
    /// `<product>.app`.
    ProductApp,
}

impl AssetName {
    fn render(self, metadata: &ProjectMetadata) -> String {
        match self {
            Self::Literal(name) => name.to_owned(),
            Self::ProjectBinary => metadata.project_name().to_owned(),
            Self::ProjectExe => format!("{}.exe", metadata.project_name()),
            Self::ProductApp => format!("{}.app", metadata.product_name()),
        }
    }
}

const WIN32_BINARIES: &[AssetName] = &[
    AssetName::ProjectExe,
    AssetName::Literal("content_shell.pak"),
    AssetName::Literal("d3dcompiler_47.dll"),
    AssetName::Literal("icudtl.dat"),
    AssetName::Literal("libEGL.dll"),
    AssetName::Literal("libGLESv2.dll"),
    AssetName::Literal("ffmpeg.dll"),
    AssetName::Literal("node.dll"),
    AssetName::Literal("blink_image_resources_200_percent.pak"),
    AssetName::Literal("content_resources_200_percent.pak"),
    AssetName::Literal("ui_resources_200_percent.pak"),
    AssetName::Literal("views_resources_200_percent.pak"),
    AssetName::Literal("xinput1_3.dll"),
    AssetName::Literal("natives_blob.bin"),
    AssetName::Literal("snapshot_blob.bin"),
];

const LINUX_BINARIES: &[AssetName] = &[
    AssetName::ProjectBinary,
    AssetName::Literal("content_shell.pak"),
    AssetName::Literal("icudtl.dat"),
    AssetName::Literal("libffmpeg.so"),
    AssetName::Literal("libnode.so"),
    AssetName::Literal("blink_image_resources_200_percent.pak"),
    AssetName::Literal("content_resources_200_percent.pak"),
    AssetName::Literal("ui_resources_200_percent.pak"),
    AssetName::Literal("views_resources_200_percent.pak"),
    AssetName::Literal("natives_blob.bin"),
    AssetName::Literal("snapshot_blob.bin"),
];

const RESOURCE_DIRECTORIES: &[AssetName] = &[
    AssetName::Literal("resources"),
    AssetName::Literal("locales"),
];

const DARWIN_DIRECTORIES: &[AssetName] = &[AssetName::ProductApp];

/// The build outputs shipped for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformAssets {
    /// Files copied verbatim into `<arch>/bin`, in table order.
    pub binaries: Vec<String>,
    /// Directories copied recursively into `<arch>/bin`, in table order.
    pub directories: Vec<String>,
    /// Build-output import library staged as `<project>.lib` in local mode.
    pub import_library: &'static str,
}

impl Platform {
    /// All supported platforms.
    pub const ALL: [Self; 3] = [Self::Darwin, Self::Win32, Self::Linux];

    /// Resolve the platform of the running host.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::UnsupportedPlatform`] on any host other than
    /// macOS, Windows or Linux.
    pub fn current() -> Result<Self> {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value to a platform.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::UnsupportedPlatform`] for unknown operating systems.
    pub fn from_os(os: &str) -> Result<Self> {
        match os {
            "macos" => Ok(Self::Darwin),
            "windows" => Ok(Self::Win32),
            "linux" => Ok(Self::Linux),
            other => Err(DistError::UnsupportedPlatform {
                os: other.to_owned(),
            }),
        }
    }

    /// The platform tag (`darwin`, `win32`, `linux`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Darwin => "darwin",
            Self::Win32 => "win32",
            Self::Linux => "linux",
        }
    }

    /// Build the asset record for this platform.
    ///
    /// # Examples
    ///
    /// ```
    /// use electron_dist::metadata::ProjectMetadata;
    /// use electron_dist::platform::Platform;
    ///
    /// let metadata = ProjectMetadata::new("electron", "Electron", "1.2.3");
    /// let assets = Platform::Win32.assets(&metadata);
    /// assert_eq!(assets.binaries[0], "electron.exe");
    /// assert_eq!(assets.import_library, "node.dll.lib");
    /// ```
    #[must_use]
    pub fn assets(self, metadata: &ProjectMetadata) -> PlatformAssets {
        let (binaries, directories, import_library) = match self {
            Self::Darwin => (&[][..], DARWIN_DIRECTORIES, "libnode.dylib"),
            Self::Win32 => (WIN32_BINARIES, RESOURCE_DIRECTORIES, "node.dll.lib"),
            Self::Linux => (LINUX_BINARIES, RESOURCE_DIRECTORIES, "libnode.so"),
        };
        PlatformAssets {
            binaries: binaries.iter().map(|a| a.render(metadata)).collect(),
            directories: directories.iter().map(|a| a.render(metadata)).collect(),
            import_library,
        }
    }
}

impl FromStr for Platform {
    type Err = DistError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| DistError::InvalidPlatform {
                value: s.to_owned(),
            })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target CPU architecture of the packaged build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// 32-bit x86.
    Ia32,
    /// 64-bit x86.
    #[default]
    X64,
    /// 32-bit ARM.
    Arm,
    /// 64-bit ARM.
    Arm64,
}

/// Environment variable consulted when no architecture is configured.
pub const TARGET_ARCH_ENV: &str = "TARGET_ARCH";

impl Arch {
    /// All supported architectures.
    pub const ALL: [Self; 4] = [Self::Ia32, Self::X64, Self::Arm, Self::Arm64];

    /// The architecture tag used in paths and URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ia32 => "ia32",
            Self::X64 => "x64",
            Self::Arm => "arm",
            Self::Arm64 => "arm64",
        }
    }

    /// Read the architecture from `TARGET_ARCH`, if set.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::InvalidArch`] if the variable holds an unknown tag.
    pub fn from_env() -> Result<Option<Self>> {
        match std::env::var(TARGET_ARCH_ENV) {
            Ok(value) if !value.trim().is_empty() => value.trim().parse().map(Some),
            _ => Ok(None),
        }
    }
}

impl FromStr for Arch {
    type Err = DistError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| DistError::InvalidArch {
                value: s.to_owned(),
            })
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
