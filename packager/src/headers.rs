//! Third-party header collection.
//!
//! Each bundled component contributes the `*.h` files of one directory to
//! `includes/<component>`. Most components live in a Node tree: the vendored
//! checkout in local mode, or the extracted source tarball in remote mode.
//! NAN and the `electron.h` helper header are checked in under the dist root.

use crate::config::{DistConfig, LibrarySource};
use crate::download::{ArtefactDownloader, source_tarball_name, source_tarball_url};
use crate::error::{DistError, Result};
use crate::extraction::ArtefactExtractor;
use crate::stager::{copy_file, require_dir};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::io;
use tempfile::TempDir;

/// Helper header copied to the top of `includes`.
pub const HELPER_HEADER: &str = "electron.h";

/// Where a component's headers are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderRoot {
    /// Relative to the Node tree.
    NodeTree,
    /// Relative to `<dist>/includes`.
    CheckedIn,
}

/// One component's header directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeaderComponent {
    name: &'static str,
    root: HeaderRoot,
    dir: &'static str,
}

const COMPONENTS: &[HeaderComponent] = &[
    HeaderComponent {
        name: "node",
        root: HeaderRoot::NodeTree,
        dir: "src",
    },
    HeaderComponent {
        name: "v8",
        root: HeaderRoot::NodeTree,
        dir: "deps/v8/include",
    },
    HeaderComponent {
        name: "uv",
        root: HeaderRoot::NodeTree,
        dir: "deps/uv/include",
    },
    HeaderComponent {
        name: "zlib",
        root: HeaderRoot::NodeTree,
        dir: "deps/zlib",
    },
    HeaderComponent {
        name: "http_parser",
        root: HeaderRoot::NodeTree,
        dir: "deps/http_parser",
    },
    HeaderComponent {
        name: "nan",
        root: HeaderRoot::CheckedIn,
        dir: "nan",
    },
];

/// Single headers copied outside the per-component globs: (source relative
/// to the Node tree, destination relative to `includes`).
const NODE_TREE_EXTRAS: &[(&str, &str)] = &[(
    "deps/v8/include/libplatform/libplatform.h",
    "v8/libplatform/libplatform.h",
)];

/// A Node source tree to read component headers from.
#[derive(Debug)]
pub enum NodeTree {
    /// The vendored checkout under the source root.
    Local(Utf8PathBuf),
    /// A downloaded tarball extracted into a scratch directory that is
    /// removed when this value is dropped.
    Extracted {
        /// Scratch directory owning the extracted files.
        scratch: TempDir,
        /// `<scratch>/node-v<version>`.
        root: Utf8PathBuf,
    },
}

impl NodeTree {
    /// Root directory of the tree.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        match self {
            Self::Local(root) | Self::Extracted { root, .. } => root,
        }
    }

    /// Select the tree for the configured library source, downloading and
    /// extracting the source tarball in remote mode.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::MissingArtefact`] if the tree root does not
    /// exist, or any download or extraction failure.
    pub fn prepare(
        config: &DistConfig,
        downloader: &dyn ArtefactDownloader,
        extractor: &dyn ArtefactExtractor,
    ) -> Result<Self> {
        let tree = match &config.library_source {
            LibrarySource::Local => Self::Local(config.layout.vendored_node_tree()),
            LibrarySource::Remote { base_url } => {
                Self::fetch(base_url, config.version(), downloader, extractor)?
            }
        };
        require_dir(tree.root())?;
        Ok(tree)
    }

    fn fetch(
        base_url: &str,
        version: &str,
        downloader: &dyn ArtefactDownloader,
        extractor: &dyn ArtefactExtractor,
    ) -> Result<Self> {
        let scratch = tempfile::Builder::new()
            .prefix("electron-dist-")
            .tempdir()?;
        let scratch_root = Utf8PathBuf::try_from(scratch.path().to_path_buf())
            .map_err(|e| DistError::NonUtf8Path {
                path: e.into_path_buf(),
            })?;

        let url = source_tarball_url(base_url, version);
        let tarball = scratch_root.join(source_tarball_name(version));
        info!("Downloading Node sources from {url}");
        downloader.download_to_file(&url, tarball.as_std_path())?;

        let files = extractor.extract(tarball.as_std_path(), scratch_root.as_std_path())?;
        debug!("extracted {files} files into {scratch_root}");

        Ok(Self::Extracted {
            root: scratch_root.join(format!("node-v{version}")),
            scratch,
        })
    }
}

/// Copy every component's headers and the helper header into `includes`.
///
/// Returns the number of header files copied.
///
/// # Errors
///
/// Returns [`DistError::MissingArtefact`] if a component directory or a
/// single header is absent, [`DistError::NoHeaders`] if a component
/// directory holds no `*.h` files, and [`DistError::Staging`] if a copy
/// fails.
pub fn collect_headers(config: &DistConfig, tree: &NodeTree) -> Result<usize> {
    let include_dir = &config.layout.include_dir;
    let checked_in = config.layout.checked_in_includes();
    let mut copied = 0;

    for component in COMPONENTS {
        let base = match component.root {
            HeaderRoot::NodeTree => tree.root(),
            HeaderRoot::CheckedIn => checked_in.as_path(),
        };
        let src = base.join(component.dir);
        let dest = include_dir.join(component.name);
        let count = copy_headers(component.name, &src, &dest)?;
        debug!("copied {count} headers for {}", component.name);
        copied += count;
    }

    for (src, dest) in NODE_TREE_EXTRAS {
        let dest = include_dir.join(dest);
        create_parent(&dest)?;
        copy_file(&tree.root().join(src), &dest)?;
        copied += 1;
    }

    copy_file(&checked_in.join(HELPER_HEADER), &include_dir.join(HELPER_HEADER))?;
    copied += 1;

    info!("Collected {copied} headers into {include_dir}");
    Ok(copied)
}

/// Copy `<src>/*.h` into `dest`, creating it first.
fn copy_headers(component: &'static str, src: &Utf8Path, dest: &Utf8Path) -> Result<usize> {
    require_dir(src)?;
    let headers = matching_headers(src)?;
    if headers.is_empty() {
        return Err(DistError::NoHeaders {
            component,
            dir: src.to_owned(),
        });
    }

    std::fs::create_dir_all(dest).map_err(|e| DistError::staging(dest, e))?;
    for header in &headers {
        if let Some(name) = header.file_name() {
            copy_file(header, &dest.join(name))?;
        }
    }
    Ok(headers.len())
}

/// Regular files directly inside `dir` whose names end in `.h`, sorted.
fn matching_headers(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let pattern = format!("{}/*.h", glob::Pattern::escape(dir.as_str()));
    let paths = glob::glob(&pattern)
        .map_err(|e| DistError::staging(dir, io::Error::new(io::ErrorKind::InvalidInput, e)))?;

    let mut headers = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| DistError::staging(dir, e.into_error()))?;
        if !path.is_file() {
            continue;
        }
        let path = Utf8PathBuf::try_from(path).map_err(|e| DistError::NonUtf8Path {
            path: e.into_path_buf(),
        })?;
        headers.push(path);
    }
    headers.sort();
    Ok(headers)
}

fn create_parent(path: &Utf8Path) -> Result<()> {
    match path.parent() {
        Some(parent) => std::fs::create_dir_all(parent).map_err(|e| DistError::staging(parent, e)),
        None => Ok(()),
    }
}

#[cfg(test)]
#[path = "headers_tests.rs"]
mod tests;
