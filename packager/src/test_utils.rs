//! Shared test utilities for the packager crate.

use crate::builder::{BuildCommand, CommandExecutor};
use crate::config::DEFAULT_DIST_DIR;
use crate::download::{ArtefactDownloader, DownloadError};
use crate::error::{DistError, Result};
use crate::metadata::ProjectMetadata;
use crate::platform::Platform;
use camino::Utf8Path;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::path::Path;
use std::process::ExitStatus;

/// Headers placed in every fixture Node tree, relative to the tree root.
pub const NODE_TREE_HEADERS: &[&str] = &[
    "src/node.h",
    "src/node_version.h",
    "deps/v8/include/v8.h",
    "deps/v8/include/libplatform/libplatform.h",
    "deps/uv/include/uv.h",
    "deps/zlib/zlib.h",
    "deps/http_parser/http_parser.h",
];

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// An expected build invocation and the exit code it should report.
#[derive(Debug)]
pub struct ExpectedBuild {
    /// The program expected to be launched (e.g. `python`).
    pub program: &'static str,
    /// Exit code returned to the caller.
    pub exit_code: i32,
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Returns predefined exit codes in order and records every command it was
/// asked to run.
#[derive(Debug, Default)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedBuild>>,
    invoked: RefCell<Vec<BuildCommand>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected invocations.
    #[must_use]
    pub fn new(expected: Vec<ExpectedBuild>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            invoked: RefCell::new(Vec::new()),
        }
    }

    /// Commands received so far.
    #[must_use]
    pub fn invoked(&self) -> Vec<BuildCommand> {
        self.invoked.borrow().clone()
    }

    /// Asserts that all expected invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, command: &BuildCommand) -> Result<ExitStatus> {
        self.invoked.borrow_mut().push(command.clone());
        let Some(call) = self.expected.borrow_mut().pop_front() else {
            return Err(DistError::StubMismatch {
                message: format!("unexpected invocation of {command}"),
            });
        };
        if call.program != command.program {
            return Err(DistError::StubMismatch {
                message: format!("expected {}, got {}", call.program, command.program),
            });
        }
        Ok(exit_status(call.exit_code))
    }
}

fn write_file(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)
}

/// Populate `root` with a minimal runtime checkout whose build has already
/// run: `electron.gyp`, the build script, every build output the platform
/// ships, the vendored Node tree and the checked-in dist headers.
///
/// # Errors
///
/// Returns any I/O error raised while writing the tree.
pub fn write_source_tree(
    root: &Utf8Path,
    metadata: &ProjectMetadata,
    platform: Platform,
) -> io::Result<()> {
    write_file(
        &root.join("electron.gyp"),
        format!(
            "{{\n  'variables': {{\n    'project_name%': '{}',\n    'product_name%': '{}',\n    'version%': '{}',\n  }},\n}}\n",
            metadata.project_name(),
            metadata.product_name(),
            metadata.version()
        )
        .as_bytes(),
    )?;
    write_file(&root.join("script/build.py"), b"import sys\nsys.exit(0)\n")?;

    let build_dir = root.join("out/R");
    let assets = platform.assets(metadata);
    for name in &assets.binaries {
        write_file(&build_dir.join(name), name.as_bytes())?;
    }
    for name in &assets.directories {
        write_file(&build_dir.join(name).join("manifest.pak"), name.as_bytes())?;
    }
    write_file(&build_dir.join(assets.import_library), b"import library")?;

    let node_tree = root.join("vendor/node");
    for header in NODE_TREE_HEADERS {
        write_file(&node_tree.join(header), format!("// {header}\n").as_bytes())?;
    }
    let includes = root.join(DEFAULT_DIST_DIR).join("includes");
    write_file(&includes.join("nan/nan.h"), b"// nan\n")?;
    write_file(&includes.join("electron.h"), b"// electron helper\n")?;
    Ok(())
}

/// Build a gzip-compressed Node source tarball rooted at `node-v<version>/`.
///
/// # Errors
///
/// Returns any I/O error raised by the encoders.
pub fn node_source_tarball(version: &str) -> io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for header in NODE_TREE_HEADERS {
        let contents = format!("// remote {header}\n");
        let mut entry = tar::Header::new_gnu();
        entry.set_size(contents.len() as u64);
        entry.set_mode(0o644);
        entry.set_cksum();
        builder.append_data(
            &mut entry,
            format!("node-v{version}/{header}"),
            contents.as_bytes(),
        )?;
    }
    builder.into_inner()?.finish()
}

/// An in-memory [`ArtefactDownloader`] serving fixed bodies by URL.
///
/// Unknown URLs report [`DownloadError::NotFound`], like a real mirror.
#[derive(Debug, Default)]
pub struct FakeDownloader {
    bodies: BTreeMap<String, Vec<u8>>,
    requested: RefCell<Vec<String>>,
}

impl FakeDownloader {
    /// Creates a downloader with no artefacts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    #[must_use]
    pub fn serving(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

impl ArtefactDownloader for FakeDownloader {
    fn download_to_file(&self, url: &str, dest: &Path) -> std::result::Result<(), DownloadError> {
        self.requested.borrow_mut().push(url.to_owned());
        let body = self.bodies.get(url).ok_or_else(|| DownloadError::NotFound {
            url: url.to_owned(),
        })?;
        std::fs::write(dest, body)?;
        Ok(())
    }
}
