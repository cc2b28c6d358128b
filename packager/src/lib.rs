//! Electron runtime distribution packager.
//!
//! This crate builds an Electron-style runtime, stages its binaries, import
//! library and third-party headers into a versioned tree, and zips the tree
//! for native module consumers. It is used by the `electron-dist` CLI binary
//! and can be driven programmatically with stub collaborators for testing.
//!
//! # Modules
//!
//! - [`archive`] - Zip archive creation with checksum sidecar
//! - [`builder`] - External build invocation
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Run configuration and path layout
//! - [`download`] - HTTP retrieval of remote artefacts
//! - [`error`] - Error types
//! - [`extraction`] - Source tarball extraction
//! - [`headers`] - Third-party header collection
//! - [`library`] - Import library staging
//! - [`logging`] - Stderr subscriber installed by the binary
//! - [`metadata`] - Project name and version resolution
//! - [`output`] - Success and dry-run reporting
//! - [`pipeline`] - Stage orchestration
//! - [`platform`] - Platform and architecture tables
//! - [`stager`] - Staging tree management and file copying

pub mod archive;
pub mod builder;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod extraction;
pub mod headers;
pub mod library;
pub mod logging;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod platform;
pub mod stager;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
