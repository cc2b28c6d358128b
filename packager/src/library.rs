//! Import library staging.
//!
//! Consumers link native modules against `<arch>/lib/<project>.lib`. Locally
//! that file is the platform import library from the build output; remotely
//! it is the prebuilt `node.lib` published for the version and arch.

use crate::config::{DistConfig, LibrarySource};
use crate::download::{ArtefactDownloader, library_url};
use crate::error::Result;
use crate::stager::copy_file;
use camino::Utf8PathBuf;
use log::info;

/// Destination of the import library inside the staging tree.
#[must_use]
pub fn staged_library_path(config: &DistConfig) -> Utf8PathBuf {
    config
        .layout
        .lib_dir
        .join(format!("{}.lib", config.metadata.project_name()))
}

/// Copy or download the import library into `<arch>/lib`.
///
/// # Errors
///
/// Returns [`crate::error::DistError::MissingArtefact`] if the local import
/// library is absent and [`crate::error::DistError::Download`] if the remote
/// fetch fails.
pub fn stage_library(
    config: &DistConfig,
    downloader: &dyn ArtefactDownloader,
) -> Result<Utf8PathBuf> {
    let dest = staged_library_path(config);
    match &config.library_source {
        LibrarySource::Local => {
            let src = config.layout.build_dir.join(config.assets().import_library);
            copy_file(&src, &dest)?;
            info!("Copied import library {src} -> {dest}");
        }
        LibrarySource::Remote { base_url } => {
            let url = library_url(base_url, config.version(), config.arch);
            info!("Downloading import library from {url}");
            downloader.download_to_file(&url, dest.as_std_path())?;
        }
    }
    Ok(dest)
}
