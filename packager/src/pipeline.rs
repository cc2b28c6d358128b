//! Packaging pipeline orchestration.
//!
//! Runs the stages in their fixed order: build, staging reset, asset copy,
//! import library, headers, version stamp, archive, cleanup. Collaborators
//! that touch processes or the network are injected so the whole pipeline
//! can run against stubs.
//!
//! A run moves through [`PipelineState::Staging`], [`PipelineState::Archived`]
//! and [`PipelineState::Cleaned`]. Any failure before the archive exists
//! removes the staging tree (best effort) and returns the error; once the
//! archive exists, cleanup failures are only logged.

use crate::archive::{ArchiveOutput, create_archive};
use crate::builder::{Builder, CommandExecutor};
use crate::config::DistConfig;
use crate::download::ArtefactDownloader;
use crate::error::Result;
use crate::extraction::ArtefactExtractor;
use crate::headers::{NodeTree, collect_headers};
use crate::library::stage_library;
use crate::stager::Stager;
use log::{debug, info, warn};

/// Where a run stands with respect to its staging tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// The staging tree is being assembled; no archive exists yet.
    Staging,
    /// The archive has been written; the staging tree may still exist.
    Archived,
    /// The archive has been written and the staging tree removed.
    Cleaned,
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    /// The archive that was written.
    pub archive: ArchiveOutput,
    /// Number of header files collected.
    pub headers: usize,
    /// Final state: `Cleaned`, or `Archived` if the staging tree could not
    /// be removed.
    pub state: PipelineState,
}

/// External collaborators used by a run.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Runs the external build.
    pub executor: &'a dyn CommandExecutor,
    /// Fetches remote artefacts.
    pub downloader: &'a dyn ArtefactDownloader,
    /// Unpacks the source tarball.
    pub extractor: &'a dyn ArtefactExtractor,
}

/// One packaging run over a resolved configuration.
pub struct Pipeline<'a> {
    config: &'a DistConfig,
    collaborators: Collaborators<'a>,
    remove_staging: fn(&Stager<'_>) -> Result<()>,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline for `config`.
    #[must_use]
    pub fn new(config: &'a DistConfig, collaborators: Collaborators<'a>) -> Self {
        Self {
            config,
            collaborators,
            remove_staging: |stager| stager.remove(),
        }
    }

    /// Run every stage and produce the archive.
    ///
    /// # Errors
    ///
    /// Returns the first stage error. The staging tree is removed before
    /// returning unless the archive was already written.
    pub fn run(&self) -> Result<PipelineOutcome> {
        info!(
            "Packaging {} {} for {}-{}",
            self.config.metadata.project_name(),
            self.config.version(),
            self.config.platform,
            self.config.arch
        );
        Builder::new(self.collaborators.executor).build(&self.config.build)?;

        let stager = Stager::new(&self.config.layout);
        let mut state = PipelineState::Staging;
        debug!("state: {state:?}");
        let (archive, headers) = match self.assemble(&stager) {
            Ok(assembled) => assembled,
            Err(e) => {
                discard_staging(&stager);
                return Err(e);
            }
        };

        state = PipelineState::Archived;
        debug!("state: {state:?}");
        match (self.remove_staging)(&stager) {
            Ok(()) => {
                state = PipelineState::Cleaned;
                debug!("state: {state:?}");
            }
            Err(e) => warn!("archive written but staging cleanup failed: {e}"),
        }

        Ok(PipelineOutcome {
            archive,
            headers,
            state,
        })
    }

    fn assemble(&self, stager: &Stager<'_>) -> Result<(ArchiveOutput, usize)> {
        let config = self.config;
        stager.reset()?;
        stager.stage_assets(&config.assets())?;
        stage_library(config, self.collaborators.downloader)?;

        let headers = {
            let tree = NodeTree::prepare(
                config,
                self.collaborators.downloader,
                self.collaborators.extractor,
            )?;
            collect_headers(config, &tree)?
        };

        stager.write_version(config.version())?;
        let archive = create_archive(&config.layout.staging_dir, &config.layout.archive_path)?;
        Ok((archive, headers))
    }
}

fn discard_staging(stager: &Stager<'_>) {
    if let Err(e) = stager.remove() {
        warn!("could not remove staging tree after failure: {e}");
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
