//! Behaviour-driven tests for the packaging pipeline.
//!
//! Each scenario writes a throwaway runtime checkout, runs the full pipeline
//! against it with a stub build and an in-memory mirror, and inspects the
//! resulting zip. Tests use the rstest-bdd v0.5.0 mutable world pattern.

use camino::Utf8PathBuf;
use electron_dist::config::{DistConfig, FileConfig, LibrarySourceKind, Overrides};
use electron_dist::download::{library_url, source_tarball_url};
use electron_dist::error::DistError;
use electron_dist::extraction::TarGzExtractor;
use electron_dist::metadata::ProjectMetadata;
use electron_dist::pipeline::{Collaborators, Pipeline, PipelineOutcome};
use electron_dist::platform::{Arch, Platform};
use electron_dist::test_utils::{
    ExpectedBuild, FakeDownloader, StubExecutor, node_source_tarball, write_source_tree,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use tempfile::TempDir;

const MIRROR: &str = "https://mirror.test";

// ---------------------------------------------------------------------------
// World types
// ---------------------------------------------------------------------------

#[derive(Default)]
struct PipelineWorld {
    temp_dir: Option<TempDir>,
    root: Option<Utf8PathBuf>,
    platform: Option<Platform>,
    build_exit_code: i32,
    library_source: Option<LibrarySourceKind>,
    downloader: FakeDownloader,
    config: Option<DistConfig>,
    outcome: Option<PipelineOutcome>,
    error: Option<DistError>,
}

#[fixture]
fn world() -> PipelineWorld {
    PipelineWorld {
        temp_dir: Some(TempDir::new().expect("temp dir")),
        ..PipelineWorld::default()
    }
}

fn root(world: &PipelineWorld) -> &Utf8PathBuf {
    world.root.as_ref().expect("checkout written")
}

/// Resolve the configuration the scenario describes, caching it in the world.
fn config(world: &mut PipelineWorld) -> &DistConfig {
    if world.config.is_none() {
        let overrides = Overrides {
            platform: world.platform,
            arch: Some(Arch::X64),
            library_source: Some(world.library_source.unwrap_or(LibrarySourceKind::Local)),
            base_url: Some(MIRROR.to_owned()),
            ..Overrides::default()
        };
        let config = DistConfig::from_parts(root(world), &FileConfig::default(), &overrides)
            .expect("config");
        world.config = Some(config);
    }
    world.config.as_ref().expect("config set above")
}

/// Run the pipeline and store the outcome or error in the world.
fn run_pipeline(world: &mut PipelineWorld) {
    let executor = StubExecutor::new(vec![ExpectedBuild {
        program: "python",
        exit_code: world.build_exit_code,
    }]);
    let config = config(world).clone();
    let result = Pipeline::new(&config, Collaborators {
        executor: &executor,
        downloader: &world.downloader,
        extractor: &TarGzExtractor,
    })
    .run();

    match result {
        Ok(outcome) => world.outcome = Some(outcome),
        Err(err) => world.error = Some(err),
    }
}

fn archive_entries(world: &PipelineWorld) -> BTreeMap<String, Vec<u8>> {
    let outcome = world.outcome.as_ref().expect("pipeline succeeded");
    let file = fs::File::open(&outcome.archive.path).expect("open archive");
    let mut zip = zip::ZipArchive::new(file).expect("zip");
    let mut entries = BTreeMap::new();
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).expect("entry");
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).expect("read entry");
        entries.insert(entry.name().to_owned(), contents);
    }
    entries
}

// ---------------------------------------------------------------------------
// Step definitions
// ---------------------------------------------------------------------------

#[given("a \"{platform}\" checkout at version \"{version}\"")]
fn given_checkout(world: &mut PipelineWorld, platform: String, version: String) {
    let platform: Platform = platform.parse().expect("known platform");
    let temp = world.temp_dir.as_ref().expect("temp_dir set");
    let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
    let metadata = ProjectMetadata::new("electron", "Electron", &version);
    write_source_tree(&root, &metadata, platform).expect("source tree");
    world.root = Some(root);
    world.platform = Some(platform);
}

#[given("the build exits with code {code}")]
fn given_build_exit_code(world: &mut PipelineWorld, code: i32) {
    world.build_exit_code = code;
}

#[given("the binary \"{name}\" is missing")]
fn given_missing_binary(world: &mut PipelineWorld, name: String) {
    let path = config(world).layout.build_dir.join(&name);
    fs::remove_file(path).expect("remove binary");
}

#[given("a leftover staging file \"{name}\"")]
fn given_leftover_staging(world: &mut PipelineWorld, name: String) {
    let bin_dir = config(world).layout.bin_dir.clone();
    fs::create_dir_all(&bin_dir).expect("leftover bin dir");
    fs::write(bin_dir.join(name), b"stale").expect("leftover file");
}

#[given("the remote mirror serves the library and node sources")]
fn given_remote_mirror(world: &mut PipelineWorld) {
    world.library_source = Some(LibrarySourceKind::Remote);
    world.downloader = FakeDownloader::new()
        .serving(library_url(MIRROR, "1.2.3", Arch::X64), "remote lib")
        .serving(
            source_tarball_url(MIRROR, "1.2.3"),
            node_source_tarball("1.2.3").expect("tarball"),
        );
}

#[given("the remote mirror serves nothing")]
fn given_empty_mirror(world: &mut PipelineWorld) {
    world.library_source = Some(LibrarySourceKind::Remote);
    world.downloader = FakeDownloader::new();
}

#[when("the distribution is packaged")]
fn when_packaged(world: &mut PipelineWorld) {
    run_pipeline(world);
}

#[then("the archive \"{name}\" exists")]
fn then_archive_exists(world: &mut PipelineWorld, name: String) {
    let outcome = world.outcome.as_ref().expect("pipeline succeeded");
    assert_eq!(outcome.archive.path.file_name(), Some(name.as_str()));
    assert!(outcome.archive.path.is_file(), "archive must exist");
}

#[then("the archive holds \"{entry}\" containing \"{contents}\"")]
fn then_archive_entry_contains(world: &mut PipelineWorld, entry: String, contents: String) {
    let entries = archive_entries(world);
    let actual = entries.get(&entry).expect("entry present");
    assert_eq!(String::from_utf8_lossy(actual), contents);
}

#[then("the archive holds \"{entry}\"")]
fn then_archive_holds(world: &mut PipelineWorld, entry: String) {
    let entries = archive_entries(world);
    assert!(entries.contains_key(&entry), "missing {entry}: {:?}", entries.keys());
}

#[then("the archive does not hold \"{entry}\"")]
fn then_archive_lacks(world: &mut PipelineWorld, entry: String) {
    assert!(!archive_entries(world).contains_key(&entry), "unexpected {entry}");
}

#[then("the staging directory is gone")]
fn then_staging_gone(world: &mut PipelineWorld) {
    assert!(!config(world).layout.staging_dir.exists());
}

#[then("no archive exists")]
fn then_no_archive(world: &mut PipelineWorld) {
    assert!(world.outcome.is_none(), "pipeline must fail");
    assert!(!config(world).layout.archive_path.exists());
}

#[then("packaging fails with a build error")]
fn then_build_error(world: &mut PipelineWorld) {
    assert!(
        matches!(world.error, Some(DistError::BuildFailed { .. })),
        "expected BuildFailed, got {:?}",
        world.error
    );
}

#[then("packaging fails naming \"{name}\"")]
fn then_missing_artefact(world: &mut PipelineWorld, name: String) {
    match &world.error {
        Some(DistError::MissingArtefact { path }) => assert!(path.ends_with(&name)),
        other => panic!("expected MissingArtefact, got {other:?}"),
    }
}

#[then("packaging fails with a download error")]
fn then_download_error(world: &mut PipelineWorld) {
    assert!(
        matches!(world.error, Some(DistError::Download(_))),
        "expected Download, got {:?}",
        world.error
    );
}

// ---------------------------------------------------------------------------
// Scenario bindings
// ---------------------------------------------------------------------------

#[scenario(path = "tests/features/packaging.feature", index = 0)]
fn scenario_package_linux_release(world: PipelineWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/packaging.feature", index = 1)]
fn scenario_build_failure(world: PipelineWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/packaging.feature", index = 2)]
fn scenario_missing_binary(world: PipelineWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/packaging.feature", index = 3)]
fn scenario_leftover_staging(world: PipelineWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/packaging.feature", index = 4)]
fn scenario_remote_sources(world: PipelineWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/packaging.feature", index = 5)]
fn scenario_remote_not_found(world: PipelineWorld) {
    let _ = world;
}
