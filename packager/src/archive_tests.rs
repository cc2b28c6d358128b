//! Unit tests for archive creation.

use super::*;
use rstest::{fixture, rstest};
use std::collections::BTreeMap;
use tempfile::TempDir;

struct Tree {
    _temp: TempDir,
    staging: Utf8PathBuf,
    archive: Utf8PathBuf,
}

#[fixture]
fn tree() -> Tree {
    let temp = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
    let staging = root.join("dist/1.2.3");
    fs::create_dir_all(staging.join("x64/bin/resources")).expect("bin");
    fs::create_dir_all(staging.join("x64/lib")).expect("lib");
    fs::create_dir_all(staging.join("includes/node")).expect("includes");
    fs::write(staging.join("x64/bin/electron"), b"ELF").expect("binary");
    fs::write(staging.join("x64/bin/resources/app.asar"), b"asar").expect("resource");
    fs::write(staging.join("x64/lib/electron.lib"), b"lib").expect("lib");
    fs::write(staging.join("includes/node/node.h"), b"// node").expect("header");
    fs::write(staging.join("version.txt"), b"1.2.3").expect("version");
    Tree {
        _temp: temp,
        archive: root.join("dist/out/electron/electron1.2.3.zip"),
        staging,
    }
}

fn read_entries(archive: &Utf8Path) -> BTreeMap<String, Vec<u8>> {
    let file = fs::File::open(archive).expect("open archive");
    let mut zip = zip::ZipArchive::new(file).expect("read archive");
    let mut entries = BTreeMap::new();
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).expect("entry");
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).expect("read entry");
        entries.insert(entry.name().to_owned(), contents);
    }
    entries
}

#[rstest]
fn archive_reproduces_staging_tree(tree: Tree) {
    let output = create_archive(&tree.staging, &tree.archive).expect("archive");

    assert_eq!(output.path, tree.archive);
    let entries = read_entries(&tree.archive);
    assert_eq!(entries["version.txt"], b"1.2.3");
    assert_eq!(entries["x64/bin/electron"], b"ELF");
    assert_eq!(entries["x64/bin/resources/app.asar"], b"asar");
    assert_eq!(entries["x64/lib/electron.lib"], b"lib");
    assert_eq!(entries["includes/node/node.h"], b"// node");
    assert!(entries.contains_key("x64/bin/resources/"));
    assert!(entries.keys().all(|name| !name.starts_with("1.2.3")));
    assert_eq!(output.entries, entries.len());
}

#[rstest]
fn archive_leaves_no_partial_and_writes_sidecar(tree: Tree) {
    let output = create_archive(&tree.staging, &tree.archive).expect("archive");

    assert!(!partial_path(&tree.archive).exists());
    let digest = compute_sha256(tree.archive.as_std_path()).expect("digest");
    assert_eq!(output.sha256, digest);
    assert_eq!(
        fs::read_to_string(sidecar_path(&tree.archive)).expect("sidecar"),
        format!("{digest}  electron1.2.3.zip\n")
    );
}

#[rstest]
fn archive_replaces_previous_archive(tree: Tree) {
    fs::create_dir_all(tree.archive.parent().expect("parent")).expect("out dir");
    fs::write(&tree.archive, b"stale").expect("stale archive");

    create_archive(&tree.staging, &tree.archive).expect("archive");

    assert!(read_entries(&tree.archive).contains_key("version.txt"));
}

#[rstest]
fn missing_staging_tree_leaves_nothing_behind(tree: Tree) {
    fs::remove_dir_all(&tree.staging).expect("remove staging");

    let err = create_archive(&tree.staging, &tree.archive).expect_err("no staging");

    assert!(matches!(err, ArchiveError::Walk(_)));
    assert!(!tree.archive.exists());
    assert!(!partial_path(&tree.archive).exists());
}

#[rstest]
fn blocked_archive_path_keeps_previous_sidecar(tree: Tree) {
    let sidecar = sidecar_path(&tree.archive);
    fs::create_dir_all(tree.archive.join("occupied")).expect("blocking dir");
    fs::write(&sidecar, "previous  electron1.2.3.zip\n").expect("old sidecar");

    create_archive(&tree.staging, &tree.archive).expect_err("rename onto a directory");

    assert!(tree.archive.is_dir());
    assert_eq!(
        fs::read_to_string(&sidecar).expect("sidecar"),
        "previous  electron1.2.3.zip\n"
    );
    assert!(!partial_path(&tree.archive).exists());
    assert!(!partial_path(&sidecar).exists());
}

#[rstest]
fn blocked_archive_path_writes_no_sidecar(tree: Tree) {
    fs::create_dir_all(tree.archive.join("occupied")).expect("blocking dir");

    create_archive(&tree.staging, &tree.archive).expect_err("rename onto a directory");

    assert!(!sidecar_path(&tree.archive).exists());
    assert!(!partial_path(&sidecar_path(&tree.archive)).exists());
}

#[cfg(unix)]
#[rstest]
fn archive_keeps_modes_and_symlinks(tree: Tree) {
    use std::os::unix::fs::PermissionsExt;

    let binary = tree.staging.join("x64/bin/electron");
    fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).expect("chmod");
    std::os::unix::fs::symlink("electron", tree.staging.join("x64/bin/electron-link"))
        .expect("symlink");

    create_archive(&tree.staging, &tree.archive).expect("archive");

    let mut zip = zip::ZipArchive::new(fs::File::open(&tree.archive).expect("open"))
        .expect("read archive");
    let mode = zip
        .by_name("x64/bin/electron")
        .expect("binary entry")
        .unix_mode()
        .expect("mode");
    assert_eq!(mode & 0o777, 0o755);

    let mut link = zip.by_name("x64/bin/electron-link").expect("link entry");
    assert!(link.is_symlink());
    let mut target = String::new();
    link.read_to_string(&mut target).expect("link target");
    assert_eq!(target, "electron");
}

#[test]
fn compute_sha256_of_known_content() {
    let temp = TempDir::new().expect("temp dir");
    let path = temp.path().join("abc");
    fs::write(&path, b"abc").expect("write");
    assert_eq!(
        compute_sha256(&path).expect("digest"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[rstest]
#[case::plain("/s/version.txt", "version.txt")]
#[case::nested("/s/x64/bin/resources/app.asar", "x64/bin/resources/app.asar")]
fn entry_names_are_relative_and_slash_separated(#[case] path: &str, #[case] expected: &str) {
    assert_eq!(
        entry_name(Path::new("/s"), Path::new(path)).expect("name"),
        expected
    );
}
