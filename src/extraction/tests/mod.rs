use super::*;
use crate::test_helpers::{PanickingObserver, RecordingObserver, create_zip, zip_bytes};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn extractor() -> ArchiveExtractor {
    ArchiveExtractor::new(ExtractionConfig::default()).unwrap()
}

fn extractor_with_observer() -> (ArchiveExtractor, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::default());
    let extractor = extractor().with_observer(observer.clone());
    (extractor, observer)
}

/// Every path below `root`, relative to it, with a trailing `/` for directories
fn tree(root: &Path) -> BTreeSet<String> {
    walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap())
        .map(|e| {
            let rel = e
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            if e.file_type().is_dir() {
                format!("{rel}/")
            } else {
                rel
            }
        })
        .collect()
}

/// Write a ZIP whose single stored entry has a corrupted payload byte
fn create_corrupt_zip(archive_path: &Path) {
    let content = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let file = fs::File::create(archive_path).unwrap();
    let mut writer = ::zip::ZipWriter::new(file);
    let options =
        ::zip::write::FileOptions::default().compression_method(::zip::CompressionMethod::Stored);
    writer.start_file("data.bin", options).unwrap();
    writer.write_all(content).unwrap();
    writer.finish().unwrap();

    let mut bytes = fs::read(archive_path).unwrap();
    let offset = bytes
        .windows(content.len())
        .position(|w| w == content)
        .unwrap();
    bytes[offset + 5] ^= 0xFF;
    fs::write(archive_path, bytes).unwrap();
}

// ---------------------------------------------------------------------------
// Successful extraction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_single_entry_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("bootstrap.zip");
    let out = temp_dir.path().join("out");
    create_zip(&archive, &[("readme.txt", b"hello")]);

    let summary = extractor().extract(&archive, &out).await.unwrap();

    assert_eq!(tree(&out), BTreeSet::from(["readme.txt".to_string()]));
    assert_eq!(fs::read(out.join("readme.txt")).unwrap(), b"hello");
    assert!(!archive.exists(), "archive should be removed after extraction");
    assert!(summary.archive_removed);
    assert_eq!(summary.entries, 1);
    assert_eq!(summary.files, vec![out.join("readme.txt")]);
    assert_eq!(summary.bytes_written, 5);
}

#[test]
fn test_extracted_tree_matches_entry_set() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("bootstrap.zip");
    let out = temp_dir.path().join("out");
    fs::create_dir(&out).unwrap();

    let large: Vec<u8> = (0..300_000u32).map(|i| (i * 31 % 256) as u8).collect();
    let entries: [(&str, &[u8]); 7] = [
        ("blocks/", b""),
        ("blocks/blk00000.dat", &large),
        ("blocks/index/", b""),
        ("blocks/index/000001.ldb", b"index-data"),
        ("chainstate/CURRENT", b"MANIFEST-000002\n"),
        ("empty.txt", b""),
        ("peers.dat", b"\x00\x01\x02\xff"),
    ];
    create_zip(&archive, &entries);

    let summary = extractor().extract_blocking(&archive, &out).unwrap();

    let expected: BTreeSet<String> = [
        "blocks/",
        "blocks/blk00000.dat",
        "blocks/index/",
        "blocks/index/000001.ldb",
        "chainstate/",
        "chainstate/CURRENT",
        "empty.txt",
        "peers.dat",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    assert_eq!(tree(&out), expected);

    for (name, content) in &entries {
        if !name.ends_with('/') {
            assert_eq!(&fs::read(out.join(name)).unwrap(), content, "{name}");
        }
    }

    assert_eq!(summary.entries, entries.len());
    assert_eq!(summary.files.len(), 5);
    assert_eq!(summary.directories.len(), 2);
    assert_eq!(summary.bytes_written, large.len() as u64 + 10 + 16 + 4);
}

#[test]
fn test_directory_entry_before_nested_file() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("bootstrap.zip");
    let out = temp_dir.path().join("out");
    create_zip(&archive, &[("sub/", b""), ("sub/file.txt", b"nested")]);

    let summary = extractor().extract_blocking(&archive, &out).unwrap();

    assert!(out.join("sub").is_dir());
    assert_eq!(fs::read(out.join("sub").join("file.txt")).unwrap(), b"nested");
    assert_eq!(summary.directories, vec![out.join("sub/")]);
}

#[cfg(unix)]
#[test]
fn test_trailing_backslash_is_a_file_name() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("bootstrap.zip");
    let out = temp_dir.path().join("out");
    create_zip(&archive, &[("notes\\", b"x")]);

    let summary = extractor().extract_blocking(&archive, &out).unwrap();

    assert!(out.join("notes\\").is_file());
    assert!(summary.directories.is_empty());
    assert_eq!(summary.files, vec![out.join("notes\\")]);
}

#[test]
fn test_small_buffer_copies_in_chunks() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("bootstrap.zip");
    let out = temp_dir.path().join("out");
    let content: Vec<u8> = (0..10_000u32).map(|i| (i % 97) as u8).collect();
    create_zip(&archive, &[("data.bin", &content)]);

    let config = ExtractionConfig {
        buffer_size: 7,
        ..Default::default()
    };
    ArchiveExtractor::new(config)
        .unwrap()
        .extract_blocking(&archive, &out)
        .unwrap();

    assert_eq!(fs::read(out.join("data.bin")).unwrap(), content);
}

#[test]
fn test_existing_output_root_is_reused() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("bootstrap.zip");
    let out = temp_dir.path().join("out");
    fs::create_dir(&out).unwrap();
    fs::write(out.join("keep.txt"), b"untouched").unwrap();
    fs::write(out.join("readme.txt"), b"old content that is longer").unwrap();
    create_zip(&archive, &[("readme.txt", b"hello")]);

    extractor().extract_blocking(&archive, &out).unwrap();

    assert_eq!(fs::read(out.join("keep.txt")).unwrap(), b"untouched");
    assert_eq!(fs::read(out.join("readme.txt")).unwrap(), b"hello");
}

#[test]
fn test_observer_receives_message_per_entry() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("bootstrap.zip");
    let out = temp_dir.path().join("out");
    create_zip(
        &archive,
        &[("a/", b""), ("a/one.txt", b"1"), ("two.txt", b"2"), ("three.txt", b"3")],
    );
    let (extractor, observer) = extractor_with_observer();

    extractor.extract_blocking(&archive, &out).unwrap();

    assert_eq!(
        observer.messages(),
        vec![
            "File extracted: a/",
            "File extracted: a/one.txt",
            "File extracted: two.txt",
            "File extracted: three.txt",
        ]
    );
    assert_eq!(
        observer.percents("Extracting bootstrap"),
        vec![25.0, 50.0, 75.0, 100.0]
    );
}

#[test]
fn test_empty_archive_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("bootstrap.zip");
    let out = temp_dir.path().join("out");
    create_zip(&archive, &[]);

    let summary = extractor().extract_blocking(&archive, &out).unwrap();

    assert!(out.is_dir());
    assert_eq!(summary.entries, 0);
    assert!(!archive.exists());
}

#[tokio::test]
async fn test_panicking_observer_does_not_fail_extraction() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("bootstrap.zip");
    let out = temp_dir.path().join("out");
    create_zip(&archive, &[("readme.txt", b"hello")]);
    let extractor = extractor().with_observer(Arc::new(PanickingObserver));

    let summary = extractor.extract(&archive, &out).await.unwrap();

    assert_eq!(summary.entries, 1);
    assert_eq!(fs::read(out.join("readme.txt")).unwrap(), b"hello");
    assert!(summary.archive_removed);
}

#[cfg(unix)]
#[test]
fn test_archive_removal_failure_keeps_success() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let locked = temp_dir.path().join("incoming");
    fs::create_dir(&locked).unwrap();
    let archive = locked.join("bootstrap.zip");
    let out = temp_dir.path().join("out");
    create_zip(&archive, &[("readme.txt", b"hello")]);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

    let result = extractor().extract_blocking(&archive, &out);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let summary = result.unwrap();
    assert_eq!(fs::read(out.join("readme.txt")).unwrap(), b"hello");
    // root ignores permission bits and may still remove the archive
    assert_eq!(summary.archive_removed, !archive.exists());
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn test_missing_archive_is_open_error() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("out");

    let err = extractor()
        .extract_blocking(&temp_dir.path().join("nope.zip"), &out)
        .unwrap_err();

    assert!(matches!(err, Error::Extract(ExtractError::ArchiveOpen { .. })));
    assert!(!out.exists(), "destination must not be created before open");
}

#[test]
fn test_non_zip_is_open_error_and_archive_kept() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("bootstrap.zip");
    fs::write(&archive, b"<html>503 Service Unavailable</html>").unwrap();

    let err = extractor()
        .extract_blocking(&archive, &temp_dir.path().join("out"))
        .unwrap_err();

    match err {
        Error::Extract(ExtractError::ArchiveOpen { archive: path, .. }) => {
            assert_eq!(path, archive)
        }
        other => panic!("expected ArchiveOpen, got {other:?}"),
    }
    assert!(archive.exists());
}

#[test]
fn test_output_root_is_file_is_destination_error() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("bootstrap.zip");
    let out = temp_dir.path().join("out");
    fs::write(&out, b"not a directory").unwrap();
    create_zip(&archive, &[("readme.txt", b"hello")]);

    let err = extractor().extract_blocking(&archive, &out).unwrap_err();

    assert!(matches!(err, Error::Extract(ExtractError::Destination { .. })));
    assert!(archive.exists());

    // The handle was released, so the archive can be removed right away
    fs::remove_file(&archive).unwrap();
}

#[test]
fn test_path_traversal_entry_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("bootstrap.zip");
    let out = temp_dir.path().join("out");
    create_zip(&archive, &[("ok.txt", b"fine"), ("../evil.txt", b"pwned")]);

    let err = extractor().extract_blocking(&archive, &out).unwrap_err();

    match err {
        Error::Extract(ExtractError::EntryMetadata { index, .. }) => assert_eq!(index, 1),
        other => panic!("expected EntryMetadata, got {other:?}"),
    }
    assert!(!temp_dir.path().join("evil.txt").exists());
    // Entries before the bad one were already written; nothing after it
    assert!(out.join("ok.txt").exists());
    assert!(archive.exists());
}

#[test]
fn test_corrupt_payload_is_read_error_and_partial_file_removed() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("bootstrap.zip");
    let out = temp_dir.path().join("out");
    create_corrupt_zip(&archive);

    let err = extractor().extract_blocking(&archive, &out).unwrap_err();

    match err {
        Error::Extract(ExtractError::EntryRead { name, .. }) => assert_eq!(name, "data.bin"),
        other => panic!("expected EntryRead, got {other:?}"),
    }
    assert!(!out.join("data.bin").exists(), "partial file must be removed");
    assert!(archive.exists());
}

#[test]
fn test_file_blocking_nested_directory_is_write_error() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("bootstrap.zip");
    let out = temp_dir.path().join("out");
    fs::create_dir(&out).unwrap();
    fs::write(out.join("blocks"), b"occupied").unwrap();
    create_zip(&archive, &[("blocks/blk0.dat", b"data"), ("after.txt", b"x")]);

    let err = extractor().extract_blocking(&archive, &out).unwrap_err();

    match err {
        Error::Extract(ExtractError::EntryWrite { path, .. }) => {
            assert_eq!(path, out.join("blocks/blk0.dat"))
        }
        other => panic!("expected EntryWrite, got {other:?}"),
    }
    assert!(!out.join("after.txt").exists(), "extraction must halt");
    assert!(archive.exists());
}

#[test]
fn test_zero_buffer_size_rejected() {
    let config = ExtractionConfig {
        buffer_size: 0,
        ..Default::default()
    };
    assert!(matches!(
        ArchiveExtractor::new(config),
        Err(Error::Config { .. })
    ));
}

#[test]
fn test_archive_handle_reads_entry_metadata() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("bootstrap.zip");
    fs::write(
        &archive,
        zip_bytes(&[("dir/", b""), ("dir/file.txt", b"twelve bytes")]),
    )
    .unwrap();

    let mut handle = ArchiveHandle::open(&archive).unwrap();
    assert_eq!(handle.entry_count(), 2);
    assert_eq!(handle.path(), archive.as_path());

    let dir = handle.entry(0).unwrap();
    assert!(dir.is_dir);
    assert_eq!(dir.name, "dir/");

    let file = handle.entry(1).unwrap();
    assert!(!file.is_dir);
    assert_eq!(file.size, 12);
    assert_eq!(file.relative_path, PathBuf::from("dir/file.txt"));

    let mut content = String::new();
    handle
        .open_entry(&file)
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "twelve bytes");
}
