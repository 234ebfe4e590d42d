mod common;

use std::fs;
use std::io::Write;
use std::sync::{Arc, Mutex};

use common::{ArchiveBuilder, sample_text};
use streamunzip::io::MemorySource;
use streamunzip::zip::{DirectorySink, EntryFilter, ListingSink, OverwritePolicy, StreamExtractor};

fn sample_archive() -> (Vec<u8>, Vec<u8>) {
    let big = sample_text(100_000, 21);
    let archive = ArchiveBuilder::new()
        .folder("docs/")
        .stored("docs/readme.txt", b"read me")
        .deflated("docs/deep/big.txt", &big)
        .streamed("notes.txt", 8, b"streamed notes")
        .finish();
    (archive, big)
}

async fn extract(archive: &[u8], sink: DirectorySink) -> anyhow::Result<DirectorySink> {
    let mut source = MemorySource::new(archive.to_vec(), 333);
    StreamExtractor::new().run(&mut source, sink).await
}

#[tokio::test]
async fn test_extracts_tree() {
    let dir = tempfile::tempdir().unwrap();
    let (archive, big) = sample_archive();

    let sink = extract(&archive, DirectorySink::new(dir.path())).await.unwrap();

    assert_eq!(sink.files_written(), 3);
    assert_eq!(sink.folders_created(), 1);
    assert_eq!(sink.skipped(), 0);
    assert!(dir.path().join("docs").is_dir());
    assert_eq!(fs::read(dir.path().join("docs/readme.txt")).unwrap(), b"read me");
    assert_eq!(fs::read(dir.path().join("docs/deep/big.txt")).unwrap(), big);
    assert_eq!(fs::read(dir.path().join("notes.txt")).unwrap(), b"streamed notes");
}

#[tokio::test]
async fn test_directory_entries_with_flags() {
    let utf8_names = ArchiveBuilder::new()
        .header("dir/", 0x0800, 0, 0, 0, &[])
        .stored("dir/a.txt", b"utf8")
        .finish();
    let streamed = ArchiveBuilder::new()
        .streamed("dir/", 8, b"")
        .stored("dir/a.txt", b"streamed")
        .finish();

    for (archive, contents) in [(utf8_names, &b"utf8"[..]), (streamed, &b"streamed"[..])] {
        let dir = tempfile::tempdir().unwrap();
        let sink = extract(&archive, DirectorySink::new(dir.path())).await.unwrap();

        assert_eq!(sink.folders_created(), 1);
        assert_eq!(sink.files_written(), 1);
        assert!(dir.path().join("dir").is_dir());
        assert_eq!(fs::read(dir.path().join("dir/a.txt")).unwrap(), contents);
    }
}

#[tokio::test]
async fn test_unsafe_paths_are_skipped() {
    let root = tempfile::tempdir().unwrap();
    let dest = root.path().join("out");
    let archive = ArchiveBuilder::new()
        .stored("../escape.txt", b"nope")
        .stored("/abs.txt", b"nope")
        .stored("ok.txt", b"ok")
        .finish();

    let sink = extract(&archive, DirectorySink::new(&dest)).await.unwrap();

    assert_eq!(sink.files_written(), 1);
    assert_eq!(sink.skipped(), 2);
    assert!(!root.path().join("escape.txt").exists());
    assert_eq!(fs::read(dest.join("ok.txt")).unwrap(), b"ok");
}

#[tokio::test]
async fn test_overwrite_policies() {
    let dir = tempfile::tempdir().unwrap();
    let archive = ArchiveBuilder::new().stored("a.txt", b"new").finish();
    let target = dir.path().join("a.txt");

    fs::write(&target, b"old").unwrap();
    let sink = extract(&archive, DirectorySink::new(dir.path())).await.unwrap();
    assert_eq!(sink.skipped(), 1);
    assert_eq!(fs::read(&target).unwrap(), b"old");

    let sink = DirectorySink::new(dir.path()).overwrite(OverwritePolicy::Never);
    let sink = extract(&archive, sink).await.unwrap();
    assert_eq!(sink.skipped(), 1);
    assert_eq!(fs::read(&target).unwrap(), b"old");

    let sink = DirectorySink::new(dir.path()).overwrite(OverwritePolicy::Always);
    let sink = extract(&archive, sink).await.unwrap();
    assert_eq!(sink.files_written(), 1);
    assert_eq!(fs::read(&target).unwrap(), b"new");
}

#[tokio::test]
async fn test_junk_paths() {
    let dir = tempfile::tempdir().unwrap();
    let (archive, big) = sample_archive();

    let sink = DirectorySink::new(dir.path()).junk_paths(true);
    let sink = extract(&archive, sink).await.unwrap();

    assert_eq!(sink.files_written(), 3);
    assert_eq!(sink.folders_created(), 0);
    assert!(!dir.path().join("docs").exists());
    assert_eq!(fs::read(dir.path().join("readme.txt")).unwrap(), b"read me");
    assert_eq!(fs::read(dir.path().join("big.txt")).unwrap(), big);
}

#[tokio::test]
async fn test_include_filter() {
    let dir = tempfile::tempdir().unwrap();
    let (archive, _) = sample_archive();

    let filter = EntryFilter {
        include: vec!["*.txt".into()],
        exclude: vec!["deep".into()],
    };
    let sink = DirectorySink::new(dir.path()).filter(filter);
    let sink = extract(&archive, sink).await.unwrap();

    assert_eq!(sink.files_written(), 2);
    assert_eq!(sink.skipped(), 1);
    assert!(dir.path().join("docs/readme.txt").exists());
    assert!(dir.path().join("notes.txt").exists());
    assert!(!dir.path().join("docs/deep/big.txt").exists());
}

#[tokio::test]
async fn test_truncated_archive_removes_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    let archive = ArchiveBuilder::new()
        .stored("done.txt", b"complete")
        .stored("cut.txt", &sample_text(10_000, 22))
        .finish();
    let truncated = &archive[..archive.len() - 5_000];

    let err = extract(truncated, DirectorySink::new(dir.path()))
        .await
        .err()
        .unwrap();

    assert!(err.to_string().contains("invalid archive"), "{err}");
    assert_eq!(fs::read(dir.path().join("done.txt")).unwrap(), b"complete");
    assert!(!dir.path().join("cut.txt").exists());
}

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_pipe_mode() {
    let dir = tempfile::tempdir().unwrap();
    let archive = ArchiveBuilder::new()
        .folder("dir/")
        .stored("dir/a.txt", b"first,")
        .streamed("b.txt", 8, b"second")
        .finish();
    let buffer = SharedBuffer::default();

    let sink = DirectorySink::new(dir.path()).pipe_to(Box::new(buffer.clone()));
    let sink = extract(&archive, sink).await.unwrap();

    assert_eq!(sink.files_written(), 2);
    assert_eq!(buffer.0.lock().unwrap().as_slice(), b"first,second");
    assert!(!dir.path().join("dir").exists());
}

#[tokio::test]
async fn test_listing_measures_streamed_entries() {
    let data = sample_text(50_000, 23);
    let archive = ArchiveBuilder::new()
        .folder("d/")
        .streamed("d/s.txt", 8, &data)
        .stored("k.txt", b"known")
        .finish();

    let mut source = MemorySource::new(archive, 1000);
    let listing = StreamExtractor::new()
        .run(&mut source, ListingSink::new())
        .await
        .unwrap();
    let entries = listing.entries();

    assert_eq!(entries.len(), 3);
    assert!(entries[0].is_directory);
    assert_eq!(entries[0].file_name, "d/");

    let streamed = &entries[1];
    assert_eq!(streamed.file_name, "d/s.txt");
    assert_eq!(streamed.uncompressed_size, data.len() as u64);
    assert_eq!(streamed.compressed_size, common::deflate(&data).len() as u64);
    assert_eq!(streamed.header.as_ref().map(|h| h.compressed_size), Some(0));

    assert_eq!(entries[2].compressed_size, 5);
    assert_eq!(entries[2].uncompressed_size, 5);
}
