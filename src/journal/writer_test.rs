use std::fs;

use super::*;
use crate::durability::BasicWrite;

fn tmp_dir(name: &str) -> OsString {
    let mut dir = std::env::temp_dir();
    dir.push(format!("docs-writer-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir.into_os_string()
}

#[test]
fn open_starts_a_fresh_file_header() {
    let dir = tmp_dir("open");
    let writer = JournalWriter::open(dir, false).unwrap();
    assert_eq!(writer.file_id(), 0);
}

#[test]
fn write_section_grows_the_file_and_persists_the_lsn() {
    let dir = tmp_dir("write");
    let mut writer = JournalWriter::open(dir, false).unwrap();

    let mut section = PreparedSection::new(1, 0);
    section.push_write(BasicWrite { db: "test".into(), file_no: 0, offset: 0, flags: 0, bytes: vec![1, 2, 3] });
    let n = writer.write_section(&section).unwrap();
    assert!(n > 0);

    writer.set_lsn(1).unwrap();
    assert_eq!(writer.read_lsn().unwrap(), 1);
}

#[test]
fn reopen_continues_from_the_highest_numbered_file() {
    let dir = tmp_dir("reopen");
    {
        let mut writer = JournalWriter::open(dir.clone(), false).unwrap();
        writer.rotate().unwrap();
        assert_eq!(writer.file_id(), 1);
    }
    let writer = JournalWriter::open(dir, false).unwrap();
    assert_eq!(writer.file_id(), 2);
}

#[test]
fn opening_the_same_journal_file_twice_is_rejected() {
    let dir = tmp_dir("locked");
    let _writer = JournalWriter::open(dir.clone(), false).unwrap();

    // create_file's advisory lock is held by `_writer`'s open fd, so a
    // second attempt at the same `j._0` file must fail rather than
    // silently interleave writes from two processes.
    let err = JournalWriter::create_file(&dir, 0).unwrap_err();
    assert!(matches!(err, Error::IOError(_)));
}

#[test]
fn cleanup_all_removes_existing_journal_files_and_starts_over() {
    let dir = tmp_dir("cleanup");
    let mut writer = JournalWriter::open(dir, false).unwrap();
    writer.rotate().unwrap();
    writer.cleanup_all().unwrap();
    assert_eq!(writer.file_id(), 0);
}
