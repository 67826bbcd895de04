use std::fs;

use super::*;
use crate::durability::BasicWrite;

fn tmp_dir(name: &str) -> (OsString, OsString) {
    let mut base = std::env::temp_dir();
    base.push(format!("docs-recovery-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&base);
    let mut dbpath = base.clone();
    dbpath.push("db");
    let mut journal_dir = base;
    journal_dir.push("journal");
    fs::create_dir_all(&dbpath).unwrap();
    fs::create_dir_all(&journal_dir).unwrap();
    (dbpath.into_os_string(), journal_dir.into_os_string())
}

fn write_journal_file(journal_dir: &OsStr, file_id: u64, sections: &[PreparedSection]) {
    let mut path = PathBuf::from(journal_dir);
    path.push(journal_file_name(file_id));
    let mut bytes = FileHeader { file_id }.to_bytes().to_vec();
    for section in sections {
        bytes.extend_from_slice(&section.encode().unwrap());
    }
    fs::write(path, bytes).unwrap();
}

#[test]
fn recovers_with_no_journal_directory() {
    let mut dbpath = std::env::temp_dir();
    dbpath.push(format!("docs-recovery-missing-{}", std::process::id()));
    let mut missing = dbpath.clone();
    missing.push("journal");
    let outcome = recover(dbpath.into_os_string(), missing.into_os_string()).unwrap();
    assert_eq!(outcome.sections_applied, 0);
}

#[test]
fn replays_file_creation_and_basic_write() {
    let (dbpath, journal_dir) = tmp_dir("basic");

    let mut section = PreparedSection::new(1, 0);
    section.push_op(DurOp::FileCreated { db: "test".into(), file_no: 0, size: 64 });
    section.push_write(BasicWrite { db: "test".into(), file_no: 0, offset: 16, flags: 0, bytes: vec![7, 7, 7, 7] });
    write_journal_file(&journal_dir, 0, &[section]);

    let outcome = recover(dbpath.clone(), journal_dir).unwrap();
    assert_eq!(outcome.sections_applied, 1);
    assert!(!outcome.truncated_early);

    let mut path = PathBuf::from(&dbpath);
    path.push("test.0");
    let bytes = fs::read(path).unwrap();
    assert_eq!(bytes.len(), 64);
    assert_eq!(&bytes[16..20], &[7, 7, 7, 7]);
}

#[test]
fn corrupt_footer_truncates_without_erroring() {
    let (dbpath, journal_dir) = tmp_dir("corrupt");

    let mut good = PreparedSection::new(1, 0);
    good.push_write(BasicWrite { db: "test".into(), file_no: 0, offset: 0, flags: 0, bytes: vec![1] });
    let good_bytes = good.encode().unwrap();

    let mut bad = PreparedSection::new(2, 0);
    bad.push_write(BasicWrite { db: "test".into(), file_no: 0, offset: 1, flags: 0, bytes: vec![2] });
    let mut bad_bytes = bad.encode().unwrap();
    let last = bad_bytes.len() - 1;
    bad_bytes[last] ^= 0xFF;

    let mut path = PathBuf::from(&journal_dir);
    path.push(journal_file_name(0));
    let mut bytes = FileHeader { file_id: 0 }.to_bytes().to_vec();
    bytes.extend_from_slice(&good_bytes);
    bytes.extend_from_slice(&bad_bytes);
    fs::write(path, bytes).unwrap();

    let outcome = recover(dbpath, journal_dir).unwrap();
    assert_eq!(outcome.sections_applied, 1);
    assert!(outcome.truncated_early);
}

#[test]
fn replay_is_idempotent() {
    let (dbpath, journal_dir) = tmp_dir("idempotent");

    let mut section = PreparedSection::new(1, 0);
    section.push_op(DurOp::FileCreated { db: "test".into(), file_no: 0, size: 32 });
    section.push_write(BasicWrite { db: "test".into(), file_no: 0, offset: 4, flags: 0, bytes: vec![9, 9] });
    write_journal_file(&journal_dir, 0, &[section]);

    let first = recover(dbpath.clone(), journal_dir.clone()).unwrap();
    let second = recover(dbpath.clone(), journal_dir).unwrap();
    assert_eq!(first.sections_applied, second.sections_applied);

    let mut path = PathBuf::from(&dbpath);
    path.push("test.0");
    let bytes = fs::read(path).unwrap();
    assert_eq!(bytes.len(), 32);
    assert_eq!(&bytes[4..6], &[9, 9]);
}

#[test]
fn rejects_gap_in_journal_file_sequence() {
    let (dbpath, journal_dir) = tmp_dir("gap");

    let mut section = PreparedSection::new(1, 0);
    section.push_write(BasicWrite { db: "test".into(), file_no: 0, offset: 0, flags: 0, bytes: vec![1] });
    write_journal_file(&journal_dir, 0, &[section.clone()]);
    write_journal_file(&journal_dir, 2, &[section]);

    let err = recover(dbpath, journal_dir).unwrap_err();
    assert!(matches!(err, Error::JournalCorrupt(_)));
}

#[test]
fn drop_db_removes_its_data_files() {
    let (dbpath, journal_dir) = tmp_dir("dropdb");

    let mut create = PreparedSection::new(1, 0);
    create.push_op(DurOp::FileCreated { db: "test".into(), file_no: 0, size: 16 });
    write_journal_file(&journal_dir, 0, &[create]);
    recover(dbpath.clone(), journal_dir.clone()).unwrap();

    let mut path = PathBuf::from(&dbpath);
    path.push("test.0");
    assert!(path.exists());

    let mut drop_section = PreparedSection::new(2, 0);
    drop_section.push_op(DurOp::DropDb { db: "test".into() });
    write_journal_file(&journal_dir, 1, &[drop_section]);

    recover(dbpath, journal_dir).unwrap();
    assert!(!path.exists());
}
