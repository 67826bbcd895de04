use super::*;

fn tmp_dbpath(name: &str) -> std::ffi::OsString {
    let mut p = std::env::temp_dir();
    p.push(format!("docstore-core-catalog-test-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&p).unwrap();
    p.into_os_string()
}

#[test]
fn insert_find_roundtrip() {
    let mut cat = Catalog::open(tmp_dbpath("insert"), "test").unwrap();
    cat.insert(CollectionHeader::new("test.foo")).unwrap();
    assert!(cat.find("test.foo").is_some());
    assert!(cat.find("test.bar").is_none());
}

#[test]
fn duplicate_insert_fails() {
    let mut cat = Catalog::open(tmp_dbpath("dup"), "test").unwrap();
    cat.insert(CollectionHeader::new("test.foo")).unwrap();
    let err = cat.insert(CollectionHeader::new("test.foo")).unwrap_err();
    assert!(matches!(err, Error::BadValue(_)));
}

#[test]
fn kill_tombstones_and_hides() {
    let mut cat = Catalog::open(tmp_dbpath("kill"), "test").unwrap();
    cat.insert(CollectionHeader::new("test.foo")).unwrap();
    cat.kill("test.foo").unwrap();
    assert!(cat.find("test.foo").is_none());
    // the slot is reusable after a kill
    cat.insert(CollectionHeader::new("test.foo")).unwrap();
    assert!(cat.find("test.foo").is_some());
}

#[test]
fn rename_moves_header_and_overflow_offset() {
    let mut cat = Catalog::open(tmp_dbpath("rename"), "test").unwrap();
    let mut header = CollectionHeader::new("test.foo");
    header.indexes.push(IndexDescriptor::new("a_1", vec![("a".into(), 1)]));
    cat.insert(header).unwrap();

    cat.rename("test.foo", "test.bar").unwrap();
    assert!(cat.find("test.foo").is_none());
    let renamed = cat.find("test.bar").unwrap();
    assert_eq!(renamed.name, "test.bar");
    assert_eq!(renamed.indexes.len(), 1);
}

#[test]
fn iterate_skips_tombstones() {
    let mut cat = Catalog::open(tmp_dbpath("iterate"), "test").unwrap();
    cat.insert(CollectionHeader::new("test.a")).unwrap();
    cat.insert(CollectionHeader::new("test.b")).unwrap();
    cat.kill("test.a").unwrap();

    let names: Vec<&str> = cat.iterate().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["test.b"]);
}

#[test]
fn flush_and_reopen_restores_entries() {
    let dbpath = tmp_dbpath("flush");
    {
        let mut cat = Catalog::open(dbpath.clone(), "test").unwrap();
        cat.insert(CollectionHeader::new("test.foo")).unwrap();
        cat.flush().unwrap();
    }
    let cat = Catalog::open(dbpath, "test").unwrap();
    assert!(cat.find("test.foo").is_some());
}
