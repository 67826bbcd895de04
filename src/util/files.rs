//! File-system helpers shared by the record store and the journal: fixed
//! read/write framing macros, append/create/open helpers and a directory
//! walker used to enumerate `<db>.N` data files and `j._N` journal files.

use std::{ffi, fs, path};

use crate::{err_at, Error, Result};

/// Read exactly `n` bytes at `seek`, failing loudly on a short read — used
/// everywhere a record/extent/journal-section header has a known fixed
/// size.
#[macro_export]
macro_rules! read_file {
    ($fd:expr, $seek:expr, $n:expr, $msg:expr) => {{
        use std::convert::TryFrom;
        use std::io::{Read, Seek};

        match $fd.seek($seek) {
            Ok(_) => {
                let mut buf = vec![0; usize::try_from($n).unwrap()];
                match $fd.read(&mut buf) {
                    Ok(n) if buf.len() == n => Ok(buf),
                    Ok(n) => {
                        let m = buf.len();
                        err_at!(IOError, msg: concat!($msg, " {}/{} at {:?}"), m, n, $seek)
                    }
                    Err(err) => err_at!(IOError, Err(err)),
                }
            }
            Err(err) => err_at!(IOError, Err(err)),
        }
    }};
}

/// Write `$buffer` in full or fail — a partial write to a data or journal
/// file is treated as fatal rather than silently retried, since every
/// caller already knows the exact length it intends to write.
#[macro_export]
macro_rules! write_file {
    ($fd:expr, $buffer:expr, $file:expr, $msg:expr) => {{
        use std::io::Write;

        match err_at!(IOError, $fd.write($buffer)) {
            Ok(n) if $buffer.len() == n => Ok(n),
            Ok(n) => err_at!(
                Fatal, msg: "partial-wr {}, {:?}, {}/{}", $msg, $file, $buffer.len(), n
            ),
            Err(err) => Err(err),
        }
    }};
}

/// Create a file in append mode, removing any stale file at the same path
/// first — used for brand new journal files (`j._N`).
pub fn create_file_a(file: &ffi::OsStr) -> Result<fs::File> {
    let os_file = {
        let os_file = path::Path::new(file);
        fs::remove_file(os_file).ok(); // stale leftover from a previous run
        os_file
    };

    let parent = match os_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => return err_at!(InvalidFile, msg: "{:?}", file),
    };
    err_at!(IOError, fs::create_dir_all(parent))?;

    let mut opts = fs::OpenOptions::new();
    err_at!(IOError, opts.append(true).create_new(true).open(os_file))
}

/// Open an existing file in append mode — used to resume a data file after
/// a restart.
pub fn open_file_a(file: &ffi::OsStr) -> Result<fs::File> {
    let os_file = path::Path::new(file);
    let mut opts = fs::OpenOptions::new();
    err_at!(IOError, opts.append(true).open(os_file))
}

/// Open a file read-only.
pub fn open_file_r(file: &ffi::OsStr) -> Result<fs::File> {
    let os_file = path::Path::new(file);
    err_at!(IOError, fs::OpenOptions::new().read(true).open(os_file))
}

/// Open a file read-write without truncating, creating it if absent —
/// used for data files that are both scanned (reads) and extended
/// (writes) in place.
pub fn open_file_rw(file: &ffi::OsStr) -> Result<fs::File> {
    let os_file = path::Path::new(file);
    let mut opts = fs::OpenOptions::new();
    err_at!(IOError, opts.read(true).write(true).create(true).open(os_file))
}

/// Write `data` to `file` and `fsync` it before returning — the building
/// block for the journal writer's "fsync the journal file" step (spec.md
/// §4.5 step 4).
pub fn sync_write(file: &mut fs::File, data: &[u8]) -> Result<usize> {
    use std::io::Write;

    let n = err_at!(IOError, file.write(data))?;
    if n != data.len() {
        err_at!(IOError, msg: "partial write to file {} {}", n, data.len())?;
    }
    err_at!(IOError, file.sync_all())?;
    Ok(n)
}

pub enum WalkRes {
    Ok,
    SkipDir,
}

/// Breadth-first directory walk, used to enumerate `j._N` files under
/// `journal/` and `<db>.N` files under the dbpath at recovery time.
pub fn walk<P, S, F>(root: P, state: S, mut callb: F) -> Result<S>
where
    P: AsRef<path::Path>,
    F: FnMut(&mut S, &path::Path, &fs::DirEntry, usize, usize) -> Result<WalkRes>,
{
    do_walk(root, state, &mut callb, 0)
}

fn do_walk<P, S, F>(parent: P, mut state: S, callb: &mut F, depth: usize) -> Result<S>
where
    P: AsRef<path::Path>,
    F: FnMut(&mut S, &path::Path, &fs::DirEntry, usize, usize) -> Result<WalkRes>,
{
    let mut subdirs = vec![];

    let parent: path::PathBuf = parent.as_ref().to_path_buf();
    let dirs = err_at!(IOError, fs::read_dir(&parent), "read_dir({:?})", parent)?;
    for (breath, entry) in dirs.enumerate() {
        let entry = err_at!(IOError, entry)?;
        match callb(&mut state, &parent, &entry, depth, breath)? {
            WalkRes::Ok if err_at!(IOError, entry.file_type())?.is_dir() => subdirs.push(entry),
            WalkRes::Ok | WalkRes::SkipDir => (),
        }
    }

    for subdir in subdirs.into_iter() {
        state = do_walk(subdir.path(), state, callb, depth + 1)?;
    }

    Ok(state)
}

#[cfg(test)]
#[path = "files_test.rs"]
mod files_test;
