//! Appends journal sections to the current `j._N` file, fsyncing each one,
//! and rotates to a new file once a size threshold is crossed (spec.md
//! §4.5 step 4, §4.6).

use std::{ffi::OsString, fs, path::PathBuf};

use fs2::FileExt;

use crate::{
    durability::PreparedSection,
    err_at,
    journal::{journal_file_name, parse_journal_file_name, FileHeader},
    util, Error, Result,
};

/// Rotate to a fresh journal file once the current one crosses this size.
pub const ROTATE_SIZE: u64 = 1024 * 1024 * 1024;

pub struct JournalWriter {
    dir: OsString,
    file_id: u64,
    file: fs::File,
    len: u64,
    fsync: bool,
}

impl JournalWriter {
    /// Open the journal directory, continuing from the highest-numbered
    /// `j._N` file found (or starting a fresh `j._0`).
    pub fn open(dir: impl Into<OsString>, fsync: bool) -> Result<JournalWriter> {
        let dir = dir.into();
        err_at!(IOError, fs::create_dir_all(&dir))?;

        let next_id = Self::scan_max_file_id(&dir)?.map(|n| n + 1).unwrap_or(0);
        let (file, len) = Self::create_file(&dir, next_id)?;

        Ok(JournalWriter { dir, file_id: next_id, file, len, fsync })
    }

    fn scan_max_file_id(dir: &OsString) -> Result<Option<u64>> {
        let path = PathBuf::from(dir);
        if !path.exists() {
            return Ok(None);
        }
        let mut max = None;
        for entry in err_at!(IOError, fs::read_dir(&path))? {
            let entry = err_at!(IOError, entry)?;
            let name = entry.file_name();
            if let Some(name) = name.to_str() {
                if let Some(n) = parse_journal_file_name(name) {
                    max = Some(max.map_or(n, |m: u64| m.max(n)));
                }
            }
        }
        Ok(max)
    }

    fn create_file(dir: &OsString, file_id: u64) -> Result<(fs::File, u64)> {
        let mut path = PathBuf::from(dir);
        path.push(journal_file_name(file_id));
        let mut file = util::create_file_a(path.as_os_str())?;

        // Only one process may hold a given journal file open for writing
        // at a time (spec.md §4.6 assumes a single writer per journal
        // sequence); an advisory exclusive lock catches a second process
        // pointed at the same dbpath before it corrupts the sequence.
        err_at!(IOError, file.try_lock_exclusive(), "journal file {} is already locked by another process", file_id)?;

        let header = FileHeader { file_id };
        let n = util::sync_write(&mut file, &header.to_bytes())?;
        Ok((file, n as u64))
    }

    pub fn file_id(&self) -> u64 {
        self.file_id
    }

    /// Write one section: fsync the journal file before returning
    /// (spec.md §4.5 step 4). The durability mutex that guards the
    /// buffer-*build* phase (spec.md §4.5 "Concurrency") is the caller's
    /// responsibility — this call itself need not be serialized against
    /// concurrent buffer building, only against another `write_section`.
    pub fn write_section(&mut self, section: &PreparedSection) -> Result<u64> {
        let bytes = section.encode()?;
        let n = if self.fsync {
            util::sync_write(&mut self.file, &bytes)?
        } else {
            use std::io::Write;
            err_at!(IOError, self.file.write_all(&bytes))?;
            bytes.len()
        };
        self.len += n as u64;
        tracing::debug!(file_id = self.file_id, bytes = n, fsync = self.fsync, "wrote journal section");

        if self.len > ROTATE_SIZE {
            self.rotate()?;
        }
        Ok(n as u64)
    }

    fn rotate(&mut self) -> Result<()> {
        let next_id = self.file_id + 1;
        let (file, len) = Self::create_file(&self.dir, next_id)?;
        self.file_id = next_id;
        self.file = file;
        self.len = len;
        tracing::info!(file_id = next_id, "rotated to a new journal file");
        Ok(())
    }

    fn lsn_path(&self) -> PathBuf {
        let mut p = PathBuf::from(&self.dir);
        p.push("lsn");
        p
    }

    /// Persist the last-synced sequence number once the applier confirms
    /// every section up to it has reached the data files (spec.md §4.6
    /// "A truncate occurs when...").
    pub fn set_lsn(&self, seq: u64) -> Result<()> {
        err_at!(IOError, fs::write(self.lsn_path(), seq.to_le_bytes()))
    }

    pub fn read_lsn(&self) -> Result<u64> {
        read_lsn_at(&self.lsn_path())
    }

    /// Remove every `j._N` file once recovery/the applier has confirmed
    /// everything in them is durable in the data files (spec.md §4.6 step
    /// 3 "remove journal files").
    pub fn cleanup_all(&mut self) -> Result<()> {
        for entry in err_at!(IOError, fs::read_dir(&self.dir))? {
            let entry = err_at!(IOError, entry)?;
            if let Some(name) = entry.file_name().to_str() {
                if parse_journal_file_name(name).is_some() {
                    err_at!(IOError, fs::remove_file(entry.path())).ok();
                }
            }
        }
        let (file, len) = Self::create_file(&self.dir, 0)?;
        self.file_id = 0;
        self.file = file;
        self.len = len;
        Ok(())
    }
}

pub fn read_lsn_at(path: &PathBuf) -> Result<u64> {
    if !path.exists() {
        return Ok(0);
    }
    let bytes = err_at!(IOError, fs::read(path))?;
    if bytes.len() < 8 {
        return Ok(0);
    }
    let mut b = [0u8; 8];
    b.copy_from_slice(&bytes[0..8]);
    Ok(u64::from_le_bytes(b))
}

#[cfg(test)]
#[path = "writer_test.rs"]
mod writer_test;
