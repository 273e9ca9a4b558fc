use crate::backup::entry::BackupEntry;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::{convert_error_vec, Result};
use crate::backup::result_error::WithMsg;
use itertools::Itertools;
use std::fs::read_dir;
use std::path::Path;
use tracing::{info, warn};

/// Every finalized backup under a root, newest first.
///
/// Entries are enumerated by file name and then stably sorted by their
/// timestamp, so two backups sharing a timestamp keep enumeration order.
/// Recomputed on demand, never cached.
#[derive(Clone, Debug, Default)]
pub struct BackupIndex {
    entries: Vec<BackupEntry>,
}

impl BackupIndex {
    pub fn scan<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.exists() {
            return Ok(Self::default());
        }

        let mut entries = read_dir(root)
            .map_err(Error::from)
            .with_msg(format!("Listing backup root {:?} failed", root))?
            .filter_map(|r| r.ok())
            .map(|r| r.path())
            .sorted_by(|a, b| a.file_name().cmp(&b.file_name()))
            .filter_map(BackupEntry::from_path)
            .collect_vec();
        entries.sort_by(|a, b| b.sort_key().cmp(a.sort_key()));

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[BackupEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&BackupEntry> {
        self.entries.first()
    }

    /// First entry, newest first, whose name contains `needle`
    pub fn find(&self, needle: &str) -> Option<&BackupEntry> {
        self.entries.iter().find(|e| e.name().contains(needle))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Deletes every backup beyond the `max_count` newest.
///
/// `keep` is never deleted and counts toward `max_count`, so the backup a run
/// just produced survives even when older runs carry later timestamps.
/// Returns the removed entries and, separately, the deletions that failed;
/// a failed deletion does not stop the rest. Running it twice without a new
/// backup in between removes nothing the second time.
pub fn prune<P: AsRef<Path>>(
    root: P,
    max_count: usize,
    keep: Option<&Path>,
) -> Result<(Vec<BackupEntry>, Option<Error>)> {
    let index = BackupIndex::scan(root)?;
    if index.len() <= max_count {
        return Ok((vec![], None));
    }

    let (kept, candidates): (Vec<_>, Vec<_>) = index
        .entries
        .into_iter()
        .partition(|e| keep.is_some_and(|k| e.path() == k));
    let retained = max_count.saturating_sub(kept.len());

    let mut removed = vec![];
    let mut errors = vec![];
    for entry in candidates.into_iter().skip(retained) {
        info!("Removing out of retention backup {:?}", entry.path());
        match entry.remove() {
            Ok(_) => removed.push(entry),
            Err(e) => {
                warn!("{e}");
                errors.push(e);
            }
        }
    }

    Ok((removed, convert_error_vec(errors).err()))
}
