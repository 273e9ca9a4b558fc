use crate::backup::category::{Category, CategoryPaths, SourceShape};
use crate::backup::entry::{BackupEntry, BackupView};
use crate::backup::fs_tree::{copy_file, copy_tree};
use crate::backup::result_error::error::{CategoryError, Error};
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::retention::BackupIndex;
use std::path::{Path, PathBuf};
use tracing::info;

pub static LATEST: &str = "latest";

/// Maps a user-supplied identifier to a backup, trying in order: an existing
/// path, `latest`, then the newest backup whose name contains the identifier.
pub fn resolve<P: AsRef<Path>>(identifier: &str, backup_root: P) -> Result<BackupEntry> {
    let as_path = Path::new(identifier);
    if as_path.exists() {
        return BackupEntry::at(as_path);
    }

    let index = BackupIndex::scan(backup_root)?;
    let found = if identifier == LATEST {
        index.latest()
    } else {
        index.find(identifier)
    };
    found
        .cloned()
        .ok_or_else(|| Error::BackupNotFound(identifier.to_string()))
}

#[derive(Debug, Default)]
pub struct RestoreReport {
    pub restored: Vec<Category>,
    /// Categories absent from the backup; their live data was left alone
    pub skipped: Vec<Category>,
    pub failed: Vec<CategoryError>,
}

impl RestoreReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Copies every category found in `entry` back to its live location.
///
/// Archives are extracted under `scratch_root` first; failing to extract is
/// fatal. The extraction directory is removed when this returns, whatever
/// happened to the individual categories.
pub fn restore_all<P: AsRef<Path>>(
    entry: &BackupEntry,
    paths: &CategoryPaths,
    scratch_root: P,
) -> Result<RestoreReport> {
    info!("Restoring from {:?}", entry.path());
    let view = entry.open(scratch_root)?;
    if let Ok(manifest) = view.manifest() {
        info!(
            "Backup taken {} by version {}, {} item(s)",
            manifest.timestamp,
            manifest.version,
            manifest.items_backed_up()
        );
    }

    let mut report = RestoreReport::default();
    for (category, live) in paths.iter() {
        match restore_category(&view, category, live) {
            Ok(true) => report.restored.push(category),
            Ok(false) => report.skipped.push(category),
            Err(e) => {
                report.failed.push(e);
            }
        }
    }
    info!(
        "Restored {} categor(ies), skipped {}, failed {}",
        report.restored.len(),
        report.skipped.len(),
        report.failed.len()
    );
    Ok(report)
}

fn staged_source(view: &BackupView, category: Category, live: &Path) -> Option<PathBuf> {
    category
        .restore_candidates()
        .into_iter()
        .map(|name| view.root().join(name))
        .find_map(|dir| match category.shape() {
            SourceShape::Dir => dir.is_dir().then_some(dir),
            SourceShape::File => live
                .file_name()
                .map(|file_name| dir.join(file_name))
                .filter(|file| file.is_file()),
        })
}

/// `Ok(false)` when the backup does not hold this category
fn restore_category(
    view: &BackupView,
    category: Category,
    live: &Path,
) -> std::result::Result<bool, CategoryError> {
    let Some(staged) = staged_source(view, category, live) else {
        info!("{category} not in backup, leaving {:?} untouched", live);
        return Ok(false);
    };

    let copied = match category.shape() {
        SourceShape::Dir => copy_tree(&staged, live),
        SourceShape::File => copy_file(&staged, live),
    };
    copied
        .with_msg(format!("Restoring {:?} to {:?} failed", staged, live))
        .map_err(|e| CategoryError::new(category, e))?;

    info!("Restored {category} to {:?}", live);
    Ok(true)
}
