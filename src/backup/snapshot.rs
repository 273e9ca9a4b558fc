use crate::backup::category::{Category, SourceShape};
use crate::backup::fs_tree::{copy_file, copy_tree, top_level_count};
use crate::backup::manifest::{CategoryStats, CategoryStatus, Manifest, ManifestStatus, TOOL_VERSION};
use crate::backup::result_error::error::{CategoryError, Error};
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::run_context::RunContext;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug)]
pub struct SnapshotResult {
    pub staging_dir: PathBuf,
    pub manifest: Manifest,
    /// Categories that failed to copy; their siblings were still captured
    pub errors: Vec<CategoryError>,
}

/// Copies every category present on this machine into `dest_root`, then
/// writes the manifest.
///
/// Only failing to create `dest_root` or to write the manifest is fatal.
pub fn build_snapshot<P: AsRef<Path>>(ctx: &RunContext, dest_root: P) -> Result<SnapshotResult> {
    let dest_root = dest_root.as_ref();
    fs::create_dir_all(dest_root)
        .map_err(Error::from)
        .with_msg(format!("Creating snapshot dir {:?} failed", dest_root))?;

    let mut items = Vec::with_capacity(Category::ALL.len());
    let mut errors = Vec::new();
    for (category, source) in ctx.config().categories().iter() {
        match capture_category(category, source, dest_root) {
            Ok(stats) => items.push(stats),
            Err(e) => {
                items.push(CategoryStats::failed(category, source, e.error.to_string()));
                errors.push(e);
            }
        }
    }

    let manifest = Manifest {
        version: TOOL_VERSION.to_string(),
        timestamp: ctx.timestamp().token(),
        timestamp_utc: ctx.timestamp().rfc3339(),
        hash_algorithm: *ctx.config().hash_algorithm(),
        compressed: ctx.config().compression().is_enabled(),
        total_size: items.iter().map(|i| i.size).sum(),
        status: if errors.is_empty() {
            ManifestStatus::Completed
        } else {
            ManifestStatus::Partial
        },
        items,
        backup_path: dest_root.to_path_buf(),
    };
    manifest.write_to(dest_root)?;
    info!(
        "Snapshot captured {} item(s), {} byte(s) into {:?}",
        manifest.items_backed_up(),
        manifest.total_size,
        dest_root
    );

    Ok(SnapshotResult {
        staging_dir: dest_root.to_path_buf(),
        manifest,
        errors,
    })
}

fn capture_category(
    category: Category,
    source: &Path,
    dest_root: &Path,
) -> std::result::Result<CategoryStats, CategoryError> {
    if !source.exists() {
        info!("Skipping {category}, {:?} does not exist", source);
        return Ok(CategoryStats::skipped(category, source));
    }

    let dest = dest_root.join(category.staging_name());
    let captured = match category.shape() {
        SourceShape::Dir => copy_tree(source, &dest)
            .and_then(|size| top_level_count(&dest).map(|count| (count, size))),
        SourceShape::File => {
            let file_name = source
                .file_name()
                .unwrap_or(OsStr::new(category.staging_name()));
            copy_file(source, dest.join(file_name)).map(|size| (1, size))
        }
    };
    let (count, size) = captured
        .with_msg(format!("Copying {:?} failed", source))
        .map_err(|e| CategoryError::new(category, e))?;

    info!("Captured {category}: {count} item(s), {size} byte(s)");
    Ok(CategoryStats {
        category,
        source: source.to_path_buf(),
        count,
        size,
        status: CategoryStatus::Success,
        error: None,
    })
}
