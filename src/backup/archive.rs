//! Packs a staging snapshot into `backup_<token>_<fp>.tar.xz`.
//!
//! The fingerprint is the short digest of the finished archive file, so the
//! same digest recomputed later tells whether the archive is intact.

use crate::backup::compress::xz::XzConfig;
use crate::backup::compress::CompressorBuilder;
use crate::backup::file_ext::FileExtProvider;
use crate::backup::function_path;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{WithDebugObjectAndFnName, WithMsg};
use crate::backup::run_context::RunContext;
use crate::backup::timestamp::RunTimestamp;
use function_name::named;
use liblzma::read::XzDecoder;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, IntoInnerError};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub static ARCHIVE_PREFIX: &str = "backup_";
static TMP_EXT: &str = "tmp";

/// `backup_<token>[_<fingerprint>].<ext>`
pub fn archive_file_name(ts: &RunTimestamp, fingerprint: Option<&str>, ext: &str) -> String {
    match fingerprint {
        Some(fp) => format!("{ARCHIVE_PREFIX}{}_{fp}.{ext}", ts.token()),
        None => format!("{ARCHIVE_PREFIX}{}.{ext}", ts.token()),
    }
}

/// Turns the staging directory into this run's backup.
///
/// Returns the backup path and an optional non-fatal error. When compression
/// is disabled, or when writing the archive fails, the staging directory is
/// renamed to `<root>/<token>` and kept as a directory backup. The staging
/// directory is only deleted once the archive exists under its final name.
#[named]
pub fn archive<P: AsRef<Path>>(ctx: &RunContext, staging_dir: P) -> Result<(PathBuf, Option<Error>)> {
    let staging_dir = staging_dir.as_ref();
    let compression = ctx.config().compression();
    let (Some(xz), Some(ext)) = (compression.xz(), compression.file_ext()) else {
        let dir = promote_to_directory(ctx, staging_dir)?;
        info!("Compression disabled, kept directory backup {:?}", dir);
        return Ok((dir, None));
    };

    let tmp_path = ctx.backup_root().join(format!(
        "{}.{TMP_EXT}",
        archive_file_name(ctx.timestamp(), None, ext)
    ));

    let archive_res = write_tar_xz(xz, staging_dir, &tmp_path)
        .and_then(|_| ctx.config().hash_algorithm().fingerprint_file(&tmp_path))
        .and_then(|fp| {
            let file_path = ctx
                .backup_root()
                .join(archive_file_name(ctx.timestamp(), Some(&fp), ext));
            fs::rename(&tmp_path, &file_path)
                .map(|_| file_path)
                .map_err(Error::from)
        })
        .with_debug_object_and_fn_name(staging_dir.to_path_buf(), function_path!());

    match archive_res {
        Ok(file_path) if file_path.is_file() => {
            info!("Created archive {:?}", file_path);
            let non_fatal_error = fs::remove_dir_all(staging_dir)
                .map_err(Error::from)
                .with_msg(format!("Removing staging dir {:?} failed", staging_dir))
                .err();
            Ok((file_path, non_fatal_error))
        }
        Ok(file_path) => Err(Error::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("archive {:?} missing after rename", file_path),
        ))),
        Err(mut e) => {
            if tmp_path.is_file() {
                if let Err(e2) = fs::remove_file(&tmp_path) {
                    e = e.chain(e2.into());
                }
            }
            warn!("Archiving failed, keeping the snapshot as a directory backup");
            match promote_to_directory(ctx, staging_dir) {
                Ok(dir) => Ok((dir, Some(e.with_msg("Archive creation failed")))),
                Err(e2) => Err(e.chain(e2)),
            }
        }
    }
}

fn promote_to_directory(ctx: &RunContext, staging_dir: &Path) -> Result<PathBuf> {
    let dir = ctx.directory_backup_path();
    fs::rename(staging_dir, &dir)
        .map_err(Error::from)
        .with_msg(format!("Renaming {:?} to {:?} failed", staging_dir, dir))?;
    Ok(dir)
}

fn write_tar_xz(xz: &XzConfig, src_dir: &Path, dst: &Path) -> Result<()> {
    let mut writer = File::create_new(dst)
        .map(BufWriter::new)
        .map_err(Error::from)
        .and_then(|f| xz.build_compressor(f))
        .map(BufWriter::new)
        .map(tar::Builder::new)?;

    writer.follow_symlinks(true);

    let mut entry_count = 0;
    for entry in WalkDir::new(src_dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let name = entry.path().strip_prefix(src_dir)?;
        if entry.file_type().is_dir() {
            writer.append_dir(name, entry.path())?;
        } else {
            writer.append_path_with_name(entry.path(), name)?;
        }
        entry_count += 1;
    }
    debug!("Wrote {} archive entries to {:?}", entry_count, dst);

    writer
        .into_inner()?
        .into_inner()
        .map_err(IntoInnerError::into_error)?
        .finish()?
        .into_inner()
        .map_err(IntoInnerError::into_error)?
        .sync_all()?;

    Ok(())
}

/// Unpacks a `tar.xz` backup into `dest`
pub fn extract_archive<P1: AsRef<Path>, P2: AsRef<Path>>(archive: P1, dest: P2) -> Result<()> {
    let archive = archive.as_ref();
    File::open(archive)
        .map(BufReader::new)
        .map(XzDecoder::new)
        .map(tar::Archive::new)
        .and_then(|mut a| a.unpack(dest.as_ref()))
        .map_err(|e| Error::Extraction {
            path: archive.to_path_buf(),
            error: Box::new(e.into()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::backup_config::RepairConfig;
    use crate::backup::hash::HashAlgorithm;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tempfile::TempDir;

    fn context(home: &Path, compression: serde_json::Value) -> RunContext {
        let config = RepairConfig::load(home, None, [json!({ "compression": compression })]).unwrap();
        RunContext::builder()
            .config(config)
            .timestamp(RunTimestamp::from_date_time(
                Utc.with_ymd_and_hms(2025, 11, 24, 10, 15, 0).unwrap(),
            ))
            .build()
    }

    fn staging(ctx: &RunContext) -> PathBuf {
        let dir = ctx.staging_dir();
        fs::create_dir_all(dir.join("tasks/t1")).unwrap();
        fs::write(dir.join("tasks/t1/ui_messages.json"), "[1,2,3]").unwrap();
        fs::write(dir.join("backup_manifest.json"), "{}").unwrap();
        dir
    }

    #[test]
    fn test_archive_name_embeds_archive_fingerprint() {
        let home = TempDir::new().unwrap();
        let ctx = context(home.path(), json!({"compressor_type": "xz", "level": 1, "thread": 1}));
        let staging_dir = staging(&ctx);

        let (path, non_fatal) = archive(&ctx, &staging_dir).unwrap();

        assert!(non_fatal.is_none());
        assert!(!staging_dir.exists());
        let fp = HashAlgorithm::Sha256.fingerprint_file(&path).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            format!("backup_20251124_101500_UTC_{fp}.tar.xz")
        );

        let out = TempDir::new().unwrap();
        extract_archive(&path, out.path()).unwrap();
        assert_eq!(
            fs::read_to_string(out.path().join("tasks/t1/ui_messages.json")).unwrap(),
            "[1,2,3]"
        );
    }

    #[test]
    fn test_disabled_compression_keeps_directory() {
        let home = TempDir::new().unwrap();
        let ctx = context(home.path(), json!({"compressor_type": "none"}));
        let staging_dir = staging(&ctx);

        let (path, non_fatal) = archive(&ctx, &staging_dir).unwrap();

        assert!(non_fatal.is_none());
        assert_eq!(path, ctx.backup_root().join("20251124_101500_UTC"));
        assert!(path.join("tasks/t1/ui_messages.json").is_file());
        assert!(!staging_dir.exists());
    }

    #[test]
    fn test_failed_archive_promotes_staging() {
        let home = TempDir::new().unwrap();
        let ctx = context(home.path(), json!({"compressor_type": "xz", "thread": 1}));
        let staging_dir = staging(&ctx);
        // occupy the temporary archive name so it cannot be created
        let blocker = ctx
            .backup_root()
            .join("backup_20251124_101500_UTC.tar.xz.tmp");
        fs::create_dir_all(&blocker).unwrap();

        let (path, non_fatal) = archive(&ctx, &staging_dir).unwrap();

        assert!(non_fatal.is_some());
        assert_eq!(path, ctx.directory_backup_path());
        assert!(path.join("backup_manifest.json").is_file());
        assert!(blocker.is_dir());
    }

    #[test]
    fn test_extract_garbage_is_extraction_error() {
        let temp_dir = TempDir::new().unwrap();
        let bogus = temp_dir.path().join("backup_20250101_000000_UTC_deadbeef.tar.xz");
        fs::write(&bogus, "not an archive").unwrap();

        match extract_archive(&bogus, temp_dir.path().join("out")) {
            Err(Error::Extraction { path, .. }) => assert_eq!(path, bogus),
            other => panic!("Expected extraction error, got {other:?}"),
        }
    }
}
