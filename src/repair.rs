//! The repair sequence around the backup subsystem: verify, back up,
//! reinstall the extension, restore, then fix the editor layout.

use crate::backup::archive::archive;
use crate::backup::entry::BackupEntry;
use crate::backup::fs_tree::tree_size;
use crate::backup::hash::all_digests;
use crate::backup::manifest::MANIFEST_FILE_NAME;
use crate::backup::report::{BackupListing, RunReport};
use crate::backup::restore::{resolve, restore_all, LATEST};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::retention::{prune, BackupIndex};
use crate::backup::run_context::RunContext;
use crate::backup::snapshot::build_snapshot;
use crate::backup::verify::{verify_all, VerifySummary};
use crate::host::settings::{merge_setting, SIDEBAR_LOCATION, SIDEBAR_LOCATION_KEY};
use crate::host::ExtensionHost;
use bon::Builder;
use itertools::Itertools;
use serde_json::Value;
use std::io::{BufRead, Write};
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Back up, reinstall, restore
    #[default]
    Repair,
    BackupOnly,
    RestoreOnly,
    ListBackups,
}

#[derive(Clone, Debug, Builder)]
pub struct RepairOptions {
    #[builder(default)]
    pub mode: Mode,
    /// Reinstall without taking a backup first; nothing is restored afterwards
    #[builder(default)]
    pub skip_backup: bool,
    #[builder(into, default = LATEST.to_string())]
    pub restore_from: String,
    /// Whether the user can be asked to close the editor
    #[builder(default)]
    pub interactive: bool,
}

/// Runs one invocation. Fatal conditions are returned as `Err`; recoverable
/// ones are recorded in `report` and the sequence carries on.
pub fn run<H: ExtensionHost>(
    ctx: &RunContext,
    host: &H,
    options: &RepairOptions,
    report: &mut RunReport,
) -> Result<()> {
    info!(
        "Run {} in {:?} mode, backups in {:?}",
        ctx.timestamp(),
        options.mode,
        ctx.backup_root()
    );

    let index = BackupIndex::scan(ctx.backup_root())?;
    let summary = verify_all(&index, *ctx.config().hash_algorithm());
    if options.mode == Mode::ListBackups {
        report.backups = Some(list_backups(&index, &summary));
        report.verification = Some(summary);
        return Ok(());
    }
    report.verification = Some(summary);

    if options.mode == Mode::RestoreOnly {
        ensure_not_running(host, options.interactive)?;
        let entry = resolve(&options.restore_from, ctx.backup_root())?;
        return restore_into_live(ctx, &entry, report);
    }

    let host_info = host.detect()?;
    info!("Editor version {}", host_info.version);

    if options.mode == Mode::BackupOnly {
        info!("Backup-only mode, skipping the editor process check");
        create_backup(ctx, report)?;
        return Ok(());
    }

    ensure_not_running(host, options.interactive)?;

    let backup = if options.skip_backup {
        warn!("Backup skipped on request, user data will not be restored");
        if options.interactive {
            prompt("Backup skipped! Press Enter to continue or Ctrl+C to cancel...");
        }
        None
    } else {
        Some(create_backup(ctx, report)?)
    };

    if let Err(e) = host.uninstall() {
        warn!("Uninstall encountered issues, continuing: {e}");
    }
    host.install()
        .with_msg("Installing the extension failed, please install it manually")?;

    if let Some(entry) = backup {
        restore_into_live(ctx, &entry, report)?;
    }

    if let Err(e) = merge_setting(
        ctx.config().settings_file(),
        SIDEBAR_LOCATION_KEY,
        Value::from(SIDEBAR_LOCATION),
    ) {
        warn!("Configuring the sidebar failed: {e}");
    }

    info!("Repair completed");
    Ok(())
}

/// Snapshot, archive and prune. Returns the backup produced by this run.
pub fn create_backup(ctx: &RunContext, report: &mut RunReport) -> Result<BackupEntry> {
    let snapshot = build_snapshot(ctx, ctx.staging_dir())?;
    for e in &snapshot.errors {
        report.record_error(e);
    }

    match ctx
        .config()
        .hash_algorithm()
        .digest_file(snapshot.staging_dir.join(MANIFEST_FILE_NAME))
    {
        Ok(digest) => {
            report.hashes.insert("manifest".to_string(), digest);
        }
        Err(e) => report.record_error(&e),
    }

    let (backup_path, non_fatal_error) = archive(ctx, &snapshot.staging_dir)?;
    if let Some(e) = non_fatal_error {
        report.record_error(&e);
    }
    if backup_path.is_file() {
        match all_digests(&backup_path) {
            Ok(digests) => report.hashes.extend(digests),
            Err(e) => report.record_error(&e),
        }
    }

    report.backup_size = tree_size(&backup_path).ok();
    report.items_backed_up = Some(snapshot.manifest.items_backed_up());
    report.backup_path = Some(backup_path.clone());
    info!("Backup stored at {:?}", backup_path);

    let (removed, prune_error) = prune(
        ctx.backup_root(),
        *ctx.config().max_backups(),
        Some(backup_path.as_path()),
    )?;
    if !removed.is_empty() {
        info!("Removed {} old backup(s)", removed.len());
    }
    if let Some(e) = prune_error {
        report.record_error(&e);
    }

    BackupEntry::at(&backup_path)
}

fn restore_into_live(ctx: &RunContext, entry: &BackupEntry, report: &mut RunReport) -> Result<()> {
    let restored = restore_all(entry, ctx.config().categories(), ctx.backup_root())?;
    for e in &restored.failed {
        report.record_error(e);
    }
    report.restored = restored.restored;
    Ok(())
}

fn list_backups(index: &BackupIndex, summary: &VerifySummary) -> Vec<BackupListing> {
    index
        .entries()
        .iter()
        .map(|entry| BackupListing::new(entry, summary.result_for(entry)))
        .collect_vec()
}

fn ensure_not_running<H: ExtensionHost>(host: &H, interactive: bool) -> Result<()> {
    let running = host.running_processes()?;
    if running == 0 {
        return Ok(());
    }
    warn!("Found {running} editor process(es) running");
    if !interactive {
        return Err(Error::HostRunning(running));
    }

    prompt("The editor must be closed. Save your work, close all windows, then press Enter...");
    match host.running_processes()? {
        0 => Ok(()),
        still_running => Err(Error::HostRunning(still_running)),
    }
}

fn prompt(message: &str) {
    eprintln!("{message}");
    let _ = std::io::stderr().flush();
    let mut line = String::new();
    if let Err(e) = std::io::stdin().lock().read_line(&mut line) {
        warn!("Reading confirmation failed: {e}");
    }
}
