use cline_repair::backup::backup_config::RepairConfig;
use cline_repair::backup::category::Category;
use cline_repair::backup::entry::BackupEntry;
use cline_repair::backup::report::RunReport;
use cline_repair::backup::restore::{resolve, restore_all, LATEST};
use cline_repair::backup::retention::{prune, BackupIndex};
use cline_repair::backup::run_context::RunContext;
use cline_repair::backup::timestamp::RunTimestamp;
use cline_repair::backup::verify::{verify, Verification};
use cline_repair::repair::create_backup;
use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn context(home: &Path, compression: serde_json::Value, day: u32) -> RunContext {
    let config = RepairConfig::load(home, None, [json!({ "compression": compression })]).unwrap();
    RunContext::builder()
        .config(config)
        .timestamp(RunTimestamp::from_date_time(
            Utc.with_ymd_and_hms(2025, 3, day, 8, 30, 0).unwrap(),
        ))
        .build()
}

fn xz() -> serde_json::Value {
    json!({"compressor_type": "xz", "level": 1, "thread": 1})
}

fn write_tasks(ctx: &RunContext) -> Vec<(String, Vec<u8>)> {
    let tasks = ctx.config().categories().tasks();
    let files = vec![
        ("1700000000001/api_conversation_history.json".to_string(), b"[{\"role\":\"user\"}]".to_vec()),
        ("1700000000002/ui_messages.json".to_string(), vec![0u8, 159, 146, 150, 10]),
        ("1700000000003/task_metadata.json".to_string(), b"{\"files\":[]}".to_vec()),
    ];
    for (name, content) in &files {
        let path = tasks.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    files
}

#[test]
fn archive_round_trip_restores_identical_bytes() {
    let home = TempDir::new().unwrap();
    let ctx = context(home.path(), xz(), 1);
    let files = write_tasks(&ctx);
    let mut report = RunReport::new(ctx.timestamp().token());

    let backup = create_backup(&ctx, &mut report).unwrap();
    assert!(backup.is_archive());
    assert_eq!(report.items_backed_up, Some(3));
    assert!(report.errors.is_empty());
    assert!(!ctx.staging_dir().exists());

    let tasks = ctx.config().categories().tasks().clone();
    fs::remove_dir_all(&tasks).unwrap();

    let latest = resolve(LATEST, ctx.backup_root()).unwrap();
    assert_eq!(latest, backup);
    let restored = restore_all(&latest, ctx.config().categories(), ctx.backup_root()).unwrap();

    assert!(restored.is_success());
    assert!(restored.restored.contains(&Category::Tasks));
    for (name, content) in files {
        assert_eq!(fs::read(tasks.join(&name)).unwrap(), content, "{name}");
    }
    // the temporary extraction directory is gone
    let leftovers = fs::read_dir(ctx.backup_root())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".restore_"))
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn directory_backup_round_trip() {
    let home = TempDir::new().unwrap();
    let ctx = context(home.path(), json!({"compressor_type": "none"}), 2);
    let files = write_tasks(&ctx);
    let mut report = RunReport::new(ctx.timestamp().token());

    let backup = create_backup(&ctx, &mut report).unwrap();
    assert!(!backup.is_archive());
    assert_eq!(backup.name(), "20250302_083000_UTC");
    assert!(!report.hashes.contains_key("sha256"));
    assert!(report.hashes.contains_key("manifest"));

    let tasks = ctx.config().categories().tasks().clone();
    fs::remove_dir_all(&tasks).unwrap();
    restore_all(&backup, ctx.config().categories(), ctx.backup_root()).unwrap();

    for (name, content) in files {
        assert_eq!(fs::read(tasks.join(&name)).unwrap(), content);
    }
}

#[test]
fn verifier_detects_tampering_and_legacy_names() {
    let home = TempDir::new().unwrap();
    let ctx = context(home.path(), xz(), 3);
    write_tasks(&ctx);
    let mut report = RunReport::new(ctx.timestamp().token());
    let backup = create_backup(&ctx, &mut report).unwrap();
    let algorithm = *ctx.config().hash_algorithm();

    assert_eq!(verify(backup.path(), algorithm).unwrap(), Verification::Verified);

    let legacy = ctx.backup_root().join("backup_20240101_000000.tar.xz");
    fs::copy(backup.path(), &legacy).unwrap();
    assert_eq!(verify(&legacy, algorithm).unwrap(), Verification::LegacyUnknown);

    let mut bytes = fs::read(backup.path()).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xFF;
    fs::write(backup.path(), bytes).unwrap();
    assert_eq!(verify(backup.path(), algorithm).unwrap(), Verification::Failed);
}

#[test]
fn retention_keeps_newest_across_both_shapes() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let mut names = vec![];
    for i in 0..10 {
        let token = RunTimestamp::from_date_time(start + Duration::days(i)).token();
        let name = if i % 2 == 0 {
            let name = format!("backup_{token}_0123abcd.tar.xz");
            fs::write(root.join(&name), "archive").unwrap();
            name
        } else {
            fs::create_dir_all(root.join(&token).join("tasks")).unwrap();
            token
        };
        names.push(name);
    }

    let (removed, error) = prune(root, 5, None).unwrap();

    assert!(error.is_none());
    let removed_names: BTreeSet<&str> = removed.iter().map(|e| e.name().as_str()).collect();
    let oldest: BTreeSet<&str> = names[..5].iter().map(String::as_str).collect();
    assert_eq!(removed_names, oldest);
    for name in &names[5..] {
        assert!(root.join(name).exists(), "{name}");
    }
    let index = BackupIndex::scan(root).unwrap();
    assert_eq!(index.len(), 5);
    assert_eq!(index.latest().unwrap().name(), &names[9]);

    let (removed_again, _) = prune(root, 5, None).unwrap();
    assert!(removed_again.is_empty());
}

#[test]
fn latest_is_greatest_timestamp_regardless_of_shape_or_suffix() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("backup_20250101_000000_UTC_0123abcd.tar.xz"), "x").unwrap();
    fs::create_dir(root.join("20250105_000000")).unwrap();
    fs::write(root.join("backup_20250103_000000.tar.xz"), "x").unwrap();

    let latest = resolve(LATEST, root).unwrap();
    assert_eq!(latest.name(), "20250105_000000");
    assert_eq!(
        latest,
        BackupEntry::from_path(root.join("20250105_000000")).unwrap()
    );
}

#[test]
fn restore_leaves_live_category_missing_from_backup_untouched() {
    let home = TempDir::new().unwrap();
    let ctx = context(home.path(), xz(), 4);
    write_tasks(&ctx);
    let mut report = RunReport::new(ctx.timestamp().token());
    let backup = create_backup(&ctx, &mut report).unwrap();

    let workflows = ctx.config().categories().workflows().clone();
    fs::create_dir_all(&workflows).unwrap();
    fs::write(workflows.join("release.md"), "live only").unwrap();

    let restored = restore_all(&backup, ctx.config().categories(), ctx.backup_root()).unwrap();

    assert!(restored.is_success());
    assert!(restored.skipped.contains(&Category::Workflows));
    assert_eq!(
        fs::read_to_string(workflows.join("release.md")).unwrap(),
        "live only"
    );
}
