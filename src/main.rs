use clap::Parser;
use cline_repair::backup::backup_config::{parse_json_input, RepairConfig};
use cline_repair::backup::entry::BackupKind;
use cline_repair::backup::hash::HashAlgorithm;
use cline_repair::backup::report::{BackupListing, RunReport};
use cline_repair::backup::restore::LATEST;
use cline_repair::backup::result_error::error::Error;
use cline_repair::backup::result_error::result::Result;
use cline_repair::backup::run_context::RunContext;
use cline_repair::backup::timestamp::RunTimestamp;
use cline_repair::host::code_cli::CodeCli;
use cline_repair::logger::init_logger;
use cline_repair::repair::{self, Mode, RepairOptions};
use serde_json::{json, Map, Value};
use std::fmt::Display;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::exit;

/// Repairs the Cline extension: backs up its data, reinstalls it and restores the data
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Only create a backup, leave the extension installed
    #[arg(long, conflicts_with_all = ["restore_only", "list_backups", "skip_backup"])]
    backup_only: bool,

    /// Restore data from a backup without reinstalling the extension
    #[arg(long, conflicts_with = "list_backups")]
    restore_only: bool,

    /// Backup to restore from: `latest`, a timestamp or a path
    #[arg(long, visible_alias = "restore-from", default_value = LATEST, requires = "restore_only")]
    from: String,

    /// List the available backups and exit
    #[arg(long)]
    list_backups: bool,

    /// Reinstall without taking a backup first (not recommended)
    #[arg(long)]
    skip_backup: bool,

    /// Keep the backup as a plain directory instead of a tar.xz archive
    #[arg(long)]
    no_compress: bool,

    /// Digest used for archive fingerprints
    #[arg(long, value_enum, ignore_case = true)]
    hash_algorithm: Option<HashAlgorithm>,

    /// Number of backups to keep
    #[arg(long)]
    max_backups: Option<usize>,

    /// Directory holding the backups [default: ~/ClineBackups]
    #[arg(long)]
    backup_path: Option<PathBuf>,

    /// Location of a YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON object overriding config values
    #[arg(long)]
    json_input: Option<String>,

    /// Print a single JSON result object instead of log lines
    #[arg(long)]
    json_output: bool,

    /// Log debug details
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn mode(&self) -> Mode {
        if self.list_backups {
            Mode::ListBackups
        } else if self.restore_only {
            Mode::RestoreOnly
        } else if self.backup_only {
            Mode::BackupOnly
        } else {
            Mode::Repair
        }
    }

    /// Flags given on the command line, as the top config layer
    fn overlay(&self) -> Value {
        let mut overlay = Map::new();
        if let Some(path) = &self.backup_path {
            overlay.insert("backup_root".into(), json!(path));
        }
        if let Some(max_backups) = self.max_backups {
            overlay.insert("max_backups".into(), json!(max_backups));
        }
        if let Some(algorithm) = self.hash_algorithm {
            overlay.insert("hash_algorithm".into(), json!(algorithm));
        }
        if self.no_compress {
            overlay.insert("compression".into(), json!({"compressor_type": "none"}));
        }
        Value::Object(overlay)
    }

    fn load_config(&self) -> Result<RepairConfig> {
        let home = dirs::home_dir().ok_or(Error::NoHomeDir)?;
        let mut overlays = vec![];
        if let Some(blob) = &self.json_input {
            overlays.push(parse_json_input(blob)?);
        }
        overlays.push(self.overlay());
        RepairConfig::load(home, self.config.as_deref(), overlays)
    }
}

fn main() {
    let args = Args::parse();
    let timestamp = RunTimestamp::now();

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => fail_early(&args, &timestamp, e),
    };

    let guards = match init_logger(
        config.backup_root(),
        &timestamp.token(),
        args.verbose,
        !args.json_output,
    ) {
        Ok(guards) => guards,
        Err(e) => fail_early(&args, &timestamp, e),
    };

    let ctx = RunContext::builder()
        .config(config)
        .timestamp(timestamp)
        .json_output(args.json_output)
        .build();
    let host = CodeCli::from_config(ctx.config());
    let options = RepairOptions::builder()
        .mode(args.mode())
        .skip_backup(args.skip_backup)
        .restore_from(args.from.as_str())
        .interactive(!args.json_output && std::io::stdin().is_terminal())
        .build();

    let mut report = RunReport::new(ctx.timestamp().token());
    let res = repair::run(&ctx, &host, &options, &mut report);
    if let Err(e) = &res {
        report.record_error(e);
    }
    report.finish(res.is_ok());
    drop(guards);

    if *ctx.json_output() {
        print_json(&report);
    } else {
        print_human(&ctx, &options, &report);
    }

    exit(if res.is_ok() { 0 } else { 1 });
}

/// Reports a failure that happened before logging was set up
fn fail_early<E: Display>(args: &Args, timestamp: &RunTimestamp, error: E) -> ! {
    if args.json_output {
        let mut report = RunReport::new(timestamp.token());
        report.errors.push(error.to_string());
        report.finish(false);
        print_json(&report);
    } else {
        eprintln!("{error}");
    }
    exit(1);
}

fn print_json(report: &RunReport) {
    match serde_json::to_string_pretty(report) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Serializing report failed: {e}"),
    }
}

fn print_human(ctx: &RunContext, options: &RepairOptions, report: &RunReport) {
    if let Some(backups) = &report.backups {
        print_listing(ctx, backups);
        return;
    }

    println!("Status: {:?}", report.status);
    if let Some(path) = &report.backup_path {
        println!("Backup: {}", path.display());
    }
    if let Some(size) = report.backup_size {
        println!("Backup size: {}", format_size(size));
    }
    if !report.restored.is_empty() {
        let restored: Vec<String> = report.restored.iter().map(|c| c.to_string()).collect();
        println!("Restored: {}", restored.join(", "));
    }
    if options.mode == Mode::Repair && report.errors.is_empty() {
        println!("Launch the editor and check that Cline is in the left sidebar.");
    }
    if !report.errors.is_empty() {
        println!("{} error(s), see the log in {}", report.errors.len(), ctx.backup_root().display());
    }
}

fn print_listing(ctx: &RunContext, backups: &[BackupListing]) {
    if backups.is_empty() {
        println!("No backups found in {}", ctx.backup_root().display());
        return;
    }
    println!("Found {} backup(s) in {}\n", backups.len(), ctx.backup_root().display());
    println!("  # | Timestamp            | Type      | Size       | Integrity");
    println!("----+----------------------+-----------+------------+-----------");
    for (i, backup) in backups.iter().enumerate() {
        let kind = match backup.kind {
            BackupKind::Directory => "Directory",
            BackupKind::Archive { .. } => "Archive",
        };
        let integrity = backup
            .verification
            .map(|v| format!("{v:?}"))
            .unwrap_or_default();
        println!(
            "{:>3} | {:<20} | {:<9} | {:>10} | {}{}",
            i + 1,
            backup.timestamp.as_deref().unwrap_or(&backup.name),
            kind,
            backup.size.map(format_size).unwrap_or_default(),
            integrity,
            if i == 0 { " (latest)" } else { "" }
        );
    }
    println!("\nRestore one with: cline-repair --restore-only --from <TIMESTAMP>");
}

fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let bytes = bytes as f64;
    if bytes >= KIB * KIB {
        format!("{:.2} MB", bytes / (KIB * KIB))
    } else {
        format!("{:.2} KB", bytes / KIB)
    }
}
