//! # cline-repair
//!
//! Backs up, verifies and restores the user data of the Cline editor
//! extension, and reinstalls the extension around that backup.
//!
//! ## Features
//!
//! - **Snapshots**: Tasks, task history, MCP settings and servers, rules, workflows and checkpoints
//! - **Archives**: `tar.xz` with the archive's digest fingerprint in the file name
//! - **Verification**: Recomputes fingerprints of existing archives
//! - **Retention**: Keeps the newest N backups across archive and directory backups
//! - **Restore**: From `latest`, a timestamp or an explicit path
//!
//! ## Quick Start
//!
//! ```no_run
//! use cline_repair::backup::backup_config::RepairConfig;
//! use cline_repair::backup::report::RunReport;
//! use cline_repair::backup::run_context::RunContext;
//! use cline_repair::repair::create_backup;
//!
//! let config = RepairConfig::load("/home/me", None, std::iter::empty())?;
//! let ctx = RunContext::builder().config(config).build();
//! let mut report = RunReport::new(ctx.timestamp().token());
//! let backup = create_backup(&ctx, &mut report)?;
//! println!("{:?}", backup.path());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backup;
pub mod host;
pub mod logger;
pub mod repair;
