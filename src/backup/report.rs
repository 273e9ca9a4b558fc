//! The single JSON object printed at the end of a `--json-output` run.

use crate::backup::category::Category;
use crate::backup::entry::{BackupEntry, BackupKind};
use crate::backup::manifest::TOOL_VERSION;
use crate::backup::verify::{Verification, VerifySummary};
use serde::Serialize;
use serde_with::skip_serializing_none;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::PathBuf;
use tracing::error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
    InProgress,
}

#[skip_serializing_none]
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupListing {
    pub name: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub kind: BackupKind,
    pub timestamp: Option<String>,
    pub size: Option<u64>,
    pub verification: Option<Verification>,
}

impl BackupListing {
    pub fn new(entry: &BackupEntry, verification: Option<Verification>) -> Self {
        Self {
            name: entry.name().clone(),
            path: entry.path().clone(),
            kind: entry.kind().clone(),
            timestamp: entry.timestamp().map(|ts| ts.rfc3339()),
            size: entry.size().ok(),
            verification,
        }
    }
}

#[skip_serializing_none]
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub status: RunStatus,
    pub version: String,
    pub timestamp: String,
    pub backup_path: Option<PathBuf>,
    pub backup_size: Option<u64>,
    pub items_backed_up: Option<usize>,
    /// Digests of the finished backup keyed by algorithm, plus `manifest`
    pub hashes: BTreeMap<String, String>,
    pub verification: Option<VerifySummary>,
    pub restored: Vec<Category>,
    pub backups: Option<Vec<BackupListing>>,
    pub errors: Vec<String>,
}

impl RunReport {
    pub fn new<S: Into<String>>(timestamp: S) -> Self {
        Self {
            status: RunStatus::InProgress,
            version: TOOL_VERSION.to_string(),
            timestamp: timestamp.into(),
            backup_path: None,
            backup_size: None,
            items_backed_up: None,
            hashes: BTreeMap::new(),
            verification: None,
            restored: vec![],
            backups: None,
            errors: vec![],
        }
    }

    /// Logs `error` at error level and keeps its message for the report
    pub fn record_error<E: Display + ?Sized>(&mut self, error: &E) {
        error!("{error}");
        self.errors.push(error.to_string());
    }

    pub fn finish(&mut self, ok: bool) {
        self.status = if ok {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
    }
}
