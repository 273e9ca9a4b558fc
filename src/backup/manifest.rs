//! `backup_manifest.json`, written last into every snapshot.

use crate::backup::category::Category;
use crate::backup::hash::HashAlgorithm;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub static MANIFEST_FILE_NAME: &str = "backup_manifest.json";
pub static TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus {
    Success,
    /// Source absent on this machine
    Skipped,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestStatus {
    Completed,
    /// At least one category failed to copy
    Partial,
}

#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub category: Category,
    pub source: PathBuf,
    /// Top-level entries captured (one per task folder, one for a single file)
    pub count: usize,
    pub size: u64,
    pub status: CategoryStatus,
    pub error: Option<String>,
}

impl CategoryStats {
    pub fn skipped<P: Into<PathBuf>>(category: Category, source: P) -> Self {
        Self {
            category,
            source: source.into(),
            count: 0,
            size: 0,
            status: CategoryStatus::Skipped,
            error: None,
        }
    }

    pub fn failed<P: Into<PathBuf>, S: Into<String>>(category: Category, source: P, error: S) -> Self {
        Self {
            category,
            source: source.into(),
            count: 0,
            size: 0,
            status: CategoryStatus::Failed,
            error: Some(error.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: String,
    pub timestamp: String,
    pub timestamp_utc: String,
    pub hash_algorithm: HashAlgorithm,
    pub compressed: bool,
    pub items: Vec<CategoryStats>,
    pub total_size: u64,
    pub status: ManifestStatus,
    /// Directory the snapshot was captured into
    pub backup_path: PathBuf,
}

impl Manifest {
    pub fn items_backed_up(&self) -> usize {
        self.items.iter().map(|i| i.count).sum()
    }

    pub fn stats(&self, category: Category) -> Option<&CategoryStats> {
        self.items.iter().find(|i| i.category == category)
    }

    pub fn write_to<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let path = dir.as_ref().join(MANIFEST_FILE_NAME);
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(path)
    }

    pub fn read_from<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let path = dir.as_ref().join(MANIFEST_FILE_NAME);
        File::open(&path)
            .map(BufReader::new)
            .map_err(Error::from)
            .and_then(|r| serde_json::from_reader(r).map_err(Error::from))
            .with_msg(format!("Reading manifest {:?} failed", path))
    }
}
