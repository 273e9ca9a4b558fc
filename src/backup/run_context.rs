use crate::backup::backup_config::RepairConfig;
use crate::backup::timestamp::RunTimestamp;
use bon::Builder;
use getset::Getters;
use std::path::{Path, PathBuf};

pub static STAGING_PREFIX: &str = ".staging_";

/// Identity and settings of one run, built once at startup and passed by
/// reference to every component.
#[derive(Clone, Debug, Builder, Getters)]
#[getset(get = "pub")]
pub struct RunContext {
    config: RepairConfig,
    #[builder(default = RunTimestamp::now())]
    timestamp: RunTimestamp,
    /// Human output is suppressed when set
    #[builder(default)]
    json_output: bool,
}

impl RunContext {
    pub fn backup_root(&self) -> &Path {
        self.config.backup_root()
    }

    /// Working directory for this run's snapshot; the leading dot keeps it
    /// out of the backup index.
    pub fn staging_dir(&self) -> PathBuf {
        self.backup_root()
            .join(format!("{}{}", STAGING_PREFIX, self.timestamp.token()))
    }

    /// Final location of an uncompressed backup
    pub fn directory_backup_path(&self) -> PathBuf {
        self.backup_root().join(self.timestamp.token())
    }
}
