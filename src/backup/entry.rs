use crate::backup::archive::extract_archive;
use crate::backup::fs_tree::tree_size;
use crate::backup::manifest::Manifest;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::timestamp::{sort_key, RunTimestamp};
use getset::Getters;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tempfile::TempDir;

static ARCHIVE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^backup_(\d{8}_\d{6}(?:_UTC)?)(?:_([0-9A-Fa-f]{8}))?\.tar\.xz$").unwrap()
});
static DIRECTORY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{8}_\d{6}(?:_UTC)?)$").unwrap());

pub static RESTORE_DIR_PREFIX: &str = ".restore_";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackupKind {
    /// `fingerprint` is `None` for archives named before fingerprints existed
    Archive { fingerprint: Option<String> },
    Directory,
}

/// One persisted backup in the backup root, archive or plain directory.
#[derive(Clone, Debug, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct BackupEntry {
    path: PathBuf,
    name: String,
    /// Timestamp token taken from the name, empty when the name carries none
    token: String,
    kind: BackupKind,
}

impl BackupEntry {
    /// Recognizes a finalized backup by its name. Staging, temporary and
    /// unrelated entries yield `None`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();
        let name = path.file_name()?.to_str()?;

        if path.is_file() {
            let captures = ARCHIVE_NAME.captures(name)?;
            return Some(Self {
                path: path.to_path_buf(),
                name: name.to_string(),
                token: captures[1].to_string(),
                kind: BackupKind::Archive {
                    fingerprint: captures.get(2).map(|m| m.as_str().to_string()),
                },
            });
        }

        if path.is_dir() {
            let captures = DIRECTORY_NAME.captures(name)?;
            return Some(Self {
                path: path.to_path_buf(),
                name: name.to_string(),
                token: captures[1].to_string(),
                kind: BackupKind::Directory,
            });
        }

        None
    }

    /// Any existing file or directory given explicitly by the user, whether
    /// or not its name follows the backup naming scheme.
    pub fn at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(entry) = Self::from_path(path) {
            return Ok(entry);
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let kind = if path.is_dir() {
            BackupKind::Directory
        } else if path.is_file() {
            BackupKind::Archive { fingerprint: None }
        } else {
            return Err(Error::BackupNotFound(path.display().to_string()));
        };
        Ok(Self {
            path: path.to_path_buf(),
            name,
            token: String::new(),
            kind,
        })
    }

    pub fn is_archive(&self) -> bool {
        matches!(self.kind, BackupKind::Archive { .. })
    }

    pub fn fingerprint(&self) -> Option<&str> {
        match &self.kind {
            BackupKind::Archive { fingerprint } => fingerprint.as_deref(),
            BackupKind::Directory => None,
        }
    }

    pub fn timestamp(&self) -> Option<RunTimestamp> {
        RunTimestamp::parse_token(&self.token)
    }

    pub fn sort_key(&self) -> &str {
        sort_key(&self.token)
    }

    /// Bytes on disk: the archive length, or the sum of files in a directory
    pub fn size(&self) -> Result<u64> {
        tree_size(&self.path)
    }

    pub fn remove(&self) -> Result<()> {
        match self.kind {
            BackupKind::Archive { .. } => fs::remove_file(&self.path),
            BackupKind::Directory => fs::remove_dir_all(&self.path),
        }
        .map_err(Error::from)
        .with_msg(format!("Removing backup {:?} failed", self.path))
    }

    /// Readable view of the backup contents. Archives are extracted into a
    /// fresh `.restore_*` directory under `scratch_root` that lives as long
    /// as the returned view.
    pub fn open<P: AsRef<Path>>(&self, scratch_root: P) -> Result<BackupView> {
        match self.kind {
            BackupKind::Directory => Ok(BackupView {
                root: self.path.clone(),
                _extracted: None,
            }),
            BackupKind::Archive { .. } => {
                let extracted = tempfile::Builder::new()
                    .prefix(RESTORE_DIR_PREFIX)
                    .tempdir_in(scratch_root.as_ref())?;
                extract_archive(&self.path, extracted.path())?;
                Ok(BackupView {
                    root: extracted.path().to_path_buf(),
                    _extracted: Some(extracted),
                })
            }
        }
    }
}

/// Snapshot layout of a backup on disk. Dropping the view deletes any
/// extraction directory it owns.
#[derive(Debug)]
pub struct BackupView {
    root: PathBuf,
    _extracted: Option<TempDir>,
}

impl BackupView {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> Result<Manifest> {
        Manifest::read_from(&self.root)
    }
}
