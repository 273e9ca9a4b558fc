use crate::backup::entry::BackupEntry;
use crate::backup::hash::{short_fingerprint, HashAlgorithm};
use crate::backup::result_error::result::Result;
use crate::backup::retention::BackupIndex;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static FINGERPRINT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_([0-9A-Fa-f]{8})\.tar\.xz$").unwrap());

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    Verified,
    Failed,
    /// No fingerprint in the name, nothing to check against
    LegacyUnknown,
}

/// Checks an archive against the fingerprint embedded in its file name.
///
/// The fingerprint is a prefix of the digest under the algorithm the archive
/// was created with, and the name does not record which one. Checking with a
/// different `algorithm` yields `Failed` for an intact archive.
///
/// Advisory only: a mismatch is reported, never acted upon.
pub fn verify<P: AsRef<Path>>(path: P, algorithm: HashAlgorithm) -> Result<Verification> {
    let path = path.as_ref();
    let expected = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|name| FINGERPRINT_SUFFIX.captures(name))
        .map(|c| c[1].to_string());
    let Some(expected) = expected else {
        return Ok(Verification::LegacyUnknown);
    };

    let digest = algorithm.digest_file(path)?;
    let actual = short_fingerprint(&digest);
    debug!("{:?}: expected {}, actual {}", path, expected, actual);
    Ok(if actual.eq_ignore_ascii_case(&expected) {
        Verification::Verified
    } else {
        Verification::Failed
    })
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct VerifySummary {
    pub verified: usize,
    pub failed: usize,
    pub legacy: usize,
    #[serde(skip)]
    pub results: Vec<(PathBuf, Verification)>,
}

impl VerifySummary {
    pub fn result_for(&self, entry: &BackupEntry) -> Option<Verification> {
        self.results
            .iter()
            .find(|(p, _)| p == entry.path())
            .map(|(_, v)| *v)
    }

    fn record(&mut self, path: &Path, verification: Verification) {
        match verification {
            Verification::Verified => self.verified += 1,
            Verification::Failed => self.failed += 1,
            Verification::LegacyUnknown => self.legacy += 1,
        }
        self.results.push((path.to_path_buf(), verification));
    }
}

/// Verifies every archive in the index. Directory backups carry no
/// fingerprint and count as legacy; an unreadable archive counts as failed.
pub fn verify_all(index: &BackupIndex, algorithm: HashAlgorithm) -> VerifySummary {
    let mut summary = VerifySummary::default();
    for entry in index.entries() {
        let verification = if entry.is_archive() {
            verify(entry.path(), algorithm).unwrap_or_else(|e| {
                warn!("Verifying {:?} failed: {e}", entry.path());
                Verification::Failed
            })
        } else {
            Verification::LegacyUnknown
        };
        if verification == Verification::Failed {
            warn!(
                "Integrity check failed for {:?} using {algorithm}; archives made with another hash algorithm always fail",
                entry.path()
            );
        }
        summary.record(entry.path(), verification);
    }
    info!(
        "Verified {} backup(s): {} ok, {} failed, {} without fingerprint",
        index.len(),
        summary.verified,
        summary.failed,
        summary.legacy
    );
    summary
}
