//! File digests and the short fingerprints embedded in archive names.
//!
//! The fingerprint is a fixed-length prefix of the hex digest. It is meant
//! for telling backups apart at a glance and for catching corruption, not
//! as a collision-resistant identifier.

use crate::backup::result_error::result::Result;
use clap::ValueEnum;
use derive_more::Display;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Number of hex characters kept from a digest for file naming
pub const FINGERPRINT_LEN: usize = 8;

const BUFFER_SIZE: usize = 8192;

#[derive(
    Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    #[display("sha256")]
    Sha256,
    #[display("sha1")]
    Sha1,
    #[display("md5")]
    Md5,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 3] = [Self::Sha256, Self::Sha1, Self::Md5];

    /// Hex digest of the file at `path`, read in fixed-size chunks
    pub fn digest_file<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        let reader = BufReader::with_capacity(BUFFER_SIZE, File::open(path.as_ref())?);
        match self {
            Self::Sha256 => digest_reader::<Sha256, _>(reader),
            Self::Sha1 => digest_reader::<Sha1, _>(reader),
            Self::Md5 => digest_reader::<Md5, _>(reader),
        }
    }

    pub fn fingerprint_file<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        self.digest_file(path)
            .map(|digest| short_fingerprint(&digest).to_string())
    }
}

fn digest_reader<D: Digest, R: Read>(mut reader: R) -> Result<String> {
    let mut hasher = D::new();
    let mut buffer = [0u8; BUFFER_SIZE];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// First [`FINGERPRINT_LEN`] characters of a hex digest, or the whole digest if shorter
pub fn short_fingerprint(digest: &str) -> &str {
    digest.get(..FINGERPRINT_LEN).unwrap_or(digest)
}

/// Every supported digest of one file, keyed by algorithm name
pub fn all_digests<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, String>> {
    HashAlgorithm::ALL
        .iter()
        .map(|algo| {
            algo.digest_file(path.as_ref())
                .map(|digest| (algo.to_string(), digest))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    const EMPTY_SHA1: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";
    const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";

    #[test]
    fn test_digest_of_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty");
        std::fs::write(&path, b"").unwrap();

        assert_eq!(HashAlgorithm::Sha256.digest_file(&path).unwrap(), EMPTY_SHA256);
        assert_eq!(HashAlgorithm::Sha1.digest_file(&path).unwrap(), EMPTY_SHA1);
        assert_eq!(HashAlgorithm::Md5.digest_file(&path).unwrap(), EMPTY_MD5);
    }

    #[test]
    fn test_digest_spans_multiple_buffers() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("large");
        let data = vec![7u8; BUFFER_SIZE * 3 + 17];
        std::fs::write(&path, &data).unwrap();

        let expected = hex::encode(Sha256::digest(&data));
        assert_eq!(HashAlgorithm::Sha256.digest_file(&path).unwrap(), expected);
    }

    #[test]
    fn test_digest_missing_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(HashAlgorithm::Sha256
            .digest_file(temp_dir.path().join("missing"))
            .is_err());
    }

    #[test]
    fn test_short_fingerprint() {
        assert_eq!(short_fingerprint(EMPTY_SHA256), "e3b0c442");
        assert_eq!(short_fingerprint("abc"), "abc");
    }

    #[test]
    fn test_all_digests_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty");
        std::fs::write(&path, b"").unwrap();

        let digests = all_digests(&path).unwrap();
        assert_eq!(digests.len(), 3);
        assert_eq!(digests["md5"], EMPTY_MD5);
        assert_eq!(digests["sha1"], EMPTY_SHA1);
        assert_eq!(digests["sha256"], EMPTY_SHA256);
    }

    #[test]
    fn test_algorithm_serde_lowercase() {
        let algo: HashAlgorithm = serde_json::from_str("\"md5\"").unwrap();
        assert_eq!(algo, HashAlgorithm::Md5);
        assert_eq!(serde_json::to_string(&HashAlgorithm::Sha1).unwrap(), "\"sha1\"");
    }
}
