pub mod xz;

use crate::backup::file_ext::FileExtProvider;
use crate::backup::result_error::result::Result;
use derive_more::From;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::result;
use validator::{Validate, ValidationErrors};

/// How a finished snapshot is persisted.
///
/// `None` keeps the snapshot as a plain directory; `Xz` packs it into a
/// fingerprinted `tar.xz` archive.
#[derive(Clone, From, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "compressor_type")]
#[serde(rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum CompressorConfig {
    None,
    Xz(xz::XzConfig),
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self::Xz(xz::XzConfig::default())
    }
}

impl Validate for CompressorConfig {
    fn validate(&self) -> result::Result<(), ValidationErrors> {
        match self {
            CompressorConfig::None => Ok(()),
            CompressorConfig::Xz(xz) => xz.validate(),
        }
    }
}

impl CompressorConfig {
    pub fn xz(&self) -> Option<&xz::XzConfig> {
        match self {
            CompressorConfig::None => None,
            CompressorConfig::Xz(xz) => Some(xz),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.xz().is_some()
    }
}

pub trait CompressorBuilder<W: Write> {
    type Compressor: Write;

    fn build_compressor(&self, writer: W) -> Result<Self::Compressor>;
}

impl FileExtProvider for CompressorConfig {
    fn file_ext(&self) -> Option<&'static str> {
        match self {
            CompressorConfig::None => None,
            CompressorConfig::Xz(_) => Some(xz::XZ_ARCHIVE_EXT),
        }
    }
}
