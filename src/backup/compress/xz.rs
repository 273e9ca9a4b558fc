use crate::backup::compress::CompressorBuilder;
use crate::backup::result_error::result::Result;
use liblzma::stream::{Check, MtStreamBuilder};
use liblzma::write::XzEncoder;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::io::Write;
use std::num::NonZero;
use validator::Validate;

pub static XZ_ARCHIVE_EXT: &str = "tar.xz";

/// Default compression level (balance of speed vs size)
static DEFAULT_COMPRESSION_LEVEL: u32 = 6;
/// Maximum threads to prevent resource exhaustion
static DEFAULT_MAX_PARALLELIZATION: usize = 32;

/// Configuration for XZ (LZMA) compression
///
/// Supports parallel compression on multi-core systems. Single and
/// multi-threaded encoders lay out blocks differently, so the thread count
/// changes the archive bytes and therefore its fingerprint.
#[skip_serializing_none]
#[derive(Clone, Default, Validate, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct XzConfig {
    /// Compression level (0-9)
    #[validate(range(min = 0, max = 9))]
    level: Option<u32>,

    /// Number of compression threads, half of the available cores when unset
    #[validate(range(min = 1))]
    thread: Option<u32>,
}

impl XzConfig {
    pub fn new(level: Option<u32>, thread: Option<u32>) -> Self {
        Self { level, thread }
    }
}

impl<W: Write> CompressorBuilder<W> for XzConfig {
    type Compressor = XzEncoder<W>;

    fn build_compressor(&self, writer: W) -> Result<XzEncoder<W>> {
        let level = self.level.unwrap_or(DEFAULT_COMPRESSION_LEVEL);

        let thread = self.thread.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(NonZero::get)
                .map(|core| core / 2)
                .map(|t| t.max(1))
                .map(|t| t.min(DEFAULT_MAX_PARALLELIZATION) as u32)
                .unwrap_or(1)
        });

        tracing::debug!("Creating XZ compressor with level={}, threads={}", level, thread);

        if thread == 1 {
            Ok(XzEncoder::new(writer, level))
        } else {
            let stream = MtStreamBuilder::new()
                .preset(level)
                .check(Check::Crc64)
                .threads(thread)
                .encoder()?;
            Ok(XzEncoder::new_stream(writer, stream))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liblzma::read::XzDecoder;
    use std::io::{Cursor, Read};

    fn roundtrip(config: &XzConfig, data: &[u8]) -> Vec<u8> {
        let mut encoder = config.build_compressor(Cursor::new(Vec::new())).unwrap();
        encoder.write_all(data).unwrap();
        let compressed = encoder.finish().unwrap().into_inner();

        let mut out = Vec::new();
        XzDecoder::new(compressed.as_slice())
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_xz_config_default() {
        let config = XzConfig::default();
        assert!(config.level.is_none());
        assert!(config.thread.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_xz_config_invalid_level() {
        assert!(XzConfig::new(Some(10), Some(1)).validate().is_err());
    }

    #[test]
    fn test_xz_config_invalid_thread() {
        assert!(XzConfig::new(Some(5), Some(0)).validate().is_err());
    }

    #[test]
    fn test_single_thread_roundtrip() {
        let data = b"tasks and settings".repeat(100);
        assert_eq!(roundtrip(&XzConfig::new(Some(1), Some(1)), &data), data);
    }

    #[test]
    fn test_multi_thread_roundtrip() {
        let data = b"checkpoint".repeat(1000);
        assert_eq!(roundtrip(&XzConfig::new(Some(3), Some(4)), &data), data);
    }
}
