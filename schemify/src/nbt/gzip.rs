use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;

use crate::error::Result;

/// Gzip framing for schematic files.
#[derive(Clone, Copy, Debug)]
pub struct GzipCodec {
    level: Compression,
}

impl Default for GzipCodec {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl GzipCodec {
    /// `level` is clamped to flate2's 0-9 range.
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(len = data.len()))]
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), self.level);
        encoder.write_all(data)?;
        let compressed = encoder.finish()?;
        log::debug!("compressed {} bytes to {}", data.len(), compressed.len());
        Ok(compressed)
    }
}
