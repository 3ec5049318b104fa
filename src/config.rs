//! Runtime settings shared by the vault, the content reader and thumbnails.

use crate::crypto::KdfParams;

/// Default bounding box for generated thumbnails, in pixels.
pub const DEFAULT_THUMBNAIL_MAX_DIMENSION: u32 = 256;
/// Largest decrypted blob the reader will allocate (64 MiB).
pub const DEFAULT_MAX_CONTENT_BYTES: usize = 64 * 1024 * 1024;
/// Largest source image, in pixels, the thumbnailer will decode.
pub const DEFAULT_MAX_SOURCE_PIXELS: u64 = 48_000_000;

#[derive(Debug, Clone, Copy)]
pub struct Settings {
    kdf: KdfParams,
    thumbnail_max_dimension: u32,
    max_content_bytes: usize,
    max_source_pixels: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            kdf: KdfParams::default(),
            thumbnail_max_dimension: DEFAULT_THUMBNAIL_MAX_DIMENSION,
            max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
            max_source_pixels: DEFAULT_MAX_SOURCE_PIXELS,
        }
    }
}

impl Settings {
    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn with_thumbnail_max_dimension(mut self, max: u32) -> Self {
        self.thumbnail_max_dimension = max.max(1);
        self
    }

    pub fn with_max_content_bytes(mut self, max: usize) -> Self {
        self.max_content_bytes = max;
        self
    }

    pub fn with_max_source_pixels(mut self, max: u64) -> Self {
        self.max_source_pixels = max;
        self
    }

    pub fn kdf(&self) -> KdfParams {
        self.kdf
    }

    pub fn thumbnail_max_dimension(&self) -> u32 {
        self.thumbnail_max_dimension
    }

    pub fn max_content_bytes(&self) -> usize {
        self.max_content_bytes
    }

    pub fn max_source_pixels(&self) -> u64 {
        self.max_source_pixels
    }
}
