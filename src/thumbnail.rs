//! Bounded-size previews of decrypted image content.
//!
//! Decoding goes through [`ImageCodec`]. The source dimensions are read from
//! the image header first, so oversized images are refused before any pixel
//! buffer exists, and only the scaled bitmap outlives the call.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageError, ImageReader, Limits};
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::content::ContentCipher;
use crate::error::{Result, VaultError};
use crate::master_secret::MasterSecret;

/// Default JPEG quality for [`Thumbnail::into_output_stream`].
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Tightly packed RGB8 pixels. Wiped when dropped.
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Zeroizing<Vec<u8>>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(VaultError::Decode(format!(
                "bitmap of {width}x{height} needs {expected} bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels: Zeroizing::new(pixels),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Image decoding and encoding capability.
pub trait ImageCodec: Send + Sync {
    /// Reads width and height from the header without decoding pixels.
    fn dimensions(&self, bytes: &[u8]) -> Result<(u32, u32)>;

    /// Decodes `bytes` into a bitmap of exactly `width` x `height`.
    ///
    /// Implementations may decode at full resolution and resample
    /// afterwards, so peak memory can follow the source size. Callers bound
    /// it with the source pixel limit checked against [`dimensions`](Self::dimensions).
    fn decode_scaled(&self, bytes: &[u8], width: u32, height: u32) -> Result<Bitmap>;

    fn encode_jpeg(&self, bitmap: &Bitmap) -> Result<Vec<u8>>;
}

/// [`ImageCodec`] backed by the `image` crate (PNG and JPEG).
#[derive(Debug, Clone, Copy)]
pub struct ImageCrateCodec {
    max_alloc: u64,
    jpeg_quality: u8,
}

impl ImageCrateCodec {
    pub fn new(max_alloc: u64, jpeg_quality: u8) -> Self {
        Self {
            max_alloc,
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    fn reader<'a>(&self, bytes: &'a [u8]) -> Result<ImageReader<Cursor<&'a [u8]>>> {
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| VaultError::Decode(format!("unreadable image: {e}")))?;

        let mut limits = Limits::default();
        limits.max_alloc = Some(self.max_alloc);
        reader.limits(limits);
        Ok(reader)
    }
}

impl Default for ImageCrateCodec {
    fn default() -> Self {
        Self::new(512 * 1024 * 1024, DEFAULT_JPEG_QUALITY)
    }
}

fn map_image_error(e: ImageError) -> VaultError {
    match e {
        ImageError::Limits(limit) => VaultError::OutOfResources(limit.to_string()),
        other => VaultError::Decode(other.to_string()),
    }
}

impl ImageCodec for ImageCrateCodec {
    fn dimensions(&self, bytes: &[u8]) -> Result<(u32, u32)> {
        self.reader(bytes)?.into_dimensions().map_err(map_image_error)
    }

    // image 0.25 has no scaled decode for JPEG or PNG; this decodes the
    // whole source and then resamples.
    fn decode_scaled(&self, bytes: &[u8], width: u32, height: u32) -> Result<Bitmap> {
        let full = self.reader(bytes)?.decode().map_err(map_image_error)?;
        let scaled = full.thumbnail_exact(width, height);
        // full-resolution plaintext pixels are wiped right away
        drop(Zeroizing::new(full.into_bytes()));

        let rgb = scaled.into_rgb8();
        let (w, h) = rgb.dimensions();
        Bitmap::new(w, h, rgb.into_raw())
    }

    fn encode_jpeg(&self, bitmap: &Bitmap) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, self.jpeg_quality)
            .write_image(
                bitmap.pixels(),
                bitmap.width(),
                bitmap.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(map_image_error)?;
        Ok(out)
    }
}

/// A scaled preview. Consumed by [`Thumbnail::into_output_stream`].
pub struct Thumbnail {
    bitmap: Bitmap,
    aspect_ratio: f32,
    codec: Arc<dyn ImageCodec>,
}

impl Thumbnail {
    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }

    /// `width / height` of the preview.
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    /// Compresses the preview to JPEG and releases the bitmap.
    pub fn into_output_stream(self) -> Result<Cursor<Vec<u8>>> {
        let Thumbnail { bitmap, codec, .. } = self;
        let encoded = codec.encode_jpeg(&bitmap);
        drop(bitmap);
        Ok(Cursor::new(encoded?))
    }
}

impl std::fmt::Debug for Thumbnail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thumbnail")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("aspect_ratio", &self.aspect_ratio)
            .finish()
    }
}

/// Largest size fitting in a `max_dimension` square with the same aspect
/// ratio. Images already inside the box keep their size.
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let max_dimension = max_dimension.max(1);
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }

    let (w, h, max) = (width as u64, height as u64, max_dimension as u64);
    if w >= h {
        let scaled = ((h * max + w / 2) / w).max(1);
        (max_dimension, scaled as u32)
    } else {
        let scaled = ((w * max + h / 2) / h).max(1);
        (scaled as u32, max_dimension)
    }
}

/// Whether `content_type` names an image (`image/*`, case-insensitive).
pub fn is_image_type(content_type: &str) -> bool {
    content_type
        .trim()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
}

pub struct ThumbnailGenerator {
    codec: Arc<dyn ImageCodec>,
    max_source_pixels: u64,
}

impl ThumbnailGenerator {
    pub fn new(codec: Arc<dyn ImageCodec>, max_source_pixels: u64) -> Self {
        Self {
            codec,
            max_source_pixels,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(ImageCrateCodec::default()),
            settings.max_source_pixels(),
        )
    }

    pub fn generate(&self, plaintext: &[u8], max_dimension: u32) -> Result<Thumbnail> {
        let started = Instant::now();

        let (width, height) = self.codec.dimensions(plaintext)?;
        if width == 0 || height == 0 {
            return Err(VaultError::Decode(format!(
                "image has empty dimensions {width}x{height}"
            )));
        }

        let pixels = width as u64 * height as u64;
        if pixels > self.max_source_pixels {
            return Err(VaultError::OutOfResources(format!(
                "image of {width}x{height} exceeds {} pixel budget",
                self.max_source_pixels
            )));
        }

        let (target_w, target_h) = scaled_dimensions(width, height, max_dimension);
        let bitmap = self.codec.decode_scaled(plaintext, target_w, target_h)?;
        let aspect_ratio = bitmap.width() as f32 / bitmap.height() as f32;

        tracing::debug!(
            width = bitmap.width(),
            height = bitmap.height(),
            aspect_ratio,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "generated thumbnail"
        );

        Ok(Thumbnail {
            bitmap,
            aspect_ratio,
            codec: Arc::clone(&self.codec),
        })
    }
}

/// Decrypts stored content and, for images, produces its thumbnail.
pub struct AttachmentPreviewer {
    cipher: ContentCipher,
    generator: ThumbnailGenerator,
}

impl AttachmentPreviewer {
    pub fn new(cipher: ContentCipher, generator: ThumbnailGenerator) -> Self {
        Self { cipher, generator }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            ContentCipher::new(settings.max_content_bytes()),
            ThumbnailGenerator::from_settings(settings),
        )
    }

    /// Returns `Ok(None)` for non-image content types without reading the
    /// content at all.
    pub fn generate_thumbnail(
        &self,
        secret: &MasterSecret,
        content_ref: &Path,
        content_type: &str,
        max_dimension: u32,
    ) -> Result<Option<Thumbnail>> {
        if !is_image_type(content_type) {
            return Ok(None);
        }

        let plaintext = self.cipher.decrypt_file(secret, content_ref)?;
        self.generator.generate(&plaintext, max_dimension).map(Some)
    }
}
