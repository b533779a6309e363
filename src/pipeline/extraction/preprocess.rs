//! Image preparation before recognition.
//!
//! Flow: validate byte bounds, sniff the real format and check it against
//! the declared media type, decode, fix EXIF orientation, convert to RGB,
//! re-encode as PNG for the local engine. The remote path sends the
//! original bytes, so this step only guarantees they decode.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, ImageOutputFormat, RgbImage};
use tracing::debug;

use super::ExtractionError;
use crate::models::{ImageUnit, InputError, MediaType};

/// Reject anything larger; corrupt or adversarial files can blow up decoding.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

/// Smallest valid PNG is ~67 bytes.
const MIN_IMAGE_BYTES: usize = 67;

/// Decoded, upright, lossless copy of one image.
#[derive(Debug)]
pub struct PreparedImage {
    pub png_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// EXIF orientation tag that was applied (1 = none).
    pub orientation: u32,
}

pub fn validate_image_bytes(bytes: &[u8]) -> Result<(), ExtractionError> {
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(ExtractionError::ImageProcessing(
            "Image data too small to be valid".into(),
        ));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ExtractionError::ImageProcessing(format!(
            "Image data exceeds {}MB limit",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Media type of the actual content, if it is one we accept.
pub fn sniff_media_type(bytes: &[u8]) -> Result<MediaType, String> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => Ok(MediaType::Jpeg),
        Ok(ImageFormat::Png) => Ok(MediaType::Png),
        Ok(other) => Err(format!("{other:?}")),
        Err(_) => Err("unknown".to_string()),
    }
}

/// Validate and normalize one image.
pub fn prepare_image(unit: &ImageUnit) -> Result<PreparedImage, InputError> {
    let undecodable = |reason: String| InputError::Undecodable {
        name: unit.name().to_string(),
        reason,
    };

    validate_image_bytes(unit.bytes()).map_err(|e| undecodable(e.to_string()))?;

    let actual = sniff_media_type(unit.bytes()).map_err(|actual| InputError::MediaTypeMismatch {
        name: unit.name().to_string(),
        declared: unit.media_type().mime(),
        actual,
    })?;
    if actual != unit.media_type() {
        return Err(InputError::MediaTypeMismatch {
            name: unit.name().to_string(),
            declared: unit.media_type().mime(),
            actual: actual.mime().to_string(),
        });
    }

    let decoded = image::load_from_memory(unit.bytes()).map_err(|e| undecodable(e.to_string()))?;
    let orientation = read_exif_orientation(unit.bytes());
    let rgb = apply_orientation(decoded, orientation).to_rgb8();
    let (width, height) = rgb.dimensions();

    let png_bytes = encode_png(&rgb).map_err(|e| undecodable(e.to_string()))?;

    debug!(
        file = unit.name(),
        width,
        height,
        orientation,
        "Image prepared"
    );

    Ok(PreparedImage {
        png_bytes,
        width,
        height,
        orientation,
    })
}

/// EXIF orientation tag, 1 when absent or unreadable.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply EXIF orientation transform to a `DynamicImage`.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        1 => img,
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>, ExtractionError> {
    let dynamic = DynamicImage::ImageRgb8(img.clone());
    let mut cursor = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;
    Ok(cursor.into_inner())
}
