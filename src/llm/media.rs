use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use tracing::debug;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("Unsupported image type: {0}")]
    UnsupportedType(String),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image as JPEG: {0}")]
    Encode(String),
}

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

pub fn normalize_image_mime_type(mime_type: &str) -> String {
    let lowered = mime_type.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        _ => lowered,
    }
}

/// Guarantees a JPEG capture for the generation service.
///
/// Every capture is fully decoded. JPEG bytes that decode are kept as they
/// are; PNG and WebP are re-encoded. The declared MIME type is only used
/// when sniffing fails.
pub fn ensure_jpeg(bytes: &[u8], declared_mime: &str) -> Result<Vec<u8>, MediaError> {
    let mime_type = detect_mime_type(bytes)
        .map(|mime| normalize_image_mime_type(&mime))
        .unwrap_or_else(|| normalize_image_mime_type(declared_mime));

    let format = match mime_type.as_str() {
        "image/jpeg" => ImageFormat::Jpeg,
        "image/png" => ImageFormat::Png,
        "image/webp" => ImageFormat::WebP,
        other => return Err(MediaError::UnsupportedType(other.to_string())),
    };

    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|err| MediaError::Decode(err.to_string()))?;
    if format == ImageFormat::Jpeg {
        return Ok(bytes.to_vec());
    }
    debug!(
        "Re-encoding {} capture ({}x{}) as JPEG",
        mime_type,
        decoded.width(),
        decoded.height()
    );

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
    let mut buffer = Cursor::new(Vec::new());
    rgb.write_to(&mut buffer, ImageFormat::Jpeg)
        .map_err(|err| MediaError::Encode(err.to_string()))?;
    Ok(buffer.into_inner())
}
