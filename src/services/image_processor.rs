// src/services/image_processor.rs
use crate::errors::FondayError;
use base64::{Engine as _, engine::general_purpose};
use image::{GenericImageView, ImageFormat as ImgFormat};
use log::warn;

// Gemini counts inline data after base64 expansion (~33% overhead), so the
// raw photo has to stay under ~3.75MB.
const MAX_INLINE_BYTES: usize = 3_750_000;

pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Prepares a base64 photo payload for the inline model call: sniffs the
    /// MIME type and downscales anything over the inline-data budget. The
    /// client is only trusted for "a file was picked", so a payload that does
    /// not decode goes upstream untouched as JPEG.
    pub fn prepare_inline(&self, base64_payload: &str) -> (String, &'static str) {
        let Ok(bytes) = general_purpose::STANDARD.decode(base64_payload) else {
            return (base64_payload.to_string(), "image/jpeg");
        };

        let mime_type = sniff_mime(&bytes);
        if bytes.len() <= MAX_INLINE_BYTES {
            return (base64_payload.to_string(), mime_type);
        }

        match self.shrink(&bytes) {
            Ok(shrunk) => (general_purpose::STANDARD.encode(&shrunk), "image/jpeg"),
            Err(e) => {
                warn!("failed to shrink oversized photo, sending as-is: {}", e);
                (base64_payload.to_string(), mime_type)
            }
        }
    }

    fn shrink(&self, data: &[u8]) -> Result<Vec<u8>, FondayError> {
        let img = image::load_from_memory(data)
            .map_err(|e| FondayError::ImageProcessing(format!("Failed to load image: {}", e)))?;

        let (width, height) = img.dimensions();

        let scale_factor = ((MAX_INLINE_BYTES as f64 / data.len() as f64).sqrt() * 0.9) as f32;
        let new_width = ((width as f32 * scale_factor) as u32).max(256);
        let new_height = ((height as f32 * scale_factor) as u32).max(256);

        let resized = img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3);

        let mut output = Vec::new();
        resized
            .write_to(&mut std::io::Cursor::new(&mut output), ImgFormat::Jpeg)
            .map_err(|e| {
                FondayError::ImageProcessing(format!("Failed to encode resized image: {}", e))
            })?;

        Ok(output)
    }
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImgFormat::Png) => "image/png",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png_base64() -> String {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([120, 90, 80]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImgFormat::Png)
            .unwrap();
        general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn small_png_passes_through_with_png_mime() {
        let payload = tiny_png_base64();
        let processor = ImageProcessor::new();

        let (out, mime_type) = processor.prepare_inline(&payload);

        assert_eq!(out, payload);
        assert_eq!(mime_type, "image/png");
    }

    #[test]
    fn undecodable_payload_passes_through_as_jpeg() {
        let processor = ImageProcessor::new();

        let (out, mime_type) = processor.prepare_inline("not!!valid@@base64");

        assert_eq!(out, "not!!valid@@base64");
        assert_eq!(mime_type, "image/jpeg");
    }

    #[test]
    fn unknown_binary_defaults_to_jpeg_mime() {
        let payload = general_purpose::STANDARD.encode(b"plain bytes, not an image");
        let processor = ImageProcessor::new();

        let (_, mime_type) = processor.prepare_inline(&payload);

        assert_eq!(mime_type, "image/jpeg");
    }
}
