//! Image resizing and JPEG encoding.

use crate::error::PipelineError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

/// Resize an image down to a maximum width, preserving aspect ratio exactly.
///
/// Images already at or below `max_width` are returned unchanged: there is
/// never any upscaling. The color type (including alpha) is preserved.
pub fn resize_to_width(image: &DynamicImage, max_width: u32) -> DynamicImage {
    if image.width() <= max_width {
        return image.clone();
    }

    let ratio = f64::from(max_width) / f64::from(image.width());
    let height = ((f64::from(image.height()) * ratio).round() as u32).max(1);

    image.resize_exact(max_width, height, FilterType::Lanczos3)
}

/// Encode an image as JPEG.
///
/// `quality` is a compression factor in [0, 1]; values outside that range
/// are clamped. JPEG carries no alpha channel, so the image is flattened to
/// RGB first.
pub fn encode_jpeg(image: &DynamicImage, quality: f32) -> Result<Vec<u8>, PipelineError> {
    let quality = ((quality.clamp(0.0, 1.0) * 100.0).round() as u8).max(1);
    let rgb = image.to_rgb8();

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(&rgb)?;
    Ok(buf)
}
