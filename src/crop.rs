use crate::error::AppError;
use crate::models::BBox;
use base64::Engine;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use std::io::Cursor;
use std::path::Path;

const JPEG_QUALITY: u8 = 90;

/// Cuts the `[x, y, w, h]` region out of `image`.
///
/// Coordinates are rounded to whole pixels and clamped to the source bounds,
/// so a box hanging over the edge yields the visible part only.
pub fn crop_region(image: &DynamicImage, bbox: BBox) -> Result<DynamicImage, AppError> {
    if bbox.iter().any(|v| !v.is_finite()) {
        return Err(AppError::Validation(format!("Invalid bbox {:?}", bbox)));
    }
    let (width, height) = image.dimensions();
    let [x, y, w, h] = bbox;

    let x0 = x.round().clamp(0.0, width as f64) as u32;
    let y0 = y.round().clamp(0.0, height as f64) as u32;
    let x1 = (x + w).round().clamp(0.0, width as f64) as u32;
    let y1 = (y + h).round().clamp(0.0, height as f64) as u32;

    if x1 <= x0 || y1 <= y0 {
        return Err(AppError::Validation(format!(
            "bbox {:?} lies outside the {}x{} image",
            bbox, width, height
        )));
    }

    log::trace!("Cropping {}x{} at ({}, {})", x1 - x0, y1 - y0, x0, y0);
    Ok(image.crop_imm(x0, y0, x1 - x0, y1 - y0))
}

/// Crops the region and returns it as a `data:image/jpeg;base64,` URL.
pub fn cropped_image_url(image: &DynamicImage, bbox: BBox) -> Result<String, AppError> {
    let crop = crop_region(image, bbox)?;
    let rgb = DynamicImage::ImageRgb8(crop.to_rgb8());

    let mut buffer = Cursor::new(Vec::new());
    rgb.write_to(&mut buffer, ImageOutputFormat::Jpeg(JPEG_QUALITY))?;

    let encoded = base64::engine::general_purpose::STANDARD.encode(buffer.into_inner());
    Ok(format!("data:image/jpeg;base64,{}", encoded))
}

pub fn save_crop(image: &DynamicImage, bbox: BBox, path: &Path) -> Result<(), AppError> {
    let crop = crop_region(image, bbox)?;
    DynamicImage::ImageRgb8(crop.to_rgb8()).save(path)?;
    log::debug!("Cropped object saved to: {:?}", path);
    Ok(())
}
