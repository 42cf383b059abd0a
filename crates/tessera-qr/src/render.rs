//! QR code rendering for pairing URIs

use qrcode::render::unicode::Dense1x2;
use qrcode::{EcLevel, QrCode};

use crate::error::{QrError, Result};

/// Pairing URIs are dense; medium correction keeps them in one readable code
fn qr(uri: &str) -> Result<QrCode> {
    QrCode::with_error_correction_level(uri.as_bytes(), EcLevel::M)
        .map_err(|e| QrError::Render(format!("QR encode: {}", e)))
}

/// Render as PNG bytes with at least `size` pixels per side
pub fn to_png(uri: &str, size: u32) -> Result<Vec<u8>> {
    let image = qr(uri)?
        .render::<image::Luma<u8>>()
        .min_dimensions(size, size)
        .build();

    let mut png_bytes = Vec::new();
    image::DynamicImage::ImageLuma8(image)
        .write_to(&mut std::io::Cursor::new(&mut png_bytes), image::ImageFormat::Png)
        .map_err(|e| QrError::Render(format!("PNG encode: {}", e)))?;

    Ok(png_bytes)
}

/// Render as plain ASCII for terminals without Unicode support
pub fn to_ascii(uri: &str) -> Result<String> {
    Ok(qr(uri)?
        .render::<char>()
        .quiet_zone(true)
        .module_dimensions(2, 1)
        .build())
}

/// Render with half-block characters, two modules per terminal row
pub fn to_unicode(uri: &str) -> Result<String> {
    Ok(qr(uri)?
        .render::<Dense1x2>()
        .dark_color(Dense1x2::Light)
        .light_color(Dense1x2::Dark)
        .build())
}
