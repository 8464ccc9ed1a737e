use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use qrcode::{types::Color, EcLevel, QrCode};

use super::ExportError;

/// Pixels per QR module.
pub const MODULE_PX: u32 = 10;
/// Quiet zone, in modules.
pub const BORDER_MODULES: u32 = 4;

/// Render `data` as a QR symbol (error correction M) to a grayscale image.
pub fn qr_image(data: &str) -> Result<GrayImage, ExportError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)?;
    let modules = code.width() as u32;
    let colors = code.to_colors();
    let side = (modules + 2 * BORDER_MODULES) * MODULE_PX;

    let img = GrayImage::from_fn(side, side, |x, y| {
        let mx = (x / MODULE_PX).checked_sub(BORDER_MODULES);
        let my = (y / MODULE_PX).checked_sub(BORDER_MODULES);
        match (mx, my) {
            (Some(mx), Some(my)) if mx < modules && my < modules => {
                match colors[(my * modules + mx) as usize] {
                    Color::Dark => Luma([0u8]),
                    Color::Light => Luma([255u8]),
                }
            }
            _ => Luma([255u8]),
        }
    });
    Ok(img)
}

pub fn qr_png(data: &str) -> Result<Vec<u8>, ExportError> {
    let img = qr_image(data)?;
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img).write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// `data:image/png;base64,...` URI of the QR code for `data`.
pub fn qr_data_uri(data: &str) -> Result<String, ExportError> {
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(qr_png(data)?)))
}
