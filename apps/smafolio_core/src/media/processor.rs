use bytes::Bytes;
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage};

/// Longest edge, in pixels, a stored image may have.
pub const MAX_DIMENSION: u32 = 1200;

pub const JPEG_QUALITY: u8 = 85;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("upload is not a valid image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("media path {0:?} is outside the media root")]
    InvalidPath(String),

    #[error("media storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file received from a form, before or after recompression.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Bytes,
}

impl UploadedImage {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Recompress an upload for storage.
///
/// The image is flattened to RGB (alpha is dropped), shrunk to fit inside
/// `MAX_DIMENSION` x `MAX_DIMENSION` keeping its aspect ratio, and re-encoded
/// as JPEG at `JPEG_QUALITY`. Images that already fit are never upscaled.
/// The result keeps the upload's base name with a `.jpg` extension.
pub fn compress(upload: Option<UploadedImage>) -> Result<Option<UploadedImage>, MediaError> {
    let Some(upload) = upload else {
        return Ok(None);
    };

    let decoded =
        image::load_from_memory(&upload.bytes).map_err(|e| MediaError::Decode(e.to_string()))?;
    let mut img = match decoded {
        DynamicImage::ImageRgb8(_) => decoded,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    };

    if img.width() > MAX_DIMENSION || img.height() > MAX_DIMENSION {
        img = img.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3);
    }

    let rgb = img.into_rgb8();
    let mut out = Vec::new();
    // the image crate encoder has no optimize flag, only quality
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| MediaError::Encode(e.to_string()))?;

    Ok(Some(UploadedImage::new(jpeg_name(&upload.file_name), out)))
}

/// Check that an upload decodes as an image without transforming it.
pub fn verify(upload: &UploadedImage) -> Result<(), MediaError> {
    image::load_from_memory(&upload.bytes)
        .map(|_| ())
        .map_err(|e| MediaError::Decode(e.to_string()))
}

fn jpeg_name(original: &str) -> String {
    let file = original
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(original);
    let base = file.split('.').next().unwrap_or_default();
    if base.is_empty() {
        "image.jpg".to_string()
    } else {
        format!("{base}.jpg")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use rstest::rstest;
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 128]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn dimensions(bytes: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory(bytes).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn absent_image_is_a_no_op() {
        assert!(compress(None).unwrap().is_none());
    }

    #[rstest]
    #[case((2400, 1600), (1200, 800))]
    #[case((1000, 3000), (400, 1200))]
    #[case((1201, 10), (1200, 10))]
    fn oversized_images_shrink_to_the_bound(#[case] input: (u32, u32), #[case] expected: (u32, u32)) {
        let out = compress(Some(UploadedImage::new("big.png", png(input.0, input.1))))
            .unwrap()
            .unwrap();
        assert_eq!(dimensions(&out.bytes), expected);
    }

    #[rstest]
    #[case((1200, 1200))]
    #[case((640, 480))]
    #[case((1, 1))]
    fn images_within_the_bound_keep_their_size(#[case] input: (u32, u32)) {
        let out = compress(Some(UploadedImage::new("small.png", png(input.0, input.1))))
            .unwrap()
            .unwrap();
        assert_eq!(dimensions(&out.bytes), input);
    }

    #[test]
    fn output_is_rgb_jpeg_with_renamed_extension() {
        let out = compress(Some(UploadedImage::new("holiday.photo.png", png(20, 20))))
            .unwrap()
            .unwrap();
        assert_eq!(out.file_name, "holiday.jpg");
        assert_eq!(image::guess_format(&out.bytes).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn directory_components_are_dropped_from_the_name() {
        assert_eq!(jpeg_name("C:\\Users\\me\\cover.PNG"), "cover.jpg");
        assert_eq!(jpeg_name("../../etc/passwd"), "passwd.jpg");
        assert_eq!(jpeg_name(".hidden"), "image.jpg");
    }

    #[test]
    fn garbage_fails_to_decode() {
        let err = compress(Some(UploadedImage::new("x.png", b"not an image".to_vec()))).unwrap_err();
        assert!(matches!(err, MediaError::Decode(_)));
        assert!(verify(&UploadedImage::new("x.png", b"nope".to_vec())).is_err());
    }
}
