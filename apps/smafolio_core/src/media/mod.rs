//! Uploaded image handling: recompression before persistence and the
//! on-disk media store.

mod processor;
mod storage;

pub use processor::{compress, verify, MediaError, UploadedImage, JPEG_QUALITY, MAX_DIMENSION};
pub use storage::{MediaStorage, UploadDir, DEFAULT_AVATAR};
