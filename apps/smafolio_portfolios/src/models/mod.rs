pub mod category;
pub mod portfolio_image;
pub mod portfolio_item;

use smafolio_core::error::AppError;
use smafolio_core::media::{compress, MediaStorage, UploadDir, UploadedImage};

/// Value an image column holds after a write.
///
/// Any incoming upload is recompressed and saved as a new file, whatever
/// its file name. Without one the stored path is kept and the file
/// on disk is not touched.
pub(crate) async fn store_image_field(
    media: &MediaStorage,
    dir: UploadDir,
    stored: Option<&str>,
    incoming: Option<UploadedImage>,
) -> Result<Option<String>, AppError> {
    if incoming.is_none() {
        return Ok(stored.map(str::to_owned));
    }
    let compressed = tokio::task::spawn_blocking(move || compress(incoming))
        .await
        .map_err(AppError::internal)??;
    match compressed {
        Some(upload) => Ok(Some(media.save(dir, &upload).await?)),
        None => Ok(stored.map(str::to_owned)),
    }
}
