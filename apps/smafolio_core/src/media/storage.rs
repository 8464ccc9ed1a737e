use std::path::{Component, Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use super::{MediaError, UploadedImage};

/// Stored path of the avatar every new profile starts with.
pub const DEFAULT_AVATAR: &str = "avatars/default.png";

/// Upload subdirectories under the media root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadDir {
    Covers,
    Gallery,
    Avatars,
}

impl UploadDir {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadDir::Covers => "portfolio_covers",
            UploadDir::Gallery => "portfolio_gallery",
            UploadDir::Avatars => "avatars",
        }
    }
}

/// Local filesystem media store. Records keep the path relative to `root`.
#[derive(Clone, Debug)]
pub struct MediaStorage {
    root: PathBuf,
    url_prefix: String,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        let mut url_prefix = url_prefix.into();
        if !url_prefix.ends_with('/') {
            url_prefix.push('/');
        }
        Self {
            root: root.into(),
            url_prefix,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `upload` under `dir` and return its stored relative path.
    /// A name already taken gets a `_xxxxxxx` suffix before the extension.
    pub async fn save(&self, dir: UploadDir, upload: &UploadedImage) -> Result<String, MediaError> {
        let dir_path = self.root.join(dir.as_str());
        tokio::fs::create_dir_all(&dir_path).await?;

        let name = valid_file_name(&upload.file_name);
        let mut candidate = name.clone();
        loop {
            let target = dir_path.join(&candidate);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target)
                .await
            {
                Ok(mut file) => {
                    file.write_all(&upload.bytes).await?;
                    file.flush().await?;
                    break;
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    candidate = with_suffix(&name);
                }
                Err(e) => return Err(e.into()),
            }
        }

        let stored = format!("{}/{}", dir.as_str(), candidate);
        debug!(path = %stored, bytes = upload.bytes.len(), "stored media file");
        Ok(stored)
    }

    pub async fn read(&self, stored: &str) -> Result<Vec<u8>, MediaError> {
        let path = self.resolve(stored)?;
        Ok(tokio::fs::read(path).await?)
    }

    pub fn resolve(&self, stored: &str) -> Result<PathBuf, MediaError> {
        let rel = Path::new(stored);
        if stored.is_empty() || !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(MediaError::InvalidPath(stored.to_string()));
        }
        Ok(self.root.join(rel))
    }

    /// Public URL of a stored path.
    pub fn url(&self, stored: &str) -> String {
        format!("{}{}", self.url_prefix, stored)
    }
}

/// Keep the last path component, replace anything outside `[A-Za-z0-9._-]`.
fn valid_file_name(raw: &str) -> String {
    let last = raw
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

fn with_suffix(name: &str) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(7).collect();
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{suffix}.{ext}"),
        _ => format!("{name}_{suffix}"),
    }
}
