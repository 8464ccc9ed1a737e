//! TrueType faces for the PDF export. Noto Sans ships with the crate; faces
//! listed in `EXPORT_FONTS` (Noto Sans Thai, for instance) are appended as
//! fallbacks for characters Noto Sans has no glyph for.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use ttf_parser::Face;

use super::ExportError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Weight {
    Regular,
    Bold,
}

/// Bytes of one TrueType font, checked to parse on construction.
#[derive(Clone)]
pub struct FontSource {
    name: String,
    data: Arc<[u8]>,
}

impl FontSource {
    pub fn new(name: &str, data: impl Into<Arc<[u8]>>) -> Result<Self, ExportError> {
        let data = data.into();
        let face = Face::parse(&data, 0).map_err(|e| ExportError::Font(format!("{name}: {e}")))?;
        // embedded as CIDFontType2, which needs glyf outlines
        if face.tables().cff.is_some() || face.tables().cff2.is_some() {
            return Err(ExportError::Font(format!(
                "{name}: CFF outlines are not supported, use a .ttf build"
            )));
        }
        Ok(Self {
            name: pdf_font_name(name),
            data,
        })
    }

    /// Name written as the PDF `BaseFont`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn face(&self) -> Result<Face<'_>, ExportError> {
        Face::parse(&self.data, 0).map_err(|e| ExportError::Font(format!("{}: {e}", self.name)))
    }
}

impl fmt::Debug for FontSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontSource")
            .field("name", &self.name)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Faces per weight, in lookup order.
#[derive(Clone, Debug)]
pub struct FontBook {
    regular: Vec<FontSource>,
    bold: Vec<FontSource>,
}

impl FontBook {
    /// Noto Sans Regular and Bold only.
    pub fn bundled() -> Result<Self, ExportError> {
        Ok(Self {
            regular: vec![FontSource::new("NotoSans-Regular", notosans::REGULAR_TTF)?],
            bold: vec![FontSource::new("NotoSans-Bold", notosans::BOLD_TTF)?],
        })
    }

    /// Append a fallback used by both weights.
    pub fn with_fallback(mut self, source: FontSource) -> Self {
        self.regular.push(source.clone());
        self.bold.push(source);
        self
    }

    /// The bundled faces followed by the font files at `paths`, in order.
    pub async fn load(paths: &[PathBuf]) -> Result<Self, ExportError> {
        let mut book = Self::bundled()?;
        for path in paths {
            let data = tokio::fs::read(path)
                .await
                .map_err(|e| ExportError::Font(format!("{}: {e}", path.display())))?;
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Fallback");
            book = book.with_fallback(FontSource::new(name, data)?);
        }
        Ok(book)
    }

    pub fn sources(&self, weight: Weight) -> &[FontSource] {
        match weight {
            Weight::Regular => &self.regular,
            Weight::Bold => &self.bold,
        }
    }
}

/// PDF names cannot hold spaces or delimiters.
fn pdf_font_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "Font".into()
    } else {
        cleaned
    }
}
