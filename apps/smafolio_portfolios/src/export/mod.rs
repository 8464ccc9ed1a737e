//! PDF export of a user's portfolio: a tera template renders the line
//! markup in [`markup`], which [`pdf`] lays out in the faces of a
//! [`fonts::FontBook`], with a QR code pointing back at the live public page.

pub mod fonts;
pub mod markup;
pub mod pdf;
pub mod qr;
#[cfg(test)]
pub(crate) mod testing;

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use tera::{Context, Tera};
use tracing::info;

use smafolio_core::error::AppError;
use smafolio_core::models::profile::{self, Column as ProfileCol, Entity as Profile};
use smafolio_core::models::user;
use smafolio_core::origin::RequestOrigin;
use smafolio_core::AppState;

use crate::models::{category, portfolio_item};

use self::fonts::FontBook;

const TEMPLATE_NAME: &str = "portfolio_export.txt";
const TEMPLATE: &str = include_str!("../../templates/portfolio_export.txt");

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("qr encoding failed: {0}")]
    Qr(#[from] qrcode::types::QrError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("malformed export markup: {0}")]
    Markup(String),

    #[error("pdf error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("font error: {0}")]
    Font(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ExportError> for AppError {
    fn from(e: ExportError) -> Self {
        AppError::internal(e)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportUser {
    pub username: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportProfile {
    pub bio: String,
    pub facebook_link: String,
    pub github_link: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportItem {
    pub title: String,
    pub category: String,
    pub event_date: Option<String>,
    pub description: String,
    pub video_link: Option<String>,
}

/// Everything the export template sees apart from the QR image.
#[derive(Debug, Clone, Serialize)]
pub struct ExportContext {
    pub user: ExportUser,
    pub profile: Option<ExportProfile>,
    pub items: Vec<ExportItem>,
    pub public_url: String,
    pub generated_on: String,
}

impl ExportContext {
    pub fn new(
        user: &user::Model,
        profile: Option<&profile::Model>,
        items: &[portfolio_item::Model],
        categories: &HashMap<i64, category::Model>,
        public_url: String,
    ) -> Self {
        Self {
            user: ExportUser {
                username: user.username.clone(),
                display_name: user.display_name(),
            },
            profile: profile.map(|p| ExportProfile {
                bio: p.bio.clone(),
                facebook_link: p.facebook_link.clone(),
                github_link: p.github_link.clone(),
            }),
            items: items
                .iter()
                .map(|i| ExportItem {
                    title: i.title.clone(),
                    category: i
                        .category_id
                        .and_then(|id| categories.get(&id))
                        .map(|c| c.name.clone())
                        .unwrap_or_else(|| "Uncategorized".into()),
                    event_date: i.event_date.map(|d| d.format("%-d %B %Y").to_string()),
                    description: i.description.clone(),
                    video_link: i.video_link.clone(),
                })
                .collect(),
            public_url,
            generated_on: Utc::now().format("%-d %B %Y").to_string(),
        }
    }
}

/// Build the PDF export for `user`. The QR code encodes the public
/// portfolio URL as seen from the current request.
pub async fn generate_pdf(
    state: &AppState,
    user: &user::Model,
    origin: &RequestOrigin,
) -> Result<Vec<u8>, AppError> {
    let profile = Profile::find()
        .filter(ProfileCol::UserId.eq(user.id))
        .one(&state.db)
        .await?;
    let items = portfolio_item::find_for_owner(user.id).all(&state.db).await?;
    let categories: HashMap<i64, category::Model> = category::list(&state.db)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    let public_url = origin.public_portfolio_url(&user.username);
    let ctx = ExportContext::new(user, profile.as_ref(), &items, &categories, public_url);
    let book = FontBook::load(&state.settings.export_fonts).await?;
    let pdf = tokio::task::spawn_blocking(move || render_export(&ctx, &book))
        .await
        .map_err(AppError::internal)??;

    info!(user_id = user.id, items = items.len(), bytes = pdf.len(), "portfolio pdf generated");
    Ok(pdf)
}

/// QR, template and PDF steps; CPU only.
pub fn render_export(ctx: &ExportContext, book: &FontBook) -> Result<Vec<u8>, ExportError> {
    let qr_uri = qr::qr_data_uri(&ctx.public_url)?;
    let document = render_document(ctx, &qr_uri)?;
    let blocks = markup::parse(&document)?;
    pdf::render(&blocks, &format!("Portfolio of {}", ctx.user.display_name), book)
}

/// Render the export template to line markup.
pub fn render_document(ctx: &ExportContext, qr_data_uri: &str) -> Result<String, ExportError> {
    let mut tera = Tera::default();
    tera.add_raw_template(TEMPLATE_NAME, TEMPLATE)?;
    tera.register_filter("markup", markup::markup_filter);
    tera.register_filter("inline", markup::inline_filter);

    let mut context = Context::from_serialize(ctx)?;
    context.insert("qr_data_uri", qr_data_uri);
    Ok(tera.render(TEMPLATE_NAME, &context)?)
}

#[cfg(test)]
mod tests {
    use super::markup::{parse, Block};
    use super::testing::{shown_text, thai_only_font};
    use super::*;

    fn context(items: Vec<ExportItem>, profile: Option<ExportProfile>) -> ExportContext {
        ExportContext {
            user: ExportUser {
                username: "nok".into(),
                display_name: "Nok Siri".into(),
            },
            profile,
            items,
            public_url: "https://smafolio.app/nok/".into(),
            generated_on: "1 January 2026".into(),
        }
    }

    #[test]
    fn user_text_cannot_inject_headings_or_images() {
        let item = ExportItem {
            title: "Robotics\n# fake".into(),
            category: "Academic".into(),
            event_date: Some("2 November 2025".into()),
            description: "## not a heading\n@image data:image/png;base64,AAAA".into(),
            video_link: None,
        };
        let doc = render_document(&context(vec![item], None), "data:image/png;base64,AAAA").unwrap();
        let blocks = parse(&doc).unwrap();

        let headings: Vec<&str> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::Heading(_, t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            headings,
            [
                "Nok Siri",
                "https://smafolio.app/nok/",
                "Portfolio",
                "Robotics # fake",
                "Scan to visit the live portfolio",
            ]
        );
        assert_eq!(blocks.iter().filter(|b| matches!(b, Block::Image(_))).count(), 1);
        assert!(blocks.contains(&Block::Text("## not a heading".into())));
    }

    #[test]
    fn empty_portfolio_says_so() {
        let profile = ExportProfile {
            bio: "Hello".into(),
            facebook_link: String::new(),
            github_link: "https://github.com/nok".into(),
        };
        let doc = render_document(&context(vec![], Some(profile)), "data:image/png;base64,AAAA").unwrap();
        assert!(doc.contains("No portfolio items yet."));
        assert!(doc.contains("GitHub: https://github.com/nok"));
        assert!(!doc.contains("Facebook:"));
    }

    #[test]
    fn full_export_is_a_pdf_with_the_qr_image() {
        let ctx = context(vec![], None);
        let pdf = render_export(&ctx, &FontBook::bundled().unwrap()).unwrap();
        let doc = lopdf::Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        let images: Vec<&lopdf::Stream> = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter(|s| {
                s.dict.get(b"Subtype").and_then(lopdf::Object::as_name).ok()
                    == Some(b"Image".as_slice())
            })
            .collect();
        assert_eq!(images.len(), 1);

        let expected = qr::qr_image(&ctx.public_url).unwrap();
        let dict = &images[0].dict;
        assert_eq!(dict.get(b"Width").unwrap().as_i64().unwrap(), expected.width() as i64);
        assert_eq!(dict.get(b"Height").unwrap().as_i64().unwrap(), expected.height() as i64);
        assert_eq!(images[0].content, expected.into_raw());
    }

    #[test]
    fn thai_names_and_titles_are_shown_with_a_thai_fallback_font() {
        let mut ctx = context(
            vec![ExportItem {
                title: "ค่ายอาสา".into(),
                category: "Volunteer".into(),
                event_date: None,
                description: "Built a library".into(),
                video_link: None,
            }],
            None,
        );
        ctx.user.display_name = "สมชาย ใจดี".into();
        let book = FontBook::bundled()
            .unwrap()
            .with_fallback(fonts::FontSource::new("ThaiTest", thai_only_font()).unwrap());

        let shown: Vec<String> = shown_text(&render_export(&ctx, &book).unwrap())
            .into_iter()
            .map(|(_, text)| text)
            .collect();
        assert_eq!(shown[0], "สมชาย ใจดี");
        assert!(shown.contains(&"ค่ายอาสา".to_string()));
        assert!(shown.iter().all(|t| !t.contains('?') && !t.contains('\u{FFFD}')));
    }
}
