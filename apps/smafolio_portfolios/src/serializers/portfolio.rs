use serde::{Deserialize, Serialize};

use smafolio_core::media::MediaStorage;
use smafolio_core::serializers::profile::{OwnerOut, ProfileOut};
use smafolio_core::serializers::user_auth::UserPublic;

use crate::forms::MAX_GALLERY_IMAGES;
use crate::models::{category, portfolio_image, portfolio_item};
use crate::video::embed_url;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CategoryOut {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl From<&category::Model> for CategoryOut {
    fn from(c: &category::Model) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            slug: c.slug.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImageOut {
    pub id: i64,
    pub image: String,
    pub image_url: String,
}

impl ImageOut {
    pub fn new(m: &portfolio_image::Model, media: &MediaStorage) -> Self {
        Self {
            id: m.id,
            image: m.image.clone(),
            image_url: media.url(&m.image),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ItemOut {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub description: String,
    pub category: Option<CategoryOut>,
    pub cover_image: String,
    pub cover_image_url: String,
    pub video_link: Option<String>,
    pub embed_url: Option<String>,
    /// `YYYY-MM-DD`
    pub event_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub images: Vec<ImageOut>,
}

impl ItemOut {
    pub fn new(
        item: &portfolio_item::Model,
        category: Option<&category::Model>,
        images: &[portfolio_image::Model],
        media: &MediaStorage,
    ) -> Self {
        Self {
            id: item.id,
            owner_id: item.owner_id,
            title: item.title.clone(),
            description: item.description.clone(),
            category: category.map(CategoryOut::from),
            cover_image: item.cover_image.clone(),
            cover_image_url: media.url(&item.cover_image),
            video_link: item.video_link.clone(),
            embed_url: item.video_link.as_deref().and_then(embed_url),
            event_date: item.event_date.map(|d| d.format("%Y-%m-%d").to_string()),
            created_at: item.created_at.to_rfc3339(),
            updated_at: item.updated_at.to_rfc3339(),
            images: images.iter().map(|i| ImageOut::new(i, media)).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardOut {
    pub user: UserPublic,
    pub profile: Option<ProfileOut>,
    pub public_path: String,
    pub items: Vec<ItemOut>,
}

/// Field description for an empty or pre-filled item form.
#[derive(Debug, Serialize)]
pub struct ItemFormOut {
    pub fields: Vec<&'static str>,
    pub required: Vec<&'static str>,
    pub categories: Vec<CategoryOut>,
    /// How many more gallery images the form accepts.
    pub gallery_slots: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemOut>,
}

impl ItemFormOut {
    pub const FIELDS: [&'static str; 6] = [
        "title",
        "category",
        "description",
        "cover_image",
        "event_date",
        "video_link",
    ];

    pub fn empty(categories: &[category::Model]) -> Self {
        Self {
            fields: Self::FIELDS.to_vec(),
            required: vec!["title", "description", "cover_image"],
            categories: categories.iter().map(CategoryOut::from).collect(),
            gallery_slots: MAX_GALLERY_IMAGES,
            item: None,
        }
    }

    pub fn initial(categories: &[category::Model], item: ItemOut) -> Self {
        Self {
            fields: Self::FIELDS.to_vec(),
            required: vec!["title", "description"],
            categories: categories.iter().map(CategoryOut::from).collect(),
            gallery_slots: MAX_GALLERY_IMAGES.saturating_sub(item.images.len()),
            item: Some(item),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteConfirmOut {
    pub item: ItemOut,
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedOut {
    pub deleted: i64,
    pub message: String,
}

/// Items under one category heading on the public page.
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub category: Option<CategoryOut>,
    pub items: Vec<ItemOut>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublicPortfolioOut {
    pub owner: OwnerOut,
    pub items: Vec<ItemOut>,
    pub groups: Vec<CategoryGroup>,
}

impl PublicPortfolioOut {
    /// `items` must already be sorted by category.
    pub fn new(owner: OwnerOut, items: Vec<ItemOut>) -> Self {
        let mut groups: Vec<CategoryGroup> = Vec::new();
        for item in &items {
            match groups.last_mut() {
                Some(g) if g.category == item.category => g.items.push(item.clone()),
                _ => groups.push(CategoryGroup {
                    category: item.category.clone(),
                    items: vec![item.clone()],
                }),
            }
        }
        Self {
            owner,
            items,
            groups,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemDetailOut {
    pub owner: OwnerOut,
    pub item: ItemOut,
}
