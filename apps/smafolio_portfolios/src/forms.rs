//! Item form validation and gallery bookkeeping for create and edit.

use chrono::NaiveDate;
use validator::Validate;

use smafolio_core::forms::{blank_or_url, FieldErrors, FormData};
use smafolio_core::media::UploadedImage;

use crate::models::{category, portfolio_image, portfolio_item::ItemFields};

/// Most gallery images an item may carry.
pub const MAX_GALLERY_IMAGES: usize = 4;

const REQUIRED: &str = "This field is required.";

#[derive(Debug, Clone, Validate)]
pub struct ItemForm {
    #[validate(length(max = 200, message = "Ensure this value has at most 200 characters."))]
    pub title: String,
    pub description: String,
    pub category: String,
    pub event_date: String,
    #[validate(custom(function = "blank_or_url"))]
    pub video_link: String,
    pub cover_image: Option<UploadedImage>,
}

/// A validated item form, ready to persist.
#[derive(Debug, Clone)]
pub struct CleanedItem {
    pub fields: ItemFields,
    pub cover: Option<UploadedImage>,
}

impl ItemForm {
    pub fn from_form_data(form: &FormData) -> Self {
        Self {
            title: form.text_or_empty("title"),
            description: form.text_or_empty("description"),
            category: form.text_or_empty("category"),
            event_date: form.text_or_empty("event_date"),
            video_link: form.text_or_empty("video_link"),
            cover_image: form.file("cover_image").cloned(),
        }
    }

    /// Validate against the known categories. `require_cover` is set on
    /// create; on edit an absent cover keeps the stored one.
    pub fn clean(
        self,
        categories: &[category::Model],
        require_cover: bool,
    ) -> Result<CleanedItem, FieldErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        };
        if self.title.is_empty() {
            errors.add("title", REQUIRED);
        }
        if self.description.is_empty() {
            errors.add("description", REQUIRED);
        }
        if require_cover && self.cover_image.is_none() {
            errors.add("cover_image", REQUIRED);
        }

        let category_id = match self.category.as_str() {
            "" => None,
            raw => match raw.parse::<i64>() {
                Ok(id) if categories.iter().any(|c| c.id == id) => Some(id),
                _ => {
                    errors.add(
                        "category",
                        "Select a valid choice. That choice is not one of the available choices.",
                    );
                    None
                }
            },
        };

        let event_date = match self.event_date.as_str() {
            "" => None,
            raw => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(d) => Some(d),
                Err(_) => {
                    errors.add("event_date", "Enter a valid date.");
                    None
                }
            },
        };

        finish(
            errors,
            CleanedItem {
                fields: ItemFields {
                    title: self.title,
                    description: self.description,
                    category_id,
                    video_link: Some(self.video_link).filter(|v| !v.is_empty()),
                    event_date,
                },
                cover: self.cover_image,
            },
        )
    }
}

/// New gallery files submitted with a create form.
pub fn gallery_uploads(form: &FormData) -> Result<Vec<UploadedImage>, FieldErrors> {
    let uploads: Vec<UploadedImage> = form.files("gallery").cloned().collect();
    let mut errors = FieldErrors::new();
    if uploads.len() > MAX_GALLERY_IMAGES {
        errors.add("gallery", too_many_images());
    }
    finish(errors, uploads)
}

/// Gallery changes submitted with an edit form: `remove_image` ids,
/// `image-<id>` replacement files and new `gallery` files.
#[derive(Debug, Clone, Default)]
pub struct GalleryEdit {
    pub remove: Vec<i64>,
    pub replace: Vec<(i64, UploadedImage)>,
    pub add: Vec<UploadedImage>,
}

impl GalleryEdit {
    pub fn from_form_data(form: &FormData) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut edit = GalleryEdit::default();
        for raw in form.texts("remove_image") {
            match raw.trim().parse::<i64>() {
                Ok(id) if !edit.remove.contains(&id) => edit.remove.push(id),
                Ok(_) => {}
                Err(_) => errors.add("remove_image", "Enter a whole number."),
            }
        }
        for (suffix, upload) in form.files_with_prefix("image-") {
            match suffix.parse::<i64>() {
                Ok(id) => edit.replace.push((id, upload.clone())),
                Err(_) => errors.add("gallery", "Unknown gallery image."),
            }
        }
        edit.add = form.files("gallery").cloned().collect();
        finish(errors, edit)
    }

    /// Check the edit against the item's current gallery. A replacement for
    /// an image that is also being removed is dropped.
    pub fn check(mut self, existing: &[portfolio_image::Model]) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let known = |id: &i64| existing.iter().any(|img| img.id == *id);
        if !self.remove.iter().all(known) {
            errors.add("remove_image", "Unknown gallery image.");
        }
        if !self.replace.iter().all(|(id, _)| known(id)) {
            errors.add("gallery", "Unknown gallery image.");
        }
        let remove = self.remove.clone();
        self.replace.retain(|(id, _)| !remove.contains(id));

        let retained = existing.len() - existing.iter().filter(|i| remove.contains(&i.id)).count();
        if retained + self.add.len() > MAX_GALLERY_IMAGES {
            errors.add("gallery", too_many_images());
        }
        finish(errors, self)
    }
}

fn too_many_images() -> String {
    format!("Please submit at most {MAX_GALLERY_IMAGES} images.")
}

fn finish<T>(errors: FieldErrors, ok: T) -> Result<T, FieldErrors> {
    if errors.is_empty() {
        Ok(ok)
    } else {
        Err(errors)
    }
}
