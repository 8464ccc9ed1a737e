//! Multipart form decoding and field-level error collection shared by the
//! profile and portfolio forms.

use std::collections::{BTreeMap, HashMap};

use axum::extract::Multipart;
use serde::Serialize;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::AppError;
use crate::media::UploadedImage;
use crate::models::user::username_problem;

/// Field name -> human readable messages. `__all__` holds non-field errors.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub const NON_FIELD: &'static str = "__all__";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }

    /// `Ok(())` when nothing was recorded, a validation error otherwise.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            for err in errs {
                let message = match &err.message {
                    Some(m) => m.to_string(),
                    None => default_message(&err.code).to_string(),
                };
                out.add(&field, message);
            }
        }
        out
    }
}

fn default_message(code: &str) -> &'static str {
    match code {
        "required" => "This field is required.",
        "length" => "Ensure this value has a valid length.",
        "url" => "Enter a valid URL.",
        "email" => "Enter a valid email address.",
        _ => "Enter a valid value.",
    }
}

/// A decoded `multipart/form-data` submission.
#[derive(Debug, Default, Clone)]
pub struct FormData {
    fields: HashMap<String, Vec<String>>,
    files: Vec<(String, UploadedImage)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the multipart stream. Empty file inputs (no name, no bytes), as
    /// browsers send them for untouched `<input type=file>`, are skipped.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = FormData::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_owned) {
                Some(file_name) => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    form.files.push((name, UploadedImage::new(file_name, bytes)));
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    form.fields.entry(name).or_default().push(text);
                }
            }
        }
        Ok(form)
    }

    pub fn with_text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.entry(name.to_string()).or_default().push(value.into());
        self
    }

    pub fn with_file(mut self, name: &str, upload: UploadedImage) -> Self {
        self.files.push((name.to_string(), upload));
        self
    }

    /// First value of a text field, trimmed.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|v| v.first())
            .map(|s| s.trim())
    }

    /// Trimmed text value, empty string when absent.
    pub fn text_or_empty(&self, name: &str) -> String {
        self.text(name).unwrap_or_default().to_string()
    }

    pub fn texts(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Checkbox semantics: an unchecked box is simply absent from the body.
    pub fn flag(&self, name: &str) -> bool {
        match self.text(name) {
            None => false,
            Some(v) => !matches!(v.to_ascii_lowercase().as_str(), "" | "0" | "false" | "off"),
        }
    }

    pub fn file(&self, name: &str) -> Option<&UploadedImage> {
        self.files.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn files<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a UploadedImage> + 'a {
        self.files.iter().filter(move |(n, _)| n == name).map(|(_, f)| f)
    }

    /// Files whose field name is `<prefix><suffix>`, yielded with the suffix.
    pub fn files_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a UploadedImage)> + 'a {
        self.files
            .iter()
            .filter_map(move |(n, f)| n.strip_prefix(prefix).map(|suffix| (suffix, f)))
    }
}

/// Profile edit submission (user fields and profile fields together).
#[derive(Debug, Clone, Validate)]
pub struct ProfileForm {
    pub username: String,
    #[validate(length(max = 150))]
    pub first_name: String,
    #[validate(length(max = 150))]
    pub last_name: String,
    #[validate(length(max = 500, message = "Ensure this value has at most 500 characters."))]
    pub bio: String,
    #[validate(custom(function = "blank_or_url"))]
    pub facebook_link: String,
    #[validate(custom(function = "blank_or_url"))]
    pub github_link: String,
    pub is_public: bool,
    pub avatar: Option<UploadedImage>,
}

impl ProfileForm {
    pub fn from_form_data(form: &FormData) -> Self {
        Self {
            username: form.text_or_empty("username"),
            first_name: form.text_or_empty("first_name"),
            last_name: form.text_or_empty("last_name"),
            bio: form.text_or_empty("bio"),
            facebook_link: form.text_or_empty("facebook_link"),
            github_link: form.text_or_empty("github_link"),
            is_public: form.flag("is_public"),
            avatar: form.file("avatar").cloned(),
        }
    }

    /// Field checks that need no database access.
    pub fn check(&self) -> FieldErrors {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        };
        if let Some(problem) = username_problem(&self.username) {
            errors.add("username", problem);
        }
        errors
    }
}

/// Blank, or an absolute http(s) URL.
pub fn blank_or_url(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || is_http_url(value) {
        Ok(())
    } else {
        let mut err = ValidationError::new("url");
        err.message = Some("Enter a valid URL.".into());
        Err(err)
    }
}

pub fn is_http_url(value: &str) -> bool {
    url::Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, max = 5))]
        name: String,
        #[validate(url(message = "Enter a valid URL."))]
        link: String,
    }

    #[test]
    fn validator_errors_become_field_messages() {
        let sample = Sample {
            name: "too long".into(),
            link: "not a url".into(),
        };
        let errors: FieldErrors = sample.validate().unwrap_err().into();
        assert!(errors.contains("name"));
        assert_eq!(errors.get("link").unwrap(), ["Enter a valid URL."]);
    }

    #[test]
    fn into_result_is_ok_only_when_empty() {
        assert!(FieldErrors::new().into_result().is_ok());
        let mut errors = FieldErrors::new();
        errors.add("title", "This field is required.");
        assert!(matches!(errors.into_result(), Err(AppError::Validation(_))));
    }

    #[test]
    fn flag_follows_checkbox_semantics() {
        let form = FormData::new().with_text("is_public", "on").with_text("off", "false");
        assert!(form.flag("is_public"));
        assert!(!form.flag("off"));
        assert!(!form.flag("missing"));
    }

    #[test]
    fn profile_form_rejects_bad_links_and_long_bio() {
        let form = FormData::new()
            .with_text("username", "nok")
            .with_text("bio", "x".repeat(501))
            .with_text("facebook_link", "facebook.com/nok")
            .with_text("github_link", "https://github.com/nok");
        let errors = ProfileForm::from_form_data(&form).check();
        assert!(errors.contains("bio"));
        assert_eq!(errors.get("facebook_link").unwrap(), ["Enter a valid URL."]);
        assert!(!errors.contains("github_link"));
        assert!(!errors.contains("username"));
    }

    #[test]
    fn profile_form_without_checkbox_is_private() {
        let form = FormData::new().with_text("username", "nok");
        assert!(!ProfileForm::from_form_data(&form).is_public);
    }

    #[test]
    fn files_with_prefix_yields_suffixes() {
        let form = FormData::new()
            .with_file("image-7", UploadedImage::new("a.png", vec![1]))
            .with_file("gallery", UploadedImage::new("b.png", vec![2]));
        let found: Vec<_> = form.files_with_prefix("image-").map(|(s, _)| s).collect();
        assert_eq!(found, ["7"]);
        assert_eq!(form.files("gallery").count(), 1);
    }
}
