//! Portfolio items, their galleries and categories: the dashboard and
//! editing views, the public pages and the PDF export.

pub mod export;
pub mod forms;
pub mod models;
pub mod permissions;
pub mod serializers;
pub mod urls;
pub mod video;
pub mod views;

pub use urls::{public_router, router};
