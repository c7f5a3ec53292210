//! About page content.

use tsitsi_core::AboutPageId;

/// Stored about page. Text fields are Markdown.
#[derive(Debug, Clone)]
pub struct AboutPage {
    pub id: AboutPageId,
    pub title: String,
    pub story: String,
    pub mission: String,
    pub vision: String,
    pub banner_image: Option<String>,
    pub photo_image: Option<String>,
}
