use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::audit::Audit;
use crate::error::AppError;
use crate::security::Role;

/// Site language / 站点语言
///
/// Serialized as its uppercase name; parsing ignores case and surrounding whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Language {
    /// Sorani
    Ckb,
    /// Kurmanji
    Kmr,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Ckb => "CKB",
            Language::Kmr => "KMR",
        }
    }

    /// Value stored in the `language` column of taxonomy link tables
    pub fn code(&self) -> &'static str {
        match self {
            Language::Ckb => "ckb",
            Language::Kmr => "kmr",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CKB" => Ok(Language::Ckb),
            "KMR" => Ok(Language::Kmr),
            _ => Err(format!("Unknown language: {}", s.trim())),
        }
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Media attachment type / 媒体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaType {
    Image,
    Video,
    Audio,
    Document,
    Pdf,
    Text,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "IMAGE",
            MediaType::Video => "VIDEO",
            MediaType::Audio => "AUDIO",
            MediaType::Document => "DOCUMENT",
            MediaType::Pdf => "PDF",
            MediaType::Text => "TEXT",
        }
    }

    /// Storage path prefix the file-serving layer routes this type to
    pub fn storage_prefix(&self) -> &'static str {
        match self {
            MediaType::Image => "images/",
            MediaType::Video => "videos/",
            MediaType::Audio => "audios/",
            MediaType::Document => "documents/",
            MediaType::Pdf => "pdfs/",
            MediaType::Text => "texts/",
        }
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IMAGE" => Ok(MediaType::Image),
            "VIDEO" => Ok(MediaType::Video),
            "AUDIO" => Ok(MediaType::Audio),
            "DOCUMENT" => Ok(MediaType::Document),
            "PDF" => Ok(MediaType::Pdf),
            "TEXT" => Ok(MediaType::Text),
            _ => Err(format!("Unknown media type: {}", s.trim())),
        }
    }
}

/// Content domain an item belongs to / 内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Project,
    Writing,
    News,
}

impl ContentKind {
    /// Discriminator stored in link and media tables
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Project => "project",
            ContentKind::Writing => "writing",
            ContentKind::News => "news",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Project => "projects",
            ContentKind::Writing => "writings",
            ContentKind::News => "news",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Project => "Project",
            ContentKind::Writing => "Writing",
            ContentKind::News => "News",
        }
    }

    /// Lowercased title columns the search predicate looks at
    pub fn title_columns(&self) -> &'static [&'static str] {
        match self {
            ContentKind::Project => &["title_lower"],
            ContentKind::Writing | ContentKind::News => &["title_ckb_lower", "title_kmr_lower"],
        }
    }
}

/// Tag or keyword namespace / 标签或关键词
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaxonomyKind {
    Tag,
    Keyword,
}

impl TaxonomyKind {
    pub fn table(&self) -> &'static str {
        match self {
            TaxonomyKind::Tag => "tags",
            TaxonomyKind::Keyword => "keywords",
        }
    }

    pub fn link_table(&self) -> &'static str {
        match self {
            TaxonomyKind::Tag => "item_tags",
            TaxonomyKind::Keyword => "item_keywords",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaxonomyKind::Tag => "Tag",
            TaxonomyKind::Keyword => "Keyword",
        }
    }
}

/// A tag or keyword record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Term {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: i64,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub url: String,
    pub caption: Option<String>,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInput {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub url: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i64>,
}

/// One language block of a bilingual item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizedContent {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub project_date: Option<String>,
    pub tags: Vec<String>,
    pub keywords: Vec<String>,
    pub media: Vec<Media>,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub project_date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub media: Vec<MediaInput>,
}

/// Book or article, with per-language taxonomy / 著作
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Writing {
    pub id: i64,
    pub ckb: Option<LocalizedContent>,
    pub kmr: Option<LocalizedContent>,
    pub tags_ckb: Vec<String>,
    pub tags_kmr: Vec<String>,
    pub keywords_ckb: Vec<String>,
    pub keywords_kmr: Vec<String>,
    pub media: Vec<Media>,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WritingInput {
    #[serde(default)]
    pub ckb: Option<LocalizedContent>,
    #[serde(default)]
    pub kmr: Option<LocalizedContent>,
    #[serde(default)]
    pub tags_ckb: Vec<String>,
    #[serde(default)]
    pub tags_kmr: Vec<String>,
    #[serde(default)]
    pub keywords_ckb: Vec<String>,
    #[serde(default)]
    pub keywords_kmr: Vec<String>,
    #[serde(default)]
    pub media: Vec<MediaInput>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct News {
    pub id: i64,
    pub ckb: Option<LocalizedContent>,
    pub kmr: Option<LocalizedContent>,
    pub tags: Vec<String>,
    pub keywords: Vec<String>,
    pub media: Vec<Media>,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsInput {
    #[serde(default)]
    pub ckb: Option<LocalizedContent>,
    #[serde(default)]
    pub kmr: Option<LocalizedContent>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub media: Vec<MediaInput>,
}

/// Back-office account / 后台用户
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub enabled: bool,
    pub last_login: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn role(&self) -> Result<Role, AppError> {
        self.role.parse().map_err(AppError::Internal)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub enabled: Option<bool>,
}

/// One page of a listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, page_size: i64) -> Self {
        let total_pages = if page_size > 0 {
            (total as f64 / page_size as f64).ceil() as i64
        } else {
            0
        };
        Self { items, total, page, page_size, total_pages }
    }
}
