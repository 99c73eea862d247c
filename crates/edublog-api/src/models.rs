//! Data models for the blog backend
//!
//! The backend is inconsistent about field names (`_id`/`id`,
//! `likes`/`likesCount`, `imageSrc`/`image`) and about whether a post's
//! author is populated. Each model deserializes through a loose `Raw*`
//! shape and is normalized once, here.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use edublog_core::{Role, RoleProfile};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Excerpt length used when the backend sends only the content
const EXCERPT_CHARS: usize = 150;

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value.and_then(|s| DateTime::parse_from_rfc3339(&s).ok().map(|dt| dt.with_timezone(&Utc)))
}

/// Counters arrive as numbers or as arrays of user ids
fn count(value: Option<Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::Array(items)) => items.len() as u64,
        _ => 0,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Author summary attached to posts and comments
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub profile_image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAuthor {
    #[serde(rename = "_id")]
    underscore_id: Option<String>,
    id: Option<String>,
    name: Option<String>,
    email: Option<String>,
    user_type: Option<Role>,
    profile_image: Option<String>,
}

/// Unpopulated references come as a bare id
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AuthorRef {
    Id(String),
    Full(RawAuthor),
}

impl From<AuthorRef> for Author {
    fn from(author: AuthorRef) -> Self {
        let raw = match author {
            AuthorRef::Id(id) => RawAuthor {
                id: Some(id),
                ..RawAuthor::default()
            },
            AuthorRef::Full(raw) => raw,
        };
        Author {
            id: raw.underscore_id.or(raw.id).unwrap_or_default(),
            name: non_empty(raw.name).unwrap_or_else(|| "Unknown".to_string()),
            email: raw.email.unwrap_or_default(),
            role: raw.user_type.unwrap_or(Role::Student),
            profile_image: non_empty(raw.profile_image),
        }
    }
}

/// A blog post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPost")]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub author: Option<Author>,
    /// Relative image reference, e.g. `images/cover.png`
    pub image_src: Option<String>,
    pub tags: Vec<String>,
    pub likes: u64,
    pub comments: u64,
    /// Whether the requesting user liked this post
    pub is_liked: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPost {
    #[serde(rename = "_id")]
    underscore_id: Option<String>,
    id: Option<String>,
    #[serde(default)]
    title: String,
    content: Option<String>,
    excerpt: Option<String>,
    author: Option<AuthorRef>,
    image_src: Option<String>,
    image: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    likes: Option<Value>,
    likes_count: Option<Value>,
    comments: Option<Value>,
    comments_count: Option<Value>,
    #[serde(default)]
    user_liked: bool,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl From<RawPost> for Post {
    fn from(raw: RawPost) -> Self {
        let content = non_empty(raw.content);
        let excerpt = non_empty(raw.excerpt);
        let excerpt_from_content = || {
            content
                .as_deref()
                .map(|c| c.chars().take(EXCERPT_CHARS).collect::<String>())
                .unwrap_or_default()
        };

        let likes = match count(raw.likes) {
            0 => count(raw.likes_count),
            n => n,
        };
        let comments = match count(raw.comments) {
            0 => count(raw.comments_count),
            n => n,
        };

        Post {
            id: raw.underscore_id.or(raw.id).unwrap_or_default(),
            title: raw.title,
            excerpt: excerpt.clone().unwrap_or_else(excerpt_from_content),
            content: content.clone().or(excerpt).unwrap_or_default(),
            author: raw.author.map(Author::from),
            image_src: non_empty(raw.image_src).or_else(|| non_empty(raw.image)),
            tags: raw.tags,
            likes,
            comments,
            is_liked: raw.user_liked,
            created_at: parse_timestamp(raw.created_at),
            updated_at: parse_timestamp(raw.updated_at),
        }
    }
}

/// A comment on a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawComment")]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: Option<String>,
    pub content: String,
    pub author: Option<Author>,
    pub likes: u64,
    pub is_liked: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawComment {
    #[serde(rename = "_id")]
    underscore_id: Option<String>,
    id: Option<String>,
    post_id: Option<String>,
    post: Option<Value>,
    #[serde(default)]
    content: String,
    author: Option<AuthorRef>,
    likes: Option<Value>,
    likes_count: Option<Value>,
    #[serde(default)]
    user_liked: bool,
    created_at: Option<String>,
}

impl From<RawComment> for Comment {
    fn from(raw: RawComment) -> Self {
        let post_id = raw.post_id.or_else(|| match raw.post {
            Some(Value::String(id)) => Some(id),
            Some(Value::Object(post)) => post
                .get("_id")
                .or_else(|| post.get("id"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        });
        let likes = match count(raw.likes) {
            0 => count(raw.likes_count),
            n => n,
        };

        Comment {
            id: raw.underscore_id.or(raw.id).unwrap_or_default(),
            post_id,
            content: raw.content,
            author: raw.author.map(Author::from),
            likes,
            is_liked: raw.user_liked,
            created_at: parse_timestamp(raw.created_at),
        }
    }
}

/// Result of liking a post or comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LikeStatus {
    pub liked: Option<bool>,
    pub likes: Option<u64>,
}

impl LikeStatus {
    pub(crate) fn from_data(data: Option<&Value>) -> Self {
        let Some(data) = data else {
            return Self::default();
        };
        let liked = ["liked", "isLiked", "userLiked"]
            .iter()
            .find_map(|key| data.get(key).and_then(Value::as_bool));
        let likes = ["likes", "likesCount"]
            .iter()
            .find_map(|key| match data.get(key) {
                Some(Value::Number(n)) => n.as_u64(),
                Some(Value::Array(items)) => Some(items.len() as u64),
                _ => None,
            });
        Self { liked, likes }
    }
}

/// Paging metadata of list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default, alias = "totalPages")]
    pub pages: Option<u64>,
}

/// One page of a list endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Option<Pagination>,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Fields of a post being created or edited
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPost {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl NewPost {
    pub fn new(title: impl Into<String>, excerpt: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into().trim().to_string(),
            excerpt: excerpt.into().trim().to_string(),
            content: content.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Account created by an admin through `POST /users/register`
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(flatten)]
    pub profile: RoleProfile,
    /// Filled in from the upload when an image is attached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

impl NewUser {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        profile: RoleProfile,
    ) -> Self {
        Self {
            name: name.into().trim().to_string(),
            email: email.into().trim().to_lowercase(),
            password: password.into(),
            school: None,
            age: None,
            profile,
            profile_image: None,
        }
    }

    pub fn with_school(mut self, school: impl Into<String>) -> Self {
        self.school = Some(school.into().trim().to_string());
        self
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn role(&self) -> Role {
        self.profile.role()
    }
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"***")
            .field("role", &self.profile.role())
            .finish()
    }
}

/// Partial update of a user; unset fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(flatten)]
    pub profile: Option<RoleProfile>,
}

impl UserUpdate {
    /// Changing the role is an admin-only edit
    pub fn changes_role(&self) -> bool {
        self.profile.is_some() || self.is_active.is_some()
    }
}

/// Outcome of an admin creating a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUserOutcome {
    /// The created account, when the backend echoes it back
    pub user: Option<edublog_core::UserRecord>,
    /// Ancillary failures that did not stop the creation
    pub warnings: Vec<String>,
}

/// Local image attached to a post or a new user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub path: PathBuf,
}

impl ImageFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("image.jpg")
            .to_string()
    }

    /// Only PNG is told apart; everything else goes up as JPEG
    pub fn mime(&self) -> &'static str {
        match extension(&self.path).as_deref() {
            Some("png") => "image/png",
            _ => "image/jpeg",
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}
