//! Blog post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::comment::CommentWithAuthor;
use super::tag::Tag;

/// Blog post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// Owning user
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(title: String, content: String, author_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title,
            content,
            author_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Post with the author's username and its tags
#[derive(Debug, Clone, Serialize)]
pub struct PostWithMeta {
    #[serde(flatten)]
    pub post: Post,
    pub author_username: String,
    pub tags: Vec<Tag>,
}

/// Post detail payload including comments
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: PostWithMeta,
    pub comments: Vec<CommentWithAuthor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePostInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update; `tags: Some(..)` replaces the whole tag set
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Filters accepted by the post list
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    /// Substring over title, content or tag name
    pub q: Option<String>,
    /// Exact tag name, ignoring case
    pub tag_name: Option<String>,
}
