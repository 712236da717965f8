use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Document ids are UUIDs internally and opaque strings on the wire.
pub type Id = uuid::Uuid;

/// Display name used for anonymous posts and for authors that do not
/// resolve in the user directory.
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// Avatar served for users without a profile image. Overridable so
/// deployments can point at their own placeholder asset.
pub static DEFAULT_PROFILE_IMAGE: Lazy<String> = Lazy::new(|| {
    std::env::var("HAVEN_DEFAULT_AVATAR").unwrap_or_else(|_| {
        "https://www.gravatar.com/avatar/00000000000000000000000000000000?d=mp&f=y".to_string()
    })
});

/// One entry of a post's or comment's embedded like-set.
/// A given `user_id` appears at most once per document.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Like {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// A blog post. `author_name` / `author_image` are snapshots of the
/// author's directory entry taken at creation time and never refreshed;
/// for anonymous posts they are forced to the anonymous constants.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Post {
    pub id: Id,
    pub author_id: String,
    pub title: String,
    pub content: String,
    pub is_anonymous: bool,
    pub author_name: String,
    pub author_image: Option<String>,
    pub likes: Vec<Like>,
    pub like_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewPost {
    pub author_id: String,
    pub title: String,
    pub content: String,
    pub is_anonymous: bool,
    pub images: Option<Vec<String>>,
}

/// A comment on a post. `post_id` is kept as the raw string the client
/// sent; a comment may reference a post that no longer exists.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    pub id: Id,
    pub post_id: String,
    pub author_id: String,
    pub content: String,
    pub author_name: String,
    pub author_image: Option<String>,
    pub likes: Vec<Like>,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewComment {
    pub post_id: String,
    pub author_id: String,
    pub content: String,
}

/// Result of a like toggle, with the post-mutation count.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LikeOutcome {
    pub liked: bool,
    pub like_count: i64,
}

/// Read-only projection of a document's like state.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LikeSummary {
    pub like_count: i64,
    pub likes: Vec<Like>,
}

/// User directory entry. Credentials live elsewhere; the directory only
/// answers display-name and avatar lookups.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct UserProfile {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Avatar URL with the directory default applied.
    pub fn avatar(&self) -> String {
        self.profile_image
            .clone()
            .unwrap_or_else(|| DEFAULT_PROFILE_IMAGE.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct JournalEntry {
    pub id: Id,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewJournalEntry {
    pub user_id: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateJournalEntry {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct MoodLog {
    pub id: Id,
    pub user_id: String,
    pub date: String,
    pub mood: String,
    pub notes: String,
    pub score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewMoodLog {
    pub user_id: String,
    pub date: String,
    pub mood: String,
    pub notes: String,
    pub score: Option<f64>,
}

/// View-ready feed item: the stored post plus a live comment count.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostView {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub is_anonymous: bool,
    pub author_name: String,
    pub image: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub likes: Vec<Like>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl PostView {
    pub fn from_post(post: Post, comment_count: i64) -> Self {
        // Re-apply the anonymity rule so an anonymous post can never leak
        // a stored name or avatar, whatever the document contains.
        let (author_name, image) = if post.is_anonymous {
            (ANONYMOUS_NAME.to_string(), None)
        } else {
            (post.author_name, post.author_image)
        };
        Self {
            id: post.id.to_string(),
            user_id: post.author_id,
            title: post.title,
            content: post.content,
            is_anonymous: post.is_anonymous,
            author_name,
            image,
            like_count: post.like_count,
            comment_count,
            created_at: post.created_at,
            likes: post.likes,
            images: post.images,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentView {
    pub id: String,
    pub user_id: String,
    pub post_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub user_name: String,
    pub user_image: Option<String>,
}

impl From<Comment> for CommentView {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id.to_string(),
            user_id: c.author_id,
            post_id: c.post_id,
            content: c.content,
            created_at: c.created_at,
            user_name: c.author_name,
            user_image: c.author_image,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub profile_image: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserProfile> for UserView {
    fn from(u: UserProfile) -> Self {
        let profile_image = u.avatar();
        Self {
            id: u.id.to_string(),
            name: u.name,
            email: u.email,
            profile_image,
            created_at: u.created_at,
        }
    }
}
