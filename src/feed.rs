use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::models::*;
use crate::repo::Repo;

/// Stateless orchestrator over the post store, the comment store and the
/// user directory. Holds no state of its own; constructed per request.
pub struct FeedService<'a> {
    repo: &'a dyn Repo,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreatePostRequest {
    pub user_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ToggleLikeRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddCommentRequest {
    pub post_id: Option<String>,
    pub user_id: Option<String>,
    pub content: Option<String>,
}

/// Missing and blank both fail validation, matching the loose falsiness
/// checks the clients rely on.
fn require<'a>(value: &'a Option<String>, msg: &str) -> Result<&'a str, ApiError> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::Validation(msg.to_string())),
    }
}

impl<'a> FeedService<'a> {
    pub fn new(repo: &'a dyn Repo) -> Self {
        Self { repo }
    }

    /// Feed items newest-first. Comment counts are not denormalized on
    /// the post document; they are counted live on every read.
    pub async fn get_feed(&self) -> Result<Vec<PostView>, ApiError> {
        let posts = self.repo.list_posts(true).await?;
        let mut views = Vec::with_capacity(posts.len());
        for post in posts {
            let comment_count = self.repo.count_comments(&post.id.to_string()).await?;
            views.push(PostView::from_post(post, comment_count));
        }
        Ok(views)
    }

    pub async fn create_post(&self, req: CreatePostRequest) -> Result<Post, ApiError> {
        let author_id = require(&req.user_id, "User ID is required")?.to_string();
        let title = require(&req.title, "Title and content are required")?.to_string();
        let content = require(&req.content, "Title and content are required")?.to_string();
        let post = self
            .repo
            .create_post(NewPost {
                author_id,
                title,
                content,
                is_anonymous: req.is_anonymous,
                images: req.images,
            })
            .await?;
        Ok(post)
    }

    pub async fn toggle_post_like(
        &self,
        post_id: &str,
        req: ToggleLikeRequest,
    ) -> Result<bool, ApiError> {
        let user_id = require(&req.user_id, "User ID is required")?;
        Ok(self.repo.toggle_post_like(post_id, user_id).await?)
    }

    pub async fn delete_post(&self, post_id: &str) -> Result<(), ApiError> {
        Ok(self.repo.delete_post(post_id).await?)
    }

    /// Returns the created comment with its at-creation author snapshot;
    /// no fresh directory lookup happens on the way out.
    pub async fn add_comment(&self, req: AddCommentRequest) -> Result<Comment, ApiError> {
        let post_id = require(&req.post_id, "Missing required fields")?.to_string();
        let author_id = require(&req.user_id, "Missing required fields")?.to_string();
        let content = require(&req.content, "Missing required fields")?.to_string();
        let comment = self
            .repo
            .create_comment(NewComment {
                post_id,
                author_id,
                content,
            })
            .await?;
        Ok(comment)
    }

    pub async fn list_comments(&self, post_id: &str) -> Result<Vec<CommentView>, ApiError> {
        let comments = self.repo.list_comments(post_id).await?;
        Ok(comments.into_iter().map(CommentView::from).collect())
    }

    pub async fn toggle_comment_like(
        &self,
        comment_id: &str,
        req: ToggleLikeRequest,
    ) -> Result<LikeOutcome, ApiError> {
        let user_id = require(&req.user_id, "User ID is required")?;
        Ok(self.repo.toggle_comment_like(comment_id, user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_rejects_missing_and_blank() {
        assert!(require(&None, "x").is_err());
        assert!(require(&Some(String::new()), "x").is_err());
        assert!(require(&Some("  ".into()), "x").is_err());
        assert_eq!(require(&Some("u1".into()), "x").unwrap(), "u1");
    }
}
