use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::feed::{AddCommentRequest, CreatePostRequest, FeedService, ToggleLikeRequest};
use crate::models::*;
use crate::rate_limit::RateLimiterFacade;
use crate::repo::Repo;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/blog-posts")
            .route(web::get().to(list_feed))
            .route(web::post().to(create_post))
            .default_service(web::route().to(method_not_allowed)),
    )
    .service(
        web::resource("/blog-posts/{post_id}")
            .route(web::delete().to(delete_post))
            .default_service(web::route().to(method_not_allowed)),
    )
    .service(
        web::resource("/blog-posts/{post_id}/like")
            .route(web::post().to(toggle_post_like))
            .default_service(web::route().to(method_not_allowed)),
    )
    .service(
        web::resource("/blog-posts/{post_id}/comments")
            .route(web::get().to(list_comments))
            .default_service(web::route().to(method_not_allowed)),
    )
    .service(
        web::resource("/comments")
            .route(web::post().to(add_comment))
            .default_service(web::route().to(method_not_allowed)),
    )
    .service(
        web::resource("/comments/{comment_id}/like")
            .route(web::post().to(toggle_comment_like))
            .default_service(web::route().to(method_not_allowed)),
    )
    .service(
        web::resource("/users")
            .route(web::get().to(list_users))
            .route(web::post().to(create_user))
            .default_service(web::route().to(method_not_allowed)),
    )
    .service(
        web::resource("/users/{user_id}")
            .route(web::get().to(get_user))
            .default_service(web::route().to(method_not_allowed)),
    )
    .service(
        web::resource("/users/{user_id}/profile-image")
            .route(web::put().to(set_profile_image))
            .default_service(web::route().to(method_not_allowed)),
    )
    .service(
        web::resource("/users/{user_id}/journal-entries")
            .route(web::get().to(list_journal_entries))
            .default_service(web::route().to(method_not_allowed)),
    )
    .service(
        web::resource("/journal-entries")
            .route(web::post().to(add_journal_entry))
            .default_service(web::route().to(method_not_allowed)),
    )
    .service(
        web::resource("/journal-entries/{entry_id}")
            .route(web::put().to(update_journal_entry))
            .route(web::delete().to(delete_journal_entry))
            .default_service(web::route().to(method_not_allowed)),
    )
    .service(
        web::resource("/mood-logs")
            .route(web::post().to(add_mood_log))
            .default_service(web::route().to(method_not_allowed)),
    )
    .service(
        web::resource("/users/{user_id}/mood-logs")
            .route(web::get().to(list_mood_logs))
            .default_service(web::route().to(method_not_allowed)),
    );
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub rate_limiter: Option<RateLimiterFacade>,
}

async fn method_not_allowed() -> Result<HttpResponse, ApiError> {
    Err(ApiError::MethodNotAllowed)
}

// ---------------- Feed: posts -------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FeedResponse {
    pub posts: Vec<PostView>,
}

#[utoipa::path(
    get,
    path = "/blog-posts",
    responses(
        (status = 200, description = "Feed, newest post first", body = FeedResponse)
    )
)]
pub async fn list_feed(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let posts = FeedService::new(data.repo.as_ref()).get_feed().await?;
    Ok(HttpResponse::Ok().json(FeedResponse { posts }))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CreatePostResponse {
    pub post_id: String,
}

#[utoipa::path(
    post,
    path = "/blog-posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = CreatePostResponse),
        (status = 400, description = "Missing title, content or user id"),
        (status = 429, description = "Posting too fast")
    )
)]
pub async fn create_post(
    data: web::Data<AppState>,
    payload: web::Json<CreatePostRequest>,
) -> Result<HttpResponse, ApiError> {
    if let (Some(rl), Some(uid)) = (&data.rate_limiter, payload.user_id.as_deref()) {
        if !rl.allow_post(uid) {
            return Err(ApiError::RateLimited);
        }
    }
    let post = FeedService::new(data.repo.as_ref())
        .create_post(payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(CreatePostResponse {
        post_id: post.id.to_string(),
    }))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ToggleLikeResponse {
    pub liked: bool,
}

#[utoipa::path(
    post,
    path = "/blog-posts/{post_id}/like",
    request_body = ToggleLikeRequest,
    params(("post_id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "Like state after the toggle", body = ToggleLikeResponse),
        (status = 400, description = "Missing user id"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn toggle_post_like(
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ToggleLikeRequest>,
) -> Result<HttpResponse, ApiError> {
    let liked = FeedService::new(data.repo.as_ref())
        .toggle_post_like(&path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ToggleLikeResponse { liked }))
}

#[utoipa::path(
    delete,
    path = "/blog-posts/{post_id}",
    params(("post_id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "Deleted (no-op when already absent)")
    )
)]
pub async fn delete_post(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    FeedService::new(data.repo.as_ref())
        .delete_post(&path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Post deleted successfully" })))
}

// ---------------- Feed: comments ----------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AddCommentResponse {
    pub comment_id: String,
    pub comment: CommentView,
}

#[utoipa::path(
    post,
    path = "/comments",
    request_body = AddCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = AddCommentResponse),
        (status = 400, description = "Missing required fields"),
        (status = 429, description = "Commenting too fast")
    )
)]
pub async fn add_comment(
    data: web::Data<AppState>,
    payload: web::Json<AddCommentRequest>,
) -> Result<HttpResponse, ApiError> {
    if let (Some(rl), Some(uid)) = (&data.rate_limiter, payload.user_id.as_deref()) {
        if !rl.allow_comment(uid) {
            return Err(ApiError::RateLimited);
        }
    }
    let comment = FeedService::new(data.repo.as_ref())
        .add_comment(payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(AddCommentResponse {
        comment_id: comment.id.to_string(),
        comment: comment.into(),
    }))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CommentsResponse {
    pub comments: Vec<CommentView>,
}

#[utoipa::path(
    get,
    path = "/blog-posts/{post_id}/comments",
    params(("post_id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "Comments, newest first", body = CommentsResponse)
    )
)]
pub async fn list_comments(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let comments = FeedService::new(data.repo.as_ref())
        .list_comments(&path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(CommentsResponse { comments }))
}

#[utoipa::path(
    post,
    path = "/comments/{comment_id}/like",
    request_body = ToggleLikeRequest,
    params(("comment_id" = String, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Like state and post-toggle count", body = LikeOutcome),
        (status = 400, description = "Missing user id"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn toggle_comment_like(
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ToggleLikeRequest>,
) -> Result<HttpResponse, ApiError> {
    let outcome = FeedService::new(data.repo.as_ref())
        .toggle_comment_like(&path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

// ---------------- User directory ----------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CreateUserResponse {
    pub user_id: String,
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = CreateUserResponse),
        (status = 400, description = "Missing name or email")
    )
)]
pub async fn create_user(
    data: web::Data<AppState>,
    payload: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    let (Some(name), Some(email)) = (req.name, req.email) else {
        return Err(ApiError::Validation("Name and email are required".into()));
    };
    let user = data.repo.create_user(NewUser { name, email }).await?;
    Ok(HttpResponse::Created().json(CreateUserResponse {
        user_id: user.id.to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Directory entry with avatar default applied", body = UserView),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let user = data
        .repo
        .find_user(&path.into_inner())
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok().json(UserView::from(user)))
}

pub async fn list_users(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let users: Vec<UserView> = data
        .repo
        .list_users()
        .await?
        .into_iter()
        .map(UserView::from)
        .collect();
    Ok(HttpResponse::Ok().json(serde_json::json!({ "users": users })))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SetProfileImageRequest {
    pub profile_image: Option<String>,
}

// Directory-side avatar update. Existing post and comment snapshots keep
// the old image.
pub async fn set_profile_image(
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<SetProfileImageRequest>,
) -> Result<HttpResponse, ApiError> {
    let url = payload
        .into_inner()
        .profile_image
        .ok_or_else(|| ApiError::Validation("No image URL provided".into()))?;
    data.repo
        .update_profile_image(&path.into_inner(), &url)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "profile_image": url,
        "message": "Profile image updated successfully"
    })))
}

// ---------------- Journal entries ---------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AddJournalEntryRequest {
    pub user_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
}

pub async fn add_journal_entry(
    data: web::Data<AppState>,
    payload: web::Json<AddJournalEntryRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    let (Some(user_id), Some(content)) = (req.user_id, req.content) else {
        return Err(ApiError::Validation("User ID and content are required".into()));
    };
    let title = req
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled Entry".to_string());
    let entry = data
        .repo
        .create_entry(NewJournalEntry {
            user_id,
            title,
            content,
        })
        .await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Journal entry added successfully",
        "entry_id": entry.id.to_string()
    })))
}

pub async fn list_journal_entries(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let entries = data.repo.list_entries(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "journal_entries": entries })))
}

pub async fn update_journal_entry(
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<UpdateJournalEntry>,
) -> Result<HttpResponse, ApiError> {
    let upd = payload.into_inner();
    if upd.title.is_none() && upd.content.is_none() {
        return Err(ApiError::Validation("No fields to update".into()));
    }
    data.repo.update_entry(&path.into_inner(), upd).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Journal entry updated successfully"
    })))
}

pub async fn delete_journal_entry(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    data.repo.delete_entry(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Journal entry deleted successfully"
    })))
}

// ---------------- Mood logs ---------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AddMoodLogRequest {
    pub user_id: Option<String>,
    pub date: Option<String>,
    pub mood: Option<String>,
    pub notes: Option<String>,
    pub score: Option<f64>,
}

pub async fn add_mood_log(
    data: web::Data<AppState>,
    payload: web::Json<AddMoodLogRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    let (Some(user_id), Some(date), Some(mood)) = (req.user_id, req.date, req.mood) else {
        return Err(ApiError::Validation(
            "User ID, date and mood are required".into(),
        ));
    };
    let log = data
        .repo
        .create_log(NewMoodLog {
            user_id,
            date,
            mood,
            notes: req.notes.unwrap_or_default(),
            score: req.score,
        })
        .await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Mood log added successfully",
        "log_id": log.id.to_string()
    })))
}

pub async fn list_mood_logs(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let logs = data.repo.list_logs(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "mood_logs": logs })))
}
