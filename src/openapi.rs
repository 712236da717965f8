use utoipa::OpenApi;

use crate::feed::{AddCommentRequest, CreatePostRequest, ToggleLikeRequest};
use crate::models::{CommentView, Like, LikeOutcome, PostView, UserView};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::list_feed,
        crate::routes::create_post,
        crate::routes::toggle_post_like,
        crate::routes::delete_post,
        crate::routes::add_comment,
        crate::routes::list_comments,
        crate::routes::toggle_comment_like,
        crate::routes::create_user,
        crate::routes::get_user,
    ),
    components(schemas(
        PostView, CommentView, Like, LikeOutcome, UserView,
        CreatePostRequest, ToggleLikeRequest, AddCommentRequest,
        crate::routes::FeedResponse, crate::routes::CreatePostResponse,
        crate::routes::ToggleLikeResponse, crate::routes::AddCommentResponse,
        crate::routes::CommentsResponse,
        crate::routes::CreateUserRequest, crate::routes::CreateUserResponse,
    )),
    tags(
        (name = "blog-posts", description = "Feed and post operations"),
        (name = "comments", description = "Comment operations"),
        (name = "users", description = "User directory"),
    )
)]
pub struct ApiDoc;
