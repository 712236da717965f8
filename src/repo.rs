use chrono::Utc;

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")]
    NotFound,
    #[error("storage error: {0}")]
    Storage(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

use async_trait::async_trait;

/// Resolves user ids to display names and avatars. Feed documents keep
/// the raw id string even when it does not resolve here.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn create_user(&self, new: NewUser) -> RepoResult<UserProfile>;
    async fn find_user(&self, user_id: &str) -> RepoResult<Option<UserProfile>>;
    async fn list_users(&self) -> RepoResult<Vec<UserProfile>>;
    async fn update_profile_image(&self, user_id: &str, image_url: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn create_post(&self, new: NewPost) -> RepoResult<Post>;
    async fn list_posts(&self, newest_first: bool) -> RepoResult<Vec<Post>>;
    /// Flips `user_id`'s like on the post and returns the resulting state.
    /// The membership check and the set/counter mutation are one atomic
    /// step per document.
    async fn toggle_post_like(&self, post_id: &str, user_id: &str) -> RepoResult<bool>;
    async fn delete_post(&self, post_id: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn create_comment(&self, new: NewComment) -> RepoResult<Comment>;
    async fn list_comments(&self, post_id: &str) -> RepoResult<Vec<Comment>>;
    async fn count_comments(&self, post_id: &str) -> RepoResult<i64>;
    async fn toggle_comment_like(&self, comment_id: &str, user_id: &str)
        -> RepoResult<LikeOutcome>;
    async fn comment_likes(&self, comment_id: &str) -> RepoResult<LikeSummary>;
}

#[async_trait]
pub trait JournalRepo: Send + Sync {
    async fn create_entry(&self, new: NewJournalEntry) -> RepoResult<JournalEntry>;
    async fn list_entries(&self, user_id: &str) -> RepoResult<Vec<JournalEntry>>;
    async fn update_entry(&self, entry_id: &str, upd: UpdateJournalEntry) -> RepoResult<()>;
    async fn delete_entry(&self, entry_id: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait MoodLogRepo: Send + Sync {
    async fn create_log(&self, new: NewMoodLog) -> RepoResult<MoodLog>;
    async fn list_logs(&self, user_id: &str) -> RepoResult<Vec<MoodLog>>;
}

pub trait Repo: UserDirectory + PostRepo + CommentRepo + JournalRepo + MoodLogRepo {}

impl<T> Repo for T where T: UserDirectory + PostRepo + CommentRepo + JournalRepo + MoodLogRepo {}

fn parse_id(raw: &str) -> Option<Id> {
    Id::parse_str(raw).ok()
}

/// Snapshot of the author fields a post or comment freezes at creation.
fn author_snapshot(user: Option<&UserProfile>, anonymous: bool) -> (String, Option<String>) {
    match user {
        Some(u) if !anonymous => (u.name.clone(), Some(u.avatar())),
        _ => (ANONYMOUS_NAME.to_string(), None),
    }
}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, RwLock};

    const SNAPSHOT_PATH: &str = "data/state.json";

    // Posts and comments live in Vecs so insertion order survives the
    // snapshot round-trip; the stable sort in list_* then breaks
    // created_at ties by insertion order.
    #[derive(Default, Serialize, Deserialize)]
    struct State {
        users: HashMap<Id, UserProfile>,
        posts: Vec<Post>,
        comments: Vec<Comment>,
        journal_entries: HashMap<Id, JournalEntry>,
        mood_logs: HashMap<Id, MoodLog>,
    }

    #[derive(Clone)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        snapshot_path: Arc<PathBuf>,
    }

    impl InMemRepo {
        fn data_dir() -> PathBuf {
            std::env::var("HAVEN_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data"))
        }

        fn snapshot_path() -> PathBuf {
            if std::env::var("HAVEN_DATA_DIR").is_ok() {
                let mut p = Self::data_dir();
                p.push("state.json");
                p
            } else {
                PathBuf::from(SNAPSHOT_PATH)
            }
        }

        fn load_state_from(path: &Path) -> State {
            match std::fs::read(path) {
                Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                    Ok(s) => {
                        log::info!("loaded snapshot '{}'", path.display());
                        s
                    }
                    Err(e) => {
                        log::warn!(
                            "failed to parse snapshot '{}': {e}; starting empty",
                            path.display()
                        );
                        State::default()
                    }
                },
                Err(e) => {
                    log::info!("no snapshot at '{}': {e}; starting empty", path.display());
                    State::default()
                }
            }
        }

        fn persist(&self) {
            let path = self.snapshot_path.clone();
            if let Ok(s) = serde_json::to_vec_pretty(&*self.state.read().unwrap()) {
                if let Some(dir) = path.parent() {
                    let _ = std::fs::create_dir_all(dir);
                }
                if let Err(e) = std::fs::write(&*path, s) {
                    log::error!("failed to write snapshot '{}': {e}", path.display());
                }
            }
        }

        pub fn new() -> Self {
            let snapshot_path = Self::snapshot_path();
            let state = Self::load_state_from(&snapshot_path);
            Self {
                state: Arc::new(RwLock::new(state)),
                snapshot_path: Arc::new(snapshot_path),
            }
        }
    }

    impl Default for InMemRepo {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl UserDirectory for InMemRepo {
        async fn create_user(&self, new: NewUser) -> RepoResult<UserProfile> {
            let user = UserProfile {
                id: Id::new_v4(),
                name: new.name,
                email: new.email,
                profile_image: None,
                created_at: Utc::now(),
            };
            let mut s = self.state.write().unwrap();
            s.users.insert(user.id, user.clone());
            drop(s);
            self.persist();
            Ok(user)
        }

        async fn find_user(&self, user_id: &str) -> RepoResult<Option<UserProfile>> {
            let Some(id) = parse_id(user_id) else {
                return Ok(None);
            };
            let s = self.state.read().unwrap();
            Ok(s.users.get(&id).cloned())
        }

        async fn list_users(&self) -> RepoResult<Vec<UserProfile>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s.users.values().cloned().collect();
            v.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(v)
        }

        async fn update_profile_image(&self, user_id: &str, image_url: &str) -> RepoResult<()> {
            let id = parse_id(user_id).ok_or(RepoError::NotFound)?;
            let mut s = self.state.write().unwrap();
            let user = s.users.get_mut(&id).ok_or(RepoError::NotFound)?;
            user.profile_image = Some(image_url.to_string());
            drop(s);
            self.persist();
            Ok(())
        }
    }

    #[async_trait]
    impl PostRepo for InMemRepo {
        async fn create_post(&self, new: NewPost) -> RepoResult<Post> {
            let mut s = self.state.write().unwrap();
            let user = parse_id(&new.author_id).and_then(|id| s.users.get(&id).cloned());
            let (author_name, author_image) = author_snapshot(user.as_ref(), new.is_anonymous);
            let post = Post {
                id: Id::new_v4(),
                author_id: new.author_id,
                title: new.title,
                content: new.content,
                is_anonymous: new.is_anonymous,
                author_name,
                author_image,
                likes: Vec::new(),
                like_count: 0,
                images: new.images,
                created_at: Utc::now(),
            };
            s.posts.push(post.clone());
            drop(s);
            self.persist();
            Ok(post)
        }

        async fn list_posts(&self, newest_first: bool) -> RepoResult<Vec<Post>> {
            let s = self.state.read().unwrap();
            let mut v = s.posts.clone();
            if newest_first {
                v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
            Ok(v)
        }

        async fn toggle_post_like(&self, post_id: &str, user_id: &str) -> RepoResult<bool> {
            let id = parse_id(post_id).ok_or(RepoError::NotFound)?;
            // Membership check and mutation stay under one write lock so
            // concurrent toggles on the same post cannot interleave.
            let mut s = self.state.write().unwrap();
            let post = s
                .posts
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or(RepoError::NotFound)?;
            let liked = if post.likes.iter().any(|l| l.user_id == user_id) {
                post.likes.retain(|l| l.user_id != user_id);
                false
            } else {
                post.likes.push(Like {
                    user_id: user_id.to_string(),
                    created_at: Utc::now(),
                });
                true
            };
            post.like_count = post.likes.len() as i64;
            drop(s);
            self.persist();
            Ok(liked)
        }

        async fn delete_post(&self, post_id: &str) -> RepoResult<()> {
            // Absent or malformed ids are a no-op; comments are left in
            // place and become orphans.
            let Some(id) = parse_id(post_id) else {
                return Ok(());
            };
            let mut s = self.state.write().unwrap();
            let before = s.posts.len();
            s.posts.retain(|p| p.id != id);
            let removed = s.posts.len() != before;
            drop(s);
            if removed {
                self.persist();
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CommentRepo for InMemRepo {
        async fn create_comment(&self, new: NewComment) -> RepoResult<Comment> {
            // No check that post_id references a live post.
            let mut s = self.state.write().unwrap();
            let user = parse_id(&new.author_id).and_then(|id| s.users.get(&id).cloned());
            let (author_name, author_image) = author_snapshot(user.as_ref(), false);
            let comment = Comment {
                id: Id::new_v4(),
                post_id: new.post_id,
                author_id: new.author_id,
                content: new.content,
                author_name,
                author_image,
                likes: Vec::new(),
                like_count: 0,
                created_at: Utc::now(),
            };
            s.comments.push(comment.clone());
            drop(s);
            self.persist();
            Ok(comment)
        }

        async fn list_comments(&self, post_id: &str) -> RepoResult<Vec<Comment>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s
                .comments
                .iter()
                .filter(|c| c.post_id == post_id)
                .cloned()
                .collect();
            v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(v)
        }

        async fn count_comments(&self, post_id: &str) -> RepoResult<i64> {
            let s = self.state.read().unwrap();
            Ok(s.comments.iter().filter(|c| c.post_id == post_id).count() as i64)
        }

        async fn toggle_comment_like(
            &self,
            comment_id: &str,
            user_id: &str,
        ) -> RepoResult<LikeOutcome> {
            let id = parse_id(comment_id).ok_or(RepoError::NotFound)?;
            let mut s = self.state.write().unwrap();
            let comment = s
                .comments
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or(RepoError::NotFound)?;
            let liked = if comment.likes.iter().any(|l| l.user_id == user_id) {
                comment.likes.retain(|l| l.user_id != user_id);
                false
            } else {
                comment.likes.push(Like {
                    user_id: user_id.to_string(),
                    created_at: Utc::now(),
                });
                true
            };
            comment.like_count = comment.likes.len() as i64;
            let like_count = comment.like_count;
            drop(s);
            self.persist();
            Ok(LikeOutcome { liked, like_count })
        }

        async fn comment_likes(&self, comment_id: &str) -> RepoResult<LikeSummary> {
            let s = self.state.read().unwrap();
            let found = parse_id(comment_id).and_then(|id| s.comments.iter().find(|c| c.id == id));
            Ok(match found {
                Some(c) => LikeSummary {
                    like_count: c.like_count,
                    likes: c.likes.clone(),
                },
                None => LikeSummary {
                    like_count: 0,
                    likes: Vec::new(),
                },
            })
        }
    }

    #[async_trait]
    impl JournalRepo for InMemRepo {
        async fn create_entry(&self, new: NewJournalEntry) -> RepoResult<JournalEntry> {
            let entry = JournalEntry {
                id: Id::new_v4(),
                user_id: new.user_id,
                title: new.title,
                content: new.content,
                created_at: Utc::now(),
            };
            let mut s = self.state.write().unwrap();
            s.journal_entries.insert(entry.id, entry.clone());
            drop(s);
            self.persist();
            Ok(entry)
        }

        async fn list_entries(&self, user_id: &str) -> RepoResult<Vec<JournalEntry>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s
                .journal_entries
                .values()
                .filter(|e| e.user_id == user_id)
                .cloned()
                .collect();
            v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(v)
        }

        async fn update_entry(&self, entry_id: &str, upd: UpdateJournalEntry) -> RepoResult<()> {
            let id = parse_id(entry_id).ok_or(RepoError::NotFound)?;
            let mut s = self.state.write().unwrap();
            let entry = s.journal_entries.get_mut(&id).ok_or(RepoError::NotFound)?;
            if let Some(title) = upd.title {
                entry.title = title;
            }
            if let Some(content) = upd.content {
                entry.content = content;
            }
            drop(s);
            self.persist();
            Ok(())
        }

        async fn delete_entry(&self, entry_id: &str) -> RepoResult<()> {
            let id = parse_id(entry_id).ok_or(RepoError::NotFound)?;
            let mut s = self.state.write().unwrap();
            s.journal_entries.remove(&id).ok_or(RepoError::NotFound)?;
            drop(s);
            self.persist();
            Ok(())
        }
    }

    #[async_trait]
    impl MoodLogRepo for InMemRepo {
        async fn create_log(&self, new: NewMoodLog) -> RepoResult<MoodLog> {
            let log = MoodLog {
                id: Id::new_v4(),
                user_id: new.user_id,
                date: new.date,
                mood: new.mood,
                notes: new.notes,
                score: new.score,
                created_at: Utc::now(),
            };
            let mut s = self.state.write().unwrap();
            s.mood_logs.insert(log.id, log.clone());
            drop(s);
            self.persist();
            Ok(log)
        }

        async fn list_logs(&self, user_id: &str) -> RepoResult<Vec<MoodLog>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s
                .mood_logs
                .values()
                .filter(|l| l.user_id == user_id)
                .cloned()
                .collect();
            v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(v)
        }
    }
}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use sqlx::postgres::PgRow;
    use sqlx::types::Json;
    use sqlx::{Pool, Postgres, Row};

    #[derive(Clone)]
    pub struct PgRepo {
        pool: Pool<Postgres>,
    }

    impl PgRepo {
        /// The pool is created once at process start and injected here;
        /// no store opens its own connections.
        pub fn new(pool: Pool<Postgres>) -> Self {
            Self { pool }
        }
    }

    fn storage_err(e: sqlx::Error) -> RepoError {
        match e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            other => RepoError::Storage(other.to_string()),
        }
    }

    fn post_from_row(row: &PgRow) -> Result<Post, sqlx::Error> {
        let likes: Json<Vec<Like>> = row.try_get("likes")?;
        let images: Option<Json<Vec<String>>> = row.try_get("images")?;
        Ok(Post {
            id: row.try_get("id")?,
            author_id: row.try_get("author_id")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            is_anonymous: row.try_get("is_anonymous")?,
            author_name: row.try_get("author_name")?,
            author_image: row.try_get("author_image")?,
            likes: likes.0,
            like_count: row.try_get("like_count")?,
            images: images.map(|j| j.0),
            created_at: row.try_get("created_at")?,
        })
    }

    fn comment_from_row(row: &PgRow) -> Result<Comment, sqlx::Error> {
        let likes: Json<Vec<Like>> = row.try_get("likes")?;
        Ok(Comment {
            id: row.try_get("id")?,
            post_id: row.try_get("post_id")?,
            author_id: row.try_get("author_id")?,
            content: row.try_get("content")?,
            author_name: row.try_get("author_name")?,
            author_image: row.try_get("author_image")?,
            likes: likes.0,
            like_count: row.try_get("like_count")?,
            created_at: row.try_get("created_at")?,
        })
    }

    // Conditional pull-or-push of the like entry plus the counter delta,
    // expressed as a single statement so the check and the mutation
    // cannot interleave with a concurrent toggle on the same row.
    // RETURNING sees the post-update row, so `liked` and `like_count`
    // are the resulting state.
    const TOGGLE_LIKE_SQL: &str = r#"
        UPDATE {table} SET
            likes = CASE WHEN likes @> $2 THEN (
                SELECT COALESCE(jsonb_agg(e), '[]'::jsonb)
                FROM jsonb_array_elements(likes) AS e
                WHERE e->>'user_id' <> $3
            ) ELSE likes || $4 END,
            like_count = CASE WHEN likes @> $2 THEN like_count - 1 ELSE like_count + 1 END
        WHERE id = $1
        RETURNING likes @> $2 AS liked, like_count
    "#;

    async fn toggle_like_row(
        pool: &Pool<Postgres>,
        table: &str,
        id: Id,
        user_id: &str,
    ) -> RepoResult<LikeOutcome> {
        let probe = serde_json::json!([{ "user_id": user_id }]);
        let entry = vec![Like {
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        }];
        let row = sqlx::query(&TOGGLE_LIKE_SQL.replace("{table}", table))
            .bind(id)
            .bind(Json(probe))
            .bind(user_id)
            .bind(Json(entry))
            .fetch_optional(pool)
            .await
            .map_err(storage_err)?
            .ok_or(RepoError::NotFound)?;
        Ok(LikeOutcome {
            liked: row.try_get("liked").map_err(storage_err)?,
            like_count: row.try_get("like_count").map_err(storage_err)?,
        })
    }

    async fn snapshot_for(
        pool: &Pool<Postgres>,
        author_id: &str,
        anonymous: bool,
    ) -> RepoResult<(String, Option<String>)> {
        let user = match parse_id(author_id) {
            Some(id) => sqlx::query_as::<_, UserProfile>(
                "SELECT id, name, email, profile_image, created_at FROM users WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(storage_err)?,
            None => None,
        };
        Ok(author_snapshot(user.as_ref(), anonymous))
    }

    #[async_trait]
    impl UserDirectory for PgRepo {
        async fn create_user(&self, new: NewUser) -> RepoResult<UserProfile> {
            let user = UserProfile {
                id: Id::new_v4(),
                name: new.name,
                email: new.email,
                profile_image: None,
                created_at: Utc::now(),
            };
            sqlx::query(
                "INSERT INTO users (id, name, email, profile_image, created_at) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.profile_image)
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
            Ok(user)
        }

        async fn find_user(&self, user_id: &str) -> RepoResult<Option<UserProfile>> {
            let Some(id) = parse_id(user_id) else {
                return Ok(None);
            };
            sqlx::query_as::<_, UserProfile>(
                "SELECT id, name, email, profile_image, created_at FROM users WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)
        }

        async fn list_users(&self) -> RepoResult<Vec<UserProfile>> {
            sqlx::query_as::<_, UserProfile>(
                "SELECT id, name, email, profile_image, created_at FROM users \
                 ORDER BY created_at",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)
        }

        async fn update_profile_image(&self, user_id: &str, image_url: &str) -> RepoResult<()> {
            let id = parse_id(user_id).ok_or(RepoError::NotFound)?;
            let res = sqlx::query("UPDATE users SET profile_image = $2 WHERE id = $1")
                .bind(id)
                .bind(image_url)
                .execute(&self.pool)
                .await
                .map_err(storage_err)?;
            if res.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl PostRepo for PgRepo {
        async fn create_post(&self, new: NewPost) -> RepoResult<Post> {
            let (author_name, author_image) =
                snapshot_for(&self.pool, &new.author_id, new.is_anonymous).await?;
            let post = Post {
                id: Id::new_v4(),
                author_id: new.author_id,
                title: new.title,
                content: new.content,
                is_anonymous: new.is_anonymous,
                author_name,
                author_image,
                likes: Vec::new(),
                like_count: 0,
                images: new.images,
                created_at: Utc::now(),
            };
            sqlx::query(
                "INSERT INTO posts \
                 (id, author_id, title, content, is_anonymous, author_name, author_image, \
                  likes, like_count, images, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, '[]'::jsonb, 0, $8, $9)",
            )
            .bind(post.id)
            .bind(&post.author_id)
            .bind(&post.title)
            .bind(&post.content)
            .bind(post.is_anonymous)
            .bind(&post.author_name)
            .bind(&post.author_image)
            .bind(post.images.as_ref().map(|i| Json(i.clone())))
            .bind(post.created_at)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
            Ok(post)
        }

        async fn list_posts(&self, newest_first: bool) -> RepoResult<Vec<Post>> {
            // seq is a bigserial; it breaks created_at ties by insertion order.
            let sql = if newest_first {
                "SELECT * FROM posts ORDER BY created_at DESC, seq ASC"
            } else {
                "SELECT * FROM posts ORDER BY seq ASC"
            };
            let rows = sqlx::query(sql)
                .fetch_all(&self.pool)
                .await
                .map_err(storage_err)?;
            rows.iter()
                .map(|r| post_from_row(r).map_err(storage_err))
                .collect()
        }

        async fn toggle_post_like(&self, post_id: &str, user_id: &str) -> RepoResult<bool> {
            let id = parse_id(post_id).ok_or(RepoError::NotFound)?;
            let outcome = toggle_like_row(&self.pool, "posts", id, user_id).await?;
            Ok(outcome.liked)
        }

        async fn delete_post(&self, post_id: &str) -> RepoResult<()> {
            let Some(id) = parse_id(post_id) else {
                return Ok(());
            };
            sqlx::query("DELETE FROM posts WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(storage_err)?;
            Ok(())
        }
    }

    #[async_trait]
    impl CommentRepo for PgRepo {
        async fn create_comment(&self, new: NewComment) -> RepoResult<Comment> {
            let (author_name, author_image) =
                snapshot_for(&self.pool, &new.author_id, false).await?;
            let comment = Comment {
                id: Id::new_v4(),
                post_id: new.post_id,
                author_id: new.author_id,
                content: new.content,
                author_name,
                author_image,
                likes: Vec::new(),
                like_count: 0,
                created_at: Utc::now(),
            };
            sqlx::query(
                "INSERT INTO comments \
                 (id, post_id, author_id, content, author_name, author_image, \
                  likes, like_count, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, '[]'::jsonb, 0, $7)",
            )
            .bind(comment.id)
            .bind(&comment.post_id)
            .bind(&comment.author_id)
            .bind(&comment.content)
            .bind(&comment.author_name)
            .bind(&comment.author_image)
            .bind(comment.created_at)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
            Ok(comment)
        }

        async fn list_comments(&self, post_id: &str) -> RepoResult<Vec<Comment>> {
            let rows = sqlx::query(
                "SELECT * FROM comments WHERE post_id = $1 \
                 ORDER BY created_at DESC, seq ASC",
            )
            .bind(post_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
            rows.iter()
                .map(|r| comment_from_row(r).map_err(storage_err))
                .collect()
        }

        async fn count_comments(&self, post_id: &str) -> RepoResult<i64> {
            let row = sqlx::query("SELECT COUNT(*) AS n FROM comments WHERE post_id = $1")
                .bind(post_id)
                .fetch_one(&self.pool)
                .await
                .map_err(storage_err)?;
            row.try_get("n").map_err(storage_err)
        }

        async fn toggle_comment_like(
            &self,
            comment_id: &str,
            user_id: &str,
        ) -> RepoResult<LikeOutcome> {
            let id = parse_id(comment_id).ok_or(RepoError::NotFound)?;
            toggle_like_row(&self.pool, "comments", id, user_id).await
        }

        async fn comment_likes(&self, comment_id: &str) -> RepoResult<LikeSummary> {
            let empty = LikeSummary {
                like_count: 0,
                likes: Vec::new(),
            };
            let Some(id) = parse_id(comment_id) else {
                return Ok(empty);
            };
            let row = sqlx::query("SELECT likes, like_count FROM comments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_err)?;
            Ok(match row {
                Some(r) => {
                    let likes: Json<Vec<Like>> = r.try_get("likes").map_err(storage_err)?;
                    LikeSummary {
                        like_count: r.try_get("like_count").map_err(storage_err)?,
                        likes: likes.0,
                    }
                }
                None => empty,
            })
        }
    }

    #[async_trait]
    impl JournalRepo for PgRepo {
        async fn create_entry(&self, new: NewJournalEntry) -> RepoResult<JournalEntry> {
            let entry = JournalEntry {
                id: Id::new_v4(),
                user_id: new.user_id,
                title: new.title,
                content: new.content,
                created_at: Utc::now(),
            };
            sqlx::query(
                "INSERT INTO journal_entries (id, user_id, title, content, created_at) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(entry.id)
            .bind(&entry.user_id)
            .bind(&entry.title)
            .bind(&entry.content)
            .bind(entry.created_at)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
            Ok(entry)
        }

        async fn list_entries(&self, user_id: &str) -> RepoResult<Vec<JournalEntry>> {
            sqlx::query_as::<_, JournalEntry>(
                "SELECT id, user_id, title, content, created_at FROM journal_entries \
                 WHERE user_id = $1 ORDER BY created_at DESC",
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)
        }

        async fn update_entry(&self, entry_id: &str, upd: UpdateJournalEntry) -> RepoResult<()> {
            let id = parse_id(entry_id).ok_or(RepoError::NotFound)?;
            let res = sqlx::query(
                "UPDATE journal_entries SET \
                 title = COALESCE($2, title), content = COALESCE($3, content) \
                 WHERE id = $1",
            )
            .bind(id)
            .bind(upd.title)
            .bind(upd.content)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
            if res.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
            Ok(())
        }

        async fn delete_entry(&self, entry_id: &str) -> RepoResult<()> {
            let id = parse_id(entry_id).ok_or(RepoError::NotFound)?;
            let res = sqlx::query("DELETE FROM journal_entries WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(storage_err)?;
            if res.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl MoodLogRepo for PgRepo {
        async fn create_log(&self, new: NewMoodLog) -> RepoResult<MoodLog> {
            let log = MoodLog {
                id: Id::new_v4(),
                user_id: new.user_id,
                date: new.date,
                mood: new.mood,
                notes: new.notes,
                score: new.score,
                created_at: Utc::now(),
            };
            sqlx::query(
                "INSERT INTO mood_logs (id, user_id, date, mood, notes, score, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(log.id)
            .bind(&log.user_id)
            .bind(&log.date)
            .bind(&log.mood)
            .bind(&log.notes)
            .bind(log.score)
            .bind(log.created_at)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
            Ok(log)
        }

        async fn list_logs(&self, user_id: &str) -> RepoResult<Vec<MoodLog>> {
            sqlx::query_as::<_, MoodLog>(
                "SELECT id, user_id, date, mood, notes, score, created_at FROM mood_logs \
                 WHERE user_id = $1 ORDER BY created_at DESC",
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)
        }
    }
}
