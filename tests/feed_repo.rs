#![cfg(feature = "inmem-store")]

use haven::models::*;
use haven::repo::inmem::InMemRepo;
use haven::repo::RepoError;
// Bring trait method namespaces into scope so calls on InMemRepo resolve.
use haven::repo::{CommentRepo, JournalRepo, MoodLogRepo, PostRepo, UserDirectory};
use serial_test::serial;

/// Fresh, empty repository with an isolated snapshot dir per test run.
fn repo() -> InMemRepo {
    // isolate state: do **not** persist to the default file path
    std::env::set_var("HAVEN_DATA_DIR", tempfile::tempdir().unwrap().path());
    InMemRepo::new()
}

fn post_req(author_id: &str, title: &str, anonymous: bool) -> NewPost {
    NewPost {
        author_id: author_id.into(),
        title: title.into(),
        content: "body".into(),
        is_anonymous: anonymous,
        images: None,
    }
}

#[tokio::test]
#[serial]
async fn toggle_like_pair_restores_count() {
    let r = repo();
    let post = r.create_post(post_req("ghost", "t", false)).await.unwrap();
    let id = post.id.to_string();

    assert!(r.toggle_post_like(&id, "u2").await.unwrap());
    let posts = r.list_posts(true).await.unwrap();
    assert_eq!(posts[0].like_count, 1);
    assert_eq!(posts[0].likes.len(), 1);
    assert_eq!(posts[0].likes[0].user_id, "u2");

    assert!(!r.toggle_post_like(&id, "u2").await.unwrap());
    let posts = r.list_posts(true).await.unwrap();
    assert_eq!(posts[0].like_count, 0);
    assert!(posts[0].likes.is_empty());
}

#[tokio::test]
#[serial]
async fn like_count_always_matches_like_set() {
    let r = repo();
    let post = r.create_post(post_req("ghost", "t", false)).await.unwrap();
    let id = post.id.to_string();

    let sequence = ["a", "b", "a", "c", "b", "c", "a", "d"];
    for user in sequence {
        r.toggle_post_like(&id, user).await.unwrap();
        let posts = r.list_posts(false).await.unwrap();
        assert_eq!(posts[0].like_count, posts[0].likes.len() as i64);
    }
    // a, b, c toggled twice; only d remains
    let posts = r.list_posts(false).await.unwrap();
    assert_eq!(posts[0].like_count, 1);
    assert_eq!(posts[0].likes[0].user_id, "d");
}

#[tokio::test]
#[serial]
async fn toggle_like_unknown_post_is_not_found() {
    let r = repo();
    let missing = uuid::Uuid::new_v4().to_string();
    assert!(matches!(
        r.toggle_post_like(&missing, "u1").await.unwrap_err(),
        RepoError::NotFound
    ));
    // malformed ids cannot name a post either
    assert!(matches!(
        r.toggle_post_like("deadbeef", "u1").await.unwrap_err(),
        RepoError::NotFound
    ));
}

#[tokio::test]
#[serial]
async fn anonymous_post_masks_author_snapshot() {
    let r = repo();
    let alice = r
        .create_user(NewUser {
            name: "Alice".into(),
            email: "alice@example.com".into(),
        })
        .await
        .unwrap();
    r.update_profile_image(&alice.id.to_string(), "https://cdn.example.com/alice.png")
        .await
        .unwrap();

    let anon = r
        .create_post(post_req(&alice.id.to_string(), "hidden", true))
        .await
        .unwrap();
    assert_eq!(anon.author_name, ANONYMOUS_NAME);
    assert!(anon.author_image.is_none());
    assert_eq!(anon.author_id, alice.id.to_string());

    let open = r
        .create_post(post_req(&alice.id.to_string(), "visible", false))
        .await
        .unwrap();
    assert_eq!(open.author_name, "Alice");
    assert_eq!(
        open.author_image.as_deref(),
        Some("https://cdn.example.com/alice.png")
    );
}

#[tokio::test]
#[serial]
async fn unresolved_author_keeps_raw_id_and_falls_back() {
    let r = repo();
    let post = r.create_post(post_req("ghost", "t", false)).await.unwrap();
    assert_eq!(post.author_id, "ghost");
    assert_eq!(post.author_name, ANONYMOUS_NAME);
    assert!(post.author_image.is_none());
}

#[tokio::test]
#[serial]
async fn author_snapshot_is_frozen_at_creation() {
    let r = repo();
    let alice = r
        .create_user(NewUser {
            name: "Alice".into(),
            email: "alice@example.com".into(),
        })
        .await
        .unwrap();
    let post = r
        .create_post(post_req(&alice.id.to_string(), "t", false))
        .await
        .unwrap();
    let before = post.author_image.clone();

    r.update_profile_image(&alice.id.to_string(), "https://cdn.example.com/new.png")
        .await
        .unwrap();

    let posts = r.list_posts(true).await.unwrap();
    assert_eq!(posts[0].author_image, before);
    assert_eq!(posts[0].author_name, "Alice");
    // the directory itself sees the new image
    let fresh = r.find_user(&alice.id.to_string()).await.unwrap().unwrap();
    assert_eq!(
        fresh.profile_image.as_deref(),
        Some("https://cdn.example.com/new.png")
    );
}

#[tokio::test]
#[serial]
async fn feed_lists_newest_first() {
    let r = repo();
    let first = r.create_post(post_req("u", "first", false)).await.unwrap();
    let second = r.create_post(post_req("u", "second", false)).await.unwrap();
    let third = r.create_post(post_req("u", "third", false)).await.unwrap();

    let posts = r.list_posts(true).await.unwrap();
    assert_eq!(posts.len(), 3);
    for pair in posts.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }
    let ids: Vec<_> = posts.iter().map(|p| p.id).collect();
    assert!(ids.contains(&first.id) && ids.contains(&second.id) && ids.contains(&third.id));
    assert_eq!(posts[0].id, third.id);
}

#[tokio::test]
#[serial]
async fn equal_timestamps_keep_insertion_order() {
    // Seed a snapshot whose two posts share a created_at, then check the
    // stable sort leaves them in insertion order.
    let tmp = tempfile::tempdir().unwrap();
    std::env::set_var("HAVEN_DATA_DIR", tmp.path());

    let a = uuid::Uuid::new_v4();
    let b = uuid::Uuid::new_v4();
    let post = |id: uuid::Uuid, title: &str| {
        serde_json::json!({
            "id": id,
            "author_id": "u",
            "title": title,
            "content": "body",
            "is_anonymous": false,
            "author_name": "Anonymous",
            "author_image": null,
            "likes": [],
            "like_count": 0,
            "created_at": "2026-01-01T00:00:00Z"
        })
    };
    let state = serde_json::json!({
        "users": {},
        "posts": [post(a, "first"), post(b, "second")],
        "comments": [],
        "journal_entries": {},
        "mood_logs": {}
    });
    std::fs::write(
        tmp.path().join("state.json"),
        serde_json::to_vec_pretty(&state).unwrap(),
    )
    .unwrap();

    let r = InMemRepo::new();
    let posts = r.list_posts(true).await.unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].id, a);
    assert_eq!(posts[1].id, b);
    drop(tmp);
}

#[tokio::test]
#[serial]
async fn delete_post_is_idempotent_and_orphans_comments() {
    let r = repo();
    let post = r.create_post(post_req("u", "t", false)).await.unwrap();
    let pid = post.id.to_string();
    r.create_comment(NewComment {
        post_id: pid.clone(),
        author_id: "u2".into(),
        content: "nice".into(),
    })
    .await
    .unwrap();

    r.delete_post(&pid).await.unwrap();
    assert!(r.list_posts(true).await.unwrap().is_empty());
    // orphaned comment survives
    assert_eq!(r.count_comments(&pid).await.unwrap(), 1);

    // repeat delete and malformed id are both no-ops
    r.delete_post(&pid).await.unwrap();
    r.delete_post("not-a-uuid").await.unwrap();
}

#[tokio::test]
#[serial]
async fn comment_may_reference_missing_post() {
    let r = repo();
    let c = r
        .create_comment(NewComment {
            post_id: "deadbeef".into(),
            author_id: "u1".into(),
            content: "lost".into(),
        })
        .await
        .unwrap();
    assert_eq!(c.post_id, "deadbeef");
    assert_eq!(r.count_comments("deadbeef").await.unwrap(), 1);
    assert_eq!(r.list_comments("deadbeef").await.unwrap()[0].id, c.id);
}

#[tokio::test]
#[serial]
async fn comments_list_newest_first() {
    let r = repo();
    let early = r
        .create_comment(NewComment {
            post_id: "p".into(),
            author_id: "u".into(),
            content: "one".into(),
        })
        .await
        .unwrap();
    let late = r
        .create_comment(NewComment {
            post_id: "p".into(),
            author_id: "u".into(),
            content: "two".into(),
        })
        .await
        .unwrap();

    let list = r.list_comments("p").await.unwrap();
    assert_eq!(list.len(), 2);
    assert!(list[0].created_at >= list[1].created_at);
    assert_eq!(list[0].id, late.id);
    assert_eq!(list[1].id, early.id);
}

#[tokio::test]
#[serial]
async fn comment_like_returns_post_mutation_count() {
    let r = repo();
    let c = r
        .create_comment(NewComment {
            post_id: "p".into(),
            author_id: "u".into(),
            content: "c".into(),
        })
        .await
        .unwrap();
    let cid = c.id.to_string();

    let first = r.toggle_comment_like(&cid, "u1").await.unwrap();
    assert!(first.liked);
    assert_eq!(first.like_count, 1);

    let second = r.toggle_comment_like(&cid, "u2").await.unwrap();
    assert!(second.liked);
    assert_eq!(second.like_count, 2);

    let undo = r.toggle_comment_like(&cid, "u1").await.unwrap();
    assert!(!undo.liked);
    assert_eq!(undo.like_count, 1);

    let summary = r.comment_likes(&cid).await.unwrap();
    assert_eq!(summary.like_count, 1);
    assert_eq!(summary.likes.len(), 1);
    assert_eq!(summary.likes[0].user_id, "u2");

    // unknown id projects the empty state rather than failing
    let missing = r.comment_likes("deadbeef").await.unwrap();
    assert_eq!(missing.like_count, 0);
    assert!(missing.likes.is_empty());

    assert!(matches!(
        r.toggle_comment_like(&uuid::Uuid::new_v4().to_string(), "u1")
            .await
            .unwrap_err(),
        RepoError::NotFound
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn concurrent_toggles_do_not_lose_updates() {
    let r = repo();
    let post = r.create_post(post_req("u", "hot", false)).await.unwrap();
    let pid = post.id.to_string();

    let mut handles = Vec::new();
    for i in 0..8 {
        let r = r.clone();
        let pid = pid.clone();
        handles.push(tokio::spawn(async move {
            r.toggle_post_like(&pid, &format!("user-{i}")).await.unwrap()
        }));
    }
    for h in handles {
        assert!(h.await.unwrap());
    }

    let posts = r.list_posts(true).await.unwrap();
    assert_eq!(posts[0].like_count, 8);
    assert_eq!(posts[0].likes.len(), 8);
}

#[tokio::test]
#[serial]
async fn journal_crud_flow() {
    let r = repo();
    let first = r
        .create_entry(NewJournalEntry {
            user_id: "u1".into(),
            title: "Untitled Entry".into(),
            content: "day one".into(),
        })
        .await
        .unwrap();
    let second = r
        .create_entry(NewJournalEntry {
            user_id: "u1".into(),
            title: "Better day".into(),
            content: "day two".into(),
        })
        .await
        .unwrap();

    let entries = r.list_entries("u1").await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id, second.id);

    r.update_entry(
        &first.id.to_string(),
        UpdateJournalEntry {
            title: Some("Renamed".into()),
            content: None,
        },
    )
    .await
    .unwrap();
    let entries = r.list_entries("u1").await.unwrap();
    let renamed = entries.iter().find(|e| e.id == first.id).unwrap();
    assert_eq!(renamed.title, "Renamed");
    assert_eq!(renamed.content, "day one");

    r.delete_entry(&first.id.to_string()).await.unwrap();
    assert!(matches!(
        r.delete_entry(&first.id.to_string()).await.unwrap_err(),
        RepoError::NotFound
    ));
    assert_eq!(r.list_entries("u1").await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
async fn mood_logs_per_user() {
    let r = repo();
    r.create_log(NewMoodLog {
        user_id: "u1".into(),
        date: "2026-08-01".into(),
        mood: "calm".into(),
        notes: String::new(),
        score: Some(7.0),
    })
    .await
    .unwrap();
    r.create_log(NewMoodLog {
        user_id: "u2".into(),
        date: "2026-08-01".into(),
        mood: "tired".into(),
        notes: "late night".into(),
        score: None,
    })
    .await
    .unwrap();

    let logs = r.list_logs("u1").await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].mood, "calm");
    assert_eq!(logs[0].score, Some(7.0));
}
