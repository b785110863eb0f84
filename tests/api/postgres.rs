//! The same store-facing behaviour as `comment.rs`, against Postgres.

use crate::helpers::{self, TestAuthor};
use chrono::{Duration, Utc};
use devcircle::repository::MAX_REPLY_DEPTH;
use serde_json::Value;
use uuid::Uuid;

#[tokio::test]
async fn postgres_threads_are_nested_and_decorated() {
    let app = helpers::spawn_postgres_app().await;
    let post_id = Uuid::new_v4();

    let root = app.post_comment(&post_id, "Which allocator did you use?", None).await;
    let reply = app.post_comment(&post_id, "jemalloc", Some(&root)).await;

    // Authors without a profile may still comment.
    let stranger = TestAuthor::generate();
    let payload = serde_json::json!({
        "text": "mimalloc was faster for us",
        "post_id": post_id.to_string(),
        "author_id": stranger.id.to_string(),
        "parent_id": reply.to_string(),
    });
    let response = app.create_comment(&payload).await;
    assert_eq!(response.status().as_u16(), 201);
    let nested: Value = response.json().await.unwrap();

    let body: Value = app.get_comments(&post_id).await.json().await.unwrap();
    let comments = body["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);

    let root_node = &comments[0];
    assert_eq!(root_node["id"], root.to_string());
    assert_eq!(root_node["author_name"], app.test_author.name.as_str());
    assert_eq!(root_node["author_avatar_url"], app.test_author.avatar_url.as_str());

    let reply_node = &root_node["replies"][0];
    assert_eq!(reply_node["id"], reply.to_string());
    assert_eq!(reply_node["author_name"], app.test_author.name.as_str());

    let nested_node = &reply_node["replies"][0];
    assert_eq!(nested_node["id"], nested["id"]);
    assert!(nested_node["author_name"].is_null());
    assert!(nested_node["author_avatar_url"].is_null());
}

#[tokio::test]
async fn postgres_roots_are_newest_first_with_ties_broken_by_id() {
    let app = helpers::spawn_postgres_app().await;
    let post_id = Uuid::new_v4();
    let now = Utc::now();

    let older = Uuid::new_v4();
    let tied = [Uuid::new_v4(), Uuid::new_v4()];
    for (id, created_at) in [
        (older, now - Duration::minutes(5)),
        (tied[0], now),
        (tied[1], now),
    ] {
        sqlx::query(
            r#"
            INSERT INTO comments (id, post_id, author_id, text, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(post_id)
        .bind(app.test_author.id)
        .bind("Seeded comment")
        .bind(created_at)
        .execute(app.db_pool())
        .await
        .expect("Failed to seed comment");
    }

    let body: Value = app.get_comments(&post_id).await.json().await.unwrap();
    let ids: Vec<_> = body["comments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap().to_string())
        .collect();

    let (high, low) = if tied[0] > tied[1] {
        (tied[0], tied[1])
    } else {
        (tied[1], tied[0])
    };
    assert_eq!(
        ids,
        vec![high.to_string(), low.to_string(), older.to_string()]
    );
}

#[tokio::test]
async fn postgres_rejects_parents_outside_the_post() {
    let app = helpers::spawn_postgres_app().await;
    let post_id = Uuid::new_v4();
    let elsewhere = app.post_comment(&Uuid::new_v4(), "Other post", None).await;

    for parent_id in [elsewhere, Uuid::new_v4()] {
        let payload = serde_json::json!({
            "text": "Reply",
            "post_id": post_id.to_string(),
            "author_id": app.test_author.id.to_string(),
            "parent_id": parent_id.to_string(),
        });
        let response = app.create_comment(&payload).await;
        assert_eq!(response.status().as_u16(), 400);
    }
}

#[tokio::test]
async fn postgres_rejects_replies_nested_past_the_depth_limit() {
    let app = helpers::spawn_postgres_app().await;
    let post_id = Uuid::new_v4();

    let mut parent = app.post_comment(&post_id, "Level 0", None).await;
    for level in 1..=MAX_REPLY_DEPTH {
        parent = app
            .post_comment(&post_id, &format!("Level {level}"), Some(&parent))
            .await;
    }

    let payload = serde_json::json!({
        "text": "One level too deep",
        "post_id": post_id.to_string(),
        "author_id": app.test_author.id.to_string(),
        "parent_id": parent.to_string(),
    });
    let response = app.create_comment(&payload).await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app.get_comments(&post_id).await;
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn postgres_counts_likes_and_reports_unknown_comments() {
    let app = helpers::spawn_postgres_app().await;
    let comment_id = app.post_comment(&Uuid::new_v4(), "Like me", None).await;

    app.like_comment(&comment_id).await;
    let response = app.like_comment(&comment_id).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["likes"], 2);

    let response = app.like_comment(&Uuid::new_v4()).await;
    assert_eq!(response.status().as_u16(), 404);
}
