use crate::helpers::{self, TestAuthor};
use devcircle::repository::MAX_REPLY_DEPTH;
use serde_json::Value;
use uuid::Uuid;

// ============================================================================
// Create Comment
// ============================================================================

#[tokio::test]
async fn create_comment_returns_201_for_valid_input() {
    let app = helpers::spawn_app().await;
    let post_id = Uuid::new_v4();

    let payload = serde_json::json!({
        "text": "This is a test comment",
        "post_id": post_id.to_string(),
        "author_id": app.test_author.id.to_string(),
    });

    let response = app.create_comment(&payload).await;
    assert_eq!(
        response.status().as_u16(),
        201,
        "Expected 201 Created for valid comment creation"
    );

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["post_id"], post_id.to_string());
    assert_eq!(body["author_id"], app.test_author.id.to_string());
    assert_eq!(body["text"], "This is a test comment");
    assert_eq!(body["likes"], 0);
    assert!(body["parent_id"].is_null());
}

#[tokio::test]
async fn create_comment_returns_400_for_invalid_input() {
    let app = helpers::spawn_app().await;
    let post_id = Uuid::new_v4().to_string();
    let author_id = app.test_author.id.to_string();

    let test_cases = vec![
        (
            serde_json::json!({ "text": "", "post_id": post_id, "author_id": author_id }),
            "empty text",
        ),
        (
            serde_json::json!({ "text": "   ", "post_id": post_id, "author_id": author_id }),
            "whitespace text",
        ),
        (
            serde_json::json!({ "text": "hi", "post_id": "not-a-uuid", "author_id": author_id }),
            "invalid post_id",
        ),
        (
            serde_json::json!({ "text": "hi", "post_id": post_id, "author_id": "someone" }),
            "invalid author_id",
        ),
        (
            serde_json::json!({ "text": "hi", "post_id": post_id, "author_id": author_id, "parent_id": "123" }),
            "invalid parent_id",
        ),
        (
            serde_json::json!({ "text": "a".repeat(1001), "post_id": post_id, "author_id": author_id }),
            "text too long",
        ),
    ];

    for (payload, description) in test_cases {
        let response = app.create_comment(&payload).await;
        assert_eq!(
            response.status().as_u16(),
            400,
            "Expected 400 when the payload has {description}"
        );
    }
}

#[tokio::test]
async fn create_comment_returns_400_for_unknown_parent() {
    let app = helpers::spawn_app().await;

    let payload = serde_json::json!({
        "text": "Replying into the void",
        "post_id": Uuid::new_v4().to_string(),
        "author_id": app.test_author.id.to_string(),
        "parent_id": Uuid::new_v4().to_string(),
    });

    let response = app.create_comment(&payload).await;
    assert_eq!(response.status().as_u16(), 400);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], 400);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn create_comment_rejects_a_parent_from_another_post() {
    let app = helpers::spawn_app().await;
    let first_post = Uuid::new_v4();
    let parent_id = app.post_comment(&first_post, "On the first post", None).await;

    let payload = serde_json::json!({
        "text": "Cross-post reply",
        "post_id": Uuid::new_v4().to_string(),
        "author_id": app.test_author.id.to_string(),
        "parent_id": parent_id.to_string(),
    });

    let response = app.create_comment(&payload).await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn create_comment_returns_400_for_a_reply_past_the_depth_limit() {
    let app = helpers::spawn_app().await;
    let post_id = Uuid::new_v4();

    let mut chain = vec![app.post_comment(&post_id, "Level 0", None).await];
    for level in 1..=MAX_REPLY_DEPTH {
        let parent = chain[level - 1];
        chain.push(
            app.post_comment(&post_id, &format!("Level {level}"), Some(&parent))
                .await,
        );
    }

    let payload = serde_json::json!({
        "text": "One level too deep",
        "post_id": post_id.to_string(),
        "author_id": app.test_author.id.to_string(),
        "parent_id": chain[MAX_REPLY_DEPTH].to_string(),
    });
    let response = app.create_comment(&payload).await;
    assert_eq!(response.status().as_u16(), 400);

    // The deepest allowed thread is still served in full.
    let body: Value = app.get_comments(&post_id).await.json().await.unwrap();
    let mut node = &body["comments"][0];
    for id in &chain[..MAX_REPLY_DEPTH] {
        assert_eq!(node["id"], id.to_string());
        node = &node["replies"][0];
    }
    assert_eq!(node["id"], chain[MAX_REPLY_DEPTH].to_string());
    assert_eq!(node["replies"].as_array().unwrap().len(), 0);
}

// ============================================================================
// Get Comments
// ============================================================================

#[tokio::test]
async fn get_comments_returns_empty_array_for_post_with_no_comments() {
    let app = helpers::spawn_app().await;

    let response = app.get_comments(&Uuid::new_v4()).await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert!(body["comments"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn get_comments_returns_replies_nested_under_their_parents() {
    let app = helpers::spawn_app().await;
    let post_id = Uuid::new_v4();

    let a = app.post_comment(&post_id, "Great article", None).await;
    let b = app.post_comment(&post_id, "Agreed", Some(&a)).await;
    let c = app.post_comment(&post_id, "Same here", Some(&b)).await;

    let response = app.get_comments(&post_id).await;
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    let comments = body["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1, "Only root comments are listed at the top");

    let root = &comments[0];
    assert_eq!(root["id"], a.to_string());
    assert_eq!(root["replies"][0]["id"], b.to_string());
    assert_eq!(root["replies"][0]["replies"][0]["id"], c.to_string());
    assert_eq!(root["replies"][0]["replies"][0]["parent_id"], b.to_string());
    assert!(
        root["replies"][0]["replies"][0]["replies"]
            .as_array()
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn get_comments_lists_newest_roots_first() {
    let app = helpers::spawn_app().await;
    let post_id = Uuid::new_v4();

    let mut created = Vec::new();
    for i in 0..3 {
        created.push(app.post_comment(&post_id, &format!("Comment {i}"), None).await);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let body: Value = app.get_comments(&post_id).await.json().await.unwrap();
    let ids: Vec<_> = body["comments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap().to_string())
        .collect();

    created.reverse();
    let expected: Vec<_> = created.iter().map(Uuid::to_string).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn get_comments_decorates_known_authors() {
    let app = helpers::spawn_app().await;
    let post_id = Uuid::new_v4();
    app.post_comment(&post_id, "From a known author", None).await;

    let stranger = TestAuthor::generate();
    let payload = serde_json::json!({
        "text": "From an author without a profile",
        "post_id": post_id.to_string(),
        "author_id": stranger.id.to_string(),
    });
    assert_eq!(app.create_comment(&payload).await.status().as_u16(), 201);

    let body: Value = app.get_comments(&post_id).await.json().await.unwrap();
    let comments = body["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 2);

    let known = comments
        .iter()
        .find(|c| c["author_id"] == app.test_author.id.to_string())
        .unwrap();
    assert_eq!(known["author_name"], app.test_author.name.as_str());
    assert_eq!(known["author_avatar_url"], app.test_author.avatar_url.as_str());

    let unknown = comments
        .iter()
        .find(|c| c["author_id"] == stranger.id.to_string())
        .unwrap();
    assert!(unknown["author_name"].is_null());
    assert!(unknown["author_avatar_url"].is_null());
}

#[tokio::test]
async fn get_comments_only_returns_comments_of_the_requested_post() {
    let app = helpers::spawn_app().await;
    let post_id = Uuid::new_v4();
    app.post_comment(&post_id, "Here", None).await;
    app.post_comment(&Uuid::new_v4(), "Elsewhere", None).await;

    let body: Value = app.get_comments(&post_id).await.json().await.unwrap();
    let comments = body["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["text"], "Here");
}

#[tokio::test]
async fn get_comments_returns_404_for_malformed_post_id() {
    let app = helpers::spawn_app().await;

    let response = app.send_get("v1/comment/get/posts/not-a-uuid").await;
    assert_eq!(response.status().as_u16(), 404);
}

// ============================================================================
// Like Comment
// ============================================================================

#[tokio::test]
async fn like_comment_increments_likes() {
    let app = helpers::spawn_app().await;
    let post_id = Uuid::new_v4();
    let id = app.post_comment(&post_id, "Like me", None).await;

    let response = app.like_comment(&id).await;
    assert_eq!(response.status().as_u16(), 200);
    let response = app.like_comment(&id).await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["likes"], 2);

    let body: Value = app.get_comments(&post_id).await.json().await.unwrap();
    assert_eq!(body["comments"][0]["likes"], 2);
}

#[tokio::test]
async fn like_comment_returns_404_for_unknown_comment() {
    let app = helpers::spawn_app().await;

    let response = app.like_comment(&Uuid::new_v4()).await;
    assert_eq!(response.status().as_u16(), 404);
}
