use std::fmt::{self, Debug, Formatter};

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    domain::{CommentRecord, NewComment},
    utils,
};

/// How many replies deep a comment may sit; a root is at depth 0.
pub const MAX_REPLY_DEPTH: usize = 32;

#[derive(thiserror::Error)]
pub enum StoreError {
    #[error("comment not found")]
    NotFound,

    #[error("parent comment does not exist on this post")]
    ParentNotFound,

    #[error("replies cannot be nested more than {} levels deep", MAX_REPLY_DEPTH)]
    ReplyTooDeep,

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl Debug for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        utils::error_chain_fmt(self, f)
    }
}

/// Flat comment records, scoped by post.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// All comments of a post, newest first.
    async fn fetch_comments(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, StoreError>;

    async fn create_comment(&self, comment: &NewComment) -> Result<CommentRecord, StoreError>;

    async fn like_comment(&self, comment_id: Uuid) -> Result<CommentRecord, StoreError>;
}

pub struct PgCommentStore {
    pool: PgPool,
}

impl PgCommentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentStore for PgCommentStore {
    #[tracing::instrument(skip(self), fields(post_id=%post_id))]
    async fn fetch_comments(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, StoreError> {
        let rows = sqlx::query_as::<_, CommentRecord>(
            r#"
            SELECT id, text, author_id, created_at, parent_id, likes, post_id
            FROM comments
            WHERE post_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load comments for post")?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self, comment), fields(post_id=%comment.post_id, parent_id=?comment.parent_id))]
    async fn create_comment(&self, comment: &NewComment) -> Result<CommentRecord, StoreError> {
        if let Some(parent_id) = comment.parent_id {
            // Depth the reply would sit at; the walk stops one level past the limit.
            let depth = sqlx::query_scalar::<_, Option<i32>>(
                r#"
                WITH RECURSIVE ancestors AS (
                    SELECT id, parent_id, 1 AS depth
                    FROM comments
                    WHERE id = $1
                    AND post_id = $2
                    UNION ALL
                    SELECT c.id, c.parent_id, a.depth + 1
                    FROM comments c
                    JOIN ancestors a ON c.id = a.parent_id
                    WHERE a.depth <= $3
                )
                SELECT MAX(depth) FROM ancestors
                "#,
            )
            .bind(parent_id)
            .bind(comment.post_id)
            .bind(MAX_REPLY_DEPTH as i32)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check parent comment")?;

            match depth {
                None => return Err(StoreError::ParentNotFound),
                Some(depth) if depth as usize > MAX_REPLY_DEPTH => {
                    return Err(StoreError::ReplyTooDeep);
                }
                Some(_) => {}
            }
        }

        let record = sqlx::query_as::<_, CommentRecord>(
            r#"
            INSERT INTO comments (id, text, author_id, parent_id, post_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, text, author_id, created_at, parent_id, likes, post_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(comment.text.as_ref())
        .bind(comment.author_id)
        .bind(comment.parent_id)
        .bind(comment.post_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert comment")?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(comment_id=%comment_id))]
    async fn like_comment(&self, comment_id: Uuid) -> Result<CommentRecord, StoreError> {
        sqlx::query_as::<_, CommentRecord>(
            r#"
            UPDATE comments
            SET likes = likes + 1
            WHERE id = $1
            RETURNING id, text, author_id, created_at, parent_id, likes, post_id
            "#,
        )
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to like comment")?
        .ok_or(StoreError::NotFound)
    }
}
