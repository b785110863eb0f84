use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    domain::{AuthorProfile, CommentRecord, NewComment},
    repository::{AuthorDirectory, CommentStore, MAX_REPLY_DEPTH, StoreError},
};

/// Process-local comment store for tests and `backend: memory`.
#[derive(Default)]
pub struct InMemoryCommentStore {
    comments: RwLock<Vec<CommentRecord>>,
}

impl InMemoryCommentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommentStore for InMemoryCommentStore {
    #[tracing::instrument(skip(self), fields(post_id=%post_id))]
    async fn fetch_comments(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, StoreError> {
        let comments = self.comments.read().await;
        let mut rows: Vec<_> = comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows)
    }

    #[tracing::instrument(skip(self, comment), fields(post_id=%comment.post_id, parent_id=?comment.parent_id))]
    async fn create_comment(&self, comment: &NewComment) -> Result<CommentRecord, StoreError> {
        let mut comments = self.comments.write().await;

        if let Some(parent_id) = comment.parent_id {
            match reply_depth(&comments, comment.post_id, parent_id) {
                None => return Err(StoreError::ParentNotFound),
                Some(depth) if depth > MAX_REPLY_DEPTH => return Err(StoreError::ReplyTooDeep),
                Some(_) => {}
            }
        }

        let record = CommentRecord {
            id: Uuid::new_v4(),
            text: comment.text.as_ref().to_string(),
            author_id: comment.author_id,
            created_at: Utc::now(),
            parent_id: comment.parent_id,
            likes: 0,
            post_id: comment.post_id,
        };
        comments.push(record.clone());

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(comment_id=%comment_id))]
    async fn like_comment(&self, comment_id: Uuid) -> Result<CommentRecord, StoreError> {
        let mut comments = self.comments.write().await;
        let comment = comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or(StoreError::NotFound)?;
        comment.likes += 1;
        Ok(comment.clone())
    }
}

/// Depth a reply to `parent_id` would sit at, or `None` when the parent is
/// not a comment of the post. Stops counting one level past the limit.
fn reply_depth(comments: &[CommentRecord], post_id: Uuid, parent_id: Uuid) -> Option<usize> {
    let mut ancestor = comments
        .iter()
        .find(|c| c.id == parent_id && c.post_id == post_id)?;
    let mut depth = 1;

    while let Some(next) = ancestor.parent_id {
        if depth > MAX_REPLY_DEPTH {
            break;
        }
        match comments.iter().find(|c| c.id == next) {
            Some(parent) => ancestor = parent,
            None => break,
        }
        depth += 1;
    }

    Some(depth)
}

#[derive(Default)]
pub struct InMemoryAuthorDirectory {
    profiles: RwLock<HashMap<Uuid, AuthorProfile>>,
}

impl InMemoryAuthorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, profile: AuthorProfile) {
        self.profiles.write().await.insert(profile.id, profile);
    }
}

#[async_trait]
impl AuthorDirectory for InMemoryAuthorDirectory {
    async fn fetch_profiles(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, AuthorProfile>, anyhow::Error> {
        let profiles = self.profiles.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| profiles.get(id).map(|p| (*id, p.clone())))
            .collect())
    }
}
