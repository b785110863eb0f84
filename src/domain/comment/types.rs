use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AuthorProfile, NewComment};

/// A comment as stored and as delivered over the real-time channel.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    pub id: Uuid,
    pub text: String,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub parent_id: Option<Uuid>,
    pub likes: i64,
    pub post_id: Uuid,
}

// For fetching comments as a thread - owns data
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ThreadedComment {
    pub id: Uuid,
    pub text: String,
    pub author_id: Uuid,
    pub author_name: Option<String>,
    pub author_avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub parent_id: Option<Uuid>,
    pub likes: i64,
    pub post_id: Uuid,
    pub replies: Vec<ThreadedComment>,
}

impl ThreadedComment {
    pub fn new(
        record: &CommentRecord,
        profiles: &HashMap<Uuid, AuthorProfile>,
        replies: Vec<ThreadedComment>,
    ) -> Self {
        let profile = profiles.get(&record.author_id);

        Self {
            id: record.id,
            text: record.text.clone(),
            author_id: record.author_id,
            author_name: profile.map(|p| p.name.clone()),
            author_avatar_url: profile.and_then(|p| p.avatar_url.clone()),
            created_at: record.created_at,
            parent_id: record.parent_id,
            likes: record.likes,
            post_id: record.post_id,
            replies,
        }
    }
}

impl Drop for ThreadedComment {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(mut comment) = pending.pop() {
            pending.append(&mut comment.replies);
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct CreateCommentPayload {
    pub text: String,
    pub post_id: String,
    pub author_id: String,
    pub parent_id: Option<String>,
}

impl TryFrom<CreateCommentPayload> for NewComment {
    type Error = String;

    fn try_from(value: CreateCommentPayload) -> Result<Self, Self::Error> {
        NewComment::new(value.text, value.post_id, value.author_id, value.parent_id)
    }
}
