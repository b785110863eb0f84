use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display metadata attached to comments after a thread is built.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthorProfile {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
}
