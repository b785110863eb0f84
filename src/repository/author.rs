use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::AuthorProfile;

/// Display names and avatars, looked up after a thread is built.
#[async_trait]
pub trait AuthorDirectory: Send + Sync {
    /// Ids without a profile are absent from the returned map.
    async fn fetch_profiles(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, AuthorProfile>, anyhow::Error>;
}

pub struct PgAuthorDirectory {
    pool: PgPool,
}

impl PgAuthorDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorDirectory for PgAuthorDirectory {
    #[tracing::instrument(skip(self), fields(count = ids.len()))]
    async fn fetch_profiles(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, AuthorProfile>, anyhow::Error> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, AuthorProfile>(
            r#"
            SELECT id, user_name AS name, avatar_url
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load author profiles")?;

        Ok(rows.into_iter().map(|p| (p.id, p)).collect())
    }
}
