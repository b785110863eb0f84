mod author;
mod comment;
mod memory;

use std::sync::Arc;

pub use author::*;
pub use comment::*;
pub use memory::*;

/// The stores the application reads and writes through.
#[derive(Clone)]
pub struct Repositories {
    pub comments: Arc<dyn CommentStore>,
    pub authors: Arc<dyn AuthorDirectory>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            comments: Arc::new(InMemoryCommentStore::new()),
            authors: Arc::new(InMemoryAuthorDirectory::new()),
        }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            comments: Arc::new(PgCommentStore::new(pool.clone())),
            authors: Arc::new(PgAuthorDirectory::new(pool)),
        }
    }
}
