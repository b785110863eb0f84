use crate::domain::CommentText;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewComment {
    pub text: CommentText,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub parent_id: Option<Uuid>,
}

impl NewComment {
    pub fn new(
        text: String,
        post_id: String,
        author_id: String,
        parent_id: Option<String>,
    ) -> Result<Self, String> {
        let post_id = Uuid::parse_str(&post_id)
            .map_err(|_| "Invalid post_id: must be a valid UUID".to_string())?;

        let author_id = Uuid::parse_str(&author_id)
            .map_err(|_| "Invalid author_id: must be a valid UUID".to_string())?;

        let parent_id = parent_id
            .map(|id| Uuid::parse_str(&id))
            .transpose()
            .map_err(|_| "Invalid parent_id: must be a valid UUID".to_string())?;

        Ok(Self {
            text: CommentText::parse(text)?,
            post_id,
            author_id,
            parent_id,
        })
    }
}
