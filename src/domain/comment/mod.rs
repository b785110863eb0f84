mod comment_text;
mod new_comment;
mod types;

pub use comment_text::CommentText;
pub use new_comment::NewComment;
pub use types::*;
