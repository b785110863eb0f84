mod author;
mod comment;
mod thread;

pub use author::*;
pub use comment::*;
pub use thread::*;
