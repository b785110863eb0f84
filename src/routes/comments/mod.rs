mod comment;
mod routes;
mod stream;

pub use comment::*;
pub use routes::*;
pub use stream::*;
