// Run with: cargo fuzz run fuzz_comment_json
// Feeds arbitrary JSON through CreateCommentPayload -> NewComment validation.
#![no_main]

use devcircle::domain::{CreateCommentPayload, NewComment};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(payload) = serde_json::from_slice::<CreateCommentPayload>(data) {
        let _ = NewComment::try_from(payload);
    }
});
