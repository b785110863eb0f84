// Run with: cargo fuzz run fuzz_comment_thread
// Arbitrary parent links (duplicates, self references, cycles, orphans) must
// never hang the builder, and the patcher must never lose or invent records.
#![no_main]

use arbitrary::Arbitrary;
use chrono::Utc;
use devcircle::domain::{CommentRecord, OrphanPolicy, PatchOutcome, build_thread, patch_thread};
use libfuzzer_sys::fuzz_target;
use uuid::Uuid;

#[derive(Arbitrary, Debug)]
struct Input {
    promote_orphans: bool,
    fetched: Vec<(u8, Option<u8>)>,
    delivered: Vec<(u8, Option<u8>)>,
}

fn record((id, parent): (u8, Option<u8>)) -> CommentRecord {
    CommentRecord {
        id: Uuid::from_u128(id as u128),
        text: "fuzz".into(),
        author_id: Uuid::nil(),
        created_at: Utc::now(),
        parent_id: parent.map(|p| Uuid::from_u128(p as u128)),
        likes: 0,
        post_id: Uuid::nil(),
    }
}

fuzz_target!(|input: Input| {
    let policy = if input.promote_orphans {
        OrphanPolicy::Promote
    } else {
        OrphanPolicy::Drop
    };

    let fetched: Vec<_> = input.fetched.into_iter().map(record).collect();
    let mut thread = build_thread(fetched.clone(), policy);
    assert!(thread.flatten().len() <= fetched.len());

    for pair in input.delivered {
        let before = thread.flatten().len();
        thread = match patch_thread(&thread, record(pair)) {
            PatchOutcome::Attached(next) => {
                assert_eq!(next.flatten().len(), before + 1);
                next
            }
            PatchOutcome::Orphaned(_) => thread,
        };
    }
});
