use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::{
    configuration::CommentSettings,
    domain::{CommentRecord, PatchOutcome, Thread, build_thread, patch_thread},
    realtime::{CommentHub, Delivery, Subscription},
    repository::{CommentStore, StoreError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewUpdate {
    Patched,
    Unchanged,
    Refreshed,
    Closed,
}

const REFETCH_RETRY_DELAY: Duration = Duration::from_secs(1);

/// One post's comment thread, kept current from the real-time channel.
///
/// The view subscribes before its first fetch, so a comment created in
/// between is delivered rather than lost; deliveries already present in
/// the thread are ignored.
pub struct ThreadView {
    post_id: Uuid,
    thread: Thread,
    known: HashSet<Uuid>,
    /// Deliveries were skipped and the thread must be refetched.
    stale: bool,
    refetch_failed: bool,
    pending: VecDeque<CommentRecord>,
    settings: CommentSettings,
    store: Arc<dyn CommentStore>,
    subscription: Subscription,
}

impl ThreadView {
    #[tracing::instrument(skip(store, hub, settings))]
    pub async fn open(
        store: Arc<dyn CommentStore>,
        hub: &CommentHub,
        post_id: Uuid,
        settings: CommentSettings,
    ) -> Result<Self, StoreError> {
        let subscription = hub.subscribe(post_id);
        let mut view = Self {
            post_id,
            thread: Thread::default(),
            known: HashSet::new(),
            stale: false,
            refetch_failed: false,
            pending: VecDeque::new(),
            settings,
            store,
            subscription,
        };
        view.refresh().await?;
        Ok(view)
    }

    pub fn thread(&self) -> &Thread {
        &self.thread
    }

    pub fn pending_orphans(&self) -> usize {
        self.pending.len()
    }

    /// Refetches the post's comments and rebuilds the thread.
    #[tracing::instrument(skip(self), fields(post_id=%self.post_id))]
    pub async fn refresh(&mut self) -> Result<(), StoreError> {
        let records = self.store.fetch_comments(self.post_id).await?;

        self.known = records.iter().map(|r| r.id).collect();
        self.thread = build_thread(records, self.settings.orphan_policy);

        let known = &self.known;
        self.pending.retain(|r| !known.contains(&r.id));
        self.retry_pending();
        Ok(())
    }

    /// Applies one delivered record.
    pub fn apply(&mut self, record: CommentRecord) -> ViewUpdate {
        if record.post_id != self.post_id || self.known.contains(&record.id) {
            return ViewUpdate::Unchanged;
        }

        let id = record.id;
        match patch_thread(&self.thread, record) {
            PatchOutcome::Attached(thread) => {
                self.thread = thread;
                self.known.insert(id);
                self.retry_pending();
                ViewUpdate::Patched
            }
            PatchOutcome::Orphaned(record) => {
                self.hold_orphan(record);
                ViewUpdate::Unchanged
            }
        }
    }

    /// Waits for the next delivery and applies it.
    ///
    /// Cancel safe. Once the channel reports skipped deliveries the view is
    /// marked stale, and every call refetches before reading the channel
    /// again, so dropping this future mid-refetch loses nothing. A failed
    /// refetch is logged and reported as `Unchanged`; the next call retries
    /// it after a short delay.
    pub async fn next_update(&mut self) -> ViewUpdate {
        if !self.stale {
            match self.subscription.recv().await {
                Delivery::Comment(record) => return self.apply(record),
                Delivery::Lagged(_) => self.stale = true,
                Delivery::Closed => return ViewUpdate::Closed,
            }
        }

        self.catch_up().await
    }

    async fn catch_up(&mut self) -> ViewUpdate {
        if self.refetch_failed {
            tokio::time::sleep(REFETCH_RETRY_DELAY).await;
        }

        match self.refresh().await {
            Ok(()) => {
                self.stale = false;
                self.refetch_failed = false;
                ViewUpdate::Refreshed
            }
            Err(e) => {
                tracing::error!(error=?e, post_id=%self.post_id, "Failed to refetch lagged thread");
                self.refetch_failed = true;
                ViewUpdate::Unchanged
            }
        }
    }

    fn hold_orphan(&mut self, record: CommentRecord) {
        if !self.settings.buffer_orphans || self.settings.max_pending_orphans == 0 {
            tracing::debug!(comment_id=%record.id, parent_id=?record.parent_id, "Dropped reply to unknown comment");
            return;
        }

        if self.pending.iter().any(|r| r.id == record.id) {
            return;
        }
        if self.pending.len() >= self.settings.max_pending_orphans {
            if let Some(evicted) = self.pending.pop_front() {
                tracing::debug!(comment_id=%evicted.id, "Evicted oldest pending reply");
            }
        }
        self.pending.push_back(record);
    }

    fn retry_pending(&mut self) {
        loop {
            let mut attached_any = false;
            for record in std::mem::take(&mut self.pending) {
                if self.known.contains(&record.id) {
                    continue;
                }
                let id = record.id;
                match patch_thread(&self.thread, record) {
                    PatchOutcome::Attached(thread) => {
                        self.thread = thread;
                        self.known.insert(id);
                        attached_any = true;
                    }
                    PatchOutcome::Orphaned(record) => self.pending.push_back(record),
                }
            }
            if !attached_any {
                break;
            }
        }
    }
}
