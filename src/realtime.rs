use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::domain::CommentRecord;

/// Per-post publish/subscribe for newly created comments.
///
/// A post's channel exists only while someone is subscribed to it.
#[derive(Clone)]
pub struct CommentHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    channels: Mutex<HashMap<Uuid, broadcast::Sender<CommentRecord>>>,
    capacity: usize,
}

impl HubInner {
    fn channels(&self) -> MutexGuard<'_, HashMap<Uuid, broadcast::Sender<CommentRecord>>> {
        // The map stays consistent even if a holder panicked.
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CommentHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                channels: Mutex::new(HashMap::new()),
                capacity: capacity.max(1),
            }),
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn subscribe(&self, post_id: Uuid) -> Subscription {
        let receiver = self
            .inner
            .channels()
            .entry(post_id)
            .or_insert_with(|| broadcast::channel(self.inner.capacity).0)
            .subscribe();

        Subscription {
            post_id,
            receiver: Some(receiver),
            hub: Arc::clone(&self.inner),
        }
    }

    /// Sends `record` to everyone subscribed to its post. Returns how many
    /// subscribers it reached.
    #[tracing::instrument(skip(self, record), fields(post_id=%record.post_id, comment_id=%record.id))]
    pub fn publish(&self, record: &CommentRecord) -> usize {
        let channels = self.inner.channels();
        match channels.get(&record.post_id) {
            Some(sender) => sender.send(record.clone()).unwrap_or(0),
            None => 0,
        }
    }

    pub fn subscriber_count(&self, post_id: Uuid) -> usize {
        self.inner
            .channels()
            .get(&post_id)
            .map_or(0, |sender| sender.receiver_count())
    }

    pub fn active_posts(&self) -> usize {
        self.inner.channels().len()
    }
}

#[derive(Debug, PartialEq)]
pub enum Delivery {
    Comment(CommentRecord),
    /// The subscriber fell behind and this many records were skipped.
    Lagged(u64),
    Closed,
}

/// A live registration on one post's channel. Dropping it unsubscribes.
pub struct Subscription {
    post_id: Uuid,
    receiver: Option<broadcast::Receiver<CommentRecord>>,
    hub: Arc<HubInner>,
}

impl Subscription {
    /// Waits for the next delivery. Cancel safe.
    pub async fn recv(&mut self) -> Delivery {
        let Some(receiver) = self.receiver.as_mut() else {
            return Delivery::Closed;
        };

        match receiver.recv().await {
            Ok(record) => Delivery::Comment(record),
            Err(RecvError::Lagged(missed)) => {
                tracing::warn!(post_id=%self.post_id, missed, "Comment subscriber lagged");
                Delivery::Lagged(missed)
            }
            Err(RecvError::Closed) => Delivery::Closed,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut channels = self.hub.channels();
        // Release the receiver while holding the lock so the count below is exact.
        drop(self.receiver.take());

        let unused = channels
            .get(&self.post_id)
            .is_some_and(|sender| sender.receiver_count() == 0);
        if unused {
            channels.remove(&self.post_id);
            tracing::debug!(post_id=%self.post_id, "Closed comment channel");
        }
    }
}
