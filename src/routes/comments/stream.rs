use std::sync::Arc;
use std::time::Duration;

use actix_web::{HttpResponse, web};
use futures::{Stream, stream};
use serde::Serialize;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

use crate::{
    configuration::CommentSettings,
    realtime::{CommentHub, Delivery},
    repository::{AuthorDirectory, CommentStore},
    routes::{CommentError, CommentPathParams, decorate_thread},
    startup::SseSettings,
    thread_view::{ThreadView, ViewUpdate},
};

const KEEP_ALIVE_FRAME: &[u8] = b": keep-alive\n\n";

fn event_frame<T: Serialize>(event: &str, data: &T) -> Result<web::Bytes, serde_json::Error> {
    let data = serde_json::to_string(data)?;
    Ok(web::Bytes::from(format!("event: {event}\ndata: {data}\n\n")))
}

fn keep_alive_timer(period: Duration) -> Interval {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

fn event_stream<S>(body: S) -> HttpResponse
where
    S: Stream<Item = Result<web::Bytes, serde_json::Error>> + 'static,
{
    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(body)
}

/// Server-sent events carrying every comment created on a post, as flat
/// records. The subscription lives as long as the client stays connected.
#[tracing::instrument(skip(hub, sse), fields(post_id=%path.id))]
pub async fn stream_comments(
    path: web::Path<CommentPathParams>,
    hub: web::Data<CommentHub>,
    sse: web::Data<SseSettings>,
) -> HttpResponse {
    let subscription = hub.subscribe(path.id);
    let keep_alive = keep_alive_timer(sse.keep_alive);

    let body = stream::unfold(
        (subscription, keep_alive),
        |(mut subscription, mut keep_alive)| async move {
            let frame = tokio::select! {
                delivery = subscription.recv() => match delivery {
                    Delivery::Comment(record) => event_frame("comment", &record),
                    Delivery::Lagged(missed) => {
                        event_frame("lagged", &serde_json::json!({ "missed": missed }))
                    }
                    Delivery::Closed => return None,
                },
                _ = keep_alive.tick() => Ok(web::Bytes::from_static(KEEP_ALIVE_FRAME)),
            };
            Some((frame, (subscription, keep_alive)))
        },
    );

    event_stream(body)
}

struct LiveThread {
    view: ThreadView,
    authors: Arc<dyn AuthorDirectory>,
    keep_alive: Interval,
    snapshot_due: bool,
}

/// Server-sent events carrying the whole decorated thread of a post: once
/// on connect, then after every change.
#[tracing::instrument(skip(store, authors, hub, settings, sse), fields(post_id=%path.id))]
pub async fn live_thread(
    path: web::Path<CommentPathParams>,
    store: web::Data<dyn CommentStore>,
    authors: web::Data<dyn AuthorDirectory>,
    hub: web::Data<CommentHub>,
    settings: web::Data<CommentSettings>,
    sse: web::Data<SseSettings>,
) -> Result<HttpResponse, CommentError> {
    let view = ThreadView::open(
        store.into_inner(),
        &hub,
        path.id,
        settings.get_ref().clone(),
    )
    .await?;

    let state = LiveThread {
        view,
        authors: authors.into_inner(),
        keep_alive: keep_alive_timer(sse.keep_alive),
        snapshot_due: true,
    };

    let body = stream::unfold(state, |mut state| async move {
        if !state.snapshot_due {
            loop {
                tokio::select! {
                    update = state.view.next_update() => match update {
                        ViewUpdate::Patched | ViewUpdate::Refreshed => break,
                        ViewUpdate::Unchanged => continue,
                        ViewUpdate::Closed => return None,
                    },
                    _ = state.keep_alive.tick() => {
                        return Some((Ok(web::Bytes::from_static(KEEP_ALIVE_FRAME)), state));
                    }
                }
            }
        }

        state.snapshot_due = false;
        let comments = decorate_thread(state.view.thread(), state.authors.as_ref()).await;
        let frame = event_frame("thread", &serde_json::json!({ "comments": comments }));
        Some((frame, state))
    });

    Ok(event_stream(body))
}
