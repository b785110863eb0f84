use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};

use actix_web::{HttpResponse, ResponseError, http::StatusCode, web};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    configuration::CommentSettings,
    domain::{CreateCommentPayload, NewComment, Thread, ThreadedComment, build_thread},
    realtime::CommentHub,
    repository::{AuthorDirectory, CommentStore, StoreError},
    utils,
};

#[derive(thiserror::Error)]
pub enum CommentError {
    #[error("{0}")]
    ValidationError(String),

    #[error("comment not found")]
    NotFound,

    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for CommentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        utils::error_chain_fmt(self, f)
    }
}

impl ResponseError for CommentError {
    fn error_response(&self) -> HttpResponse {
        let status_code = match self {
            CommentError::ValidationError(_) => StatusCode::BAD_REQUEST,
            CommentError::NotFound => StatusCode::NOT_FOUND,
            CommentError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        utils::build_error_response(status_code, self.to_string())
    }
}

impl From<StoreError> for CommentError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => CommentError::NotFound,
            StoreError::ParentNotFound | StoreError::ReplyTooDeep => {
                CommentError::ValidationError(e.to_string())
            }
            StoreError::Unexpected(e) => CommentError::UnexpectedError(e),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct CommentPathParams {
    pub id: Uuid,
}

/// Decorates a built thread with author names and avatars. A directory
/// failure leaves the comments undecorated.
pub async fn decorate_thread(
    thread: &Thread,
    authors: &dyn AuthorDirectory,
) -> Vec<ThreadedComment> {
    let profiles = match authors.fetch_profiles(&thread.author_ids()).await {
        Ok(profiles) => profiles,
        Err(e) => {
            tracing::warn!(error = ?e, "Failed to load author profiles");
            HashMap::new()
        }
    };

    thread.decorate(&profiles)
}

#[tracing::instrument(skip(store, authors, settings), fields(post_id=%path.id))]
pub async fn show_comments_for_post(
    path: web::Path<CommentPathParams>,
    store: web::Data<dyn CommentStore>,
    authors: web::Data<dyn AuthorDirectory>,
    settings: web::Data<CommentSettings>,
) -> Result<HttpResponse, CommentError> {
    let records = store.fetch_comments(path.id).await?;
    let thread = build_thread(records, settings.orphan_policy);
    let comments = decorate_thread(&thread, authors.get_ref()).await;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "comments": comments })))
}

#[tracing::instrument(skip(payload, store, hub), fields(post_id=%payload.post_id))]
pub async fn create_comment(
    payload: web::Json<CreateCommentPayload>,
    store: web::Data<dyn CommentStore>,
    hub: web::Data<CommentHub>,
) -> Result<HttpResponse, CommentError> {
    let comment: NewComment = payload
        .into_inner()
        .try_into()
        .map_err(CommentError::ValidationError)?;

    let record = store.create_comment(&comment).await?;

    let delivered = hub.publish(&record);
    tracing::info!(comment_id=%record.id, delivered, "Comment created");

    Ok(HttpResponse::Created().json(record))
}

#[tracing::instrument(skip(store), fields(comment_id=%path.id))]
pub async fn like_comment(
    path: web::Path<CommentPathParams>,
    store: web::Data<dyn CommentStore>,
) -> Result<HttpResponse, CommentError> {
    let record = store.like_comment(path.id).await?;
    Ok(HttpResponse::Ok().json(record))
}
