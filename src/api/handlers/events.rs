use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::api::response::{ApiError, AppQuery};
use crate::storage::models::{FileMetadata, Subject};
use crate::subscription::{Listener, Subscription};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FileEventsParams {
    /// Limit the feed to one subject; all of the user's files otherwise
    #[serde(default)]
    pub subject_id: Option<String>,
}

/// Live file list as Server-Sent Events: one `files` event per snapshot.
/// Route: GET /users/:user_id/events/files
pub async fn file_events(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    AppQuery(params): AppQuery<FileEventsParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let (listener, rx) = latest_snapshot::<FileMetadata>();

    let store = state.library.store();
    let subscription = match params.subject_id {
        Some(ref subject_id) => store.subscribe_to_files(&user_id, subject_id, listener)?,
        None => store.subscribe_to_all_user_files(&user_id, listener)?,
    };

    Ok(snapshot_stream("files", rx, subscription, state.shutdown.clone()))
}

/// Live subject list as Server-Sent Events: one `subjects` event per snapshot.
/// Route: GET /users/:user_id/events/subjects
pub async fn subject_events(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let (listener, rx) = latest_snapshot::<Subject>();

    let subscription = state
        .library
        .store()
        .subscribe_to_subjects(&user_id, listener)?;

    Ok(snapshot_stream("subjects", rx, subscription, state.shutdown.clone()))
}

/// A listener that keeps only the newest snapshot. A client that stops reading holds at most
/// one pending snapshot; older ones are replaced, not queued.
fn latest_snapshot<T>() -> (Listener<T>, watch::Receiver<Vec<T>>)
where
    T: Send + Sync + 'static,
{
    let (tx, rx) = watch::channel(Vec::new());
    let listener = Listener::new(move |items| {
        tx.send_replace(items);
    });
    (listener, rx)
}

/// The stream owns the subscription: when the client goes away the stream is dropped and
/// the subscription with it.
fn snapshot_stream<T>(
    name: &'static str,
    rx: watch::Receiver<Vec<T>>,
    subscription: Subscription,
    shutdown: CancellationToken,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    T: Serialize + Send + Sync + 'static,
{
    let stream = stream::unfold(
        (rx, subscription, shutdown),
        move |(mut rx, subscription, shutdown)| async move {
            let changed = tokio::select! {
                changed = rx.changed() => changed.is_ok(),
                _ = shutdown.cancelled() => false,
            };
            if !changed {
                return None;
            }

            let event = snapshot_event(name, &rx.borrow_and_update());
            Some((Ok(event), (rx, subscription, shutdown)))
        },
    );

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn snapshot_event<T: Serialize>(name: &'static str, items: &[T]) -> Event {
    Event::default()
        .event(name)
        .json_data(items)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}
