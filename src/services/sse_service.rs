use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;
use uuid::Uuid;

use crate::{
    dto::sse::ServerEvent,
    error::ServiceError,
    services::{leaderboard_service, session_service, sse_events},
    state::SharedState,
};

/// Identifies the target SSE stream for hub selection and logging.
#[derive(Clone, Copy)]
pub enum StreamKind {
    Public,
    Admin,
}

impl StreamKind {
    fn label(self) -> &'static str {
        match self {
            StreamKind::Public => "public",
            StreamKind::Admin => "admin",
        }
    }
}

/// Open one of a room's event streams.
///
/// The subscriber immediately receives a handshake, the current
/// session snapshot, and the current standings, then every room event
/// broadcast after that.
pub async fn room_stream(
    state: &SharedState,
    room_id: Uuid,
    kind: StreamKind,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + use<>>, ServiceError> {
    let room = state.room(room_id)?;
    let receiver = match kind {
        StreamKind::Public => room.channels().public().subscribe(),
        StreamKind::Admin => room.channels().admin().subscribe(),
    };

    let mut initial = Vec::with_capacity(3);
    initial.extend(sse_events::handshake_event(kind.label(), room_id));
    let snapshot = session_service::session_snapshot(state, room_id).await?;
    initial.extend(sse_events::session_event(snapshot));
    let leaderboard = leaderboard_service::read_leaderboard(state, room_id).await?;
    initial.extend(sse_events::standings_event(leaderboard.standings));

    Ok(to_sse_stream(receiver, initial, kind))
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// cleaning up once the client disconnects.
fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    initial: Vec<ServerEvent>,
    kind: StreamKind,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: catch-up events first, then the broadcast feed
    tokio::spawn(async move {
        for payload in initial {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Skip lagged messages but keep the stream alive.
                            continue;
                        }
                    }
                }
            }
        }

        info!(stream = kind.label(), "SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}
