//! Long-lived execution event channel.
//!
//! The job engine pushes progress over a WebSocket at `/ws?clientId=...`.
//! An [`ExecutionChannel`] owns at most one such session at a time, decodes
//! its messages into [`ExecutionEvent`]s and fans them out to subscribers in
//! arrival order.

mod message;
mod state;

use std::fmt;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use comfyx_core::ExecutionEvent;
use futures_util::future;
use futures_util::{Stream, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

pub use self::state::ChannelState;
use self::message::parse_envelope;
use crate::{Error, Result, TRACING_TARGET_CHANNEL};

/// Upper bound for the close handshake.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(3);

/// Extra time granted to the receive task after the handshake bound.
const CLOSE_SLACK: Duration = Duration::from_millis(500);

/// Query parameter carrying the client id.
const CLIENT_ID_PARAM: &str = "clientId";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A running receive task and the means to stop it.
struct Session {
    generation: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct ChannelInner {
    client_id: String,
    events: broadcast::Sender<ExecutionEvent>,
    state: watch::Sender<ChannelState>,
    /// Bumped by every connect and disconnect; a session or state change
    /// tagged with an older value is stale.
    generation: AtomicU64,
    session: Mutex<Option<Session>>,
}

impl ChannelInner {
    fn session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Starts a new generation; the caller holds the session lock.
    fn advance(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Applies `state` unless a newer connect or disconnect has started.
    fn transition(&self, generation: u64, state: ChannelState) {
        let _session = self.session();
        if self.current() == generation {
            self.state.send_replace(state);
        }
    }

    /// Clears a session that ended on its own (remote close, transport error).
    fn finish(&self, generation: u64) {
        let mut session = self.session();
        if session.as_ref().is_some_and(|s| s.generation == generation) {
            *session = None;
        }
        if self.current() == generation {
            self.state.send_replace(ChannelState::Disconnected);
        }
    }
}

impl Drop for ChannelInner {
    fn drop(&mut self) {
        let session = self
            .session
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(session) = session {
            session.cancel.cancel();
        }
    }
}

/// Reconnectable event stream from the job engine.
///
/// Cloning yields another handle to the same channel. The client id is
/// fixed for the lifetime of the channel and reused on every connect, so the
/// job engine keeps routing events for prompts queued under it.
#[derive(Clone)]
pub struct ExecutionChannel {
    inner: Arc<ChannelInner>,
}

impl fmt::Debug for ExecutionChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionChannel")
            .field("client_id", &self.inner.client_id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl ExecutionChannel {
    /// Creates a channel with a random client id.
    ///
    /// `capacity` is the number of events buffered per subscriber.
    pub fn new(capacity: usize) -> Self {
        Self::with_client_id(capacity, Uuid::new_v4().simple().to_string())
    }

    /// Creates a channel with the given client id.
    pub fn with_client_id(capacity: usize, client_id: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        let (state, _) = watch::channel(ChannelState::Disconnected);

        let inner = ChannelInner {
            client_id: client_id.into(),
            events,
            state,
            generation: AtomicU64::new(0),
            session: Mutex::new(None),
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Returns the client id sent on connect.
    pub fn client_id(&self) -> &str {
        &self.inner.client_id
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> ChannelState {
        *self.inner.state.borrow()
    }

    /// Returns a receiver notified on every state change.
    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.inner.state.subscribe()
    }

    /// Subscribes to events published from now on.
    ///
    /// A subscriber that falls more than the channel capacity behind loses
    /// the oldest events and receives a lag error.
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.inner.events.subscribe()
    }

    /// Subscribes to events as a stream that skips over lag.
    pub fn events(&self) -> impl Stream<Item = ExecutionEvent> + Send + 'static {
        BroadcastStream::new(self.subscribe()).filter_map(|item| {
            let event = match item {
                Ok(event) => Some(event),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        target: TRACING_TARGET_CHANNEL,
                        skipped,
                        "event subscriber lagged, events dropped"
                    );
                    None
                }
            };
            future::ready(event)
        })
    }

    /// Returns `endpoint` with this channel's client id as query parameter.
    pub fn session_url(&self, endpoint: &Url) -> Url {
        let mut url = endpoint.clone();
        let retained: Vec<(String, String)> = endpoint
            .query_pairs()
            .filter(|(key, _)| key != CLIENT_ID_PARAM)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        url.set_query(None);
        url.query_pairs_mut()
            .extend_pairs(retained)
            .append_pair(CLIENT_ID_PARAM, &self.inner.client_id);
        url
    }

    /// Opens a session to the WebSocket `endpoint`.
    ///
    /// Any previous session is closed first. On failure the channel is left
    /// disconnected and the transport error is returned. A [`disconnect`]
    /// issued while this call is in flight wins: the new transport is
    /// dropped and [`Error::Superseded`] is returned.
    ///
    /// [`disconnect`]: Self::disconnect
    pub async fn connect(&self, endpoint: &Url) -> Result<()> {
        self.disconnect().await;

        let generation = {
            let _session = self.inner.session();
            let generation = self.inner.advance();
            self.inner.state.send_replace(ChannelState::Connecting);
            generation
        };

        let url = self.session_url(endpoint);
        tracing::debug!(
            target: TRACING_TARGET_CHANNEL,
            endpoint = %endpoint,
            client_id = %self.inner.client_id,
            "connecting execution channel"
        );

        let stream = match connect_async(url.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(err) => {
                self.inner.transition(generation, ChannelState::Disconnected);
                tracing::warn!(
                    target: TRACING_TARGET_CHANNEL,
                    endpoint = %endpoint,
                    error = %err,
                    "execution channel connect failed"
                );
                return Err(err.into());
            }
        };

        let mut session = self.inner.session();
        if self.inner.current() != generation {
            tracing::debug!(
                target: TRACING_TARGET_CHANNEL,
                endpoint = %endpoint,
                "connect superseded by disconnect, dropping transport"
            );
            return Err(Error::Superseded);
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(receive_loop(
            stream,
            self.inner.events.clone(),
            cancel.clone(),
            Arc::downgrade(&self.inner),
            generation,
        ));
        *session = Some(Session {
            generation,
            cancel,
            task,
        });
        self.inner.state.send_replace(ChannelState::Connected);

        tracing::info!(
            target: TRACING_TARGET_CHANNEL,
            endpoint = %endpoint,
            "execution channel connected"
        );
        Ok(())
    }

    /// Closes the current session, if any.
    ///
    /// Idempotent. The receive task is cancelled and attempts a close
    /// handshake bounded by [`CLOSE_TIMEOUT`]; a task that does not stop in
    /// time is aborted. The channel always ends up disconnected.
    pub async fn disconnect(&self) {
        let (session, generation) = {
            let mut slot = self.inner.session();
            let generation = self.inner.advance();
            let session = slot.take();
            if session.is_some() {
                self.inner.state.send_replace(ChannelState::Closing);
            }
            (session, generation)
        };

        if let Some(Session {
            cancel, mut task, ..
        }) = session
        {
            cancel.cancel();
            if tokio::time::timeout(CLOSE_TIMEOUT + CLOSE_SLACK, &mut task)
                .await
                .is_err()
            {
                task.abort();
                tracing::warn!(
                    target: TRACING_TARGET_CHANNEL,
                    "receive task did not stop in time, aborted"
                );
            }
            tracing::info!(
                target: TRACING_TARGET_CHANNEL,
                "execution channel disconnected"
            );
        }

        self.inner
            .transition(generation, ChannelState::Disconnected);
    }
}

/// Reads frames until cancelled, closed by the remote, or failed.
async fn receive_loop(
    mut stream: WsStream,
    events: broadcast::Sender<ExecutionEvent>,
    cancel: CancellationToken,
    inner: Weak<ChannelInner>,
    generation: u64,
) {
    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                close_gracefully(&mut stream).await;
                break;
            }

            frame = stream.next() => {
                let flow = match frame {
                    Some(Ok(message)) => process_message(message, &events),
                    Some(Err(err)) => {
                        tracing::warn!(
                            target: TRACING_TARGET_CHANNEL,
                            error = %err,
                            "execution channel transport error"
                        );
                        ControlFlow::Break(())
                    }
                    None => {
                        tracing::debug!(
                            target: TRACING_TARGET_CHANNEL,
                            "execution channel stream ended"
                        );
                        ControlFlow::Break(())
                    }
                };

                if flow.is_break() {
                    break;
                }
            }
        }
    }

    if let Some(inner) = inner.upgrade() {
        inner.finish(generation);
    }
}

fn process_message(
    message: Message,
    events: &broadcast::Sender<ExecutionEvent>,
) -> ControlFlow<(), ()> {
    match message {
        Message::Text(text) => {
            match parse_envelope(text.as_str()) {
                Some(event) => {
                    if events.send(event).is_err() {
                        tracing::trace!(
                            target: TRACING_TARGET_CHANNEL,
                            "no subscribers, event dropped"
                        );
                    }
                }
                None => tracing::trace!(
                    target: TRACING_TARGET_CHANNEL,
                    message_length = text.len(),
                    "ignored text message"
                ),
            }
            ControlFlow::Continue(())
        }
        Message::Binary(data) => {
            tracing::trace!(
                target: TRACING_TARGET_CHANNEL,
                data_length = data.len(),
                "ignored binary message"
            );
            ControlFlow::Continue(())
        }
        Message::Close(frame) => {
            match frame {
                Some(frame) => tracing::info!(
                    target: TRACING_TARGET_CHANNEL,
                    close_code = u16::from(frame.code),
                    close_reason = frame.reason.as_str(),
                    "job engine closed the channel"
                ),
                None => tracing::info!(
                    target: TRACING_TARGET_CHANNEL,
                    "job engine closed the channel"
                ),
            }
            ControlFlow::Break(())
        }
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => ControlFlow::Continue(()),
    }
}

/// Sends a close frame and waits for the remote to finish the handshake.
async fn close_gracefully(stream: &mut WsStream) {
    let handshake = async {
        stream.close(None).await?;
        while let Some(frame) = stream.next().await {
            frame?;
        }
        Ok::<_, tungstenite::Error>(())
    };

    match tokio::time::timeout(CLOSE_TIMEOUT, handshake).await {
        Ok(Ok(())) => tracing::debug!(
            target: TRACING_TARGET_CHANNEL,
            "close handshake completed"
        ),
        Ok(Err(err)) => tracing::debug!(
            target: TRACING_TARGET_CHANNEL,
            error = %err,
            "close handshake failed"
        ),
        Err(_) => tracing::warn!(
            target: TRACING_TARGET_CHANNEL,
            timeout_ms = CLOSE_TIMEOUT.as_millis() as u64,
            "close handshake timed out"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_channel_is_disconnected() {
        let channel = ExecutionChannel::new(0);
        assert_eq!(channel.state(), ChannelState::Disconnected);
        assert_eq!(channel.client_id().len(), 32);
        assert!(channel.client_id().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_session_url() {
        let channel = ExecutionChannel::with_client_id(8, "abc");
        let endpoint = Url::parse("ws://127.0.0.1:8188/ws").unwrap();
        assert_eq!(
            channel.session_url(&endpoint).as_str(),
            "ws://127.0.0.1:8188/ws?clientId=abc"
        );

        let endpoint = Url::parse("wss://host/ws?token=t&clientId=old").unwrap();
        assert_eq!(
            channel.session_url(&endpoint).as_str(),
            "wss://host/ws?token=t&clientId=abc"
        );
    }

    #[tokio::test]
    async fn test_disconnect_without_session() {
        let channel = ExecutionChannel::new(8);
        channel.disconnect().await;
        channel.disconnect().await;
        assert_eq!(channel.state(), ChannelState::Disconnected);
    }
}
