//! Per-call session driver
//!
//! One `CallSessionHandler` owns one call's socket. The read loop parses
//! every inbound frame and hands it to its own task, so a slow generation
//! stream never delays a `ping_pong` reply. Everything written back to the
//! platform goes through a single writer task fed by a bounded queue.

use crate::domain::agent::{CallContext, ResponseAgent};
use crate::domain::session::{
    CallMetadata, CallerNumber, InboundEvent, OutboundEvent, ResponseRequest, ResponseTicket,
    ResponseTracker, SessionCapabilities,
};
use crate::domain::shared::{CallId, RelayError, Result};
use crate::infrastructure::broadcast::SubscriberRegistry;
use crate::infrastructure::metrics;
use axum::extract::ws::{close_code, CloseFrame, Message};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::borrow::Cow;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The config frame could not be sent
    SetupFailed,
    /// The platform closed the connection, or it broke
    Disconnected,
    /// A newer session for the same call took over
    Superseded,
    /// An unexpected fault; the socket was closed with 1011
    Aborted(String),
}

/// Per-session knobs
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub capabilities: SessionCapabilities,
    pub queue_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            capabilities: SessionCapabilities::default(),
            queue_capacity: 64,
        }
    }
}

/// How long teardown waits for the writer to flush before dropping the socket
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

enum OutboundFrame {
    Text(String),
    Close { code: u16, reason: &'static str },
}

/// Send side of a session's single-writer queue
#[derive(Clone)]
struct SessionOutbox {
    tx: mpsc::Sender<OutboundFrame>,
}

impl SessionOutbox {
    fn spawn<K>(sink: K, capacity: usize) -> (Self, JoinHandle<()>)
    where
        K: Sink<Message> + Unpin + Send + 'static,
        K::Error: Display,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let writer = tokio::spawn(write_frames(sink, rx));
        (Self { tx }, writer)
    }

    /// Queue one event for the platform
    async fn send(&self, event: OutboundEvent) -> Result<()> {
        let json = event.to_json()?;
        self.tx
            .send(OutboundFrame::Text(json))
            .await
            .map_err(|_| RelayError::TransportClosed)
    }

    /// Queue a close frame without waiting. Returns `false` when the queue
    /// is full or gone, i.e. the platform has stopped reading.
    fn close(&self, code: u16, reason: &'static str) -> bool {
        self.tx.try_send(OutboundFrame::Close { code, reason }).is_ok()
    }

    /// Resolves once the writer has stopped
    async fn closed(&self) {
        self.tx.closed().await
    }
}

async fn write_frames<K>(mut sink: K, mut rx: mpsc::Receiver<OutboundFrame>)
where
    K: Sink<Message> + Unpin,
    K::Error: Display,
{
    while let Some(frame) = rx.recv().await {
        let (message, last) = match frame {
            OutboundFrame::Text(json) => (Message::Text(json), false),
            OutboundFrame::Close { code, reason } => (
                Message::Close(Some(CloseFrame {
                    code,
                    reason: Cow::Borrowed(reason),
                })),
                true,
            ),
        };
        if let Err(e) = sink.send(message).await {
            debug!(error = %e, "Session transport write failed");
            break;
        }
        if last {
            break;
        }
    }
    let _ = sink.close().await;
}

struct SessionState {
    call_id: CallId,
    caller: OnceLock<CallerNumber>,
    details_seen: AtomicBool,
    responses: Arc<ResponseTracker>,
}

impl SessionState {
    fn new(call_id: CallId) -> Self {
        Self {
            call_id,
            caller: OnceLock::new(),
            details_seen: AtomicBool::new(false),
            responses: ResponseTracker::new(),
        }
    }

    fn context(&self) -> CallContext {
        CallContext {
            call_id: self.call_id.clone(),
            caller: self.caller.get().cloned(),
        }
    }
}

/// Drives one call's session socket from the config frame to teardown.
///
/// Owns the socket for its whole life; observers only ever see what it
/// forwards through the [`SubscriberRegistry`].
pub struct CallSessionHandler {
    call_id: CallId,
    registry: Arc<SubscriberRegistry>,
    agent: Arc<dyn ResponseAgent>,
    settings: SessionSettings,
}

impl CallSessionHandler {
    pub fn new(
        call_id: CallId,
        registry: Arc<SubscriberRegistry>,
        agent: Arc<dyn ResponseAgent>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            call_id,
            registry,
            agent,
            settings,
        }
    }

    /// Drive the session until the transport closes, a fault occurs or
    /// `shutdown` fires.
    pub async fn run<S, E, K>(self, mut inbound: S, mut sink: K, shutdown: Arc<Notify>) -> SessionOutcome
    where
        S: Stream<Item = std::result::Result<Message, E>> + Unpin,
        E: Display,
        K: Sink<Message> + Unpin + Send + 'static,
        K::Error: Display,
    {
        let call_id = self.call_id.clone();

        let config = match OutboundEvent::config(self.settings.capabilities).to_json() {
            Ok(json) => json,
            Err(e) => {
                error!(call_id = %call_id, error = %e, "Failed to encode config frame");
                return SessionOutcome::SetupFailed;
            }
        };
        if let Err(e) = sink.send(Message::Text(config)).await {
            warn!(call_id = %call_id, error = %e, "Failed to send config frame");
            return SessionOutcome::SetupFailed;
        }
        info!(call_id = %call_id, "Call session established");

        let (outbox, mut writer) = SessionOutbox::spawn(sink, self.settings.queue_capacity);
        let state = Arc::new(SessionState::new(call_id.clone()));
        let mut tasks: JoinSet<Result<()>> = JoinSet::new();

        let outcome = loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    if !outbox.close(close_code::NORMAL, "superseded") {
                        writer.abort();
                    }
                    break SessionOutcome::Superseded;
                }
                Some(joined) = tasks.join_next() => match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) if e.is_transport() => break SessionOutcome::Disconnected,
                    Ok(Err(e)) if e.is_protocol() => {
                        metrics::record_protocol_fault();
                        warn!(call_id = %call_id, error = %e, "Dropped malformed session frame");
                    }
                    Ok(Err(e)) => {
                        error!(call_id = %call_id, error = %e, "Error in call session");
                        if !outbox.close(close_code::ERROR, "Server error") {
                            writer.abort();
                        }
                        break SessionOutcome::Aborted(e.to_string());
                    }
                    Err(e) => {
                        error!(call_id = %call_id, error = %e, "Call session task failed");
                        if !outbox.close(close_code::ERROR, "Server error") {
                            writer.abort();
                        }
                        break SessionOutcome::Aborted(e.to_string());
                    }
                },
                _ = outbox.closed() => break SessionOutcome::Disconnected,
                frame = inbound.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.dispatch(text, &state, &outbox, &mut tasks),
                    Some(Ok(Message::Close(_))) | None => break SessionOutcome::Disconnected,
                    Some(Ok(_)) => debug!(call_id = %call_id, "Ignoring non-text frame"),
                    Some(Err(e)) => {
                        debug!(call_id = %call_id, error = %e, "Session transport read failed");
                        break SessionOutcome::Disconnected;
                    }
                },
            }
        };

        // In-flight work is abandoned; nothing is broadcast after teardown
        tasks.shutdown().await;
        drop(outbox);
        match tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.is_cancelled() => {
                debug!(call_id = %call_id, "Session writer dropped with frames pending")
            }
            Ok(Err(e)) => warn!(call_id = %call_id, error = %e, "Session writer task failed"),
            Err(_) => {
                warn!(call_id = %call_id, "Platform stopped reading, dropping session socket");
                writer.abort();
            }
        }

        info!(call_id = %call_id, outcome = ?outcome, "Call session closed");
        outcome
    }

    fn dispatch(
        &self,
        text: String,
        state: &Arc<SessionState>,
        outbox: &SessionOutbox,
        tasks: &mut JoinSet<Result<()>>,
    ) {
        let event = match InboundEvent::parse(&text) {
            Ok(event) => event,
            Err(e) => {
                metrics::record_protocol_fault();
                warn!(call_id = %state.call_id, error = %e, "Dropped malformed session frame");
                return;
            }
        };

        let interaction_type = event.interaction_type();
        metrics::record_session_message(interaction_type);
        debug!(call_id = %state.call_id, interaction_type, "Received session frame");

        let state = Arc::clone(state);
        let outbox = outbox.clone();
        match event {
            InboundEvent::CallDetails { call } => {
                let agent = Arc::clone(&self.agent);
                tasks.spawn(accept_call_details(state, agent, outbox, call));
            }
            InboundEvent::PingPong { timestamp } => {
                tasks.spawn(async move { outbox.send(OutboundEvent::pong(timestamp)).await });
            }
            InboundEvent::UpdateOnly { .. } => {
                let registry = Arc::clone(&self.registry);
                tasks.spawn(async move {
                    registry.broadcast(text).await;
                    Ok(())
                });
            }
            InboundEvent::ResponseRequired(request) | InboundEvent::ReminderRequired(request) => {
                // Recorded here, in arrival order, before any generation starts
                let ticket = state.responses.advance(request.response_id);
                info!(
                    call_id = %state.call_id,
                    interaction_type,
                    response_id = request.response_id,
                    "Response requested"
                );
                let agent = Arc::clone(&self.agent);
                tasks.spawn(relay_response(state, agent, outbox, ticket, request));
            }
        }
    }
}

async fn accept_call_details(
    state: Arc<SessionState>,
    agent: Arc<dyn ResponseAgent>,
    outbox: SessionOutbox,
    call: CallMetadata,
) -> Result<()> {
    if state.details_seen.swap(true, Ordering::AcqRel) {
        warn!(call_id = %state.call_id, "Ignoring repeated call details");
        return Ok(());
    }

    match call.from_number.as_deref().map(CallerNumber::parse) {
        Some(Ok(number)) => {
            info!(call_id = %state.call_id, caller = %number, "Call details received");
            let _ = state.caller.set(number);
        }
        Some(Err(e)) => {
            metrics::record_protocol_fault();
            warn!(call_id = %state.call_id, error = %e, "Caller number not normalized");
        }
        None => debug!(call_id = %state.call_id, "Call details carry no caller number"),
    }

    if let Some(greeting) = agent.begin_message(state.context()).await? {
        outbox.send(greeting).await?;
    }
    Ok(())
}

async fn relay_response(
    state: Arc<SessionState>,
    agent: Arc<dyn ResponseAgent>,
    outbox: SessionOutbox,
    ticket: ResponseTicket,
    request: ResponseRequest,
) -> Result<()> {
    if ticket.is_superseded() {
        metrics::record_stale_response();
        return Ok(());
    }

    let mut frames = agent.draft_response(state.context(), request);
    while let Some(frame) = frames.next().await {
        if ticket.is_superseded() {
            metrics::record_stale_response();
            debug!(
                call_id = %state.call_id,
                response_id = ticket.response_id(),
                latest = state.responses.current(),
                "Abandoning superseded response"
            );
            return Ok(());
        }
        outbox.send(frame?).await?;
    }
    Ok(())
}
