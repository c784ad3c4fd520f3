//! Websocket session driver — one task per joined board.
//!
//! DESIGN
//! ======
//! `run_session` owns the [`BoardSession`] and multiplexes four sources in a
//! single `select!` loop: relay frames, local intents, finished route
//! lookups, and shutdown. Route lookups run on spawned tasks and report back
//! over an mpsc channel, so a slow directions API never stalls presence.
//!
//! LIFECYCLE
//! =========
//! 1. Connect → relay sends `session` → session replies `join_board`
//! 2. Frames and intents are applied; effects are written back or spawned
//! 3. Disconnect → remote cursors cleared → backoff (intents still applied
//!    offline) → reconnect and rejoin
//! 4. Shutdown → best-effort `leave_board` + close → session returned
//!
//! Shutdown is honored in every phase, including a handshake the relay
//! never answers. Handshakes and writes are bounded by `io_timeout_ms`.

#[cfg(test)]
#[path = "socket_test.rs"]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};

use super::backoff::Backoff;
use crate::config::ReconnectConfig;
use crate::cursor::MarkerLayer;
use crate::message::{ClientMessage, ServerMessage};
use crate::route::{ResolvedPath, RouteGateway};
use crate::session::{BoardSession, Effects};
use crate::signal::Intent;
use crate::workflow::RouteRequest;

const ROUTE_RESULT_BUFFER: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    Ws(Box<tungstenite::Error>),

    #[error("websocket closed by relay")]
    Closed,

    #[error("websocket write timed out")]
    WriteTimeout,

    #[error("message encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<tungstenite::Error> for TransportError {
    fn from(e: tungstenite::Error) -> Self {
        Self::Ws(Box::new(e))
    }
}

type RouteResult = (RouteRequest, Option<ResolvedPath>);

/// Why a connection ended.
enum Exit {
    Shutdown,
    Lost(TransportError),
}

/// Drive `session` against the relay at `url` until shutdown fires, the
/// sender is dropped, or the intent channel closes. The session should
/// already have been `connect`ed so it knows which board to join.
pub async fn run_session<M: MarkerLayer>(
    mut session: BoardSession<M>,
    url: &str,
    gateway: Arc<dyn RouteGateway>,
    mut intents: mpsc::Receiver<Intent>,
    mut shutdown: oneshot::Receiver<()>,
    reconnect: ReconnectConfig,
) -> BoardSession<M> {
    let (route_tx, mut route_rx) = mpsc::channel::<RouteResult>(ROUTE_RESULT_BUFFER);
    let mut backoff = Backoff::new(reconnect);
    let io = Io { gateway, route_tx, io_timeout: Duration::from_millis(reconnect.io_timeout_ms.max(1)) };

    loop {
        info!(%url, "net: connecting");
        let handshake = tokio::time::timeout(io.io_timeout, connect_async(url));
        let Some(connected) = io.offline(&mut session, handshake, &mut route_rx, &mut intents, &mut shutdown).await
        else {
            session.dispose();
            info!("net: session closed while connecting");
            return session;
        };

        match connected {
            Ok(Ok((ws, _))) => {
                let exit = io.drive(&mut session, ws, &mut route_rx, &mut intents, &mut shutdown, &mut backoff).await;
                match exit {
                    Exit::Shutdown => return session,
                    Exit::Lost(e) => {
                        warn!(error = %e, "net: connection lost");
                        session.on_transport_lost();
                    }
                }
            }
            Ok(Err(e)) => warn!(error = %e, "net: connect failed"),
            Err(_) => warn!(timeout_ms = reconnect.io_timeout_ms, "net: handshake timed out"),
        }

        let delay = backoff.next_delay();
        info!(delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), "net: reconnecting after backoff");
        let waited = io.offline(&mut session, tokio::time::sleep(delay), &mut route_rx, &mut intents, &mut shutdown);
        if waited.await.is_none() {
            session.dispose();
            info!("net: session closed while offline");
            return session;
        }
    }
}

struct Io {
    gateway: Arc<dyn RouteGateway>,
    route_tx: mpsc::Sender<RouteResult>,
    /// Bound on the handshake and on every outbound write.
    io_timeout: Duration,
}

impl Io {
    /// Await `work` with no relay connection. Intents still change local
    /// state (their outbound messages are dropped) and route results still
    /// land. Returns `None` once shutdown fires or the intent channel closes.
    async fn offline<M: MarkerLayer, F: Future>(
        &self,
        session: &mut BoardSession<M>,
        work: F,
        route_rx: &mut mpsc::Receiver<RouteResult>,
        intents: &mut mpsc::Receiver<Intent>,
        shutdown: &mut oneshot::Receiver<()>,
    ) -> Option<F::Output> {
        tokio::pin!(work);
        loop {
            tokio::select! {
                output = &mut work => return Some(output),
                _ = &mut *shutdown => return None,
                intent = intents.recv() => {
                    let effects = session.handle_intent(intent?);
                    self.spawn_lookups(effects.routes);
                }
                Some((request, result)) = route_rx.recv() => {
                    session.apply_route_result(request, result);
                }
            }
        }
    }

    async fn drive<M: MarkerLayer, S>(
        &self,
        session: &mut BoardSession<M>,
        ws: S,
        route_rx: &mut mpsc::Receiver<RouteResult>,
        intents: &mut mpsc::Receiver<Intent>,
        shutdown: &mut oneshot::Receiver<()>,
        backoff: &mut Backoff,
    ) -> Exit
    where
        S: Stream<Item = Result<Message, tungstenite::Error>> + Sink<Message, Error = tungstenite::Error> + Unpin,
    {
        let (mut write, mut read) = ws.split();

        loop {
            let step = tokio::select! {
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => match ServerMessage::from_text(text.as_str()) {
                        Ok(message) => {
                            if matches!(message, ServerMessage::Session { .. }) {
                                backoff.reset();
                            }
                            let effects = session.handle_server_message(message);
                            self.apply(effects, &mut write).await
                        }
                        Err(e) => {
                            debug!(error = %e, "net: ignoring undecodable frame");
                            Ok(())
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => Err(TransportError::Closed),
                    Some(Ok(_)) => Ok(()),
                    Some(Err(e)) => Err(e.into()),
                },
                intent = intents.recv() => match intent {
                    Some(intent) => {
                        let effects = session.handle_intent(intent);
                        self.apply(effects, &mut write).await
                    }
                    None => return self.leave(session, &mut write).await,
                },
                Some((request, result)) = route_rx.recv() => {
                    session.apply_route_result(request, result);
                    Ok(())
                }
                _ = &mut *shutdown => return self.leave(session, &mut write).await,
            };
            if let Err(e) = step {
                return Exit::Lost(e);
            }
        }
    }

    async fn apply<W>(&self, effects: Effects, write: &mut W) -> Result<(), TransportError>
    where
        W: Sink<Message, Error = tungstenite::Error> + Unpin,
    {
        self.spawn_lookups(effects.routes);
        for message in effects.outbound {
            send_message(write, &message, self.io_timeout).await?;
        }
        Ok(())
    }

    fn spawn_lookups(&self, requests: Vec<RouteRequest>) {
        for request in requests {
            let gateway = Arc::clone(&self.gateway);
            let tx = self.route_tx.clone();
            tokio::spawn(async move {
                let result = gateway.resolve(request.from, request.to).await;
                if tx.send((request, result)).await.is_err() {
                    debug!("net: route result dropped, session gone");
                }
            });
        }
    }

    /// Best-effort `leave_board` and close, then report shutdown.
    async fn leave<M: MarkerLayer, W>(&self, session: &mut BoardSession<M>, write: &mut W) -> Exit
    where
        W: Sink<Message, Error = tungstenite::Error> + Unpin,
    {
        let leave = session.dispose();
        if let Err(e) = send_message(write, &leave, self.io_timeout).await {
            debug!(error = %e, "net: leave_board not delivered");
        }
        match tokio::time::timeout(self.io_timeout, write.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "net: close failed"),
            Err(_) => debug!("net: close timed out"),
        }
        info!("net: session closed");
        Exit::Shutdown
    }
}

/// Encode and write one message; a peer that stops reading fails the write
/// after `limit` instead of stalling the loop.
async fn send_message<W>(write: &mut W, message: &ClientMessage, limit: Duration) -> Result<(), TransportError>
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let text = message.to_text()?;
    tokio::time::timeout(limit, write.send(Message::Text(text.into())))
        .await
        .map_err(|_| TransportError::WriteTimeout)??;
    Ok(())
}
