//! WebSocket handler.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS
//! - Extract sid/uid from query string (identity is resolved upstream)
//! - Register the connection with the session registry
//! - Bridge socket <-> connection channels, with ping/pong + idle timeout
//! - Drive the session's receive loop through the dispatcher

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, Query, State},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::time::{Duration, Instant};
use tracing::Instrument;

use roomcast_core::error::{Result, RoomcastError};
use roomcast_core::protocol::error_payload;

use crate::app_state::AppState;
use crate::config::GatewaySection;
use crate::realtime::{Connection, ConnectionPeer, SessionCtx};
use crate::transport::codec::{decode, encode, Inbound};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub sid: String,
    #[serde(default)]
    pub uid: Option<String>,
}

// --------------------
// Entry
// --------------------
pub async fn ws_upgrade(
    State(app): State<AppState>,
    ws: WebSocketUpgrade,
    Query(q): Query<WsQuery>,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let sid = q.sid.clone();
        if let Err(e) = run_session(app, q, socket).await {
            tracing::warn!(sid = %sid, error = %e, "session ended with error");
        }
    })
}

// --------------------
// Core session flow
// --------------------
async fn run_session(app: AppState, q: WsQuery, socket: WebSocket) -> Result<()> {
    if q.sid.is_empty() {
        return Err(RoomcastError::BadRequest("sid must not be empty".into()));
    }
    let uid = q.uid.filter(|u| !u.is_empty());

    let registry = app.registry();
    let (conn, peer) = Connection::pair(app.cfg().gateway.outbound_queue);
    let generation = registry.add_or_attach(&q.sid, conn, uid.as_deref());

    let dispatcher = app.dispatcher();
    let ctx = SessionCtx::new(q.sid.as_str(), registry.clone());
    let receive = registry.drive_attached(&q.sid, generation, |payload| {
        let dispatcher = dispatcher.clone();
        let ctx = ctx.clone();
        async move { dispatcher.dispatch_or_reply(ctx, payload).await }
    });

    let span = tracing::info_span!("ws", sid = %q.sid, generation);
    async {
        tokio::join!(bridge(socket, peer, &app.cfg().gateway, &q.sid), receive);
    }
    .instrument(span)
    .await;
    Ok(())
}

// --------------------
// Socket <-> channels
// --------------------
async fn bridge(socket: WebSocket, peer: ConnectionPeer, gw: &GatewaySection, sid: &str) {
    let ConnectionPeer { mut outbound, inbound } = peer;
    let (mut ws_tx, mut ws_rx) = socket.split();

    let ping_every = Duration::from_millis(gw.ping_interval_ms);
    let idle_timeout = Duration::from_millis(gw.idle_timeout_ms);

    let mut ping_tick = tokio::time::interval(ping_every);
    ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            // outbound writer
            maybe_out = outbound.recv() => {
                let Some(payload) = maybe_out else {
                    // session dropped this connection (replaced by a reconnect)
                    tracing::info!(sid = %sid, "connection replaced, closing socket");
                    break;
                };
                match encode(&payload) {
                    Ok(m) => {
                        if ws_tx.send(m).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(sid = %sid, error = %e, "outbound encode failed"),
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let Some(Ok(msg)) = incoming else { break; };
                last_activity = Instant::now();

                match decode(msg) {
                    Ok(Inbound::Payload(p)) => {
                        if inbound.send(p).await.is_err() {
                            break;
                        }
                    }
                    Ok(Inbound::Ping(v)) => {
                        let _ = ws_tx.send(Message::Pong(v)).await;
                    }
                    Ok(Inbound::Pong(_)) => {}
                    Ok(Inbound::Close) => break,
                    Err(e) => {
                        tracing::debug!(sid = %sid, error = %e, "inbound frame rejected");
                        if let Ok(m) = encode(&error_payload(&e.to_string())) {
                            let _ = ws_tx.send(m).await;
                        }
                    }
                }
            }

            // ping
            _ = ping_tick.tick() => {
                if ws_tx.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }

            // idle timeout
            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                if last_activity.elapsed() >= idle_timeout {
                    if let Ok(m) = encode(&error_payload("idle timeout")) {
                        let _ = ws_tx.send(m).await;
                    }
                    break;
                }
            }
        }
    }

    let _ = ws_tx.close().await;
    // dropping `inbound` ends the session's receive loop
}
