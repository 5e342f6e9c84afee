//! WebSocket handler for the live dashboard stream

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, stream::StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::{
    actors::messages::{ClientMessage, DashboardEvent},
    api::state::ApiState,
};

/// WebSocket upgrade handler
///
/// GET /api/v1/stream
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

/// Handle WebSocket connection
async fn handle_websocket(socket: WebSocket, state: ApiState) {
    info!("WebSocket client connected");

    let (mut sender, mut receiver) = socket.split();

    // Subscribe before anything is published for this connection
    let mut event_rx = state.event_tx.subscribe();

    if state.supervisor.ensure_started() {
        debug!("first client started the monitor loop");
    }

    // Fresh status for the newcomer instead of waiting for the next cadence
    let prober = state.prober.clone();
    let event_tx = state.event_tx.clone();
    tokio::spawn(async move {
        let status = prober.full_status_update().await;
        let _ = event_tx.send(DashboardEvent::StatusUpdate(status));
    });

    // Forward events to the client
    let mut send_task = tokio::spawn(async move {
        loop {
            let event = match event_rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    debug!("WebSocket client lagging, skipped {skipped} events");
                    continue;
                }
                Err(RecvError::Closed) => {
                    debug!("Broadcast channel closed");
                    break;
                }
            };

            if let Ok(text) = serde_json::to_string(&event)
                && sender.send(Message::Text(text)).await.is_err()
            {
                debug!("WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    // Handle incoming docker_action requests
    let executor = state.executor.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::DockerAction(request)) => {
                        debug!("received docker_action: {request:?}");
                        // progress is reported through command_output events
                        drop(executor.handle_action(&request));
                    }
                    Err(e) => warn!("ignoring unparseable client message: {e}"),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    info!("WebSocket client disconnected");
}
