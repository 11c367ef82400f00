//! `/ws` push channel.
//!
//! Each connected socket receives `{"type":"update"}` whenever server state
//! changes. Anything the client sends is ignored.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{stream::BoxStream, SinkExt, StreamExt};
use tracing::{debug, info};

use crate::events::ChangeNotification;
use crate::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    // Subscribed before the 101 goes out, so the client cannot miss a publish
    let notifications = state.notifier.stream();
    ws.on_upgrade(move |socket| serve_observer(socket, notifications))
}

async fn serve_observer(
    socket: WebSocket,
    mut notifications: BoxStream<'static, ChangeNotification>,
) {
    let (mut sender, mut receiver) = socket.split();
    info!("observer connected");

    loop {
        tokio::select! {
            next = notifications.next() => match next {
                Some(notification @ ChangeNotification::Update) => {
                    let frame = Message::Text(notification.to_json().into());
                    if let Err(err) = sender.send(frame).await {
                        debug!(error = %err, "observer send failed");
                        break;
                    }
                }
                Some(ChangeNotification::Unknown) => {}
                None => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(error = %err, "observer socket error");
                    break;
                }
            },
        }
    }

    info!("observer disconnected");
}
