use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::models::ChangeNotice;
use crate::routes::extract::AuthUser;
use crate::AppState;

/// Upgrade to a websocket streaming the caller's own changes
pub async fn realtime_feed(
    State(state): State<AppState>,
    auth: AuthUser,
    ws: WebSocketUpgrade,
) -> Response {
    let changes = state.subscribe();
    ws.on_upgrade(move |socket| stream_changes(socket, auth.user_id, changes))
}

/// Serialize a notice if it belongs to `user_id`
fn frame_for(notice: &ChangeNotice, user_id: &str) -> Option<String> {
    if notice.owner_id != user_id {
        return None;
    }
    match serde_json::to_string(&notice.event) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::error!("Failed to serialize change event: {:?}", e);
            None
        }
    }
}

async fn stream_changes(
    socket: WebSocket,
    user_id: String,
    mut changes: broadcast::Receiver<ChangeNotice>,
) {
    let (mut sender, mut receiver) = socket.split();
    tracing::debug!("Realtime subscriber connected: {}", user_id);

    loop {
        tokio::select! {
            notice = changes.recv() => match notice {
                Ok(notice) => {
                    let Some(text) = frame_for(&notice, &user_id) else {
                        continue;
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                // Missed events are dropped; the next one carries current state
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Realtime subscriber {} skipped {} events", user_id, skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::debug!("Realtime subscriber disconnected: {}", user_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangeEvent;

    fn notice(owner: &str) -> ChangeNotice {
        ChangeNotice {
            owner_id: owner.to_string(),
            event: ChangeEvent::FolderDeleted {
                id: "folder-1".to_string(),
            },
        }
    }

    #[test]
    fn test_frames_only_for_owner() {
        assert!(frame_for(&notice("alice"), "bob").is_none());

        let text = frame_for(&notice("alice"), "alice").unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["type"], "folder_deleted");
        assert_eq!(json["id"], "folder-1");
    }

    #[tokio::test]
    async fn test_lagging_receiver_keeps_latest() {
        let (tx, mut rx) = broadcast::channel(2);
        for i in 0..5 {
            let _ = tx.send(ChangeNotice {
                owner_id: "alice".to_string(),
                event: ChangeEvent::SnippetDeleted { id: i.to_string() },
            });
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(3))));
        let next = rx.recv().await.unwrap();
        assert!(matches!(next.event, ChangeEvent::SnippetDeleted { ref id } if id == "3"));
    }
}
