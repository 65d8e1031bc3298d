//! Push channel. A socket joins its owner's room (and the vendor room for
//! vendors) plus the product feed, and receives `{"event", "data"}` frames.

use axum::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRef, FromRequestParts, Query, State};
use axum::http::request::Parts;
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth::{bearer_token, AuthError, Claims, TokenKeys};
use crate::error::ApiError;
use crate::notifications::{user_room, vendor_room, Notification, Rooms, PRODUCTS_ROOM};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Browsers cannot set headers on a socket handshake, so the token may also
/// arrive as `?token=`.
pub struct WsAuth(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for WsAuth
where
    TokenKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let query = Query::<TokenQuery>::from_request_parts(parts, state).await.ok().and_then(|q| q.0.token);
        let token = query.as_deref().or_else(|| bearer_token(&parts.headers)).ok_or(AuthError::MissingToken)?;
        Ok(Self(TokenKeys::from_ref(state).verify(token)?))
    }
}

#[derive(Debug, Deserialize)]
struct ClientFrame {
    #[serde(rename = "type")]
    kind: String,
}

pub fn rooms_for(claims: &Claims) -> Vec<String> {
    let mut rooms = vec![user_room(claims.sub), PRODUCTS_ROOM.to_string()];
    if claims.is_vendor() {
        rooms.push(vendor_room(claims.sub));
    }
    rooms
}

pub async fn connect(WsAuth(claims): WsAuth, State(state): State<AppState>, upgrade: WebSocketUpgrade) -> Response {
    let rooms = state.notifier.rooms().clone();
    upgrade.on_upgrade(move |socket| serve(socket, rooms, claims))
}

async fn serve(socket: WebSocket, rooms: Rooms, claims: Claims) {
    let names = rooms_for(&claims);
    let mut events = rooms.subscribe_all(&names);
    let (mut sink, mut incoming) = socket.split();
    info!(user_id = %claims.sub, rooms = ?names, "socket connected");

    loop {
        tokio::select! {
            Some(notification) = events.next() => {
                if send(&mut sink, &notification).await.is_err() {
                    break;
                }
            }
            frame = incoming.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let ping = serde_json::from_str::<ClientFrame>(&text).map_or(false, |f| f.kind == "ping");
                    if ping && send(&mut sink, &Notification::new("pong", serde_json::Value::Null)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(error = %e, "socket read failed");
                    break;
                }
            },
        }
    }

    drop(events);
    rooms.prune(&names);
    info!(user_id = %claims.sub, "socket disconnected");
}

async fn send(sink: &mut SplitSink<WebSocket, Message>, notification: &Notification) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(notification) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, event = %notification.event, "failed to encode notification");
            return Ok(());
        }
    };
    sink.send(Message::Text(text)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use uuid::Uuid;

    fn claims(role: Role) -> Claims {
        Claims { sub: Uuid::now_v7(), role, permissions: vec![], iat: 0, exp: 0 }
    }

    #[test]
    fn test_vendor_joins_vendor_room() {
        let vendor = claims(Role::Vendor);
        let rooms = rooms_for(&vendor);
        assert!(rooms.contains(&vendor_room(vendor.sub)));
        assert!(rooms.contains(&user_room(vendor.sub)));
        assert!(rooms.contains(&PRODUCTS_ROOM.to_string()));
    }

    #[test]
    fn test_customer_skips_vendor_room() {
        let user = claims(Role::User);
        assert_eq!(rooms_for(&user), vec![user_room(user.sub), PRODUCTS_ROOM.to_string()]);
    }

    #[test]
    fn test_ping_frame() {
        let frame: ClientFrame = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(frame.kind, "ping");
    }
}
