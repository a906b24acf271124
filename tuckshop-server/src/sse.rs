use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
};
use chrono::{DateTime, Utc};
use futures_util::Stream;
use log::info;
use parking_lot::Mutex;
use serde::Serialize;
use std::{
    convert::Infallible,
    pin::Pin,
    sync::{Arc, Weak},
    task::{Context, Poll, Waker},
};
use tokio::task::spawn_blocking;
use tuckshop_core::{util::Id, EventReceiver, TuckshopEvent};
use utoipa::ToSchema;

use crate::{
    auth::Session,
    context::ServerContext,
    schemas::{ChatSchema, ValidatedJson},
    serialized::{Cheer, Order, ToSerialized},
};

type ConnectionId = Id<Connection>;

/// The messages pushed over the event channel. Every connected client gets
/// every event and filters locally for the ones that concern it.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ServerEvent {
    /// An order was placed and is waiting for a decision
    NewOrder { order: Order },
    /// An order moved to a terminal status
    OrderUpdated { order: Order },
    /// A cheer message was posted
    NewCheer { cheer: Cheer },
    /// A chat line relayed between connected clients
    ChatMessage {
        sender: String,
        text: String,
        time: DateTime<Utc>,
    },
}

impl From<TuckshopEvent> for ServerEvent {
    fn from(value: TuckshopEvent) -> Self {
        match value {
            TuckshopEvent::NewOrder(order) => Self::NewOrder {
                order: order.to_serialized(),
            },
            TuckshopEvent::OrderUpdated(order) => Self::OrderUpdated {
                order: order.to_serialized(),
            },
            TuckshopEvent::NewCheer(cheer) => Self::NewCheer {
                cheer: cheer.to_serialized(),
            },
            TuckshopEvent::ChatMessage { sender, text, time } => {
                Self::ChatMessage { sender, text, time }
            }
        }
    }
}

/// Manages server sent event connections.
///
/// Delivery is at-most-once: events queue only for currently connected
/// clients, nothing is replayed to clients that connect later.
pub struct ServerSentEvents {
    me: Weak<Self>,
    connections: Mutex<Vec<Connection>>,
}

struct Connection {
    id: ConnectionId,
    pending_messages: Arc<Mutex<Vec<ServerEvent>>>,
    waker: Arc<Mutex<Option<Waker>>>,
}

pub struct ConnectionHandle {
    id: ConnectionId,
    /// A reference to [Connection]'s pending messages
    pending_messages: Arc<Mutex<Vec<ServerEvent>>>,
    /// A reference to [Connection]'s stored [Waker]
    waker: Arc<Mutex<Option<Waker>>>,
    /// Required to remove connection when dropped
    manager: Weak<ServerSentEvents>,
}

impl ServerSentEvents {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            connections: Default::default(),
        })
    }

    pub fn broadcast(&self, event: ServerEvent) {
        let connections = self.connections.lock();

        for connection in connections.iter() {
            connection.send(event.clone())
        }
    }

    fn connect(&self) -> ConnectionHandle {
        let connection = Connection::new();
        let handle = connection.handle(self.me.clone());

        self.connections.lock().push(connection);
        handle
    }

    fn disconnect(&self, id: ConnectionId) {
        self.connections.lock().retain(|c| c.id != id)
    }
}

impl Connection {
    fn new() -> Self {
        Self {
            id: ConnectionId::new(),
            pending_messages: Default::default(),
            waker: Default::default(),
        }
    }

    fn send(&self, message: ServerEvent) {
        self.pending_messages.lock().push(message);

        if let Some(waker) = self.waker.lock().take() {
            waker.wake()
        }
    }

    fn handle(&self, manager: Weak<ServerSentEvents>) -> ConnectionHandle {
        ConnectionHandle {
            id: self.id,
            pending_messages: self.pending_messages.clone(),
            waker: self.waker.clone(),
            manager,
        }
    }
}

impl Stream for ConnectionHandle {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut pending_messages = self.pending_messages.lock();

        let next_event = pending_messages
            .pop()
            .map(|m| serde_json::to_string(&m).expect("serializes properly"));

        if let Some(event) = next_event {
            return Poll::Ready(Some(Ok(Event::default().data(event))));
        }

        *self.waker.lock() = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.disconnect(self.id)
        }
    }
}

/// Drains the event bus and fans every event out to connected clients
pub async fn forward_events(receiver: EventReceiver, sse: Arc<ServerSentEvents>) {
    info!("Forwarding events to connected clients.");

    while let Ok(event) = {
        let receiver = receiver.clone();
        spawn_blocking(move || receiver.recv()).await.expect("recv task joins")
    } {
        sse.broadcast(event.into());
    }
}

#[utoipa::path(
    get,
    path = "/events",
    tag = "events",
    responses(
        (
            status = 200,
            content_type = "text/event-stream",
            description = "A stream of events from the tuckshop",
            body = ServerEvent
        )
    )
)]
pub(crate) async fn event_stream(State(context): State<ServerContext>) -> Sse<ConnectionHandle> {
    Sse::new(context.sse.connect()).keep_alive(KeepAlive::default())
}

#[utoipa::path(
    post,
    path = "/chat",
    tag = "events",
    request_body = ChatSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 202, description = "The chat line was relayed to connected clients")
    )
)]
pub(crate) async fn send_chat(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<ChatSchema>,
) -> StatusCode {
    // Chat lines are relayed, never persisted
    context.tuckshop.events.emit(TuckshopEvent::ChatMessage {
        sender: session.user().display_name.clone(),
        text: body.text,
        time: Utc::now(),
    });

    StatusCode::ACCEPTED
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use tuckshop_core::{OrderData, OrderStatus};

    fn cola_order() -> OrderData {
        OrderData {
            id: 1,
            requester_name: "홍길동".to_string(),
            requester_role: "게임개발".to_string(),
            menu: "콜라".to_string(),
            quantity: 2,
            image: String::new(),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn events_serialize_as_a_tagged_union() {
        let event = ServerEvent::from(TuckshopEvent::NewOrder(cola_order()));
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["type"], "newOrder");
        assert_eq!(value["order"]["studentName"], "홍길동");
        assert_eq!(value["order"]["status"], "pending");

        let event = ServerEvent::from(TuckshopEvent::ChatMessage {
            sender: "홍길동".to_string(),
            text: "안녕하세요".to_string(),
            time: Utc::now(),
        });
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["type"], "chatMessage");
        assert_eq!(value["text"], "안녕하세요");
    }

    #[tokio::test]
    async fn broadcasts_reach_every_connected_client() {
        let sse = ServerSentEvents::new();

        let mut first = sse.connect();
        let mut second = sse.connect();

        sse.broadcast(ServerEvent::from(TuckshopEvent::NewOrder(cola_order())));

        for handle in [&mut first, &mut second] {
            let event = handle.next().await.expect("stream yields").unwrap();
            let data = format!("{event:?}");
            assert!(data.contains("newOrder"));
        }
    }

    #[tokio::test]
    async fn dropped_connections_are_forgotten() {
        let sse = ServerSentEvents::new();

        let handle = sse.connect();
        assert_eq!(sse.connections.lock().len(), 1);

        drop(handle);
        assert_eq!(sse.connections.lock().len(), 0);
    }

    #[tokio::test]
    async fn connecting_after_an_event_misses_it() {
        let sse = ServerSentEvents::new();

        sse.broadcast(ServerEvent::from(TuckshopEvent::NewOrder(cola_order())));

        let handle = sse.connect();
        assert!(handle.pending_messages.lock().is_empty());
    }
}
