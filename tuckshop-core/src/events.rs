use chrono::{DateTime, Utc};
use crossbeam::channel::{unbounded, Receiver, Sender};

use crate::{CheerData, OrderData};

pub type EventReceiver = Receiver<TuckshopEvent>;

/// Events emitted by the tuckshop system.
///
/// Delivery is best-effort and at-most-once: the bus holds no history, so a
/// consumer attached after an emit never sees it.
#[derive(Debug, Clone)]
pub enum TuckshopEvent {
    /// An order was placed and is waiting for a decision
    NewOrder(OrderData),
    /// An order moved to a terminal status
    OrderUpdated(OrderData),
    /// A cheer message was posted
    NewCheer(CheerData),
    /// A chat line relayed between connected clients, never persisted
    ChatMessage {
        sender: String,
        text: String,
        time: DateTime<Utc>,
    },
}

/// The event bus shared between the managers and whoever fans events out to
/// connected clients. Constructed once and handed to every component that
/// needs it, there is no process-wide instance.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: Sender<TuckshopEvent>,
    receiver: Receiver<TuckshopEvent>,
}

impl EventBus {
    pub fn emit(&self, event: TuckshopEvent) {
        self.sender.send(event).unwrap();
    }

    /// Returns a handle for draining emitted events. Handles share the
    /// underlying queue, so exactly one consumer should drain it.
    pub fn receiver(&self) -> EventReceiver {
        self.receiver.clone()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }
}
