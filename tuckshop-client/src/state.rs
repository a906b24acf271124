use crate::{ClientEvent, Order, OrderStatus, Role};

/// Per-client reconciliation state, fed by the live event stream.
///
/// Every client receives every event and filters locally: staff keep a
/// counter of orders waiting for a decision, requesters keep a single alert
/// flag for their own processed orders. The counter is seeded once from a
/// full fetch and never reconciled afterwards, so it can drift when events
/// are missed across reconnects.
#[derive(Debug)]
pub struct ClientState {
    role: Role,
    display_name: String,
    pending_count: u32,
    alert: bool,
}

impl ClientState {
    pub fn new(role: Role, display_name: impl Into<String>) -> Self {
        Self {
            role,
            display_name: display_name.into(),
            pending_count: 0,
            alert: false,
        }
    }

    /// Seeds the staff counter from a full order fetch
    pub fn seed_orders(&mut self, orders: &[Order]) {
        self.pending_count = orders
            .iter()
            .filter(|o| o.status == OrderStatus::Pending)
            .count() as u32;
    }

    /// Orders waiting for a decision, as far as this client knows
    pub fn pending_count(&self) -> u32 {
        self.pending_count
    }

    /// Whether one of this requester's orders was processed since the last
    /// acknowledgment. Multiple updates collapse into the one flag.
    pub fn alert(&self) -> bool {
        self.alert
    }

    /// Clears the alert flag once the user has seen it
    pub fn acknowledge(&mut self) {
        self.alert = false;
    }

    pub fn apply(&mut self, event: &ClientEvent) {
        match event {
            // The counter moves on every client, it is only shown to staff
            ClientEvent::NewOrder { .. } => {
                self.pending_count += 1;
            }
            ClientEvent::OrderUpdated { order } => {
                if self.role == Role::Teacher && order.status != OrderStatus::Pending {
                    self.pending_count = self.pending_count.saturating_sub(1);
                }

                if self.role == Role::Student && order.student_name == self.display_name {
                    self.alert = true;
                }
            }
            ClientEvent::NewCheer { .. } | ClientEvent::ChatMessage { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn order(id: i32, requester: &str, status: OrderStatus) -> Order {
        Order {
            id,
            student_name: requester.to_string(),
            user_job: "게임개발".to_string(),
            menu: "콜라".to_string(),
            quantity: 2,
            image: String::new(),
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn seeding_counts_only_pending_orders() {
        let mut state = ClientState::new(Role::Teacher, "김선생");

        state.seed_orders(&[
            order(1, "홍길동", OrderStatus::Pending),
            order(2, "이몽룡", OrderStatus::Accepted),
            order(3, "성춘향", OrderStatus::Pending),
        ]);

        assert_eq!(state.pending_count(), 2);
    }

    #[test]
    fn the_counter_follows_new_orders_and_decisions() {
        let mut state = ClientState::new(Role::Teacher, "김선생");
        state.seed_orders(&[order(1, "홍길동", OrderStatus::Pending)]);

        state.apply(&ClientEvent::NewOrder {
            order: order(2, "이몽룡", OrderStatus::Pending),
        });
        assert_eq!(state.pending_count(), 2);

        state.apply(&ClientEvent::OrderUpdated {
            order: order(1, "홍길동", OrderStatus::Accepted),
        });
        assert_eq!(state.pending_count(), 1);
    }

    #[test]
    fn the_counter_never_goes_negative() {
        let mut state = ClientState::new(Role::Teacher, "김선생");

        state.apply(&ClientEvent::OrderUpdated {
            order: order(1, "홍길동", OrderStatus::Rejected),
        });

        assert_eq!(state.pending_count(), 0);
    }

    #[test]
    fn requesters_are_alerted_about_their_own_orders_only() {
        let mut state = ClientState::new(Role::Student, "홍길동");

        state.apply(&ClientEvent::OrderUpdated {
            order: order(1, "이몽룡", OrderStatus::Accepted),
        });
        assert!(!state.alert());

        state.apply(&ClientEvent::OrderUpdated {
            order: order(2, "홍길동", OrderStatus::Accepted),
        });
        assert!(state.alert());

        // Further updates collapse into the same single flag
        state.apply(&ClientEvent::OrderUpdated {
            order: order(3, "홍길동", OrderStatus::Rejected),
        });
        assert!(state.alert());

        state.acknowledge();
        assert!(!state.alert());
    }

    #[test]
    fn cheer_and_chat_leave_the_tracks_alone() {
        let mut state = ClientState::new(Role::Teacher, "김선생");

        state.apply(&ClientEvent::ChatMessage {
            sender: "홍길동".to_string(),
            text: "안녕하세요".to_string(),
            time: Utc::now(),
        });

        assert_eq!(state.pending_count(), 0);
        assert!(!state.alert());
    }

    #[test]
    fn a_full_order_lifecycle_reaches_both_tracks() {
        // 홍길동 orders 콜라 x2, staff sees one more pending order,
        // staff accepts, 홍길동 gets the alert
        let mut staff = ClientState::new(Role::Teacher, "김선생");
        let mut requester = ClientState::new(Role::Student, "홍길동");

        staff.seed_orders(&[]);

        let placed = ClientEvent::NewOrder {
            order: order(1, "홍길동", OrderStatus::Pending),
        };
        staff.apply(&placed);
        requester.apply(&placed);

        assert_eq!(staff.pending_count(), 1);
        assert!(!requester.alert());

        let accepted = ClientEvent::OrderUpdated {
            order: order(1, "홍길동", OrderStatus::Accepted),
        };
        staff.apply(&accepted);
        requester.apply(&accepted);

        assert_eq!(staff.pending_count(), 0);
        assert!(requester.alert());
    }
}
