use log::info;
use thiserror::Error;

use crate::{
    DatabaseError, NewOrder, OrderData, OrderStatus, PopularMenu, PrimaryKey, TuckshopContext,
    TuckshopEvent,
};

/// Manages the order book: placing, deciding, cancelling, and the popular
/// menu aggregation. Every mutation is published on the event bus after it
/// is durable.
pub struct OrderManager {
    context: TuckshopContext,
}

#[derive(Debug, Error)]
pub enum OrderError {
    /// The order was already moved to a terminal status. Two staff deciding
    /// at the same time resolves to first-writer-wins, the loser gets this.
    #[error("Order was already decided as {status}")]
    AlreadyDecided { status: OrderStatus },
    #[error("An order can only move to a terminal status")]
    NotTerminal,
    #[error("Only the requester may cancel their order")]
    NotRequester,
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

impl OrderManager {
    const POPULAR_LIMIT: i64 = 3;

    pub fn new(context: &TuckshopContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Places a new order. It starts out pending and is announced to every
    /// connected client as a [TuckshopEvent::NewOrder].
    pub async fn place(&self, new_order: NewOrder) -> Result<OrderData, OrderError> {
        let order = self.context.database.create_order(new_order).await?;

        info!(
            "Order {} placed by {}: {}x {}",
            order.id, order.requester_name, order.quantity, order.menu
        );

        self.context
            .events
            .emit(TuckshopEvent::NewOrder(order.clone()));

        Ok(order)
    }

    /// Moves a pending order to a terminal status. The transition is
    /// one-directional and one-shot, deciding an already decided order fails.
    pub async fn decide(
        &self,
        order_id: PrimaryKey,
        status: OrderStatus,
    ) -> Result<OrderData, OrderError> {
        if !status.is_terminal() {
            return Err(OrderError::NotTerminal);
        }

        let finalized = self.context.database.finalize_order(order_id, status).await?;

        match finalized {
            Some(order) => {
                info!("Order {} decided as {}", order.id, order.status);

                self.context
                    .events
                    .emit(TuckshopEvent::OrderUpdated(order.clone()));

                Ok(order)
            }
            None => {
                let current = self.context.database.order_by_id(order_id).await?;

                Err(OrderError::AlreadyDecided {
                    status: current.status,
                })
            }
        }
    }

    /// Cancels a pending order on behalf of its requester. Cancellation is
    /// soft, the record stays around with status cancelled.
    pub async fn cancel(
        &self,
        order_id: PrimaryKey,
        requester_name: &str,
    ) -> Result<OrderData, OrderError> {
        let order = self.context.database.order_by_id(order_id).await?;

        if order.requester_name != requester_name {
            return Err(OrderError::NotRequester);
        }

        self.decide(order_id, OrderStatus::Cancelled).await
    }

    /// Lists orders newest first, optionally narrowed to one requester
    pub async fn list(&self, requester_name: Option<&str>) -> Result<Vec<OrderData>, DatabaseError> {
        self.context.database.list_orders(requester_name).await
    }

    pub async fn by_id(&self, order_id: PrimaryKey) -> Result<OrderData, DatabaseError> {
        self.context.database.order_by_id(order_id).await
    }

    /// The top menus by total ordered quantity
    pub async fn popular(&self) -> Result<Vec<PopularMenu>, DatabaseError> {
        self.context.database.popular_menus(Self::POPULAR_LIMIT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryDatabase, Tuckshop};

    fn tuckshop() -> Tuckshop {
        Tuckshop::new(MemoryDatabase::new())
    }

    fn cola_order(requester: &str, quantity: i32) -> NewOrder {
        NewOrder {
            requester_name: requester.to_string(),
            requester_role: "게임개발".to_string(),
            menu: "콜라".to_string(),
            quantity,
            image: "https://media.example/cola.png".to_string(),
        }
    }

    #[tokio::test]
    async fn placing_an_order_starts_pending_and_announces_it_once() {
        let tuckshop = tuckshop();
        let receiver = tuckshop.events.receiver();

        let order = tuckshop
            .orders
            .place(cola_order("홍길동", 2))
            .await
            .expect("order is placed");

        assert_eq!(order.status, OrderStatus::Pending);

        let event = receiver.try_recv().expect("an event was emitted");
        match event {
            TuckshopEvent::NewOrder(announced) => {
                assert_eq!(announced.requester_name, "홍길동");
                assert_eq!(announced.menu, "콜라");
                assert_eq!(announced.quantity, 2);
            }
            other => panic!("expected NewOrder, got {other:?}"),
        }

        assert!(receiver.try_recv().is_err(), "exactly one event is emitted");
    }

    #[tokio::test]
    async fn placing_requires_the_required_fields() {
        let tuckshop = tuckshop();

        let mut missing_menu = cola_order("홍길동", 2);
        missing_menu.menu = String::new();

        let result = tuckshop.orders.place(missing_menu).await;
        assert!(matches!(
            result,
            Err(OrderError::Db(DatabaseError::Validation { .. }))
        ));

        let result = tuckshop.orders.place(cola_order("홍길동", 0)).await;
        assert!(matches!(
            result,
            Err(OrderError::Db(DatabaseError::Validation { .. }))
        ));
    }

    #[tokio::test]
    async fn decisions_are_one_shot() {
        let tuckshop = tuckshop();
        let order = tuckshop.orders.place(cola_order("홍길동", 2)).await.unwrap();

        let accepted = tuckshop
            .orders
            .decide(order.id, OrderStatus::Accepted)
            .await
            .expect("first decision succeeds");
        assert_eq!(accepted.status, OrderStatus::Accepted);

        // The second decision lost the race and must not overwrite the first
        let rejected = tuckshop.orders.decide(order.id, OrderStatus::Rejected).await;
        assert!(matches!(
            rejected,
            Err(OrderError::AlreadyDecided {
                status: OrderStatus::Accepted
            })
        ));

        let refetched = tuckshop.orders.by_id(order.id).await.unwrap();
        assert_eq!(refetched.status, OrderStatus::Accepted);
    }

    #[tokio::test]
    async fn deciding_back_to_pending_is_not_a_thing() {
        let tuckshop = tuckshop();
        let order = tuckshop.orders.place(cola_order("홍길동", 2)).await.unwrap();

        let result = tuckshop.orders.decide(order.id, OrderStatus::Pending).await;
        assert!(matches!(result, Err(OrderError::NotTerminal)));
    }

    #[tokio::test]
    async fn decisions_are_announced() {
        let tuckshop = tuckshop();
        let order = tuckshop.orders.place(cola_order("홍길동", 2)).await.unwrap();

        let receiver = tuckshop.events.receiver();
        while receiver.try_recv().is_ok() {}

        tuckshop
            .orders
            .decide(order.id, OrderStatus::Accepted)
            .await
            .unwrap();

        let event = receiver.try_recv().expect("an event was emitted");
        match event {
            TuckshopEvent::OrderUpdated(updated) => {
                assert_eq!(updated.id, order.id);
                assert_eq!(updated.status, OrderStatus::Accepted);
            }
            other => panic!("expected OrderUpdated, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelling_is_soft_and_requester_only() {
        let tuckshop = tuckshop();
        let order = tuckshop.orders.place(cola_order("홍길동", 2)).await.unwrap();

        let not_theirs = tuckshop.orders.cancel(order.id, "이몽룡").await;
        assert!(matches!(not_theirs, Err(OrderError::NotRequester)));

        let cancelled = tuckshop
            .orders
            .cancel(order.id, "홍길동")
            .await
            .expect("requester may cancel");
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        // Soft cancel keeps the record around
        let refetched = tuckshop.orders.by_id(order.id).await.unwrap();
        assert_eq!(refetched.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancelling_a_decided_order_fails() {
        let tuckshop = tuckshop();
        let order = tuckshop.orders.place(cola_order("홍길동", 2)).await.unwrap();

        tuckshop
            .orders
            .decide(order.id, OrderStatus::Accepted)
            .await
            .unwrap();

        let result = tuckshop.orders.cancel(order.id, "홍길동").await;
        assert!(matches!(result, Err(OrderError::AlreadyDecided { .. })));
    }

    #[tokio::test]
    async fn listing_narrows_to_one_requester() {
        let tuckshop = tuckshop();
        tuckshop.orders.place(cola_order("홍길동", 2)).await.unwrap();
        tuckshop.orders.place(cola_order("이몽룡", 1)).await.unwrap();

        let all = tuckshop.orders.list(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let theirs = tuckshop.orders.list(Some("홍길동")).await.unwrap();
        assert_eq!(theirs.len(), 1);
        assert_eq!(theirs[0].requester_name, "홍길동");
    }

    #[tokio::test]
    async fn newest_orders_come_first() {
        let tuckshop = tuckshop();
        let first = tuckshop.orders.place(cola_order("홍길동", 2)).await.unwrap();
        let second = tuckshop.orders.place(cola_order("홍길동", 1)).await.unwrap();

        let orders = tuckshop.orders.list(None).await.unwrap();
        assert_eq!(orders[0].id, second.id);
        assert_eq!(orders[1].id, first.id);
    }

    #[tokio::test]
    async fn popular_menus_sum_quantities_and_rank_descending() {
        let tuckshop = tuckshop();

        for quantity in [2, 3, 1] {
            tuckshop.orders.place(cola_order("홍길동", quantity)).await.unwrap();
        }

        let mut cider = cola_order("이몽룡", 5);
        cider.menu = "사이다".to_string();
        tuckshop.orders.place(cider).await.unwrap();

        let popular = tuckshop.orders.popular().await.unwrap();

        assert_eq!(popular.len(), 2);
        assert_eq!(popular[0].menu, "콜라");
        assert_eq!(popular[0].total_quantity, 6);
        assert_eq!(popular[1].menu, "사이다");
        assert_eq!(popular[1].total_quantity, 5);
    }

    #[tokio::test]
    async fn popular_menus_cap_at_three() {
        let tuckshop = tuckshop();

        for menu in ["콜라", "사이다", "새우깡", "신라면"] {
            let mut order = cola_order("홍길동", 1);
            order.menu = menu.to_string();
            tuckshop.orders.place(order).await.unwrap();
        }

        let popular = tuckshop.orders.popular().await.unwrap();
        assert_eq!(popular.len(), 3);
    }
}
