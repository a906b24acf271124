use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crossbeam::atomic::AtomicCell;
use dashmap::DashMap;
use std::collections::HashMap;

use crate::{
    CheerData, Database, DatabaseError, DatabaseResult, ItemData, NewCheer, NewItem, NewOrder,
    NewSession, NewUser, OrderData, OrderStatus, PopularMenu, PrimaryKey, Result, SessionData,
    UpdatedItem, UpdatedUser, UserData, UserRole,
};

/// An in-memory database implementation for tuckshop, used by tests and
/// local development. Consistency matches the document store being modeled:
/// single-record writes are atomic, nothing spans records.
#[derive(Default)]
pub struct MemoryDatabase {
    id_counter: AtomicCell<PrimaryKey>,
    items: DashMap<PrimaryKey, ItemData>,
    orders: DashMap<PrimaryKey, OrderData>,
    users: DashMap<PrimaryKey, UserData>,
    sessions: DashMap<String, SessionData>,
    cheers: DashMap<PrimaryKey, CheerData>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> PrimaryKey {
        self.id_counter.fetch_add(1) + 1
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn list_items(&self) -> Result<Vec<ItemData>> {
        let mut items: Vec<_> = self.items.iter().map(|i| i.clone()).collect();
        items.sort_by_key(|i| i.id);

        Ok(items)
    }

    async fn item_by_id(&self, item_id: PrimaryKey) -> Result<ItemData> {
        self.items
            .get(&item_id)
            .map(|i| i.clone())
            .ok_or(DatabaseError::NotFound {
                resource: "item",
                identifier: "id",
            })
    }

    async fn create_item(&self, new_item: NewItem) -> Result<ItemData> {
        new_item.ensure_required()?;

        let item = ItemData {
            id: self.next_id(),
            name: new_item.name,
            category: new_item.category,
            image: new_item.image,
            in_stock: new_item.in_stock,
        };

        self.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update_item(&self, updated_item: UpdatedItem) -> Result<ItemData> {
        let mut item = self
            .items
            .get_mut(&updated_item.id)
            .ok_or(DatabaseError::NotFound {
                resource: "item",
                identifier: "id",
            })?;

        if let Some(name) = updated_item.name {
            item.name = name;
        }
        if let Some(category) = updated_item.category {
            item.category = category;
        }
        if let Some(image) = updated_item.image {
            item.image = image;
        }
        if let Some(in_stock) = updated_item.in_stock {
            item.in_stock = in_stock;
        }

        Ok(item.clone())
    }

    async fn delete_item(&self, item_id: PrimaryKey) -> Result<()> {
        self.items
            .remove(&item_id)
            .map(|_| ())
            .ok_or(DatabaseError::NotFound {
                resource: "item",
                identifier: "id",
            })
    }

    async fn list_orders(&self, requester_name: Option<&str>) -> Result<Vec<OrderData>> {
        let mut orders: Vec<_> = self
            .orders
            .iter()
            .filter(|o| requester_name.map_or(true, |name| o.requester_name == name))
            .map(|o| o.clone())
            .collect();

        orders.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(orders)
    }

    async fn order_by_id(&self, order_id: PrimaryKey) -> Result<OrderData> {
        self.orders
            .get(&order_id)
            .map(|o| o.clone())
            .ok_or(DatabaseError::NotFound {
                resource: "order",
                identifier: "id",
            })
    }

    async fn create_order(&self, new_order: NewOrder) -> Result<OrderData> {
        new_order.ensure_required()?;

        let order = OrderData {
            id: self.next_id(),
            requester_name: new_order.requester_name,
            requester_role: new_order.requester_role,
            menu: new_order.menu,
            quantity: new_order.quantity,
            image: new_order.image,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };

        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn finalize_order(
        &self,
        order_id: PrimaryKey,
        status: OrderStatus,
    ) -> Result<Option<OrderData>> {
        let mut order = self
            .orders
            .get_mut(&order_id)
            .ok_or(DatabaseError::NotFound {
                resource: "order",
                identifier: "id",
            })?;

        if order.status != OrderStatus::Pending {
            return Ok(None);
        }

        order.status = status;
        Ok(Some(order.clone()))
    }

    async fn popular_menus(&self, limit: i64) -> Result<Vec<PopularMenu>> {
        let mut totals: HashMap<String, i64> = HashMap::new();

        for order in self.orders.iter() {
            *totals.entry(order.menu.clone()).or_default() += order.quantity as i64;
        }

        let mut menus: Vec<_> = totals
            .into_iter()
            .map(|(menu, total_quantity)| PopularMenu {
                menu,
                total_quantity,
            })
            .collect();

        menus.sort_by(|a, b| {
            b.total_quantity
                .cmp(&a.total_quantity)
                .then_with(|| a.menu.cmp(&b.menu))
        });
        menus.truncate(limit as usize);

        Ok(menus)
    }

    async fn list_users(&self, role: UserRole) -> Result<Vec<UserData>> {
        let mut users: Vec<_> = self
            .users
            .iter()
            .filter(|u| u.role() == role)
            .map(|u| u.clone())
            .collect();

        users.sort_by(|a, b| a.login_id.cmp(&b.login_id));
        Ok(users)
    }

    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        self.users
            .get(&user_id)
            .map(|u| u.clone())
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })
    }

    async fn user_by_login(&self, role: UserRole, login_id: &str) -> Result<UserData> {
        self.users
            .iter()
            .find(|u| u.role() == role && u.login_id == login_id)
            .map(|u| u.clone())
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "login id",
            })
    }

    async fn count_users(&self, role: UserRole) -> Result<i64> {
        Ok(self.users.iter().filter(|u| u.role() == role).count() as i64)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        new_user.ensure_required()?;

        self.user_by_login(new_user.kind.role(), &new_user.login_id)
            .await
            .conflict_or_ok("user", "login id", &new_user.login_id)?;

        let user = UserData {
            id: self.next_id(),
            login_id: new_user.login_id,
            password: new_user.password,
            display_name: new_user.display_name,
            kind: new_user.kind,
        };

        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData> {
        let mut user = self
            .users
            .get_mut(&updated_user.id)
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })?;

        if let Some(display_name) = updated_user.display_name {
            user.display_name = display_name;
        }
        if let Some(kind) = updated_user.kind {
            user.kind = kind;
        }

        Ok(user.clone())
    }

    async fn delete_user(&self, user_id: PrimaryKey) -> Result<()> {
        self.users
            .remove(&user_id)
            .map(|_| ())
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })
    }

    async fn set_password(&self, user_id: PrimaryKey, password: String) -> Result<UserData> {
        let mut user = self
            .users
            .get_mut(&user_id)
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })?;

        user.password = password;
        Ok(user.clone())
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        self.sessions
            .get(token)
            .map(|s| s.clone())
            .ok_or(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        self.session_by_token(&new_session.token)
            .await
            .conflict_or_ok("session", "token", &new_session.token)?;

        let user = self.user_by_id(new_session.user_id).await?;

        let session = SessionData {
            id: self.next_id(),
            token: new_session.token,
            user,
            expires_at: new_session.expires_at,
        };

        self.sessions.insert(session.token.clone(), session.clone());
        Ok(session)
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        self.sessions
            .remove(token)
            .map(|_| ())
            .ok_or(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            })
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        let now = Utc::now();
        self.sessions.retain(|_, session| session.expires_at > now);

        Ok(())
    }

    async fn create_cheer(&self, new_cheer: NewCheer) -> Result<CheerData> {
        new_cheer.ensure_required()?;

        let cheer = CheerData {
            id: self.next_id(),
            message: new_cheer.message,
            target: new_cheer.target,
            created_at: Utc::now(),
        };

        self.cheers.insert(cheer.id, cheer.clone());
        Ok(cheer)
    }

    async fn cheers_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        target: Option<UserRole>,
    ) -> Result<Vec<CheerData>> {
        let mut cheers: Vec<_> = self
            .cheers
            .iter()
            .filter(|c| c.created_at >= start && c.created_at <= end)
            .filter(|c| target.map_or(true, |t| c.target == t))
            .map(|c| c.clone())
            .collect();

        cheers.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(cheers)
    }
}
