use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    /// A record is missing a required field
    #[error("{resource} is missing required field {field}")]
    Validation {
        resource: &'static str,
        field: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(e) => match e {
                DatabaseError::NotFound { .. } => Ok(()),
                e => Err(e),
            },
        }
    }
}

/// Represents a type that can store and fetch tuckshop data
#[async_trait]
pub trait Database: Send + Sync {
    async fn list_items(&self) -> Result<Vec<ItemData>>;
    async fn item_by_id(&self, item_id: PrimaryKey) -> Result<ItemData>;
    async fn create_item(&self, new_item: NewItem) -> Result<ItemData>;
    async fn update_item(&self, updated_item: UpdatedItem) -> Result<ItemData>;
    async fn delete_item(&self, item_id: PrimaryKey) -> Result<()>;

    /// Lists orders newest first, optionally narrowed to one requester
    async fn list_orders(&self, requester_name: Option<&str>) -> Result<Vec<OrderData>>;
    async fn order_by_id(&self, order_id: PrimaryKey) -> Result<OrderData>;
    async fn create_order(&self, new_order: NewOrder) -> Result<OrderData>;
    /// Moves a pending order to a terminal status. Returns `None` when the
    /// order exists but was already decided, so the caller can report the
    /// lost race instead of silently overwriting the earlier decision.
    async fn finalize_order(
        &self,
        order_id: PrimaryKey,
        status: OrderStatus,
    ) -> Result<Option<OrderData>>;
    /// Sums quantity per menu over all orders, highest total first
    async fn popular_menus(&self, limit: i64) -> Result<Vec<PopularMenu>>;

    /// Lists accounts of one role, sorted by login id
    async fn list_users(&self, role: UserRole) -> Result<Vec<UserData>>;
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData>;
    async fn user_by_login(&self, role: UserRole, login_id: &str) -> Result<UserData>;
    async fn count_users(&self, role: UserRole) -> Result<i64>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;
    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData>;
    async fn delete_user(&self, user_id: PrimaryKey) -> Result<()>;
    async fn set_password(&self, user_id: PrimaryKey, password: String) -> Result<UserData>;

    async fn session_by_token(&self, token: &str) -> Result<SessionData>;
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    async fn delete_session_by_token(&self, token: &str) -> Result<()>;
    async fn clear_expired_sessions(&self) -> Result<()>;

    async fn create_cheer(&self, new_cheer: NewCheer) -> Result<CheerData>;
    /// Lists cheers created within the window, newest first, optionally
    /// narrowed to one audience
    async fn cheers_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        target: Option<UserRole>,
    ) -> Result<Vec<CheerData>>;
}

#[derive(Debug)]
pub struct NewItem {
    pub name: String,
    pub category: ItemCategory,
    pub image: String,
    pub in_stock: bool,
}

#[derive(Debug)]
pub struct UpdatedItem {
    pub id: PrimaryKey,
    pub name: Option<String>,
    pub category: Option<ItemCategory>,
    pub image: Option<String>,
    pub in_stock: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub requester_name: String,
    pub requester_role: String,
    pub menu: String,
    pub quantity: i32,
    pub image: String,
}

#[derive(Debug)]
pub struct NewUser {
    pub login_id: String,
    /// Already hashed by the caller
    pub password: String,
    pub display_name: String,
    pub kind: UserKind,
}

#[derive(Debug)]
pub struct UpdatedUser {
    pub id: PrimaryKey,
    pub display_name: Option<String>,
    pub kind: Option<UserKind>,
}

#[derive(Debug)]
pub struct NewSession {
    pub token: String,
    pub user_id: PrimaryKey,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewCheer {
    pub message: String,
    pub target: UserRole,
}

impl NewItem {
    fn ensure_required(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DatabaseError::Validation {
                resource: "item",
                field: "name",
            });
        }

        Ok(())
    }
}

impl NewOrder {
    fn ensure_required(&self) -> Result<()> {
        if self.requester_name.trim().is_empty() {
            return Err(DatabaseError::Validation {
                resource: "order",
                field: "requester name",
            });
        }

        if self.menu.trim().is_empty() {
            return Err(DatabaseError::Validation {
                resource: "order",
                field: "menu",
            });
        }

        if self.quantity < 1 {
            return Err(DatabaseError::Validation {
                resource: "order",
                field: "quantity",
            });
        }

        Ok(())
    }
}

impl NewUser {
    fn ensure_required(&self) -> Result<()> {
        if self.login_id.trim().is_empty() {
            return Err(DatabaseError::Validation {
                resource: "user",
                field: "login id",
            });
        }

        Ok(())
    }
}

impl NewCheer {
    fn ensure_required(&self) -> Result<()> {
        if self.message.trim().is_empty() {
            return Err(DatabaseError::Validation {
                resource: "cheer",
                field: "message",
            });
        }

        Ok(())
    }
}
