use chrono::{DateTime, Utc};
use std::fmt::{self, Display};

/// The type used for primary keys in the database.
pub type PrimaryKey = i32;

/// What shelf an item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemCategory {
    Drink,
    Snack,
    Ramen,
}

/// The lifecycle of an order. Orders start out pending and move to exactly
/// one of the terminal statuses, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

/// The two account roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Student,
    Teacher,
}

/// A purchasable item on the tuckshop shelf
#[derive(Debug, Clone)]
pub struct ItemData {
    pub id: PrimaryKey,
    pub name: String,
    pub category: ItemCategory,
    /// Url to the item's picture on the media host
    pub image: String,
    pub in_stock: bool,
}

/// An order placed by a requester.
/// `menu` and `image` are denormalized copies of the item fields at the time
/// of ordering, there is no foreign key back to the item.
#[derive(Debug, Clone)]
pub struct OrderData {
    pub id: PrimaryKey,
    pub requester_name: String,
    /// The requester's department or class, as shown to staff
    pub requester_role: String,
    pub menu: String,
    pub quantity: i32,
    pub image: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// A tuckshop account
#[derive(Debug, Clone)]
pub struct UserData {
    pub id: PrimaryKey,
    /// The unique login id within the account's role
    pub login_id: String,
    /// Argon2 hash of the account password
    pub password: String,
    pub display_name: String,
    pub kind: UserKind,
}

/// Role-specific account details
#[derive(Debug, Clone)]
pub enum UserKind {
    Student {
        category: String,
        grade: i32,
        class_no: i32,
    },
    Teacher {
        category: String,
        department: String,
    },
}

/// Login session data for authentication
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: PrimaryKey,
    /// The session token, or key if you will
    pub token: String,
    /// The user that is logged in
    pub user: UserData,
    pub expires_at: DateTime<Utc>,
}

/// A cheer message shown on the home screens, scoped to one audience
#[derive(Debug, Clone)]
pub struct CheerData {
    pub id: PrimaryKey,
    pub message: String,
    pub target: UserRole,
    pub created_at: DateTime<Utc>,
}

/// One row of the popular menu aggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopularMenu {
    pub menu: String,
    pub total_quantity: i64,
}

impl ItemCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drink => "drink",
            Self::Snack => "snack",
            Self::Ramen => "ramen",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "drink" => Some(Self::Drink),
            "snack" => Some(Self::Snack),
            "ramen" => Some(Self::Ramen),
            _ => None,
        }
    }
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Everything except `pending` is terminal
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "student" => Some(Self::Student),
            "teacher" => Some(Self::Teacher),
            _ => None,
        }
    }
}

impl UserKind {
    pub fn role(&self) -> UserRole {
        match self {
            Self::Student { .. } => UserRole::Student,
            Self::Teacher { .. } => UserRole::Teacher,
        }
    }
}

impl UserData {
    pub fn role(&self) -> UserRole {
        self.kind.role()
    }
}

impl Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
