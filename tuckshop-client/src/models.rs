//! Wire types as the server serializes them. The client keeps its own
//! definitions so it only depends on the JSON contract, not on server
//! internals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub image: String,
    pub stock: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i32,
    pub student_name: String,
    pub user_job: String,
    pub menu: String,
    pub quantity: i32,
    pub image: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub login_id: String,
    pub name: String,
    pub role: Role,
    pub category: String,
    #[serde(default)]
    pub grade: Option<i32>,
    #[serde(default)]
    pub number: Option<i32>,
    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub token: String,
    pub role: Role,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cheer {
    pub id: i32,
    pub message: String,
    pub target: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PopularMenu {
    #[serde(rename = "_id")]
    pub menu: String,
    #[serde(rename = "totalQuantity")]
    pub total_quantity: i64,
}

/// The `{message}` acknowledgment some endpoints answer with
#[derive(Debug, Clone, Deserialize)]
pub struct Ack {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub id: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRequest {
    pub student_name: String,
    pub user_job: String,
    pub menu: String,
    pub quantity: i32,
    pub image: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDecisionRequest {
    pub status: OrderStatus,
}

/// The tagged union pushed over the event channel
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ClientEvent {
    NewOrder {
        order: Order,
    },
    OrderUpdated {
        order: Order,
    },
    NewCheer {
        cheer: Cheer,
    },
    ChatMessage {
        sender: String,
        text: String,
        time: DateTime<Utc>,
    },
}
