//! All schemas that are exposed from endpoints are defined here
//! along with the conversions from the core data types

use chrono::{DateTime, Utc};
use serde::Serialize;
use tuckshop_core::{
    CheerData, ItemData, OrderData, PopularMenu as CorePopularMenu, SessionData, UserData,
    UserKind,
};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    id: i32,
    name: String,
    #[serde(rename = "type")]
    item_type: String,
    image: String,
    stock: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: i32,
    student_name: String,
    user_job: String,
    menu: String,
    quantity: i32,
    image: String,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: i32,
    login_id: String,
    name: String,
    role: String,
    category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    grade: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    number: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    department: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    token: String,
    role: String,
    user: User,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Cheer {
    id: i32,
    message: String,
    target: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PopularMenu {
    #[serde(rename = "_id")]
    menu: String,
    #[serde(rename = "totalQuantity")]
    total_quantity: i64,
}

/// The `{message}` acknowledgment body
#[derive(Debug, Serialize, ToSchema)]
pub struct Message {
    message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Acknowledgment carrying the affected account
#[derive(Debug, Serialize, ToSchema)]
pub struct UserMessage {
    message: String,
    user: User,
}

impl UserMessage {
    pub fn new(message: impl Into<String>, user: &UserData) -> Self {
        Self {
            message: message.into(),
            user: user.to_serialized(),
        }
    }
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<Item> for ItemData {
    fn to_serialized(&self) -> Item {
        Item {
            id: self.id,
            name: self.name.clone(),
            item_type: self.category.as_str().to_string(),
            image: self.image.clone(),
            stock: self.in_stock,
        }
    }
}

impl ToSerialized<Order> for OrderData {
    fn to_serialized(&self) -> Order {
        Order {
            id: self.id,
            student_name: self.requester_name.clone(),
            user_job: self.requester_role.clone(),
            menu: self.menu.clone(),
            quantity: self.quantity,
            image: self.image.clone(),
            status: self.status.as_str().to_string(),
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        let (category, grade, number, department) = match &self.kind {
            UserKind::Student {
                category,
                grade,
                class_no,
            } => (category.clone(), Some(*grade), Some(*class_no), None),
            UserKind::Teacher {
                category,
                department,
            } => (category.clone(), None, None, Some(department.clone())),
        };

        User {
            id: self.id,
            login_id: self.login_id.clone(),
            name: self.display_name.clone(),
            role: self.role().as_str().to_string(),
            category,
            grade,
            number,
            department,
        }
    }
}

impl ToSerialized<LoginResult> for SessionData {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            token: self.token.clone(),
            role: self.user.role().as_str().to_string(),
            user: self.user.to_serialized(),
        }
    }
}

impl ToSerialized<Cheer> for CheerData {
    fn to_serialized(&self) -> Cheer {
        Cheer {
            id: self.id,
            message: self.message.clone(),
            target: self.target.as_str().to_string(),
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<PopularMenu> for CorePopularMenu {
    fn to_serialized(&self) -> PopularMenu {
        PopularMenu {
            menu: self.menu.clone(),
            total_quantity: self.total_quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuckshop_core::ItemCategory;

    #[test]
    fn wire_names_match_the_observed_surface() {
        let item = ItemData {
            id: 1,
            name: "콜라".to_string(),
            category: ItemCategory::Drink,
            image: "https://media.example/cola.png".to_string(),
            in_stock: true,
        };

        let value = serde_json::to_value(item.to_serialized()).unwrap();
        assert_eq!(value["type"], "drink");
        assert_eq!(value["stock"], true);

        let popular = CorePopularMenu {
            menu: "콜라".to_string(),
            total_quantity: 6,
        };

        let value = serde_json::to_value(popular.to_serialized()).unwrap();
        assert_eq!(value["_id"], "콜라");
        assert_eq!(value["totalQuantity"], 6);
    }
}
