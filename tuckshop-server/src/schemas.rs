use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use tuckshop_core::{ItemCategory, OrderStatus, UserRole};
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::ServerError;

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginSchema {
    #[validate(length(min = 1, max = 128))]
    pub id: String,
    #[validate(length(max = 64))]
    pub password: String,
    pub role: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterTeacherSchema {
    #[validate(length(min = 1, max = 128))]
    pub id: String,
    #[validate(length(min = 4, max = 64))]
    pub password: String,
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(max = 128))]
    pub category: String,
    #[validate(length(max = 128))]
    pub department: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChangePasswordSchema {
    #[validate(length(min = 1, max = 64))]
    pub current_password: String,
    #[validate(length(min = 4, max = 64))]
    pub new_password: String,
}

/// Covers both creating and replacing an item
#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ItemSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[validate(length(max = 1024))]
    pub image: String,
    pub stock: bool,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewOrderSchema {
    #[validate(length(min = 1, max = 128))]
    pub student_name: String,
    #[validate(length(max = 128))]
    pub user_job: String,
    #[validate(length(min = 1, max = 128))]
    pub menu: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(length(max = 1024))]
    pub image: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderDecisionSchema {
    pub status: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewUserSchema {
    #[validate(length(min = 1, max = 128))]
    pub id: String,
    #[validate(length(max = 64))]
    pub password: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(max = 128))]
    pub category: Option<String>,
    pub grade: Option<i32>,
    pub number: Option<i32>,
    #[validate(length(max = 128))]
    pub department: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    #[validate(length(max = 128))]
    pub category: Option<String>,
    pub grade: Option<i32>,
    pub number: Option<i32>,
    #[validate(length(max = 128))]
    pub department: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCheerSchema {
    #[validate(length(min = 1, max = 512))]
    pub message: String,
    pub target: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChatSchema {
    #[validate(length(min = 1, max = 512))]
    pub text: String,
}

pub fn parse_role(value: &str) -> Result<UserRole, ServerError> {
    UserRole::parse(value).ok_or_else(|| ServerError::Validation(format!("Unknown role {value}")))
}

pub fn parse_category(value: &str) -> Result<ItemCategory, ServerError> {
    ItemCategory::parse(value)
        .ok_or_else(|| ServerError::Validation(format!("Unknown item type {value}")))
}

pub fn parse_status(value: &str) -> Result<OrderStatus, ServerError> {
    OrderStatus::parse(value)
        .ok_or_else(|| ServerError::Validation(format!("Unknown order status {value}")))
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|_| (StatusCode::BAD_REQUEST, "JSON parse failed"))?;

        extracted_json
            .0
            .validate()
            .map_err(|_| (StatusCode::BAD_REQUEST, "Request body is invalid"))?;

        Ok(Self(extracted_json.0))
    }
}
