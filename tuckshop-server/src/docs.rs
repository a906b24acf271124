use std::borrow::BorrowMut;

use axum::{response::IntoResponse, Json};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::{auth, cheer, items, orders, schemas, serialized, sse, users};

#[derive(OpenApi)]
#[openapi(
    modifiers(&Security),
    info(
        description = "tuckshop-server exposes endpoints to interact with this tuckshop instance"
    ),
    paths(
        items::list_items,
        items::create_item,
        items::update_item,
        items::delete_item,
        orders::list_orders,
        orders::create_order,
        orders::decide_order,
        orders::cancel_order,
        orders::popular_menus,
        auth::login,
        auth::logout,
        auth::user,
        auth::register,
        auth::change_password,
        users::list_students,
        users::create_student,
        users::update_student,
        users::delete_student,
        users::reset_student_password,
        users::list_teachers,
        users::create_teacher,
        users::update_teacher,
        users::delete_teacher,
        users::reset_teacher_password,
        cheer::today,
        cheer::post_cheer,
        sse::event_stream,
        sse::send_chat,
    ),
    components(schemas(
        serialized::Item,
        serialized::Order,
        serialized::User,
        serialized::LoginResult,
        serialized::Cheer,
        serialized::PopularMenu,
        serialized::Message,
        serialized::UserMessage,
        sse::ServerEvent,
        schemas::LoginSchema,
        schemas::RegisterTeacherSchema,
        schemas::ChangePasswordSchema,
        schemas::ItemSchema,
        schemas::NewOrderSchema,
        schemas::OrderDecisionSchema,
        schemas::NewUserSchema,
        schemas::UpdateUserSchema,
        schemas::NewCheerSchema,
        schemas::ChatSchema,
    ))
)]
pub struct ApiDoc;

struct Security;

impl Modify for Security {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.borrow_mut() {
            let scheme = HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("Bearer <token>")
                .build();

            components.add_security_scheme("BearerAuth", SecurityScheme::Http(scheme))
        }
    }
}

pub async fn docs() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
