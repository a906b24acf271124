use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json,
};
use tuckshop_core::{NewItem, UpdatedItem};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{parse_category, ItemSchema, ValidatedJson},
    serialized::{Item, Message, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    responses(
        (status = 200, body = Vec<Item>)
    )
)]
pub(crate) async fn list_items(State(context): State<ServerContext>) -> ServerResult<Json<Vec<Item>>> {
    let items = context.tuckshop.items.list().await?;

    Ok(Json(items.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    request_body = ItemSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = Item)
    )
)]
pub(crate) async fn create_item(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<ItemSchema>,
) -> ServerResult<(StatusCode, Json<Item>)> {
    session.require_teacher()?;

    let item = context
        .tuckshop
        .items
        .create(NewItem {
            name: body.name,
            category: parse_category(&body.item_type)?,
            image: body.image,
            in_stock: body.stock,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(item.to_serialized())))
}

#[utoipa::path(
    put,
    path = "/items/{id}",
    tag = "items",
    request_body = ItemSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Item)
    )
)]
pub(crate) async fn update_item(
    session: Session,
    State(context): State<ServerContext>,
    Path(item_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<ItemSchema>,
) -> ServerResult<Json<Item>> {
    session.require_teacher()?;

    let item = context
        .tuckshop
        .items
        .update(UpdatedItem {
            id: item_id,
            name: Some(body.name),
            category: Some(parse_category(&body.item_type)?),
            image: Some(body.image),
            in_stock: Some(body.stock),
        })
        .await?;

    Ok(Json(item.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "items",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Message)
    )
)]
pub(crate) async fn delete_item(
    session: Session,
    State(context): State<ServerContext>,
    Path(item_id): Path<i32>,
) -> ServerResult<Json<Message>> {
    session.require_teacher()?;

    context.tuckshop.items.delete(item_id).await?;

    Ok(Json(Message::new("Item deleted")))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/:id", axum::routing::put(update_item).delete(delete_item))
}
