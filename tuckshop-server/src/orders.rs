use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json,
};
use serde::Deserialize;
use tuckshop_core::NewOrder;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{parse_status, NewOrderSchema, OrderDecisionSchema, ValidatedJson},
    serialized::{Message, Order, PopularMenu, ToSerialized},
    Router,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrdersQuery {
    student_name: Option<String>,
}

#[utoipa::path(
    get,
    path = "/orders",
    tag = "orders",
    params(
        ("studentName" = Option<String>, Query, description = "Narrow the list to one requester")
    ),
    responses(
        (status = 200, body = Vec<Order>)
    )
)]
pub(crate) async fn list_orders(
    State(context): State<ServerContext>,
    Query(query): Query<OrdersQuery>,
) -> ServerResult<Json<Vec<Order>>> {
    let orders = context
        .tuckshop
        .orders
        .list(query.student_name.as_deref())
        .await?;

    Ok(Json(orders.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/orders",
    tag = "orders",
    request_body = NewOrderSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, description = "The order was placed and announced", body = Order)
    )
)]
pub(crate) async fn create_order(
    _session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewOrderSchema>,
) -> ServerResult<(StatusCode, Json<Order>)> {
    let order = context
        .tuckshop
        .orders
        .place(NewOrder {
            requester_name: body.student_name,
            requester_role: body.user_job,
            menu: body.menu,
            quantity: body.quantity,
            image: body.image,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(order.to_serialized())))
}

#[utoipa::path(
    patch,
    path = "/orders/{id}",
    tag = "orders",
    request_body = OrderDecisionSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The order was decided and announced", body = Order),
        (status = 409, description = "The order was already decided")
    )
)]
pub(crate) async fn decide_order(
    session: Session,
    State(context): State<ServerContext>,
    Path(order_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<OrderDecisionSchema>,
) -> ServerResult<Json<Order>> {
    session.require_teacher()?;

    let status = parse_status(&body.status)?;
    let order = context.tuckshop.orders.decide(order_id, status).await?;

    Ok(Json(order.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/orders/{id}",
    tag = "orders",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The order was cancelled and announced", body = Message),
        (status = 403, description = "Someone else's order")
    )
)]
pub(crate) async fn cancel_order(
    session: Session,
    State(context): State<ServerContext>,
    Path(order_id): Path<i32>,
) -> ServerResult<Json<Message>> {
    context
        .tuckshop
        .orders
        .cancel(order_id, &session.user().display_name)
        .await?;

    Ok(Json(Message::new("Order cancelled")))
}

#[utoipa::path(
    get,
    path = "/orders/popular",
    tag = "orders",
    responses(
        (status = 200, description = "The top menus by total ordered quantity", body = Vec<PopularMenu>)
    )
)]
pub(crate) async fn popular_menus(
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<PopularMenu>>> {
    let menus = context.tuckshop.orders.popular().await?;

    Ok(Json(menus.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/popular", get(popular_menus))
        .route(
            "/:id",
            axum::routing::patch(decide_order).delete(cancel_order),
        )
}
