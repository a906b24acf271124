use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json,
};
use serde::Deserialize;
use tuckshop_core::{NewCheer, UserRole};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{NewCheerSchema, ValidatedJson},
    serialized::{Cheer, ToSerialized},
    Router,
};

#[derive(Debug, Deserialize)]
pub(crate) struct CheerQuery {
    target: Option<String>,
}

#[utoipa::path(
    get,
    path = "/cheer/today",
    tag = "cheer",
    params(
        ("target" = Option<String>, Query, description = "Narrow to one audience, anything unknown is ignored")
    ),
    responses(
        (status = 200, body = Vec<Cheer>)
    )
)]
pub(crate) async fn today(
    State(context): State<ServerContext>,
    Query(query): Query<CheerQuery>,
) -> ServerResult<Json<Vec<Cheer>>> {
    // An unknown target means no filter, matching the observed behavior
    let target = query.target.as_deref().and_then(UserRole::parse);

    let cheers = context.tuckshop.cheer.today(target).await?;

    Ok(Json(cheers.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/cheer",
    tag = "cheer",
    request_body = NewCheerSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, description = "The message was posted and announced", body = Cheer),
        (status = 400, description = "Empty message or unknown target")
    )
)]
pub(crate) async fn post_cheer(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewCheerSchema>,
) -> ServerResult<(StatusCode, Json<Cheer>)> {
    session.require_teacher()?;

    let target = UserRole::parse(&body.target)
        .ok_or_else(|| ServerError::Validation(format!("Unknown target {}", body.target)))?;

    let cheer = context
        .tuckshop
        .cheer
        .post(NewCheer {
            message: body.message,
            target,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(cheer.to_serialized())))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(post_cheer))
        .route("/today", get(today))
}
