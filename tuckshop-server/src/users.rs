use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json,
};
use tuckshop_core::{NewAccount, UpdatedUser, UserData, UserKind, UserRole};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{NewUserSchema, UpdateUserSchema, ValidatedJson},
    serialized::{ToSerialized, User, UserMessage},
    Router,
};

/// The student and teacher routers share all their logic, the only
/// difference is which role collection they touch.

async fn list(context: &ServerContext, role: UserRole) -> ServerResult<Json<Vec<User>>> {
    let users = context.tuckshop.users.list(role).await?;

    Ok(Json(users.to_serialized()))
}

async fn create(
    context: &ServerContext,
    role: UserRole,
    body: NewUserSchema,
) -> ServerResult<(StatusCode, Json<UserMessage>)> {
    let kind = match role {
        UserRole::Student => UserKind::Student {
            category: body.category.unwrap_or_default(),
            grade: body.grade.unwrap_or_default(),
            class_no: body.number.unwrap_or_default(),
        },
        UserRole::Teacher => UserKind::Teacher {
            category: body.category.unwrap_or_default(),
            department: body.department.unwrap_or_default(),
        },
    };

    let user = context
        .tuckshop
        .users
        .create(NewAccount {
            login_id: body.id,
            password: body.password,
            display_name: body.name,
            kind,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserMessage::new("Account registered", &user)),
    ))
}

/// Records reached through the wrong role's router stay invisible
fn ensure_role(user: &UserData, role: UserRole) -> ServerResult<()> {
    if user.role() != role {
        return Err(ServerError::NotFound {
            resource: "user",
            identifier: "id",
        });
    }

    Ok(())
}

async fn update(
    context: &ServerContext,
    role: UserRole,
    user_id: i32,
    body: UpdateUserSchema,
) -> ServerResult<Json<UserMessage>> {
    let current = context.tuckshop.users.by_id(user_id).await?;
    ensure_role(&current, role)?;

    let kind = match current.kind {
        UserKind::Student {
            category,
            grade,
            class_no,
        } => UserKind::Student {
            category: body.category.unwrap_or(category),
            grade: body.grade.unwrap_or(grade),
            class_no: body.number.unwrap_or(class_no),
        },
        UserKind::Teacher {
            category,
            department,
        } => UserKind::Teacher {
            category: body.category.unwrap_or(category),
            department: body.department.unwrap_or(department),
        },
    };

    let user = context
        .tuckshop
        .users
        .update(UpdatedUser {
            id: user_id,
            display_name: body.name,
            kind: Some(kind),
        })
        .await?;

    Ok(Json(UserMessage::new("Account updated", &user)))
}

async fn delete(
    context: &ServerContext,
    role: UserRole,
    user_id: i32,
) -> ServerResult<Json<UserMessage>> {
    let user = context.tuckshop.users.by_id(user_id).await?;
    ensure_role(&user, role)?;

    context.tuckshop.users.delete(user_id).await?;

    Ok(Json(UserMessage::new("Account deleted", &user)))
}

async fn reset_password(
    context: &ServerContext,
    role: UserRole,
    user_id: i32,
) -> ServerResult<Json<UserMessage>> {
    let current = context.tuckshop.users.by_id(user_id).await?;
    ensure_role(&current, role)?;

    let user = context.tuckshop.users.reset_password(user_id).await?;

    Ok(Json(UserMessage::new("Password reset", &user)))
}

#[utoipa::path(
    get,
    path = "/students",
    tag = "users",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<User>)
    )
)]
pub(crate) async fn list_students(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<User>>> {
    session.require_teacher()?;
    list(&context, UserRole::Student).await
}

#[utoipa::path(
    post,
    path = "/students",
    tag = "users",
    request_body = NewUserSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = UserMessage)
    )
)]
pub(crate) async fn create_student(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewUserSchema>,
) -> ServerResult<(StatusCode, Json<UserMessage>)> {
    session.require_teacher()?;
    create(&context, UserRole::Student, body).await
}

#[utoipa::path(
    put,
    path = "/students/{id}",
    tag = "users",
    request_body = UpdateUserSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = UserMessage)
    )
)]
pub(crate) async fn update_student(
    session: Session,
    State(context): State<ServerContext>,
    Path(user_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<UpdateUserSchema>,
) -> ServerResult<Json<UserMessage>> {
    session.require_teacher()?;
    update(&context, UserRole::Student, user_id, body).await
}

#[utoipa::path(
    delete,
    path = "/students/{id}",
    tag = "users",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = UserMessage)
    )
)]
pub(crate) async fn delete_student(
    session: Session,
    State(context): State<ServerContext>,
    Path(user_id): Path<i32>,
) -> ServerResult<Json<UserMessage>> {
    session.require_teacher()?;
    delete(&context, UserRole::Student, user_id).await
}

#[utoipa::path(
    patch,
    path = "/students/{id}/reset-password",
    tag = "users",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Password is back on the default", body = UserMessage)
    )
)]
pub(crate) async fn reset_student_password(
    session: Session,
    State(context): State<ServerContext>,
    Path(user_id): Path<i32>,
) -> ServerResult<Json<UserMessage>> {
    session.require_teacher()?;
    reset_password(&context, UserRole::Student, user_id).await
}

#[utoipa::path(
    get,
    path = "/teachers",
    tag = "users",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<User>)
    )
)]
pub(crate) async fn list_teachers(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<User>>> {
    session.require_teacher()?;
    list(&context, UserRole::Teacher).await
}

#[utoipa::path(
    post,
    path = "/teachers",
    tag = "users",
    request_body = NewUserSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = UserMessage)
    )
)]
pub(crate) async fn create_teacher(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewUserSchema>,
) -> ServerResult<(StatusCode, Json<UserMessage>)> {
    session.require_teacher()?;
    create(&context, UserRole::Teacher, body).await
}

#[utoipa::path(
    put,
    path = "/teachers/{id}",
    tag = "users",
    request_body = UpdateUserSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = UserMessage)
    )
)]
pub(crate) async fn update_teacher(
    session: Session,
    State(context): State<ServerContext>,
    Path(user_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<UpdateUserSchema>,
) -> ServerResult<Json<UserMessage>> {
    session.require_teacher()?;
    update(&context, UserRole::Teacher, user_id, body).await
}

#[utoipa::path(
    delete,
    path = "/teachers/{id}",
    tag = "users",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = UserMessage)
    )
)]
pub(crate) async fn delete_teacher(
    session: Session,
    State(context): State<ServerContext>,
    Path(user_id): Path<i32>,
) -> ServerResult<Json<UserMessage>> {
    session.require_teacher()?;
    delete(&context, UserRole::Teacher, user_id).await
}

#[utoipa::path(
    patch,
    path = "/teachers/{id}/reset-password",
    tag = "users",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Password is back on the default", body = UserMessage)
    )
)]
pub(crate) async fn reset_teacher_password(
    session: Session,
    State(context): State<ServerContext>,
    Path(user_id): Path<i32>,
) -> ServerResult<Json<UserMessage>> {
    session.require_teacher()?;
    reset_password(&context, UserRole::Teacher, user_id).await
}

pub fn students_router() -> Router {
    Router::new()
        .route("/", get(list_students).post(create_student))
        .route(
            "/:id",
            axum::routing::put(update_student).delete(delete_student),
        )
        .route(
            "/:id/reset-password",
            axum::routing::patch(reset_student_password),
        )
}

pub fn teachers_router() -> Router {
    Router::new()
        .route("/", get(list_teachers).post(create_teacher))
        .route(
            "/:id",
            axum::routing::put(update_teacher).delete(delete_teacher),
        )
        .route(
            "/:id/reset-password",
            axum::routing::patch(reset_teacher_password),
        )
}
