use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{header, request::Parts, StatusCode},
    routing::{get, post},
    Json,
};
use tuckshop_core::{Credentials, NewTeacherAccount, SessionData, UserData, UserRole};

use crate::{
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{
        parse_role, ChangePasswordSchema, LoginSchema, RegisterTeacherSchema, ValidatedJson,
    },
    serialized::{LoginResult, Message, ToSerialized, User},
    Router,
};

/// Wraps [SessionData] so [FromRequestParts] can be implemented for it
pub struct Session(SessionData);

impl Session {
    /// Returns the user of the session
    pub fn user(&self) -> &UserData {
        &self.0.user
    }

    pub fn token(&self) -> &str {
        &self.0.token
    }

    /// Staff-only routes call this before touching anything
    pub fn require_teacher(&self) -> Result<&UserData, ServerError> {
        match self.user().role() {
            UserRole::Teacher => Ok(self.user()),
            UserRole::Student => Err(ServerError::Forbidden("Teachers only")),
        }
    }
}

#[async_trait]
impl FromRequestParts<ServerContext> for Session {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        let context = ServerContext::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|x| x.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "Missing authorization"))?;

        let parts: Vec<_> = token.split_ascii_whitespace().collect();

        if parts.first() != Some(&"Bearer") {
            return Err((StatusCode::BAD_REQUEST, "Authorization must be Bearer"));
        }

        let token = parts.last().cloned().unwrap_or_default();

        let session = context
            .tuckshop
            .auth
            .session(token)
            .await
            .map_err(|_| (StatusCode::UNAUTHORIZED, "Session does not exist"))?;

        Ok(Self(session))
    }
}

#[utoipa::path(
    post,
    path = "/auth",
    tag = "auth",
    request_body = LoginSchema,
    responses(
        (status = 200, body = LoginResult),
        (status = 401, description = "Password does not match"),
        (status = 404, description = "No account with this login id exists within the role")
    )
)]
pub(crate) async fn login(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<LoginSchema>,
) -> ServerResult<Json<LoginResult>> {
    let role = parse_role(&body.role)?;

    let session = context
        .tuckshop
        .auth
        .login(Credentials {
            role,
            login_id: body.id,
            password: body.password,
        })
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/auth",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Message)
    )
)]
pub(crate) async fn logout(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Message>> {
    context.tuckshop.auth.logout(session.token()).await?;

    Ok(Json(Message::new("Logged out")))
}

#[utoipa::path(
    get,
    path = "/auth/user",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User)
    )
)]
pub(crate) async fn user(session: Session) -> Json<User> {
    Json(session.user().to_serialized())
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterTeacherSchema,
    responses(
        (status = 201, body = User),
        (status = 409, description = "A teacher account already exists")
    )
)]
pub(crate) async fn register(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<RegisterTeacherSchema>,
) -> ServerResult<(StatusCode, Json<User>)> {
    let teacher = context
        .tuckshop
        .auth
        .register_first_teacher(NewTeacherAccount {
            login_id: body.id,
            password: body.password,
            display_name: body.name,
            category: body.category,
            department: body.department,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(teacher.to_serialized())))
}

#[utoipa::path(
    post,
    path = "/auth/change-password",
    tag = "auth",
    request_body = ChangePasswordSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Message),
        (status = 401, description = "Current password does not match")
    )
)]
pub(crate) async fn change_password(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<ChangePasswordSchema>,
) -> ServerResult<Json<Message>> {
    context
        .tuckshop
        .auth
        .change_password(session.user().id, &body.current_password, &body.new_password)
        .await?;

    Ok(Json(Message::new("Password changed")))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(login).delete(logout))
        .route("/user", get(user))
        .route("/register", post(register))
        .route("/change-password", post(change_password))
}
