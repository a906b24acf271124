use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::error;
use thiserror::Error;
use tuckshop_core::{AuthError, DatabaseError, OrderError};

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("{0}")]
    Validation(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("A teacher account already exists")]
    TeacherExists,
    #[error("Order was already decided as {0}")]
    AlreadyDecided(String),
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::TeacherExists => StatusCode::CONFLICT,
            Self::AlreadyDecided(_) => StatusCode::CONFLICT,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        // Internal detail is logged, the client gets an opaque message
        if let Self::Unknown(detail) = &self {
            error!("Request failed: {detail}");
            return (self.as_status_code(), "Internal server error").into_response();
        }

        (self.as_status_code(), self.to_string()).into_response()
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::UnknownUser { .. } => Self::NotFound {
                resource: "user",
                identifier: "login id",
            },
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::TeacherExists => Self::TeacherExists,
            AuthError::Db(e) => e.into(),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            DatabaseError::Conflict {
                resource,
                field,
                value,
            } => Self::Conflict {
                resource,
                field,
                value,
            },
            DatabaseError::Validation { resource, field } => {
                Self::Validation(format!("{resource} is missing required field {field}"))
            }
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<OrderError> for ServerError {
    fn from(value: OrderError) -> Self {
        match value {
            OrderError::AlreadyDecided { status } => Self::AlreadyDecided(status.to_string()),
            OrderError::NotTerminal => {
                Self::Validation("An order can only move to a terminal status".to_string())
            }
            OrderError::NotRequester => Self::Forbidden("Only the requester may cancel an order"),
            OrderError::Db(e) => e.into(),
        }
    }
}
