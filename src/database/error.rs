use std::fmt::{self, Display};

use serde::Serialize;
use thiserror::Error;
use warp::{http::StatusCode, reject};

use super::schema::Id;

#[derive(Debug)]
pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(e),
            sqlx::Error::RowNotFound => Self::new(String::from("RowNotFound")),
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("Column not found: {e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            other => Self::new(format!("{other}")),
        }
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for QueryError {}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: Id },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("Query failed {0}")]
    Query(#[from] QueryError),
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    pub detail: String,
}

impl ApiError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: Id) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::Validation { field, message } => ErrorBody {
                error: "validation_error",
                field: Some(*field),
                detail: message.to_owned(),
            },
            ApiError::NotFound { entity, .. } => ErrorBody {
                error: "not_found",
                field: Some(*entity),
                detail: self.to_string(),
            },
            ApiError::Conflict(info) => ErrorBody {
                error: "conflict",
                field: None,
                detail: info.to_owned(),
            },
            ApiError::Forbidden(info) => ErrorBody {
                error: "forbidden",
                field: None,
                detail: info.to_owned(),
            },
            ApiError::Unauthenticated(info) => ErrorBody {
                error: "unauthenticated",
                field: None,
                detail: info.to_owned(),
            },
            ApiError::Query(_) => ErrorBody {
                error: "internal_error",
                field: None,
                detail: String::from("Internal server error"),
            },
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(value: sqlx::Error) -> Self {
        ApiError::Query(QueryError::from(value))
    }
}

impl reject::Reject for ApiError {}
