use std::{convert::Infallible, sync::Arc};

use log::error;
use warp::{
    http::StatusCode,
    reject::{self, Rejection},
    Filter, Reply,
};

use crate::{
    constants::SESSION_COOKIE,
    error::{ApiError, ErrorBody},
};

use super::jwt::{verify_jwt_session, SessionData};

pub fn with_session(
    secret: Arc<String>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).and_then(move |session: Option<String>| {
        let secret = secret.clone();
        async move {
            let token = session.ok_or_else(|| {
                reject::custom(ApiError::Unauthenticated(String::from(
                    "Authentication credentials were not provided",
                )))
            })?;

            verify_jwt_session(&token, secret.as_bytes())
                .map(SessionData::from)
                .map_err(reject::custom)
        }
    })
}

/// `None` for anonymous requests and for invalid or expired sessions.
pub fn with_possible_session(
    secret: Arc<String>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Infallible> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).map(move |session: Option<String>| {
        session.and_then(|token| {
            verify_jwt_session(&token, secret.as_bytes())
                .ok()
                .map(SessionData::from)
        })
    })
}

pub fn error_reply(err: &ApiError) -> warp::reply::WithStatus<warp::reply::Json> {
    if let ApiError::Query(info) = err {
        error!("Storage failure {info}");
    }
    warp::reply::with_status(warp::reply::json(&err.body()), err.status())
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    if let Some(api_error) = err.find::<ApiError>() {
        return Ok(error_reply(api_error));
    }

    let (status, detail) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found")
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else if err.find::<warp::body::BodyDeserializeError>().is_some() {
        (StatusCode::BAD_REQUEST, "Malformed payload")
    } else {
        error!("Unhandled rejection {err:?}");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };

    let body = ErrorBody {
        error: if status.is_client_error() {
            "invalid_request"
        } else {
            "internal_error"
        },
        field: None,
        detail: detail.to_owned(),
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}
