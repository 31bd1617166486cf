use std::sync::LazyLock;

use log::info;
use regex::Regex;
use sqlx::{Pool, Postgres};

use crate::{
    constants::{EMAIL_MAX_LENGTH, USERNAME_MAX_LENGTH},
    error::{ApiError, QueryError},
    jwt::SessionData,
    schema::{Id, NewUser, User, UserProfile},
};

static LOGIN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid login pattern"));

pub async fn get_user(pool: &Pool<Postgres>, username: &str) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Id) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_profile(
    user_id: Id,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<UserProfile, ApiError> {
    let row: Option<UserProfile> = sqlx::query_as(
        "
        SELECT u.email, u.id, u.username, u.first_name, u.last_name,
            EXISTS (
                SELECT 1 FROM subscriptions s WHERE s.user_id = $2 AND s.author_id = u.id
            ) AS is_subscribed
        FROM users u
        WHERE u.id = $1
    ",
    )
    .bind(user_id)
    .bind(viewer.map(|v| v.user_id))
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    row.ok_or(ApiError::not_found("user", user_id))
}

pub fn validate_new_user(user: &NewUser) -> Result<(), ApiError> {
    if user.username.chars().count() > USERNAME_MAX_LENGTH
        || !LOGIN_PATTERN.is_match(&user.username)
    {
        return Err(ApiError::validation(
            "username",
            "Username may only contain letters, digits and @/./+/-/_",
        ));
    }
    if user.email.chars().count() > EMAIL_MAX_LENGTH
        || !LOGIN_PATTERN.is_match(&user.email)
        || !user.email.contains('@')
    {
        return Err(ApiError::validation("email", "Enter a valid email address"));
    }
    if user.first_name.trim().is_empty() {
        return Err(ApiError::validation("first_name", "First name is required"));
    }
    if user.last_name.trim().is_empty() {
        return Err(ApiError::validation("last_name", "Last name is required"));
    }
    Ok(())
}

pub async fn create_user(user: NewUser, pool: &Pool<Postgres>) -> Result<User, ApiError> {
    validate_new_user(&user)?;

    let row: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (username, email, first_name, last_name, is_admin)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING *;
    ",
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(user.is_admin)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match row {
        Some(row) => {
            info!("Registered user {} ({})", row.username, row.id);
            Ok(row)
        }
        None => Err(ApiError::Conflict(String::from(
            "A user with that username or email already exists",
        ))),
    }
}
