use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::{Id, User};
use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub is_admin: bool,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String, is_admin: bool, lifetime_hours: i64) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(lifetime_hours)).timestamp();

        Self {
            user_id: id,
            username,
            is_admin,
            iat,
            exp,
        }
    }

    pub fn is_expired(&self) -> bool {
        (self.exp - Local::now().timestamp()).is_negative()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub is_admin: bool,
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            username: value.username,
            is_admin: value.is_admin,
        }
    }
}

fn signing_key(secret: &[u8]) -> Result<Hmac<Sha256>, ApiError> {
    Hmac::new_from_slice(secret)
        .map_err(|_| ApiError::Unauthenticated(String::from("Invalid session key")))
}

pub fn generate_jwt_session(
    user: &User,
    secret: &[u8],
    lifetime_hours: i64,
) -> Result<String, ApiError> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(
        user.id,
        user.username.to_owned(),
        user.is_admin,
        lifetime_hours,
    );

    claims
        .sign_with_key(&key)
        .map_err(|_| ApiError::Unauthenticated(String::from("Could not sign session")))
}

pub fn verify_jwt_session(token: &str, secret: &[u8]) -> Result<JwtSessionData, ApiError> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| ApiError::Unauthenticated(String::from("Invalid session; Invalid token")))?;

    if session.is_expired() {
        return Err(ApiError::Unauthenticated(String::from(
            "Invalid session; Token expired",
        )));
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 3,
            username: String::from("chef"),
            email: String::from("chef@example.com"),
            first_name: String::from("Ada"),
            last_name: String::from("Cook"),
            is_admin: true,
        }
    }

    #[test]
    fn signed_session_verifies() {
        let token = generate_jwt_session(&user(), b"secret", 1).unwrap();
        let session: SessionData = verify_jwt_session(&token, b"secret").unwrap().into();

        assert_eq!(
            session,
            SessionData {
                user_id: 3,
                username: String::from("chef"),
                is_admin: true,
            }
        );
    }

    #[test]
    fn wrong_secret_is_unauthenticated() {
        let token = generate_jwt_session(&user(), b"secret", 1).unwrap();
        let err = verify_jwt_session(&token, b"other").unwrap_err();

        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[test]
    fn expired_session_is_rejected() {
        let token = generate_jwt_session(&user(), b"secret", -1).unwrap();
        let err = verify_jwt_session(&token, b"secret").unwrap_err();

        assert!(matches!(err, ApiError::Unauthenticated(ref info) if info.contains("expired")));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(verify_jwt_session("not-a-token", b"secret").is_err());
    }
}
