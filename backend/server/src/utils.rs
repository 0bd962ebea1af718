use axum::{body::Bytes, http::HeaderMap};
use chrono::{DateTime, Utc};
use records::{
    credentials::{IdeSession, resolve_session},
    user::User,
};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    error::AppError::{self, MalformedPayload, Unauthorized},
    state::State,
};

pub const USER_HEADER: &str = "x-user-id";
pub const DEFAULT_MATCH_LIMIT: usize = 10;
pub const MAX_MATCH_LIMIT: usize = 50;
const MAX_HEADER_LENGTH: usize = 128;

#[derive(Deserialize, Debug, Default)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn parse<T: DeserializeOwned>(bytes: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(bytes).map_err(|e| MalformedPayload(e.to_string()))
}

/// Like [`parse`], but an empty body means the default payload.
pub fn parse_or_default<T: DeserializeOwned + Default>(bytes: &Bytes) -> Result<T, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    parse(bytes)
}

fn header_value<'a>(headers: &'a HeaderMap, key: &str) -> Option<&'a str> {
    let raw = headers.get(key)?.to_str().ok()?.trim();
    if raw.is_empty() || raw.len() > MAX_HEADER_LENGTH {
        return None;
    }

    Some(raw)
}

/// The user named by the `x-user-id` header.
pub async fn actor(state: &State, headers: &HeaderMap) -> Result<User, AppError> {
    let user_id = header_value(headers, USER_HEADER)
        .ok_or_else(|| Unauthorized(format!("missing {USER_HEADER} header")))?;

    state
        .docs
        .get::<User>(user_id)
        .await?
        .ok_or_else(|| Unauthorized(format!("unknown user {user_id}")))
}

/// The IDE session behind `Authorization: Bearer <token>`.
pub async fn ide_session(state: &State, headers: &HeaderMap) -> Result<IdeSession, AppError> {
    let token = header_value(headers, "authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| Unauthorized("missing IDE session token".into()))?;

    Ok(resolve_session(&state.docs, token).await?)
}

pub fn match_limit(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(DEFAULT_MATCH_LIMIT)
        .clamp(1, MAX_MATCH_LIMIT)
}
