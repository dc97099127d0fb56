//! Bearer-token identity for the conversation API.
//!
//! Tokens are HS256 JWTs issued by the identity provider; `sub` is the user id.

use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::api::{error::ApiError, state::AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// The authenticated caller of a conversation API route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(secret) = state.jwt_secret.as_deref() else {
            return Err(ApiError::unavailable(
                "Conversation API is disabled: LARA_JWT_SECRET is not set",
            ));
        };

        let token = extract_bearer(parts.headers.get(AUTHORIZATION))
            .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

        let user_id = verify_token(&token, secret).map_err(|error| {
            tracing::debug!(error = %error, "Rejected bearer token");
            ApiError::unauthorized("Invalid bearer token")
        })?;

        Ok(AuthUser { user_id })
    }
}

/// Verify a token and return its subject.
pub fn verify_token(token: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let key = DecodingKey::from_secret(secret.as_bytes());
    let data = decode::<Claims>(token, &key, &validation)?;

    let sub = data.claims.sub.trim();
    if sub.is_empty() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }
    Ok(sub.to_string())
}

fn extract_bearer(header: Option<&HeaderValue>) -> Option<String> {
    let value = header?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
pub(crate) fn issue_token(user_id: &str, secret: &str) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_round_trip_and_wrong_secret() {
        let token = issue_token("user-1", "secret");
        assert_eq!(verify_token(&token, "secret").unwrap(), "user-1");
        assert!(verify_token(&token, "other").is_err());
        assert!(verify_token("not-a-jwt", "secret").is_err());
    }

    #[test]
    fn test_blank_subject_is_rejected() {
        let token = issue_token("  ", "secret");
        assert!(verify_token(&token, "secret").is_err());
    }

    #[test]
    fn test_extract_bearer() {
        let header = HeaderValue::from_static("Bearer abc.def");
        assert_eq!(extract_bearer(Some(&header)).as_deref(), Some("abc.def"));

        let header = HeaderValue::from_static("Basic abc");
        assert!(extract_bearer(Some(&header)).is_none());

        let header = HeaderValue::from_static("Bearer   ");
        assert!(extract_bearer(Some(&header)).is_none());
        assert!(extract_bearer(None).is_none());
    }
}
