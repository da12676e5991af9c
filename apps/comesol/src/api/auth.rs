//! # Session Token Extraction
//!
//! Protected endpoints read the backend access token from the
//! `Authorization` header:
//!
//! ```text
//! Authorization: Bearer <access-token>
//! ```
//!
//! A raw token without the `Bearer ` prefix is accepted too. The token is
//! only extracted here; the service asks the backend whether it is valid.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use std::convert::Infallible;

/// The caller's access token, if one was sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BearerToken(pub Option<String>);

impl BearerToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Pull the token out of the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers);
        if token.is_none() {
            tracing::debug!(
                event = "auth_missing",
                path = %parts.uri.path(),
                "no Authorization header"
            );
        }
        Ok(Self(token))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        map
    }

    #[test]
    fn bearer_prefix_stripped() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc".to_string()));
    }

    #[test]
    fn raw_token_accepted() {
        assert_eq!(bearer_token(&headers("abc")), Some("abc".to_string()));
    }

    #[test]
    fn empty_token_is_none() {
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
