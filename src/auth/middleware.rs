//! Session middleware: resolve the remember cookie, then optionally insist
//! on a signed-in user

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::context::{login_redirect, CurrentUser};
use crate::error::Error;
use crate::models::UserService;

/// Cookie holding the plaintext remember token
pub const REMEMBER_COOKIE: &str = "remember_token";

/// Extract the remember token from the request cookies
pub fn remember_token_from_headers(headers: &HeaderMap) -> Option<&str> {
    for cookie_header in headers.get_all(header::COOKIE) {
        let Ok(cookie_str) = cookie_header.to_str() else {
            continue;
        };
        for cookie in cookie_str.split(';') {
            if let Some(token) = cookie
                .trim()
                .strip_prefix(REMEMBER_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
            {
                if !token.is_empty() {
                    return Some(token);
                }
            }
        }
    }
    None
}

/// `Set-Cookie` value issuing `token`
pub fn remember_cookie(token: &str) -> HeaderValue {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        REMEMBER_COOKIE, token
    );
    // Tokens are base64-URL, always a valid header value
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| clear_remember_cookie())
}

/// `Set-Cookie` value removing the remember cookie
pub fn clear_remember_cookie() -> HeaderValue {
    HeaderValue::from_static("remember_token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Session-aware stage: attach the user behind a valid remember cookie.
///
/// A missing cookie or unknown token is not an error here; the request
/// simply continues without a user.
pub async fn resolve_user(
    State(users): State<Arc<UserService>>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(token) = remember_token_from_headers(req.headers()).map(str::to_owned) {
        match users.by_remember(&token).await {
            Ok(user) => {
                tracing::debug!(user_id = user.id, "Resolved session");
                req.extensions_mut().insert(CurrentUser(user));
            }
            Err(Error::NotFound) => {
                tracing::debug!("Remember cookie matched no user");
            }
            Err(e) => {
                tracing::warn!("Failed to resolve session: {}", e);
            }
        }
    }
    next.run(req).await
}

/// Session-required stage: redirect to the login page unless
/// [`resolve_user`] attached a user.
pub async fn require_user(req: Request, next: Next) -> Response {
    if req.extensions().get::<CurrentUser>().is_none() {
        return login_redirect();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_no_cookie() {
        assert!(remember_token_from_headers(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_finds_token_among_cookies() {
        let h = headers("theme=dark; remember_token=abc-_123=; other=1");
        assert_eq!(remember_token_from_headers(&h), Some("abc-_123="));
    }

    #[test]
    fn test_ignores_similar_names() {
        let h = headers("remember_token_old=stale");
        assert!(remember_token_from_headers(&h).is_none());
    }

    #[test]
    fn test_empty_value_is_no_token() {
        let h = headers("remember_token=");
        assert!(remember_token_from_headers(&h).is_none());
    }

    #[test]
    fn test_cookie_round_trip() {
        let value = remember_cookie("tok=");
        let h = headers(value.to_str().unwrap().split(';').next().unwrap());
        assert_eq!(remember_token_from_headers(&h), Some("tok="));
    }
}
