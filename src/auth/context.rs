//! The authenticated user, carried with a single request

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use std::convert::Infallible;

use crate::models::User;

/// Where visitors without a session are sent
pub const LOGIN_PATH: &str = "/login";

/// The user resolved from the remember cookie.
///
/// Inserted into the request extensions by
/// [`resolve_user`](super::middleware::resolve_user). As an extractor it
/// rejects with a redirect to the login page when nobody is signed in.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Like [`CurrentUser`] but never rejects
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

/// `302 Found` pointing at the login page
pub fn login_redirect() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, LOGIN_PATH)]).into_response()
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(login_redirect)
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts.extensions.get::<CurrentUser>().map(|u| u.0.clone()),
        ))
    }
}
