//! Session cookie handling and the admin extractor.
//!
//! Handlers that take a [`RequireAdmin`] argument only run for requests that
//! carry a live session cookie; everyone else is sent to the login form.

use admin_auth::AdminUser;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
    response::Redirect,
};
use http_common::cookie_value;

use crate::AppState;

pub const SESSION_COOKIE: &str = "sid";
pub const LOGIN_PATH: &str = "/admin/login";

/// Session id from the request's `Cookie` headers, if any.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| cookie_value(v, SESSION_COOKIE))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// A logged-in administrator.
#[derive(Debug, Clone)]
pub struct RequireAdmin {
    pub user: AdminUser,
    pub session_id: String,
}

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session_id = session_id(&parts.headers).ok_or_else(|| Redirect::to(LOGIN_PATH))?;
        let user = state
            .auth
            .current_user(Some(&session_id), state.now())
            .ok_or_else(|| {
                tracing::debug!(path = %parts.uri.path(), "no live admin session");
                Redirect::to(LOGIN_PATH)
            })?;
        Ok(Self { user, session_id })
    }
}
