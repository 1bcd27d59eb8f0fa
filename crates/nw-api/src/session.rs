//! Anonymous session assignment.
//!
//! `SessionProvider` is the only place that reads or mints the `sessionId`
//! cookie. The `ensure_session` middleware runs it for every API request and
//! stores the resolved `SessionId` in the request extensions, so handlers
//! never parse cookies themselves.

use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, Request, Response};
use axum::middleware::Next;
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};

use nw_models::{SessionId, SESSION_COOKIE_NAME};

use crate::config::ApiConfig;
use crate::metrics;

/// Attributes of the session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
    pub max_age: Duration,
    pub secure: bool,
}

impl CookiePolicy {
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            max_age: config.session_max_age,
            secure: config.is_production(),
        }
    }

    /// `Set-Cookie` value for `session`.
    pub fn set_cookie_value(&self, session: &SessionId) -> String {
        let mut value = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            SESSION_COOKIE_NAME,
            session,
            self.max_age.as_secs()
        );
        if self.secure {
            value.push_str("; Secure");
        }
        value
    }
}

/// A session resolved for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredSession {
    pub id: SessionId,
    /// Whether the identifier was minted for this request.
    pub created: bool,
}

/// Resolves or creates the session of a request.
#[derive(Debug, Clone)]
pub struct SessionProvider {
    policy: CookiePolicy,
}

impl SessionProvider {
    pub fn new(policy: CookiePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CookiePolicy {
        &self.policy
    }

    /// Return the request's session, creating one when the cookie is absent
    /// or malformed. Never fails.
    pub fn ensure(&self, jar: &CookieJar) -> EnsuredSession {
        match jar.get(SESSION_COOKIE_NAME).map(|c| SessionId::parse(c.value())) {
            Some(Ok(id)) => EnsuredSession { id, created: false },
            Some(Err(e)) => {
                warn!(error = %e, "Replacing malformed session cookie");
                Self::fresh()
            }
            None => Self::fresh(),
        }
    }

    fn fresh() -> EnsuredSession {
        let id = SessionId::new();
        debug!(session_id = %id, "New session initialized");
        EnsuredSession { id, created: true }
    }
}

/// Session middleware: attach a `SessionId` to the request and set the
/// cookie on the response when one was minted.
pub async fn ensure_session(
    State(provider): State<SessionProvider>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let session = provider.ensure(&jar);
    request.extensions_mut().insert(session.id.clone());

    let mut response = next.run(request).await;

    if session.created {
        metrics::record_session_created();
        match HeaderValue::from_str(&provider.policy().set_cookie_value(&session.id)) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "Failed to encode session cookie"),
        }
    }

    response
}
