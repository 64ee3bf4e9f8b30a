use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    repository::RepositoryState,
};

/// Name of the cookie carrying the signed session token.
pub const SESSION_COOKIE: &str = "feedback_session";

/// Development-only header naming the acting user. Ignored outside `Env::Local`.
pub const LOCAL_BYPASS_HEADER: &str = "x-username";

/// Claims
///
/// Payload of the session token. The only identity claim is `sub`, the signed-in
/// username; `exp` bounds the session lifetime.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

/// Session
///
/// Per-request authentication context, resolved once by the extractor and passed
/// explicitly to handlers and to the ownership guard. `None` means anonymous.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    username: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { username: None }
    }

    pub fn signed_in(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
        }
    }

    /// The signed-in username, if any.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.username.is_some()
    }
}

/// Signs a session token for `username` valid for `config.session_ttl_hours`.
pub fn issue_token(username: &str, config: &AppConfig) -> Result<String, AppError> {
    let now = Utc::now();
    let expires = TimeDelta::try_hours(config.session_ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or(AppError::SessionLifetime)?;
    let claims = Claims {
        sub: username.to_string(),
        iat: now.timestamp() as usize,
        exp: expires.timestamp() as usize,
    };

    let key = EncodingKey::from_secret(config.session_secret.as_bytes());
    Ok(encode(&Header::default(), &claims, &key)?)
}

/// Verifies signature and expiry and returns the claims.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    Ok(decode::<Claims>(token, &key, &validation)?.claims)
}

/// Adds the session cookie for `username` to the jar.
pub fn establish(jar: CookieJar, username: &str, config: &AppConfig) -> Result<CookieJar, AppError> {
    let token = issue_token(username, config)?;
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.env == Env::Production)
        .build();

    Ok(jar.add(cookie))
}

/// Expires the session cookie. Harmless when no session exists.
pub fn clear(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

/// Session Extractor Implementation
///
/// Resolution order:
/// 1. `Env::Local` only: the `x-username` header, if it names an existing user.
/// 2. The session cookie: signature and expiry must verify.
/// 3. The claimed user must still exist; a token outliving its account is ignored.
///
/// Anything that fails verification yields an anonymous session rather than a
/// rejection, so public pages keep working with a stale cookie. Only store
/// failures reject the request.
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            if let Some(username) = parts
                .headers
                .get(LOCAL_BYPASS_HEADER)
                .and_then(|value| value.to_str().ok())
            {
                if repo.get_user(username).await?.is_some() {
                    return Ok(Session::signed_in(username));
                }
            }
        }

        let jar = CookieJar::from_headers(&parts.headers);
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(Session::anonymous());
        };

        let claims = match decode_token(cookie.value(), &config.session_secret) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "ignoring invalid session cookie");
                return Ok(Session::anonymous());
            }
        };

        match repo.get_user(&claims.sub).await? {
            Some(user) => Ok(Session::signed_in(user.username)),
            None => {
                tracing::debug!(username = %claims.sub, "session refers to a deleted user");
                Ok(Session::anonymous())
            }
        }
    }
}
