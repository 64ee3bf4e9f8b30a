use chrono::{TimeDelta, Utc};
use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// immutable afterwards; pulled into handlers and extractors via FromRef.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. `None` selects the in-memory store (local only).
    pub db_url: Option<String>,
    // Runtime environment marker. Controls the session bypass and cookie security.
    pub env: Env,
    // HMAC secret used to sign and verify session tokens.
    pub session_secret: String,
    // Lifetime of an issued session, in hours.
    pub session_ttl_hours: i64,
    // bcrypt work factor for newly stored passwords.
    pub bcrypt_cost: u32,
    // Who may view a user's profile page.
    pub profile_access: ProfileAccess,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
}

/// Env
///
/// Defines the runtime context: local development (in-memory store allowed,
/// header bypass enabled) or hardened production.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// ProfileAccess
///
/// Policy for `GET /users/{username}`. `AnySignedIn` lets every signed-in user view
/// every profile; `OwnerOnly` restricts a profile to its owner.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub enum ProfileAccess {
    #[default]
    AnySignedIn,
    OwnerOnly,
}

impl ProfileAccess {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "any" => Some(ProfileAccess::AnySignedIn),
            "owner" => Some(ProfileAccess::OwnerOnly),
            _ => None,
        }
    }
}

const LOCAL_SESSION_SECRET: &str = "local-development-session-secret";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

impl Default for AppConfig {
    /// default
    ///
    /// Safe, non-panicking values for test scaffolding: in-memory store and the
    /// cheapest bcrypt cost so tests don't spend seconds hashing.
    fn default() -> Self {
        Self {
            db_url: None,
            env: Env::Local,
            session_secret: "super-secure-test-secret-value-local".to_string(),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            bcrypt_cost: 4,
            profile_access: ProfileAccess::AnySignedIn,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from the environment and fails fast.
    ///
    /// # Panics
    /// Panics in production when `DATABASE_URL` or `SESSION_SECRET` is missing, and
    /// whenever a variable is present but malformed or out of range.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let (db_url, session_secret) = match env {
            Env::Production => (
                Some(env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod")),
                env::var("SESSION_SECRET")
                    .expect("FATAL: SESSION_SECRET must be set in production."),
            ),
            Env::Local => (
                env::var("DATABASE_URL").ok(),
                env::var("SESSION_SECRET").unwrap_or_else(|_| LOCAL_SESSION_SECRET.to_string()),
            ),
        };

        let session_ttl_hours = env::var("SESSION_TTL_HOURS")
            .map(|v| v.parse().expect("FATAL: SESSION_TTL_HOURS must be an integer"))
            .unwrap_or(DEFAULT_SESSION_TTL_HOURS);
        // Every issued token adds the TTL to the current time.
        TimeDelta::try_hours(session_ttl_hours)
            .filter(|ttl| *ttl > TimeDelta::zero())
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .expect("FATAL: SESSION_TTL_HOURS must be a positive number of hours in range");

        let bcrypt_cost = env::var("BCRYPT_COST")
            .map(|v| v.parse().expect("FATAL: BCRYPT_COST must be an integer"))
            .unwrap_or(bcrypt::DEFAULT_COST);

        let profile_access = env::var("PROFILE_ACCESS")
            .map(|v| ProfileAccess::parse(&v).expect("FATAL: PROFILE_ACCESS must be any|owner"))
            .unwrap_or_default();

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        Self {
            db_url,
            env,
            session_secret,
            session_ttl_hours,
            bcrypt_cost,
            profile_access,
            bind_addr,
        }
    }
}
