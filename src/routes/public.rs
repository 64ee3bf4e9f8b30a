use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable without a session. Register and login bounce visitors who
/// are already signed in to their own profile.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /
        .route("/", get(handlers::home))
        // GET/POST /register
        // Creates the account and establishes the session cookie.
        .route("/register", get(handlers::register_form).post(handlers::register))
        // GET/POST /login
        .route("/login", get(handlers::login_form).post(handlers::login))
        // GET /logout
        // Always succeeds, even without a session.
        .route("/logout", get(handlers::logout))
}
