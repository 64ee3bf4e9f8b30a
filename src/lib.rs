use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod session;
pub mod views;

// Routing split by who may reach a route (anyone vs. signed-in members).
pub mod routes;
use routes::{members, public};

// --- Public Re-exports ---

pub use auth::AuthService;
pub use config::AppConfig;
pub use error::AppError;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use session::Session;

/// ApiDoc
///
/// OpenAPI document for every route, served at `/api-docs/openapi.json` and
/// browsable through Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::home, handlers::register_form, handlers::register, handlers::login_form,
        handlers::login, handlers::logout, handlers::show_profile, handlers::delete_user,
        handlers::feedback_add_form, handlers::feedback_add, handlers::feedback_edit_form,
        handlers::feedback_update, handlers::feedback_delete
    ),
    components(
        schemas(
            models::User, models::Feedback, models::RegisterForm, models::LoginForm,
            models::FeedbackForm,
        )
    ),
    tags(
        (name = "feedback-board", description = "Feedback board")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single, immutable container shared by every request: the store and the
/// loaded configuration. Sessions are not kept here; they travel in the cookie.
#[derive(Clone)]
pub struct AppState {
    /// Credential and feedback stores behind one trait object.
    pub repo: RepositoryState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self { repo, config }
    }

    /// Auth service bound to this state's store and bcrypt cost.
    pub fn auth(&self) -> AuthService {
        AuthService::new(self.repo.clone(), self.config.bcrypt_cost)
    }
}

// --- Axum FromRef Extractor Implementations ---

// Lets the Session extractor pull just the pieces it needs from the state.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routes, the Swagger UI and the observability layers.
pub fn create_router(state: AppState) -> Router {
    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(members::member_routes())
        .with_state(state);

    base_router.layer(
        ServiceBuilder::new()
            // Generate a UUID for every incoming request.
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            // Wrap the request/response lifecycle in a span carrying that ID.
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            // Echo x-request-id back to the client.
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

/// trace_span_logger
///
/// Builds the per-request span with method, URI and the `x-request-id`, so every
/// log line of one request is correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
