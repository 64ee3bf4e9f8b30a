use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Members Router Module
///
/// Everything that reads a profile or mutates a user or feedback item.
///
/// Access Control Strategy:
/// Each handler takes the `Session` extractor. Profile and add-feedback pages send
/// anonymous visitors to `/login`; all mutations go through the ownership guard and
/// fail with 401 for anyone but the owner. Feedback routes look the item up first,
/// so a missing ID is a 404 regardless of who asks.
pub fn member_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /users/{username}
        // Profile plus feedback list. Any signed-in user unless PROFILE_ACCESS=owner.
        .route("/users/{username}", get(handlers::show_profile))
        // POST /users/{username}/delete
        // Owner only. Cascades to all of the user's feedback and clears the session.
        .route("/users/{username}/delete", post(handlers::delete_user))
        // GET/POST /users/{username}/feedback/add
        .route(
            "/users/{username}/feedback/add",
            get(handlers::feedback_add_form).post(handlers::feedback_add),
        )
        // GET/POST /feedback/{id}/update
        // Feedback owner only.
        .route(
            "/feedback/{id}/update",
            get(handlers::feedback_edit_form).post(handlers::feedback_update),
        )
        // POST /feedback/{id}/delete
        // Feedback owner only.
        .route("/feedback/{id}/delete", post(handlers::feedback_delete))
}
