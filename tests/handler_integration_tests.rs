use axum::{
    Form,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use feedback_board::{
    AppConfig, AppError, AppState, InMemoryRepository, Session,
    config::ProfileAccess,
    handlers,
    models::{FeedbackForm, LoginForm, RegisterForm},
    repository::RepositoryState,
    session::{self, SESSION_COOKIE},
};
use std::sync::Arc;

// --- TEST UTILITIES ---

fn create_test_state(config: AppConfig) -> AppState {
    AppState::new(Arc::new(InMemoryRepository::new()) as RepositoryState, config)
}

async fn seed_user(state: &AppState, username: &str) {
    state
        .auth()
        .register(username, "pw123456", "First", "Last", &format!("{username}@x.com"))
        .await
        .unwrap();
}

async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn feedback_form(title: &str, content: &str) -> Form<FeedbackForm> {
    Form(FeedbackForm {
        title: title.to_string(),
        content: content.to_string(),
    })
}

fn bob_registration() -> RegisterForm {
    RegisterForm {
        username: "bob".to_string(),
        password: "pw123456".to_string(),
        email: "bob@x.com".to_string(),
        first_name: "Bob".to_string(),
        last_name: "Builder".to_string(),
    }
}

// --- REGISTER / LOGIN ---

#[tokio::test]
async fn test_register_sets_session_and_redirects_home() {
    let state = create_test_state(AppConfig::default());

    let response = handlers::register(
        State(state.clone()),
        Session::anonymous(),
        CookieJar::new(),
        Form(bob_registration()),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(cookie.starts_with("feedback_session="));
    assert!(cookie.contains("HttpOnly"));

    assert!(state.repo.get_user("bob").await.unwrap().is_some());
}

#[tokio::test]
async fn test_register_duplicate_rerenders_form() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "bob").await;

    let mut form = bob_registration();
    form.email = "new@x.com".to_string();
    let response = handlers::register(
        State(state.clone()),
        Session::anonymous(),
        CookieJar::new(),
        Form(form),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let body = body_string(response).await;
    assert!(body.contains("Username is already taken"));

    // The original record is unchanged.
    let stored = state.repo.get_user("bob").await.unwrap().unwrap();
    assert_eq!(stored.email, "bob@x.com");
}

#[tokio::test]
async fn test_register_invalid_form_reports_fields() {
    let state = create_test_state(AppConfig::default());
    let form = RegisterForm {
        username: "this-username-is-way-too-long".to_string(),
        password: "123".to_string(),
        ..bob_registration()
    };

    let response = handlers::register(State(state.clone()), Session::anonymous(), CookieJar::new(), Form(form))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_string(response).await;
    assert!(body.contains("Username must be at most 20 characters"));
    assert!(body.contains("Password must be at least 6 characters"));
    // Passwords are never echoed.
    assert!(!body.contains("value=\"123\""));
    assert!(state.repo.get_user("this-username-is-way-too-long").await.unwrap().is_none());
}

#[tokio::test]
async fn test_register_when_signed_in_redirects_to_profile() {
    let state = create_test_state(AppConfig::default());

    let response = handlers::register(
        State(state.clone()),
        Session::signed_in("alice"),
        CookieJar::new(),
        Form(bob_registration()),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users/alice");
    assert!(state.repo.get_user("bob").await.unwrap().is_none());
}

#[tokio::test]
async fn test_login_failure_is_indistinguishable() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "alice").await;

    let mut bodies = Vec::new();
    for username in ["alice", "nobody"] {
        let response = handlers::login(
            State(state.clone()),
            Session::anonymous(),
            CookieJar::new(),
            Form(LoginForm {
                username: username.to_string(),
                password: "wrong".to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let body = body_string(response).await;
        assert!(body.contains("Invalid username/password"));
        bodies.push(body.replace(username, ""));
    }
    assert_eq!(bodies[0], bodies[1]);
}

#[tokio::test]
async fn test_login_success_sets_cookie() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "alice").await;

    let response = handlers::login(
        State(state),
        Session::anonymous(),
        CookieJar::new(),
        Form(LoginForm {
            username: "alice".to_string(),
            password: "pw123456".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert!(response.headers().get(header::SET_COOKIE).is_some());
}

// --- PROFILE ---

#[tokio::test]
async fn test_profile_requires_sign_in() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "alice").await;

    let response = handlers::show_profile(State(state), Session::anonymous(), Path("alice".to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_profile_visible_to_any_signed_in_user_by_default() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "alice").await;
    seed_user(&state, "bob").await;
    state.repo.create_feedback("alice", "Alice's note", "body").await.unwrap();

    let response = handlers::show_profile(State(state), Session::signed_in("bob"), Path("alice".to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Alice&#39;s note"));
    // Bob sees no owner controls on Alice's page.
    assert!(!body.contains("/users/alice/delete"));
    assert!(!body.contains("/update"));
}

#[tokio::test]
async fn test_profile_owner_only_policy() {
    let mut config = AppConfig::default();
    config.profile_access = ProfileAccess::OwnerOnly;
    let state = create_test_state(config);
    seed_user(&state, "alice").await;
    seed_user(&state, "bob").await;

    let result = handlers::show_profile(State(state.clone()), Session::signed_in("bob"), Path("alice".to_string())).await;
    assert!(matches!(result, Err(AppError::Unauthorized)));

    let own = handlers::show_profile(State(state), Session::signed_in("alice"), Path("alice".to_string()))
        .await
        .unwrap();
    assert_eq!(own.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_profile_unknown_user_not_found() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "alice").await;

    let result = handlers::show_profile(State(state), Session::signed_in("alice"), Path("ghost".to_string())).await;
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_profile_escapes_feedback() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "alice").await;
    state
        .repo
        .create_feedback("alice", "<script>alert(1)</script>", "a & b")
        .await
        .unwrap();

    let response = handlers::show_profile(State(state), Session::signed_in("alice"), Path("alice".to_string()))
        .await
        .unwrap();
    let body = body_string(response).await;

    assert!(!body.contains("<script>"));
    assert!(body.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(body.contains("a &amp; b"));
}

// --- DELETE USER ---

#[tokio::test]
async fn test_delete_user_by_owner_cascades() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "alice").await;
    let f1 = state.repo.create_feedback("alice", "a", "a").await.unwrap();
    let f2 = state.repo.create_feedback("alice", "b", "b").await.unwrap();

    let token = session::issue_token("alice", &state.config).unwrap();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::COOKIE,
        format!("{SESSION_COOKIE}={token}").parse().unwrap(),
    );

    let response = handlers::delete_user(
        State(state.clone()),
        Session::signed_in("alice"),
        CookieJar::from_headers(&headers),
        Path("alice".to_string()),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    // The session cookie the request carried is expired.
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(cookie.starts_with(&format!("{SESSION_COOKIE}=")));
    assert!(cookie.contains("Max-Age=0"));

    assert!(state.repo.get_user("alice").await.unwrap().is_none());
    assert!(state.repo.get_feedback(f1.id).await.unwrap().is_none());
    assert!(state.repo.get_feedback(f2.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_user_by_other_user_unauthorized() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "alice").await;
    seed_user(&state, "mallory").await;

    let result = handlers::delete_user(
        State(state.clone()),
        Session::signed_in("mallory"),
        CookieJar::new(),
        Path("alice".to_string()),
    )
    .await;

    assert!(matches!(result, Err(AppError::Unauthorized)));
    assert!(state.repo.get_user("alice").await.unwrap().is_some());
}

// --- FEEDBACK ---

#[tokio::test]
async fn test_feedback_add_by_owner() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "alice").await;

    let response = handlers::feedback_add(
        State(state.clone()),
        Session::signed_in("alice"),
        Path("alice".to_string()),
        feedback_form("Hi", "Hello"),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users/alice");

    let items = state.repo.get_user_feedback("alice").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Hi");
    assert_eq!(items[0].content, "Hello");
}

#[tokio::test]
async fn test_feedback_add_stores_text_verbatim() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "alice").await;

    let response = handlers::feedback_add(
        State(state.clone()),
        Session::signed_in("alice"),
        Path("alice".to_string()),
        feedback_form(" T ", "    fn main() {}\n"),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let items = state.repo.get_user_feedback("alice").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, " T ");
    assert_eq!(items[0].content, "    fn main() {}\n");
}

#[tokio::test]
async fn test_feedback_add_with_nul_rerenders_form() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "alice").await;

    let response = handlers::feedback_add(
        State(state.clone()),
        Session::signed_in("alice"),
        Path("alice".to_string()),
        feedback_form("Hi", "bad\0byte"),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_string(response).await;
    assert!(body.contains("Content must not contain NUL characters"));
    assert!(state.repo.get_user_feedback("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_feedback_add_anonymous_redirects_to_login() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "alice").await;

    let response = handlers::feedback_add(
        State(state.clone()),
        Session::anonymous(),
        Path("alice".to_string()),
        feedback_form("Hi", "Hello"),
    )
    .await
    .unwrap();

    assert_eq!(location(&response), "/login");
    assert!(state.repo.get_user_feedback("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_feedback_add_for_other_user_unauthorized() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "alice").await;
    seed_user(&state, "bob").await;

    let result = handlers::feedback_add(
        State(state.clone()),
        Session::signed_in("bob"),
        Path("alice".to_string()),
        feedback_form("Hi", "Hello"),
    )
    .await;

    assert!(matches!(result, Err(AppError::Unauthorized)));
    assert!(state.repo.get_user_feedback("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_feedback_add_title_too_long() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "alice").await;

    let response = handlers::feedback_add(
        State(state.clone()),
        Session::signed_in("alice"),
        Path("alice".to_string()),
        feedback_form(&"x".repeat(101), "Hello"),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(state.repo.get_user_feedback("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_feedback_delete_by_other_user_unauthorized() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "alice").await;
    seed_user(&state, "bob").await;
    let bobs = state.repo.create_feedback("bob", "mine", "body").await.unwrap();

    let result = handlers::feedback_delete(State(state.clone()), Session::signed_in("alice"), Path(bobs.id)).await;

    assert!(matches!(result, Err(AppError::Unauthorized)));
    assert_eq!(state.repo.get_feedback(bobs.id).await.unwrap(), Some(bobs));
}

#[tokio::test]
async fn test_feedback_delete_anonymous_unauthorized() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "bob").await;
    let bobs = state.repo.create_feedback("bob", "mine", "body").await.unwrap();

    let result = handlers::feedback_delete(State(state.clone()), Session::anonymous(), Path(bobs.id)).await;

    assert!(matches!(result, Err(AppError::Unauthorized)));
    assert!(state.repo.get_feedback(bobs.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_feedback_delete_by_owner() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "bob").await;
    let bobs = state.repo.create_feedback("bob", "mine", "body").await.unwrap();

    let response = handlers::feedback_delete(State(state.clone()), Session::signed_in("bob"), Path(bobs.id))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users/bob");
    assert!(state.repo.get_feedback(bobs.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_feedback_missing_id_not_found() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "bob").await;

    let result = handlers::feedback_delete(State(state.clone()), Session::signed_in("bob"), Path(42)).await;
    assert!(matches!(result, Err(AppError::NotFound)));

    let result = handlers::feedback_edit_form(State(state), Session::signed_in("bob"), Path(42)).await;
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_feedback_update_by_owner() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "bob").await;
    let bobs = state.repo.create_feedback("bob", "old", "old body").await.unwrap();

    let response = handlers::feedback_update(
        State(state.clone()),
        Session::signed_in("bob"),
        Path(bobs.id),
        feedback_form("new", "new body"),
    )
    .await
    .unwrap();

    assert_eq!(location(&response), "/users/bob");
    let stored = state.repo.get_feedback(bobs.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "new");
    assert_eq!(stored.content, "new body");
}

#[tokio::test]
async fn test_feedback_update_by_other_user_unauthorized() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "alice").await;
    seed_user(&state, "bob").await;
    let bobs = state.repo.create_feedback("bob", "old", "old body").await.unwrap();

    let result = handlers::feedback_update(
        State(state.clone()),
        Session::signed_in("alice"),
        Path(bobs.id),
        feedback_form("hijacked", "hijacked"),
    )
    .await;

    assert!(matches!(result, Err(AppError::Unauthorized)));
    let stored = state.repo.get_feedback(bobs.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "old");
}

#[tokio::test]
async fn test_feedback_edit_form_prefilled() {
    let state = create_test_state(AppConfig::default());
    seed_user(&state, "bob").await;
    let bobs = state.repo.create_feedback("bob", "Current title", "Current body").await.unwrap();

    let response = handlers::feedback_edit_form(State(state), Session::signed_in("bob"), Path(bobs.id))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("value=\"Current title\""));
    assert!(body.contains(">Current body</textarea>"));
}

// --- ERROR RESPONSES ---

#[tokio::test]
async fn test_error_status_codes() {
    use axum::response::IntoResponse;

    assert_eq!(AppError::Unauthorized.into_response().status(), StatusCode::UNAUTHORIZED);
    assert_eq!(AppError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
    assert_eq!(
        AppError::DuplicateKey { field: "email" }.into_response().status(),
        StatusCode::CONFLICT
    );

    let internal = AppError::Database(sqlx::Error::PoolTimedOut).into_response();
    assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(internal).await;
    assert!(!body.contains("pool"));
}
