use crate::{
    AppState,
    auth::is_signed_in,
    error::AppError,
    guard,
    models::{Feedback, FeedbackForm, FieldErrors, LoginForm, RegisterForm},
    session::{self, Session},
    views,
};
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

// --- Helpers ---

fn profile_url(username: &str) -> String {
    format!("/users/{}", views::path_segment(username))
}

/// A form that failed validation (or a domain check) is rendered again with 422.
fn invalid_form(page: String) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response()
}

/// Loads a feedback item and checks the session owns it. `NotFound` wins over
/// `Unauthorized` so the lookup happens first.
async fn owned_feedback(state: &AppState, session: &Session, id: i64) -> Result<Feedback, AppError> {
    let feedback = state.repo.get_feedback(id).await?.ok_or(AppError::NotFound)?;
    guard::assert_owns_feedback(session, &feedback)?;
    Ok(feedback)
}

// --- Handlers ---

/// home
///
/// [Public Route] Landing page.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Landing page", body = String, content_type = "text/html"))
)]
pub async fn home(session: Session) -> Html<String> {
    Html(views::landing(&session))
}

/// register_form
///
/// [Public Route] Shows the registration form. Signed-in visitors go to their profile.
#[utoipa::path(
    get,
    path = "/register",
    responses(
        (status = 200, description = "Registration form", body = String, content_type = "text/html"),
        (status = 303, description = "Already signed in")
    )
)]
pub async fn register_form(session: Session) -> Response {
    if let Some(me) = session.username() {
        return Redirect::to(&profile_url(me)).into_response();
    }
    Html(views::register_page(&RegisterForm::default(), &FieldErrors::new())).into_response()
}

/// register
///
/// [Public Route] Creates the account and signs the new user in.
///
/// *Conflicts*: a taken username or email re-renders the form with the message on
/// the conflicting field; nothing is written.
#[utoipa::path(
    post,
    path = "/register",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Registered; session cookie set"),
        (status = 422, description = "Invalid form or duplicate username/email", body = String, content_type = "text/html")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    if let Some(me) = session.username() {
        return Ok(Redirect::to(&profile_url(me)).into_response());
    }

    let form = match form.normalize() {
        Ok(form) => form,
        Err((form, errors)) => return Ok(invalid_form(views::register_page(&form, &errors))),
    };

    let result = state
        .auth()
        .register(
            &form.username,
            &form.password,
            &form.first_name,
            &form.last_name,
            &form.email,
        )
        .await;

    match result {
        Ok(user) => {
            let jar = session::establish(jar, &user.username, &state.config)?;
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(AppError::DuplicateKey { field }) => {
            let message = match field {
                "email" => "Email is already registered",
                _ => "Username is already taken",
            };
            let errors = FieldErrors::from([(field, message.to_string())]);
            Ok(invalid_form(views::register_page(&form, &errors)))
        }
        Err(e) => Err(e),
    }
}

/// login_form
///
/// [Public Route] Shows the login form. Signed-in visitors go to their profile.
#[utoipa::path(
    get,
    path = "/login",
    responses(
        (status = 200, description = "Login form", body = String, content_type = "text/html"),
        (status = 303, description = "Already signed in")
    )
)]
pub async fn login_form(session: Session) -> Response {
    if let Some(me) = session.username() {
        return Redirect::to(&profile_url(me)).into_response();
    }
    Html(views::login_page(&LoginForm::default(), &FieldErrors::new())).into_response()
}

/// login
///
/// [Public Route] Verifies credentials and establishes the session.
///
/// *Enumeration*: unknown usernames and wrong passwords produce the same page.
#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Signed in; session cookie set"),
        (status = 422, description = "Invalid username/password", body = String, content_type = "text/html")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if let Some(me) = session.username() {
        return Ok(Redirect::to(&profile_url(me)).into_response());
    }

    let form = match form.normalize() {
        Ok(form) => form,
        Err((form, errors)) => return Ok(invalid_form(views::login_page(&form, &errors))),
    };

    match state.auth().login(&form.username, &form.password).await {
        Ok(user) => {
            let jar = session::establish(jar, &user.username, &state.config)?;
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(AppError::AuthFailure) => {
            let errors = FieldErrors::from([("password", "Invalid username/password".to_string())]);
            Ok(invalid_form(views::login_page(&form, &errors)))
        }
        Err(e) => Err(e),
    }
}

/// logout
///
/// [Public Route] Clears the session cookie.
#[utoipa::path(
    get,
    path = "/logout",
    responses((status = 303, description = "Signed out"))
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    (session::clear(jar), Redirect::to("/"))
}

/// show_profile
///
/// [Signed-in Route] Profile details and the user's feedback list.
///
/// *Access*: anonymous visitors are sent to `/login`. Beyond that the configured
/// `ProfileAccess` policy decides whether any signed-in user or only the owner may look.
#[utoipa::path(
    get,
    path = "/users/{username}",
    params(("username" = String, Path, description = "Profile owner")),
    responses(
        (status = 200, description = "Profile page", body = String, content_type = "text/html"),
        (status = 303, description = "Not signed in"),
        (status = 401, description = "Profile restricted to its owner"),
        (status = 404, description = "No such user")
    )
)]
pub async fn show_profile(
    State(state): State<AppState>,
    session: Session,
    Path(username): Path<String>,
) -> Result<Response, AppError> {
    if !is_signed_in(&session) {
        return Ok(Redirect::to("/login").into_response());
    }
    guard::assert_can_view_profile(&session, &username, state.config.profile_access)?;

    let user = state
        .repo
        .get_user(&username)
        .await?
        .ok_or(AppError::NotFound)?;
    let feedback = state.repo.get_user_feedback(&username).await?;

    Ok(Html(views::profile_page(&session, &user, &feedback)).into_response())
}

/// delete_user
///
/// [Owner-Only Route] Deletes the account and, by cascade, all of its feedback.
/// The session is cleared afterwards.
#[utoipa::path(
    post,
    path = "/users/{username}/delete",
    params(("username" = String, Path, description = "Account to delete")),
    responses(
        (status = 303, description = "Deleted; redirected to /login"),
        (status = 401, description = "Not the account owner"),
        (status = 404, description = "No such user")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
    Path(username): Path<String>,
) -> Result<Response, AppError> {
    guard::assert_owns_user(&session, &username)?;

    if !state.repo.delete_user(&username).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(username = %username, "user deleted");

    Ok((session::clear(jar), Redirect::to("/login")).into_response())
}

/// feedback_add_form
///
/// [Owner-Only Route] Shows the new feedback form.
#[utoipa::path(
    get,
    path = "/users/{username}/feedback/add",
    params(("username" = String, Path, description = "Feedback owner")),
    responses(
        (status = 200, description = "Feedback form", body = String, content_type = "text/html"),
        (status = 303, description = "Not signed in"),
        (status = 401, description = "Not the owner")
    )
)]
pub async fn feedback_add_form(session: Session, Path(username): Path<String>) -> Result<Response, AppError> {
    if !is_signed_in(&session) {
        return Ok(Redirect::to("/login").into_response());
    }
    guard::assert_owns_user(&session, &username)?;

    let page = views::feedback_add_page(&session, &username, &FeedbackForm::default(), &FieldErrors::new());
    Ok(Html(page).into_response())
}

/// feedback_add
///
/// [Owner-Only Route] Creates a feedback item for `username`.
#[utoipa::path(
    post,
    path = "/users/{username}/feedback/add",
    params(("username" = String, Path, description = "Feedback owner")),
    request_body(content = FeedbackForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created; redirected to the profile"),
        (status = 401, description = "Not the owner"),
        (status = 422, description = "Invalid form", body = String, content_type = "text/html")
    )
)]
pub async fn feedback_add(
    State(state): State<AppState>,
    session: Session,
    Path(username): Path<String>,
    Form(form): Form<FeedbackForm>,
) -> Result<Response, AppError> {
    if !is_signed_in(&session) {
        return Ok(Redirect::to("/login").into_response());
    }
    guard::assert_owns_user(&session, &username)?;

    let form = match form.normalize() {
        Ok(form) => form,
        Err((form, errors)) => {
            return Ok(invalid_form(views::feedback_add_page(&session, &username, &form, &errors)));
        }
    };

    let feedback = state
        .repo
        .create_feedback(&username, &form.title, &form.content)
        .await?;
    tracing::info!(feedback_id = feedback.id, username = %username, "feedback created");

    Ok(Redirect::to(&profile_url(&username)).into_response())
}

/// feedback_edit_form
///
/// [Owner-Only Route] Shows the edit form pre-filled with the current values.
#[utoipa::path(
    get,
    path = "/feedback/{id}/update",
    params(("id" = i64, Path, description = "Feedback ID")),
    responses(
        (status = 200, description = "Edit form", body = String, content_type = "text/html"),
        (status = 401, description = "Not the owner"),
        (status = 404, description = "No such feedback")
    )
)]
pub async fn feedback_edit_form(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let feedback = owned_feedback(&state, &session, id).await?;
    let page = views::feedback_edit_page(&session, id, &FeedbackForm::from(&feedback), &FieldErrors::new());
    Ok(Html(page).into_response())
}

/// feedback_update
///
/// [Owner-Only Route] Replaces title and content of a feedback item.
#[utoipa::path(
    post,
    path = "/feedback/{id}/update",
    params(("id" = i64, Path, description = "Feedback ID")),
    request_body(content = FeedbackForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Updated; redirected to the owner's profile"),
        (status = 401, description = "Not the owner"),
        (status = 404, description = "No such feedback"),
        (status = 422, description = "Invalid form", body = String, content_type = "text/html")
    )
)]
pub async fn feedback_update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
    Form(form): Form<FeedbackForm>,
) -> Result<Response, AppError> {
    let feedback = owned_feedback(&state, &session, id).await?;

    let form = match form.normalize() {
        Ok(form) => form,
        Err((form, errors)) => {
            return Ok(invalid_form(views::feedback_edit_page(&session, id, &form, &errors)));
        }
    };

    state
        .repo
        .update_feedback(id, &form.title, &form.content)
        .await?
        .ok_or(AppError::NotFound)?;
    tracing::info!(feedback_id = id, "feedback updated");

    Ok(Redirect::to(&profile_url(&feedback.username)).into_response())
}

/// feedback_delete
///
/// [Owner-Only Route] Deletes a feedback item.
#[utoipa::path(
    post,
    path = "/feedback/{id}/delete",
    params(("id" = i64, Path, description = "Feedback ID")),
    responses(
        (status = 303, description = "Deleted; redirected to the owner's profile"),
        (status = 401, description = "Not the owner"),
        (status = 404, description = "No such feedback")
    )
)]
pub async fn feedback_delete(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let feedback = owned_feedback(&state, &session, id).await?;

    if !state.repo.delete_feedback(id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(feedback_id = id, "feedback deleted");

    Ok(Redirect::to(&profile_url(&feedback.username)).into_response())
}
