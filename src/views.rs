//! Server-rendered pages. Every user-supplied string goes through `escape`.

use axum::http::StatusCode;

use crate::{
    models::{Feedback, FeedbackForm, FieldErrors, LoginForm, RegisterForm, User},
    session::Session,
};

/// Percent-encodes one URL path segment.
pub fn path_segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, session: &Session, body: &str) -> String {
    let nav = match session.username() {
        Some(me) => format!(
            r#"<a href="/users/{}">{}</a> | <a href="/logout">Log out</a>"#,
            path_segment(me),
            escape(me)
        ),
        None => r#"<a href="/register">Register</a> | <a href="/login">Log in</a>"#.to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{title} | Feedback</title></head>
<body>
<nav><a href="/">Feedback</a> | {nav}</nav>
<main>
<h1>{title}</h1>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
    )
}

/// One labelled input with its error message, if any.
fn field(name: &str, label: &str, kind: &str, value: &str, errors: &FieldErrors) -> String {
    let error = errors
        .get(name)
        .map(|msg| format!(r#"<span class="error">{}</span>"#, escape(msg)))
        .unwrap_or_default();

    let input = if kind == "textarea" {
        format!(r#"<textarea id="{name}" name="{name}">{}</textarea>"#, escape(value))
    } else {
        format!(
            r#"<input id="{name}" name="{name}" type="{kind}" value="{}">"#,
            escape(value)
        )
    };

    format!(r#"<p><label for="{name}">{label}</label> {input} {error}</p>"#)
}

pub fn landing(session: &Session) -> String {
    let body = match session.username() {
        Some(me) => format!(
            r#"<p>Welcome back. <a href="/users/{}">Go to your profile</a>.</p>"#,
            path_segment(me)
        ),
        None => "<p>Share your feedback. Register or log in to get started.</p>".to_string(),
    };
    layout("Welcome", session, &body)
}

pub fn register_page(form: &RegisterForm, errors: &FieldErrors) -> String {
    // The password is never echoed back.
    let body = format!(
        r#"<form method="POST" action="/register">
{}
{}
{}
{}
{}
<button type="submit">Register</button>
</form>"#,
        field("username", "Username", "text", &form.username, errors),
        field("password", "Password", "password", "", errors),
        field("email", "Email Address", "email", &form.email, errors),
        field("first_name", "First Name", "text", &form.first_name, errors),
        field("last_name", "Last Name", "text", &form.last_name, errors),
    );
    layout("Register", &Session::anonymous(), &body)
}

pub fn login_page(form: &LoginForm, errors: &FieldErrors) -> String {
    let body = format!(
        r#"<form method="POST" action="/login">
{}
{}
<button type="submit">Log in</button>
</form>"#,
        field("username", "Username", "text", &form.username, errors),
        field("password", "Password", "password", "", errors),
    );
    layout("Log in", &Session::anonymous(), &body)
}

pub fn profile_page(session: &Session, user: &User, feedback: &[Feedback]) -> String {
    let is_owner = session.username() == Some(user.username.as_str());
    let segment = path_segment(&user.username);

    let items: String = feedback
        .iter()
        .map(|f| {
            let actions = if is_owner {
                format!(
                    r#"<a href="/feedback/{id}/update">Edit</a>
<form method="POST" action="/feedback/{id}/delete"><button type="submit">Delete</button></form>"#,
                    id = f.id
                )
            } else {
                String::new()
            };
            format!(
                r#"<li class="feedback"><h3>{}</h3><p>{}</p>{actions}</li>"#,
                escape(&f.title),
                escape(&f.content)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let owner_controls = if is_owner {
        format!(
            r#"<p><a href="/users/{segment}/feedback/add">Add feedback</a></p>
<form method="POST" action="/users/{segment}/delete"><button type="submit">Delete account</button></form>"#
        )
    } else {
        String::new()
    };

    let body = format!(
        r#"<dl>
<dt>Username</dt><dd>{}</dd>
<dt>Name</dt><dd>{} {}</dd>
<dt>Email</dt><dd>{}</dd>
</dl>
<h2>Feedback</h2>
<ul>
{items}
</ul>
{owner_controls}"#,
        escape(&user.username),
        escape(&user.first_name),
        escape(&user.last_name),
        escape(&user.email),
    );
    layout(&user.username, session, &body)
}

fn feedback_form(action: &str, submit: &str, form: &FeedbackForm, errors: &FieldErrors) -> String {
    format!(
        r#"<form method="POST" action="{action}">
{}
{}
<button type="submit">{submit}</button>
</form>"#,
        field("title", "Title", "text", &form.title, errors),
        field("content", "Content", "textarea", &form.content, errors),
    )
}

pub fn feedback_add_page(
    session: &Session,
    username: &str,
    form: &FeedbackForm,
    errors: &FieldErrors,
) -> String {
    let action = format!("/users/{}/feedback/add", path_segment(username));
    layout("Add feedback", session, &feedback_form(&action, "Add", form, errors))
}

pub fn feedback_edit_page(
    session: &Session,
    feedback_id: i64,
    form: &FeedbackForm,
    errors: &FieldErrors,
) -> String {
    let action = format!("/feedback/{feedback_id}/update");
    layout("Edit feedback", session, &feedback_form(&action, "Save", form, errors))
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    let title = status.canonical_reason().unwrap_or("Error");
    layout(title, &Session::anonymous(), &format!("<p>{}</p>", escape(message)))
}
