use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use utoipa::ToSchema;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A registered account from the `users` table. `username` is the primary key and
/// never changes once created.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default, PartialEq)]
pub struct User {
    pub username: String,
    // bcrypt hash. Never serialized out of the process.
    #[serde(skip_serializing)]
    #[schema(write_only)]
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Feedback
///
/// A feedback item from the `feedback` table, owned by `username`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default, PartialEq)]
pub struct Feedback {
    pub id: i64,
    pub title: String,
    pub content: String,
    // FK to users.username (ON DELETE CASCADE).
    pub username: String,
}

/// NewUser
///
/// Validated registration data with the password already hashed. This is the only
/// shape the credential store accepts for inserts.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

// --- Form Payloads (application/x-www-form-urlencoded) ---

/// Field name -> message. Ordered so re-rendered forms are deterministic.
pub type FieldErrors = BTreeMap<&'static str, String>;

/// RegisterForm
///
/// Body of `POST /register`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// LoginForm
///
/// Body of `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// FeedbackForm
///
/// Body of the add and update feedback forms.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct FeedbackForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

fn check_len(
    errors: &mut FieldErrors,
    field: &'static str,
    label: &str,
    value: &str,
    min: usize,
    max: Option<usize>,
) {
    let len = value.chars().count();
    if value.contains('\0') {
        errors.insert(field, format!("{label} must not contain NUL characters"));
    } else if len == 0 {
        errors.insert(field, format!("{label} is required"));
    } else if len < min {
        errors.insert(field, format!("{label} must be at least {min} characters"));
    } else if let Some(max) = max.filter(|max| len > *max) {
        errors.insert(field, format!("{label} must be at most {max} characters"));
    }
}

impl RegisterForm {
    /// Trims every text field except the password and checks the column limits.
    pub fn normalize(mut self) -> Result<Self, (Self, FieldErrors)> {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_string();
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();

        let mut errors = FieldErrors::new();
        check_len(&mut errors, "username", "Username", &self.username, 1, Some(20));
        check_len(&mut errors, "password", "Password", &self.password, 6, Some(55));
        check_len(&mut errors, "email", "Email", &self.email, 1, Some(50));
        check_len(&mut errors, "first_name", "First name", &self.first_name, 1, Some(30));
        check_len(&mut errors, "last_name", "Last name", &self.last_name, 1, Some(30));

        if !errors.contains_key("email") && !self.email.contains('@') {
            errors.insert("email", "Email must be a valid address".to_string());
        }

        if errors.is_empty() { Ok(self) } else { Err((self, errors)) }
    }
}

impl LoginForm {
    pub fn normalize(mut self) -> Result<Self, (Self, FieldErrors)> {
        self.username = self.username.trim().to_string();

        let mut errors = FieldErrors::new();
        check_len(&mut errors, "username", "Username", &self.username, 1, None);
        check_len(&mut errors, "password", "Password", &self.password, 1, None);

        if errors.is_empty() { Ok(self) } else { Err((self, errors)) }
    }
}

impl FeedbackForm {
    /// Title and content are stored exactly as submitted, whitespace included.
    pub fn normalize(self) -> Result<Self, (Self, FieldErrors)> {
        let mut errors = FieldErrors::new();
        check_len(&mut errors, "title", "Title", &self.title, 1, Some(100));
        check_len(&mut errors, "content", "Content", &self.content, 1, None);

        if errors.is_empty() { Ok(self) } else { Err((self, errors)) }
    }
}

impl From<&Feedback> for FeedbackForm {
    fn from(feedback: &Feedback) -> Self {
        Self {
            title: feedback.title.clone(),
            content: feedback.content.clone(),
        }
    }
}
