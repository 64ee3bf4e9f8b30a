//! Ownership checks run before every mutating operation.
//!
//! Each check compares the session identity with the owner of the target record
//! and fails with `AppError::Unauthorized` otherwise. An anonymous session never
//! owns anything.

use crate::{config::ProfileAccess, error::AppError, models::Feedback, session::Session};

pub fn assert_owns_user(session: &Session, username: &str) -> Result<(), AppError> {
    match session.username() {
        Some(me) if me == username => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

pub fn assert_owns_feedback(session: &Session, feedback: &Feedback) -> Result<(), AppError> {
    assert_owns_user(session, &feedback.username)
}

/// Profile pages need a signed-in viewer; `OwnerOnly` additionally requires the
/// viewer to be the profile's owner.
pub fn assert_can_view_profile(
    session: &Session,
    username: &str,
    access: ProfileAccess,
) -> Result<(), AppError> {
    match access {
        ProfileAccess::AnySignedIn if session.is_signed_in() => Ok(()),
        ProfileAccess::AnySignedIn => Err(AppError::Unauthorized),
        ProfileAccess::OwnerOnly => assert_owns_user(session, username),
    }
}
