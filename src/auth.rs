use crate::{
    error::AppError,
    models::{NewUser, User},
    repository::RepositoryState,
    session::Session,
};

/// AuthService
///
/// Registers users and verifies credentials against the credential store. Raw
/// passwords only ever reach `bcrypt`; they are not stored and not logged.
#[derive(Clone)]
pub struct AuthService {
    repo: RepositoryState,
    hash_cost: u32,
}

impl AuthService {
    pub fn new(repo: RepositoryState, hash_cost: u32) -> Self {
        Self { repo, hash_cost }
    }

    /// register
    ///
    /// Hashes `password` with a fresh per-record salt and inserts the user.
    ///
    /// # Errors
    /// `DuplicateKey { field }` when the username or email is already registered;
    /// the existing record is left untouched.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> Result<User, AppError> {
        let password_hash = bcrypt::hash(password, self.hash_cost)?;

        let user = self
            .repo
            .create_user(NewUser {
                username: username.to_string(),
                password_hash,
                email: email.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
            })
            .await?;

        tracing::info!(username = %user.username, "user registered");
        Ok(user)
    }

    /// login
    ///
    /// Returns the user when `password` matches the stored hash. Unknown usernames
    /// and wrong passwords both produce `AuthFailure`, and both pay for one bcrypt
    /// computation so response timing does not reveal which accounts exist.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AppError> {
        let Some(user) = self.repo.get_user(username).await? else {
            let _ = bcrypt::hash(password, self.hash_cost);
            tracing::debug!("login rejected");
            return Err(AppError::AuthFailure);
        };

        match bcrypt::verify(password, &user.password) {
            Ok(true) => {
                tracing::info!(username = %user.username, "user signed in");
                Ok(user)
            }
            Ok(false) => {
                tracing::debug!("login rejected");
                Err(AppError::AuthFailure)
            }
            Err(e) => {
                // Unparseable stored hash: still a plain credential failure to the caller.
                tracing::warn!(error = %e, "stored password hash could not be verified");
                Err(AppError::AuthFailure)
            }
        }
    }
}

/// True iff the request carries a verified identity claim.
pub fn is_signed_in(session: &Session) -> bool {
    session.is_signed_in()
}
