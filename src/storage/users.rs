use chrono::Utc;

use super::db::{Store, StoreError};
use super::engine::{lookup_in, write_in, WriteMode};
use super::models::{User, UserProfile};
use super::password::{hash_password, verify_password};
use super::tables::{Collection, Index};

impl Store {
    // ========================================================================
    // User operations
    // ========================================================================

    /// Create an account. The email check and the insert share one write transaction, so two
    /// concurrent signups with the same email cannot both succeed.
    pub fn signup(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<UserProfile, StoreError> {
        // Hash outside the write transaction; it is the slow part.
        let password_hash = hash_password(password, self.options().password_iterations)?;

        let user = User {
            uid: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash,
            display_name: display_name.to_string(),
            created_at: Utc::now(),
        };

        self.mutate(&[Collection::Users], |write_txn| {
            if !lookup_in(write_txn, Index::UserEmail, email)?.is_empty() {
                return Err(StoreError::EmailAlreadyExists);
            }
            match write_in(write_txn, &user, WriteMode::Insert) {
                Err(StoreError::UniqueConstraintViolation { .. }) => {
                    Err(StoreError::EmailAlreadyExists)
                }
                other => other.map(|_| ()),
            }
        })?;

        tracing::debug!(uid = %user.uid, "Created user");
        Ok(user.into())
    }

    /// Check credentials. Unknown email and wrong password fail the same way.
    pub fn login(&self, email: &str, password: &str) -> Result<UserProfile, StoreError> {
        let user = self.find_user_by_email(email)?;

        match user {
            Some(user) if verify_password(password, &user.password_hash) => Ok(user.into()),
            _ => Err(StoreError::InvalidCredentials),
        }
    }

    pub fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.get_by_key::<User>(uid)?.map(UserProfile::from))
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .query_by_index::<User>(Index::UserEmail, email)?
            .into_iter()
            .next())
    }

    /// Number of accounts registered under `email` (0 or 1).
    pub fn count_users_with_email(&self, email: &str) -> Result<usize, StoreError> {
        Ok(self.query_by_index::<User>(Index::UserEmail, email)?.len())
    }
}
