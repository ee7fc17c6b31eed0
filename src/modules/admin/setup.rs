use super::accounts::AdminManager;
use crate::modules::error::{PlatformError, PlatformResult};
use crate::modules::store::{Filter, RecordId};
use crate::modules::users::model::UserPatch;
use crate::modules::utils::logging::log_auth_event;

/// What [`AdminManager::bootstrap_admin`] ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// A new, already verified administrator was registered
    Created(RecordId),
    /// An existing account was given admin rights
    Promoted(RecordId),
    AlreadyAdmin(RecordId),
}

impl BootstrapOutcome {
    pub fn user_id(&self) -> &RecordId {
        match self {
            BootstrapOutcome::Created(id)
            | BootstrapOutcome::Promoted(id)
            | BootstrapOutcome::AlreadyAdmin(id) => id,
        }
    }
}

const ADMIN_ALREADY_INITIALIZED: &str = "Admin account is already initialized";

impl AdminManager {
    /// Create or promote the first administrator. Meant for operators with
    /// direct access to the deployment, so no acting admin is required. An
    /// account matching either the username or the email is promoted instead
    /// of registering a new one, once its password checks out. After an
    /// administrator exists, further admins go through `promote_to_admin`.
    pub fn bootstrap_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> PlatformResult<BootstrapOutcome> {
        let existing = self.db.users.find_one(&Filter::or(vec![
            Filter::eq("username", username),
            Filter::eq("email", email),
        ]))?;

        if let Some(user) = existing.as_ref().filter(|user| user.is_admin) {
            return Ok(BootstrapOutcome::AlreadyAdmin(user.id.clone()));
        }
        if self.db.users.find_one(&Filter::eq("is_admin", true))?.is_some() {
            log_auth_event("bootstrap_admin", username, false, Some("admin exists"));
            return Err(PlatformError::Conflict(ADMIN_ALREADY_INITIALIZED.to_string()));
        }

        let outcome = match existing {
            Some(user) => {
                if let Err(e) = self.accounts.check_password(&user, password) {
                    log_auth_event("bootstrap_admin", username, false, Some("wrong password"));
                    return Err(e);
                }
                self.db.users.update(&user.id, UserPatch::promoted_to_admin())?;
                BootstrapOutcome::Promoted(user.id)
            }
            None => {
                let registration = self
                    .accounts
                    .register(username, email, password, first_name, last_name)?;
                self.accounts.verify_email(&registration.verification_token)?;
                self.db
                    .users
                    .update(&registration.user_id, UserPatch::promoted_to_admin())?;
                BootstrapOutcome::Created(registration.user_id)
            }
        };

        log_auth_event("bootstrap_admin", username, true, Some(&format!("{:?}", outcome)));
        Ok(outcome)
    }
}
