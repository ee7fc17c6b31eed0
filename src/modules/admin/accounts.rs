use itertools::Itertools;

use crate::modules::auth::{AccountManager, DeletionAuthority};
use crate::modules::cascade::DeletionReport;
use crate::modules::error::{EntityKind, PlatformError, PlatformResult};
use crate::modules::store::{Database, Filter, RecordId};
use crate::modules::users::model::{UserPatch, UserSummary};
use crate::modules::utils::logging::log_auth_event;

/// Operations reserved for administrators. Every call checks the acting
/// user's admin flag before touching anything.
#[derive(Clone)]
pub struct AdminManager {
    pub(super) db: Database,
    pub(super) accounts: AccountManager,
}

impl AdminManager {
    pub fn new(db: Database, accounts: AccountManager) -> Self {
        Self { db, accounts }
    }

    fn apply(&self, target: &RecordId, patch: UserPatch) -> PlatformResult<()> {
        if self.db.users.update(target, patch)? {
            Ok(())
        } else {
            Err(PlatformError::NotFound(EntityKind::User))
        }
    }

    /// Every account, oldest first
    pub fn list_users(&self, acting_admin_id: &RecordId) -> PlatformResult<Vec<UserSummary>> {
        self.accounts.require_admin(acting_admin_id)?;
        let users = self.db.users.find(&Filter::All)?;
        Ok(users
            .iter()
            .sorted_by_key(|user| user.created_at)
            .map(UserSummary::from)
            .collect())
    }

    pub fn promote_to_admin(
        &self,
        acting_admin_id: &RecordId,
        target: &RecordId,
    ) -> PlatformResult<()> {
        let admin = self.accounts.require_admin(acting_admin_id)?;
        self.apply(target, UserPatch::promoted_to_admin())?;
        let details = format!("promoted {} by {}", target, admin.username);
        log_auth_event("promote_admin", target.as_str(), true, Some(&details));
        Ok(())
    }

    /// Clear the failed-login counter of a locked account
    pub fn unlock_account(&self, acting_admin_id: &RecordId, target: &RecordId) -> PlatformResult<()> {
        let admin = self.accounts.require_admin(acting_admin_id)?;
        self.apply(target, UserPatch::failed_logins_cleared())?;
        let details = format!("unlocked by {}", admin.username);
        log_auth_event("unlock_account", target.as_str(), true, Some(&details));
        Ok(())
    }

    pub fn reactivate_user(&self, acting_admin_id: &RecordId, target: &RecordId) -> PlatformResult<()> {
        self.accounts.reactivate(acting_admin_id, target)
    }

    pub fn admin_delete_user(
        &self,
        acting_admin_id: &RecordId,
        target: &RecordId,
    ) -> PlatformResult<DeletionReport> {
        self.accounts.delete_account(
            target,
            DeletionAuthority::Admin {
                acting_admin_id: acting_admin_id.clone(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testing::{test_platform, STRONG_PASSWORD};

    #[test]
    fn test_admin_checks() {
        let t = test_platform();
        let ada = t.register("ada");
        let bob = t.register("bob");
        let admin = &t.platform.admin;

        assert!(matches!(admin.list_users(&ada), Err(PlatformError::AdminRequired)));
        assert!(matches!(
            admin.promote_to_admin(&ada, &ada),
            Err(PlatformError::AdminRequired)
        ));
        assert!(matches!(
            admin.unlock_account(&ada, &bob),
            Err(PlatformError::AdminRequired)
        ));
        assert!(matches!(
            admin.admin_delete_user(&ada, &bob),
            Err(PlatformError::AdminRequired)
        ));
        assert!(matches!(
            admin.reactivate_user(&RecordId::from("missing"), &bob),
            Err(PlatformError::AdminRequired)
        ));
    }

    #[test]
    fn test_list_and_promote() {
        let t = test_platform();
        let root = t.make_admin("root");
        t.clock.advance(1);
        let ada = t.register("ada");
        let admin = &t.platform.admin;

        let users = admin.list_users(&root).unwrap();
        let names: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["root", "ada"]);

        admin.promote_to_admin(&root, &ada).unwrap();
        assert!(t.platform.accounts.get_user(&ada).unwrap().is_admin);
        assert!(admin.list_users(&ada).is_ok());

        assert!(matches!(
            admin.promote_to_admin(&root, &RecordId::from("missing")),
            Err(PlatformError::NotFound(EntityKind::User))
        ));
    }

    #[test]
    fn test_unlock_account() {
        let t = test_platform();
        let root = t.make_admin("root");
        let ada = t.register("ada");

        for _ in 0..5 {
            let _ = t.platform.accounts.login("ada", "WrongPassword1!");
        }
        assert!(matches!(
            t.platform.accounts.login("ada", STRONG_PASSWORD),
            Err(PlatformError::AccountLocked)
        ));

        t.platform.admin.unlock_account(&root, &ada).unwrap();
        assert!(t.platform.accounts.login("ada", STRONG_PASSWORD).is_ok());
    }

    #[test]
    fn test_admin_delete_user_cascades() {
        let t = test_platform();
        let root = t.make_admin("root");
        let ada = t.register("ada");
        let (_, module) = t.course_with_module(&ada);
        t.quiz(&ada, &module);
        t.note(&ada);

        let report = t.platform.admin.admin_delete_user(&root, &ada).unwrap();
        assert_eq!(report.courses, 1);
        assert_eq!(report.modules, 1);
        assert_eq!(report.quizzes, 1);
        assert_eq!(report.notes, 1);
        assert_eq!(t.store.count("users"), 1);
    }
}
