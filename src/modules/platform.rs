use log::info;
use std::sync::Arc;

use crate::modules::admin::AdminManager;
use crate::modules::auth::{
    AccountManager, PasswordHasher, Pbkdf2Hasher, RandomTokenGenerator, TokenGenerator,
};
use crate::modules::cascade::CascadeDeleter;
use crate::modules::config::PlatformConfig;
use crate::modules::content::{ContentGenerator, ContentManager, OutlineGenerator};
use crate::modules::courses::CourseManager;
use crate::modules::error::PlatformResult;
use crate::modules::ownership::OwnershipResolver;
use crate::modules::store::{Database, DocumentStore};
use crate::modules::users::ProfileManager;
use crate::modules::utils::time::{Clock, SystemClock};

/// Pluggable services the managers depend on
#[derive(Clone)]
pub struct Collaborators {
    pub hasher: Arc<dyn PasswordHasher>,
    pub tokens: Arc<dyn TokenGenerator>,
    pub clock: Arc<dyn Clock>,
    pub generator: Arc<dyn ContentGenerator>,
}

impl Collaborators {
    /// Production collaborators tuned by the security settings
    pub fn from_config(config: &PlatformConfig) -> Self {
        Self {
            hasher: Arc::new(Pbkdf2Hasher::new(config.security.password_hash_iterations)),
            tokens: Arc::new(RandomTokenGenerator::new(config.security.token_length)),
            clock: Arc::new(SystemClock),
            generator: Arc::new(OutlineGenerator),
        }
    }
}

/// Every manager wired to one store
#[derive(Clone)]
pub struct Platform {
    pub db: Database,
    pub accounts: AccountManager,
    pub profiles: ProfileManager,
    pub courses: CourseManager,
    pub content: ContentManager,
    pub admin: AdminManager,
    pub resolver: OwnershipResolver,
    pub cascade: CascadeDeleter,
}

impl Platform {
    pub fn new(store: Arc<dyn DocumentStore>, config: &PlatformConfig) -> PlatformResult<Self> {
        Self::with_collaborators(store, config, Collaborators::from_config(config))
    }

    pub fn with_collaborators(
        store: Arc<dyn DocumentStore>,
        config: &PlatformConfig,
        collaborators: Collaborators,
    ) -> PlatformResult<Self> {
        let db = Database::open(store)?;
        let resolver = OwnershipResolver::new(db.clone(), config.access.clone());
        let cascade = CascadeDeleter::new(db.clone(), resolver.clone());

        let accounts = AccountManager::new(
            db.clone(),
            collaborators.hasher,
            collaborators.tokens,
            Arc::clone(&collaborators.clock),
            config.security.clone(),
            cascade.clone(),
        );
        let profiles = ProfileManager::new(db.clone(), Arc::clone(&collaborators.clock));
        let courses = CourseManager::new(
            db.clone(),
            Arc::clone(&collaborators.clock),
            resolver.clone(),
            cascade.clone(),
        );
        let content = ContentManager::new(
            db.clone(),
            collaborators.clock,
            resolver.clone(),
            collaborators.generator,
        );
        let admin = AdminManager::new(db.clone(), accounts.clone());

        info!("Platform ready");
        Ok(Self {
            db,
            accounts,
            profiles,
            courses,
            content,
            admin,
            resolver,
            cascade,
        })
    }
}
