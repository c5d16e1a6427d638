use crate::config::Config;
use crate::db::Db;
use crate::db::repo::{CharacterRepo, CharacterRepository, MemoryCharacterRepository};
use crate::db::repo::{ItemRepo, ItemRepository, MemoryItemRepository};
use crate::error::{AppResult, DomainError};
use crate::models::character::Character;
use crate::models::types::MemberId;
use crate::services::{CatalogService, CharacterService};
use crate::state::registration::{Progress, RegistrationStep, SessionRegistry};
use std::sync::Arc;

pub struct Repos {
    pub item: Arc<dyn ItemRepo>,
    pub character: Arc<dyn CharacterRepo>,
}

pub struct Services {
    pub catalog: Arc<CatalogService>,
    pub character: Arc<CharacterService>,
}

/// What answering a registration step led to.
#[derive(Debug)]
pub enum RegistrationReply {
    Next(RegistrationStep),
    Created(Box<Character>),
}

pub struct Registry {
    pub db: Option<Arc<Db>>,
    pub repos: Arc<Repos>,
    pub services: Arc<Services>,
    pub config: Arc<Config>,
    pub registrations: SessionRegistry,
}

impl Registry {
    /// Registry backed by postgres.
    pub fn new(db: Arc<Db>, config: Arc<Config>) -> Self {
        let repos = Repos {
            item: Arc::new(ItemRepository::new(db.clone())),
            character: Arc::new(CharacterRepository::new(db.clone())),
        };
        let mut registry = Self::with_repos(repos, config);
        registry.db = Some(db);
        registry
    }

    /// Registry that keeps everything in process memory.
    pub fn in_memory(config: Arc<Config>) -> Self {
        let repos = Repos {
            item: Arc::new(MemoryItemRepository::new()),
            character: Arc::new(MemoryCharacterRepository::new()),
        };
        Self::with_repos(repos, config)
    }

    pub fn with_repos(repos: Repos, config: Arc<Config>) -> Self {
        let repos = Arc::new(repos);
        let game = Arc::new(config.game.clone());

        let catalog = Arc::new(CatalogService::new(repos.item.clone()));
        let character = Arc::new(CharacterService::new(repos.character.clone(), catalog.clone(), game));

        Self {
            db: None,
            repos,
            services: Arc::new(Services { catalog, character }),
            config,
            registrations: SessionRegistry::new(),
        }
    }

    /// Connects to the configured database and runs migrations.
    pub async fn connect(config: Arc<Config>) -> AppResult<Self> {
        let db = Arc::new(Db::new(&config.database_url)?);
        db.init().await?;
        Ok(Self::new(db, config))
    }

    /// Starts registration for a member who has no character yet.
    pub async fn start_registration(&self, member_id: &MemberId) -> AppResult<RegistrationStep> {
        if self.services.character.exists(member_id).await? {
            return Err(DomainError::CharacterAlreadyExists(member_id.clone()));
        }
        let step = self.registrations.start(member_id)?;
        tracing::debug!(member = %member_id, "registration started");
        Ok(step)
    }

    /// Feeds an answer to the member's registration and creates the character once complete.
    pub async fn answer_registration(&self, member_id: &MemberId, input: &str) -> AppResult<RegistrationReply> {
        match self.registrations.answer(member_id, input, &self.config.game)? {
            Progress::Next(step) => Ok(RegistrationReply::Next(step)),
            Progress::Complete(draft) => {
                let character = self.services.character.create(draft).await?;
                Ok(RegistrationReply::Created(Box::new(character)))
            }
        }
    }

    pub fn cancel_registration(&self, member_id: &MemberId) -> AppResult<()> {
        self.registrations.cancel(member_id)?;
        tracing::debug!(member = %member_id, "registration cancelled");
        Ok(())
    }
}
