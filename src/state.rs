// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    error::AppError,
    generator::{GeminiGenerator, QuestionGenerator},
    models::user::{Role, Teacher},
    session::SessionManager,
    store::{ExamStore, LocalStore, PgStore},
    utils::{hash::hash_password, jwt::RevokedTokens},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ExamStore>,
    pub config: Config,
    pub sessions: SessionManager,
    /// `None` when no AI key is configured.
    pub generator: Option<Arc<dyn QuestionGenerator>>,
    pub revoked: RevokedTokens,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ExamStore>,
        config: Config,
        generator: Option<Arc<dyn QuestionGenerator>>,
    ) -> Self {
        Self {
            sessions: SessionManager::new(store.clone()),
            store,
            config,
            generator,
            revoked: RevokedTokens::default(),
        }
    }

    /// Picks the backend from configuration, seeds the teacher account and
    /// wires up the optional generator.
    pub async fn bootstrap(config: Config) -> Result<Self, AppError> {
        let store: Arc<dyn ExamStore> = match (&config.database_url, &config.data_file) {
            (Some(url), _) => {
                tracing::info!("Using hosted document store");
                Arc::new(PgStore::connect(url).await?)
            }
            (None, Some(path)) => {
                tracing::info!("Using local store at {}", path);
                Arc::new(LocalStore::open(path).await?)
            }
            (None, None) => {
                tracing::warn!("No DATABASE_URL or DATA_FILE set, data will not survive a restart");
                Arc::new(LocalStore::in_memory())
            }
        };

        seed_teacher(store.as_ref(), &config).await?;

        let generator = GeminiGenerator::from_config(&config)?
            .map(|g| Arc::new(g) as Arc<dyn QuestionGenerator>);
        if generator.is_none() {
            tracing::info!("GEMINI_API_KEY not set, question generation disabled");
        }

        let state = Self::new(store, config, generator);
        state.sessions.spawn_sweeper();
        Ok(state)
    }
}

/// Creates the teacher account from configuration unless one exists.
pub async fn seed_teacher(store: &dyn ExamStore, config: &Config) -> Result<(), AppError> {
    let teacher = Teacher {
        id: "admin".to_string(),
        role: Role::Teacher,
        name: "Sistem".to_string(),
        surname: "Yöneticisi".to_string(),
        username: config.admin_username.clone(),
        password_hash: hash_password(&config.admin_password)?,
    };
    store.initialize(teacher).await
}

impl FromRef<AppState> for Arc<dyn ExamStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SessionManager {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
