//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use tracing::debug;

use crate::application::services::{
    OptionService, PathService, SolutionService, StepService, TraversalService, TreeService,
};
use crate::config::Settings;
use crate::domain::Principal;
use crate::infrastructure::error::InfraResult;
use crate::infrastructure::sqlite::SqliteStore;
use crate::infrastructure::traits::GraphStore;

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Acting identity derived from the settings
    pub principal: Principal,

    /// Persisted decision graph
    pub store: Arc<dyn GraphStore>,

    pub trees: TreeService,
    pub paths: PathService,
    pub steps: StepService,
    pub options: OptionService,
    pub solutions: SolutionService,
    pub traversal: TraversalService,
}

impl ServiceContainer {
    /// Create a container over the configured SQLite database.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        debug!("opening database {}", settings.database.display());
        let store = SqliteStore::open(&settings.database, settings.busy_timeout())?;
        Ok(Self::with_store(settings, Arc::new(store)))
    }

    /// Create a service container over a custom store (for testing).
    pub fn with_store(settings: Settings, store: Arc<dyn GraphStore>) -> Self {
        let principal = settings.principal();
        let settings = Arc::new(settings);

        Self {
            settings,
            principal,
            trees: TreeService::new(store.clone()),
            paths: PathService::new(store.clone()),
            steps: StepService::new(store.clone()),
            options: OptionService::new(store.clone()),
            solutions: SolutionService::new(store.clone()),
            traversal: TraversalService::new(store.clone()),
            store,
        }
    }
}
