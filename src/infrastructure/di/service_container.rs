//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use tracing::debug;

use crate::application::services::{CascadeService, PolicyService, ReorderService, SectionService};
use crate::application::ApplicationError;
use crate::config::Settings;
use crate::domain::UserId;
use crate::infrastructure::audit::{JsonlAuditSink, TracingAuditSink};
use crate::infrastructure::file_store::JsonFileStore;
use crate::infrastructure::traits::{AuditSink, DocumentStore};
use crate::infrastructure::InfraResult;

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Section store
    pub store: Arc<dyn DocumentStore>,

    /// Audit sink
    pub audit: Arc<dyn AuditSink>,

    pub sections: SectionService,
    pub reorder: ReorderService,
    pub cascade: CascadeService,
    pub policies: PolicyService,
}

impl ServiceContainer {
    /// Create a service container over the JSON store file from `settings`.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        let store = JsonFileStore::open(&settings.store_file).map_err(|e| {
            ApplicationError::store(format!("open store {}", settings.store_file.display()), e)
        })?;
        let audit: Arc<dyn AuditSink> = match &settings.audit_log {
            Some(path) => {
                debug!("audit log: {}", path.display());
                Arc::new(JsonlAuditSink::new(path))
            }
            None => Arc::new(TracingAuditSink),
        };
        Ok(Self::with_deps(settings, Arc::new(store), audit))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        store: Arc<dyn DocumentStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let settings = Arc::new(settings);

        let sections = SectionService::new(store.clone(), audit.clone());
        let reorder = ReorderService::new(store.clone(), audit.clone());
        let cascade = CascadeService::new(store.clone(), audit.clone(), settings.clone());
        let policies = PolicyService::new(store.clone(), audit.clone());

        Self {
            settings,
            store,
            audit,
            sections,
            reorder,
            cascade,
            policies,
        }
    }

    /// Identity recorded on audit events and created rows.
    pub fn actor(&self) -> UserId {
        UserId::new(self.settings.actor.clone())
    }
}
