use std::sync::Arc;

use diffhub_diff::{DiffGenerator, GitCliRepository, RepositoryAccess};
use diffhub_notify::{BroadcastBus, MessageBus, NotificationFanout};
use diffhub_processor::{ComparisonProcessor, ComparisonService};
use diffhub_store::{InMemoryRequestStore, InMemoryResultStore};

use crate::config::ServiceConfig;

/// Shared handler state: the comparison service and the notification fan-out.
#[derive(Clone, Debug)]
pub struct AppState {
    pub service: ComparisonService,
    pub fanout: Arc<NotificationFanout>,
    pub bus: Arc<BroadcastBus>,
}

impl AppState {
    /// Wire the service with the `git` backend and in-memory stores, and
    /// start the processor. Must run inside a tokio runtime.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let repo = Arc::new(GitCliRepository::with_binary(&config.diff.git_binary));
        Self::with_repository(repo, config)
    }

    /// Same as [`AppState::from_config`] with an explicit repository backend.
    pub fn with_repository(repo: Arc<dyn RepositoryAccess>, config: &ServiceConfig) -> Self {
        let requests = Arc::new(InMemoryRequestStore::new());
        let results = Arc::new(InMemoryResultStore::new());
        let fanout = Arc::new(NotificationFanout::new(config.notify.clone()));
        let bus = Arc::new(BroadcastBus::default());
        let generator = DiffGenerator::new(repo, config.diff.config.clone());

        let handle = ComparisonProcessor::new(
            requests.clone(),
            results.clone(),
            generator.clone(),
            Arc::clone(&fanout),
            config.processor.clone(),
        )
        .with_bus(Arc::clone(&bus) as Arc<dyn MessageBus>)
        .start();

        let service = ComparisonService::new(requests, results, generator, Arc::new(handle));
        Self {
            service,
            fanout,
            bus,
        }
    }
}
