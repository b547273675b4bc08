use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::backend::Session;
use super::container::ContainerProvider;
use super::dedup::DedupProvider;
use super::file_share::FileShareProvider;
use super::provider::ArtifactProvider;
use super::telemetry::TelemetrySink;
use crate::data::{ArtifactDescriptor, BackendType};
use crate::error::Result;

/// Resolves artifacts to the provider of their backend type. Providers are
/// created lazily and shared for the factory's lifetime.
pub struct ProviderFactory {
    session: Arc<dyn Session>,
    sink: Arc<dyn TelemetrySink>,
    providers: Mutex<HashMap<BackendType, Arc<dyn ArtifactProvider>>>,
}

impl ProviderFactory {
    pub fn new(session: Arc<dyn Session>, sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            session,
            sink,
            providers: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_provider(&self, artifact: &ArtifactDescriptor) -> Result<Arc<dyn ArtifactProvider>> {
        let backend = artifact.backend()?;
        let mut providers = self.providers.lock().unwrap_or_else(PoisonError::into_inner);
        let provider = providers
            .entry(backend)
            .or_insert_with(|| self.create(backend))
            .clone();
        Ok(provider)
    }

    fn create(&self, backend: BackendType) -> Arc<dyn ArtifactProvider> {
        tracing::debug!(%backend, "creating artifact provider");
        match backend {
            BackendType::Container => Arc::new(ContainerProvider::new(self.session.clone(), self.sink.clone())),
            BackendType::ContentAddressable => Arc::new(DedupProvider::new(self.session.clone(), self.sink.clone())),
            BackendType::FileShare => Arc::new(FileShareProvider::new(self.sink.clone())),
        }
    }
}
