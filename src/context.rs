/// Application context and dependency injection
use crate::{
    config::{BackendKind, ServerConfig},
    error::StoreResult,
    store::{FileIdentityProvider, IdentityProvider, LdapIdentityProvider},
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub provider: Arc<dyn IdentityProvider>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub fn new(config: ServerConfig) -> StoreResult<Self> {
        // Validate configuration
        config.validate()?;

        let provider: Arc<dyn IdentityProvider> = match config.backend {
            BackendKind::Ldap => {
                tracing::info!("Using LDAP backend at {}", config.ldap.url());
                Arc::new(LdapIdentityProvider::new(config.ldap.clone()))
            }
            BackendKind::File => {
                tracing::info!("Using users file {:?}", config.file.users_file);
                Arc::new(FileIdentityProvider::new(&config.file))
            }
        };

        Ok(Self::with_provider(config, provider))
    }

    /// Build a context around an existing provider
    pub fn with_provider(config: ServerConfig, provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            config: Arc::new(config),
            provider,
        }
    }

    /// Listen address
    pub fn listen_addr(&self) -> String {
        format!(
            "{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
