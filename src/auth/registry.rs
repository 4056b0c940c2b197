/// Provider Registry
///
/// In-memory map of registered OAuth2 providers. Stored grant overrides are
/// applied at registration time, so the admin copy always takes precedence
/// over the configuration shipped in code.
use crate::auth::config::ProviderOverride;
use crate::auth::error::AuthError;
use crate::auth::providers::{ProviderDescriptor, ProviderRegistry};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, warn};

#[derive(Default)]
pub struct InMemoryProviderRegistry {
    providers: RwLock<HashMap<String, ProviderDescriptor>>,
    stored_grants: HashMap<String, ProviderOverride>,
}

impl InMemoryProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that applies stored grant settings
    pub fn with_stored_grants(stored_grants: HashMap<String, ProviderOverride>) -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
            stored_grants,
        }
    }

    /// Get a registered provider
    pub fn get(&self, name: &str) -> Option<ProviderDescriptor> {
        self.providers
            .read()
            .ok()
            .and_then(|providers| providers.get(name).cloned())
    }

    /// List all registered provider names, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .providers
            .read()
            .map(|providers| providers.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl ProviderRegistry for InMemoryProviderRegistry {
    fn register(&self, name: &str, mut descriptor: ProviderDescriptor) -> Result<(), AuthError> {
        if name.is_empty() {
            return Err(AuthError::ConfigError(
                "Provider name cannot be empty".to_string(),
            ));
        }

        if let Some(stored) = self.stored_grants.get(name) {
            debug!("Applying stored grant settings for provider {}", name);
            stored.apply(&mut descriptor.grant, &mut descriptor.enabled);
        }

        descriptor.grant.validate()?;

        if descriptor.uses_placeholder_credentials() {
            warn!(
                "Provider {} still uses placeholder client credentials; set them in the provider settings",
                name
            );
        }

        let mut providers = self
            .providers
            .write()
            .map_err(|_| AuthError::ConfigError("Provider registry lock poisoned".to_string()))?;

        if providers.contains_key(name) {
            return Err(AuthError::DuplicateProvider(name.to_string()));
        }

        providers.insert(name.to_string(), descriptor);
        Ok(())
    }
}
