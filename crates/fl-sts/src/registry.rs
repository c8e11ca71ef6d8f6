//! Provider lookup tables.

use std::collections::HashMap;
use std::sync::Arc;

use fl_core::QName;

use crate::error::{StsError, StsResult};
use crate::provider::TokenProvider;

/// Providers keyed by service name, token type and (family, element).
///
/// At most one provider may be registered per exact key.
#[derive(Default)]
pub struct TokenProviderRegistry {
    by_service: HashMap<String, Arc<dyn TokenProvider>>,
    by_token_type: HashMap<String, Arc<dyn TokenProvider>>,
    by_element: HashMap<(String, QName), Arc<dyn TokenProvider>>,
}

impl std::fmt::Debug for TokenProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProviderRegistry")
            .field("services", &self.by_service.keys().collect::<Vec<_>>())
            .field("token_types", &self.by_token_type.keys().collect::<Vec<_>>())
            .field("elements", &self.by_element.len())
            .finish()
    }
}

fn insert<K>(
    map: &mut HashMap<K, Arc<dyn TokenProvider>>,
    key: K,
    provider: Arc<dyn TokenProvider>,
    describe: impl FnOnce(&K) -> String,
) -> StsResult<()>
where
    K: std::hash::Hash + Eq,
{
    if map.contains_key(&key) {
        return Err(StsError::Configuration(format!(
            "duplicate token provider for {}",
            describe(&key)
        )));
    }
    map.insert(key, provider);
    Ok(())
}

impl TokenProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `provider` for a relying service.
    ///
    /// # Errors
    ///
    /// Returns [`StsError::Configuration`] if the service is taken.
    pub fn register_service(
        &mut self,
        service: impl Into<String>,
        provider: Arc<dyn TokenProvider>,
    ) -> StsResult<()> {
        insert(&mut self.by_service, service.into(), provider, |k| {
            format!("service '{k}'")
        })
    }

    /// Registers `provider` for a token type.
    ///
    /// # Errors
    ///
    /// Returns [`StsError::Configuration`] if the type is taken.
    pub fn register_token_type(
        &mut self,
        token_type: impl Into<String>,
        provider: Arc<dyn TokenProvider>,
    ) -> StsResult<()> {
        insert(&mut self.by_token_type, token_type.into(), provider, |k| {
            format!("token type '{k}'")
        })
    }

    /// Registers `provider` for a token family and element name.
    ///
    /// # Errors
    ///
    /// Returns [`StsError::Configuration`] if the pair is taken.
    pub fn register_element(
        &mut self,
        family: impl Into<String>,
        element: QName,
        provider: Arc<dyn TokenProvider>,
    ) -> StsResult<()> {
        insert(
            &mut self.by_element,
            (family.into(), element),
            provider,
            |(family, element)| format!("element {element} in family '{family}'"),
        )
    }

    /// Returns the provider registered for `service`.
    #[must_use]
    pub fn for_service(&self, service: &str) -> Option<Arc<dyn TokenProvider>> {
        self.by_service.get(service).cloned()
    }

    /// Returns the provider registered for `token_type`.
    #[must_use]
    pub fn for_token_type(&self, token_type: &str) -> Option<Arc<dyn TokenProvider>> {
        self.by_token_type.get(token_type).cloned()
    }

    /// Returns the provider registered for the element.
    #[must_use]
    pub fn for_element(&self, family: &str, element: &QName) -> Option<Arc<dyn TokenProvider>> {
        self.by_element
            .get(&(family.to_string(), element.clone()))
            .cloned()
    }

    /// Resolves the provider for an issue request: by service first, then
    /// by token type.
    #[must_use]
    pub fn resolve(&self, service: Option<&str>, token_type: Option<&str>) -> Option<Arc<dyn TokenProvider>> {
        service
            .and_then(|s| self.for_service(s))
            .or_else(|| token_type.and_then(|t| self.for_token_type(t)))
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_service.is_empty() && self.by_token_type.is_empty() && self.by_element.is_empty()
    }
}
