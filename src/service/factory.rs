//! Map service factory
//!
//! The sole point of backend polymorphism: a provider identifier plus its
//! options bag selects which service variant gets constructed.

use crate::core::config::{ProviderKind, ServiceOptions};
use crate::provider::{amap::Amap, bmap::Bmap};
use crate::service::{MapService, ProviderService};
use crate::Result;
use std::str::FromStr;

pub struct MapServiceFactory;

impl MapServiceFactory {
    /// Selects a backend by identifier. Pure and synchronous; the returned
    /// service is not yet initialized against a live map. Unknown identifiers
    /// fail with [`crate::MapError::UnsupportedProvider`].
    pub fn create_service(
        provider_id: &str,
        options: ServiceOptions,
    ) -> Result<Box<dyn MapService>> {
        let kind = ProviderKind::from_str(provider_id)?;
        Ok(Self::create_service_for(kind, options))
    }

    /// Same selection for callers that already hold a parsed [`ProviderKind`].
    pub fn create_service_for(kind: ProviderKind, options: ServiceOptions) -> Box<dyn MapService> {
        match kind {
            ProviderKind::Amap => Box::new(ProviderService::new(Amap, options)),
            ProviderKind::Bmap => Box::new(ProviderService::new(Bmap, options)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MapError;

    #[test]
    fn test_unknown_provider_fails() {
        let result = MapServiceFactory::create_service("google", ServiceOptions::default());
        match result {
            Err(MapError::UnsupportedProvider(id)) => assert_eq!(id, "google"),
            _ => panic!("expected UnsupportedProvider"),
        }
    }

    #[test]
    fn test_known_providers_construct_uninitialized() {
        for id in ["amap", "bmap"] {
            let service = MapServiceFactory::create_service(id, ServiceOptions::default()).unwrap();
            assert_eq!(service.provider().as_str(), id);
            assert!(!service.is_ready());
            assert!(service.map().is_none());
        }
    }
}
