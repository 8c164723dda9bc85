//! The metadata lookup seam.

use std::collections::HashMap;

use async_trait::async_trait;
use proxy_saml::EntityDescriptor;

use crate::error::{MdqError, MdqResult};

/// Resolves an entity ID to its metadata.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetches the metadata for one entity.
    async fn fetch_entity(&self, entity_id: &str) -> MdqResult<EntityDescriptor>;
}

/// Serves metadata from a fixed set of descriptors.
///
/// Used when the federation is known up front, and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadataProvider {
    entities: HashMap<String, EntityDescriptor>,
}

impl StaticMetadataProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a descriptor.
    #[must_use]
    pub fn with_entity(mut self, descriptor: EntityDescriptor) -> Self {
        self.insert(descriptor);
        self
    }

    /// Parses and adds an `EntityDescriptor` document.
    pub fn with_metadata_xml(mut self, xml: &str) -> MdqResult<Self> {
        self.insert(EntityDescriptor::parse(xml)?);
        Ok(self)
    }

    /// Adds or replaces a descriptor.
    pub fn insert(&mut self, descriptor: EntityDescriptor) {
        self.entities.insert(descriptor.entity_id.clone(), descriptor);
    }
}

#[async_trait]
impl MetadataProvider for StaticMetadataProvider {
    async fn fetch_entity(&self, entity_id: &str) -> MdqResult<EntityDescriptor> {
        self.entities
            .get(entity_id)
            .cloned()
            .ok_or_else(|| MdqError::NotFound(entity_id.to_string()))
    }
}
