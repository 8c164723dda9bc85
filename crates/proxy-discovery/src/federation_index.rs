//! Searchable index of the federation's identity providers.
//!
//! The index is built from the federation's metadata aggregate. Only
//! entities with an IdP role are kept, sorted by display name.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use proxy_saml::EntityDescriptor;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{MdqError, MdqResult};

/// Maximum number of results returned by a discovery search.
pub const SEARCH_RESULT_LIMIT: usize = 20;

/// How often [`federation_index_task`] reloads the aggregate.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

const AGGREGATE_TIMEOUT: Duration = Duration::from_secs(120);

/// One IdP as shown in the discovery search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityEntry {
    /// The IdP's entity ID.
    pub entity_id: String,
    /// Human-readable organization name.
    pub display_name: String,
}

impl EntityEntry {
    fn from_descriptor(descriptor: &EntityDescriptor) -> Self {
        Self {
            entity_id: descriptor.entity_id.clone(),
            display_name: descriptor.display_name().to_string(),
        }
    }
}

/// Shared handle to the federation index.
///
/// Cloning is cheap; clones see the same entries.
#[derive(Debug, Clone)]
pub struct FederationIndex {
    entries: Arc<RwLock<Vec<EntityEntry>>>,
    loaded: Arc<AtomicBool>,
    aggregate_url: String,
    http: reqwest::Client,
}

impl FederationIndex {
    /// Creates an empty index that loads from `aggregate_url`.
    pub fn new(aggregate_url: impl Into<String>) -> MdqResult<Self> {
        Ok(Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            loaded: Arc::new(AtomicBool::new(false)),
            aggregate_url: aggregate_url.into(),
            http: reqwest::Client::builder()
                .timeout(AGGREGATE_TIMEOUT)
                .build()?,
        })
    }

    /// The aggregate this index loads from.
    #[must_use]
    pub fn aggregate_url(&self) -> &str {
        &self.aggregate_url
    }

    /// Case-insensitive substring search over display names.
    ///
    /// Results keep index order. An empty query matches everything.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<EntityEntry> {
        let needle = query.trim().to_lowercase();
        self.entries
            .read()
            .await
            .iter()
            .filter(|entry| entry.display_name.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Replaces the whole index.
    pub async fn replace(&self, entries: Vec<EntityEntry>) {
        *self.entries.write().await = entries;
        self.loaded.store(true, Ordering::Release);
    }

    /// Number of indexed IdPs.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing is indexed.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Returns true once the index has been loaded at least once.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Downloads the aggregate and rebuilds the index.
    ///
    /// On failure the previous entries stay in place.
    pub async fn refresh(&self) -> MdqResult<usize> {
        let response = self
            .http
            .get(&self.aggregate_url)
            .header(reqwest::header::ACCEPT, crate::SAML_METADATA_CONTENT_TYPE)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MdqError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.aggregate_url.clone(),
            });
        }

        let xml = response.text().await?;
        let entries = parse_idp_entries(&xml);
        let count = entries.len();
        self.replace(entries).await;
        Ok(count)
    }
}

/// Splits an aggregate into its `EntityDescriptor` elements.
///
/// Works on the raw text so a large aggregate is never held as a tree.
/// Prefixed (`md:EntityDescriptor`) and unprefixed elements are both found.
#[must_use]
pub fn entity_descriptor_fragments(xml: &str) -> Vec<&str> {
    let mut fragments = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = xml[cursor..].find('<') {
        let start = cursor + offset;
        let name_end = xml[start + 1..]
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .map_or(xml.len(), |i| start + 1 + i);
        let name = &xml[start + 1..name_end];

        let local_name = name.rsplit(':').next().unwrap_or(name);
        if local_name != "EntityDescriptor" {
            cursor = start + 1;
            continue;
        }

        let closing = format!("</{name}>");
        match xml[name_end..].find(&closing) {
            Some(i) => {
                let end = name_end + i + closing.len();
                fragments.push(&xml[start..end]);
                cursor = end;
            }
            None => cursor = name_end,
        }
    }

    fragments
}

/// Reads the IdPs out of an aggregate, sorted by display name.
///
/// Entities that fail to parse are skipped.
#[must_use]
pub fn parse_idp_entries(xml: &str) -> Vec<EntityEntry> {
    let mut entries: Vec<EntityEntry> = entity_descriptor_fragments(xml)
        .into_iter()
        .filter(|fragment| fragment.contains("IDPSSODescriptor"))
        .filter_map(|fragment| match EntityDescriptor::parse(fragment) {
            Ok(descriptor) if descriptor.is_idp() => Some(EntityEntry::from_descriptor(&descriptor)),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable entity");
                None
            }
        })
        .collect();

    entries.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    entries
}

/// Keeps the index fresh: loads immediately, then every [`REFRESH_INTERVAL`].
pub async fn federation_index_task(index: FederationIndex) {
    let mut interval = tokio::time::interval(REFRESH_INTERVAL);
    loop {
        interval.tick().await;
        match index.refresh().await {
            Ok(count) => tracing::info!(
                entities = count,
                url = %index.aggregate_url(),
                "federation index loaded"
            ),
            Err(e) => tracing::error!(
                error = %e,
                url = %index.aggregate_url(),
                "failed to refresh federation index"
            ),
        }
    }
}
