//! # proxy-discovery
//!
//! Where the proxy learns about universities.
//!
//! ## Components
//!
//! - [`FederationIndex`] - Searchable list of the federation's IdPs, built
//!   from the metadata aggregate and refreshed in the background
//! - [`MdqClient`] - Per-entity metadata lookups against an MDQ server,
//!   with signature checks and an in-memory [`MdqCache`]
//! - [`MetadataProvider`] - The seam the server depends on; also
//!   implemented by [`StaticMetadataProvider`]
//!
//! ## Example
//!
//! ```ignore
//! use proxy_discovery::{MdqCache, MdqClient, MetadataProvider};
//!
//! let mdq = MdqClient::builder("https://mdq.incommon.org")
//!     .cache(MdqCache::default())
//!     .signing_cert(mdq_cert_der)
//!     .build()?;
//! let university = mdq.fetch_entity("https://idp.example.edu/idp").await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod federation_index;
pub mod mdq;
pub mod provider;

pub use cache::MdqCache;
pub use error::{MdqError, MdqResult};
pub use federation_index::{
    entity_descriptor_fragments, federation_index_task, parse_idp_entries, EntityEntry,
    FederationIndex, REFRESH_INTERVAL, SEARCH_RESULT_LIMIT,
};
pub use mdq::{MdqClient, MdqClientBuilder, SAML_METADATA_CONTENT_TYPE};
pub use provider::{MetadataProvider, StaticMetadataProvider};
