//! RemoteGateway trait abstraction over the hosted document database.
//!
//! Implementations:
//! - `MemoryGateway` - For testing
//! - `NotionGateway` (in kb-cli) - Notion REST API over HTTPS
//!
//! Paginated operations return one `Page` per call; callers loop until
//! `next_cursor` is `None`.

mod memory;

pub use memory::{CallCounts, MemoryGateway};

use crate::blocks::{Block, RemoteBlock};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Rate limited by remote API")]
    RateLimited,

    #[error("Remote API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Remote object not found: {0}")]
    NotFound(String),

    #[error("Batch of {0} blocks exceeds the per-request limit")]
    BatchTooLarge(usize),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// One page of a paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

/// A remote document as returned by a collection query.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub id: String,
    pub title: String,
    pub doc_type: String,
    pub status: String,
    /// Canonical reference (page URL)
    pub url: String,
    /// Remote edit marker (last edited timestamp)
    pub last_edited: String,
}

/// Metadata properties written on create/patch. `None` leaves a property untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentProperties {
    pub title: Option<String>,
    pub doc_type: Option<String>,
    pub status: Option<String>,
}

impl DocumentProperties {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.doc_type.is_none() && self.status.is_none()
    }
}

/// Identity of a newly created remote document.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedDocument {
    pub id: String,
    pub url: String,
}

/// Operations the sync engines need from the remote side.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// One page of the documents in a collection
    async fn query_documents(
        &self,
        collection_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RemoteDocument>>;

    /// One page of a document's top-level blocks
    async fn fetch_block_children(
        &self,
        document_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RemoteBlock>>;

    async fn delete_block(&self, block_id: &str) -> Result<()>;

    /// Append at most `MAX_BLOCKS_PER_REQUEST` blocks to the end of a document
    async fn append_block_children(&self, document_id: &str, blocks: &[Block]) -> Result<()>;

    /// Create a document with at most `MAX_BLOCKS_PER_REQUEST` initial blocks
    async fn create_document(
        &self,
        collection_id: &str,
        properties: &DocumentProperties,
        blocks: &[Block],
    ) -> Result<CreatedDocument>;

    async fn patch_properties(
        &self,
        document_id: &str,
        properties: &DocumentProperties,
    ) -> Result<()>;
}

#[async_trait]
impl<T: RemoteGateway + Send + Sync> RemoteGateway for std::sync::Arc<T> {
    async fn query_documents(
        &self,
        collection_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RemoteDocument>> {
        (**self).query_documents(collection_id, cursor).await
    }

    async fn fetch_block_children(
        &self,
        document_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RemoteBlock>> {
        (**self).fetch_block_children(document_id, cursor).await
    }

    async fn delete_block(&self, block_id: &str) -> Result<()> {
        (**self).delete_block(block_id).await
    }

    async fn append_block_children(&self, document_id: &str, blocks: &[Block]) -> Result<()> {
        (**self).append_block_children(document_id, blocks).await
    }

    async fn create_document(
        &self,
        collection_id: &str,
        properties: &DocumentProperties,
        blocks: &[Block],
    ) -> Result<CreatedDocument> {
        (**self).create_document(collection_id, properties, blocks).await
    }

    async fn patch_properties(
        &self,
        document_id: &str,
        properties: &DocumentProperties,
    ) -> Result<()> {
        (**self).patch_properties(document_id, properties).await
    }
}
