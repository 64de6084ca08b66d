//! In-process gateway for tests.
//!
//! Keeps documents in insertion order, hands out offset cursors and counts
//! every call so tests can assert on remote traffic.

use super::{
    CreatedDocument, DocumentProperties, GatewayError, Page, RemoteDocument, RemoteGateway, Result,
};
use crate::blocks::{Block, MAX_BLOCKS_PER_REQUEST, RemoteBlock};
use async_trait::async_trait;
use std::sync::RwLock;
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: usize = 100;

/// Number of calls made per gateway operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub query: usize,
    pub fetch: usize,
    pub delete: usize,
    pub append: usize,
    pub create: usize,
    pub patch: usize,
}

impl CallCounts {
    /// Calls that change remote state.
    pub fn mutations(&self) -> usize {
        self.delete + self.append + self.create + self.patch
    }
}

struct StoredDocument {
    collection_id: String,
    document: RemoteDocument,
    blocks: Vec<RemoteBlock>,
}

#[derive(Default)]
struct State {
    documents: Vec<StoredDocument>,
    edits: u64,
    calls: CallCounts,
}

impl State {
    fn find_mut(&mut self, id: &str) -> Result<&mut StoredDocument> {
        self.documents
            .iter_mut()
            .find(|d| d.document.id == id)
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))
    }

    /// Produce a fresh edit marker. Markers sort in edit order.
    fn next_marker(&mut self) -> String {
        self.edits += 1;
        format!("edit-{:08}", self.edits)
    }

    fn touch(&mut self, id: &str) -> Result<()> {
        let marker = self.next_marker();
        self.find_mut(id)?.document.last_edited = marker;
        Ok(())
    }
}

/// In-memory remote database.
pub struct MemoryGateway {
    state: RwLock<State>,
    page_size: usize,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: RwLock::new(State::default()),
            page_size: page_size.max(1),
        }
    }

    /// Add a document as if it had been created remotely. Returns its id.
    pub fn insert_document(
        &self,
        collection_id: &str,
        title: &str,
        last_edited: &str,
        blocks: Vec<Block>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        let mut state = self.state.write().unwrap();
        state.documents.push(StoredDocument {
            collection_id: collection_id.to_string(),
            document: RemoteDocument {
                id: id.clone(),
                title: title.to_string(),
                doc_type: String::new(),
                status: String::new(),
                url: page_url(&id),
                last_edited: last_edited.to_string(),
            },
            blocks: blocks.into_iter().map(new_block).collect(),
        });
        id
    }

    /// Replace a document's content as a remote editor would, advancing its marker.
    pub fn set_blocks(&self, id: &str, blocks: Vec<Block>) {
        let mut state = self.state.write().unwrap();
        if let Ok(doc) = state.find_mut(id) {
            doc.blocks = blocks.into_iter().map(new_block).collect();
        }
        let _ = state.touch(id);
    }

    /// Append a raw block, e.g. one of a type the transcoder does not model.
    pub fn push_raw_block(&self, id: &str, block: RemoteBlock) {
        let mut state = self.state.write().unwrap();
        if let Ok(doc) = state.find_mut(id) {
            doc.blocks.push(block);
        }
    }

    /// Advance a document's edit marker without changing content.
    pub fn touch(&self, id: &str) {
        let _ = self.state.write().unwrap().touch(id);
    }

    pub fn document(&self, id: &str) -> Option<RemoteDocument> {
        let state = self.state.read().unwrap();
        state
            .documents
            .iter()
            .find(|d| d.document.id == id)
            .map(|d| d.document.clone())
    }

    /// Modeled blocks of a document, in order.
    pub fn blocks(&self, id: &str) -> Vec<Block> {
        let state = self.state.read().unwrap();
        state
            .documents
            .iter()
            .find(|d| d.document.id == id)
            .map(|d| d.blocks.iter().filter_map(|b| b.block.clone()).collect())
            .unwrap_or_default()
    }

    pub fn document_count(&self) -> usize {
        self.state.read().unwrap().documents.len()
    }

    pub fn calls(&self) -> CallCounts {
        self.state.read().unwrap().calls
    }

    pub fn mutation_count(&self) -> usize {
        self.calls().mutations()
    }

    pub fn reset_calls(&self) {
        self.state.write().unwrap().calls = CallCounts::default();
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn page_url(id: &str) -> String {
    format!("https://www.notion.so/{}", id.replace('-', ""))
}

fn new_block(block: Block) -> RemoteBlock {
    RemoteBlock::new(Uuid::new_v4().to_string(), block)
}

/// Slice `items` at the offset encoded in `cursor`.
fn paginate<T: Clone>(items: &[T], cursor: Option<&str>, page_size: usize) -> Result<Page<T>> {
    let start = match cursor {
        Some(c) => c
            .parse::<usize>()
            .map_err(|_| GatewayError::Decode(format!("invalid cursor: {c}")))?,
        None => 0,
    };
    let total = items.len();
    let start = start.min(total);
    let end = (start + page_size).min(total);
    Ok(Page {
        items: items[start..end].to_vec(),
        next_cursor: (end < total).then(|| end.to_string()),
    })
}

fn check_batch(blocks: &[Block]) -> Result<()> {
    if blocks.len() > MAX_BLOCKS_PER_REQUEST {
        return Err(GatewayError::BatchTooLarge(blocks.len()));
    }
    Ok(())
}

fn apply_properties(document: &mut RemoteDocument, properties: &DocumentProperties) {
    if let Some(title) = &properties.title {
        document.title = title.clone();
    }
    if let Some(doc_type) = &properties.doc_type {
        document.doc_type = doc_type.clone();
    }
    if let Some(status) = &properties.status {
        document.status = status.clone();
    }
}

#[async_trait]
impl RemoteGateway for MemoryGateway {
    async fn query_documents(
        &self,
        collection_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RemoteDocument>> {
        let mut state = self.state.write().unwrap();
        state.calls.query += 1;
        let documents: Vec<RemoteDocument> = state
            .documents
            .iter()
            .filter(|d| d.collection_id == collection_id)
            .map(|d| d.document.clone())
            .collect();
        paginate(&documents, cursor, self.page_size)
    }

    async fn fetch_block_children(
        &self,
        document_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RemoteBlock>> {
        let mut state = self.state.write().unwrap();
        state.calls.fetch += 1;
        let blocks = state.find_mut(document_id)?.blocks.clone();
        paginate(&blocks, cursor, self.page_size)
    }

    async fn delete_block(&self, block_id: &str) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.calls.delete += 1;
        let owner = state.documents.iter_mut().find_map(|d| {
            let index = d.blocks.iter().position(|b| b.id == block_id)?;
            d.blocks.remove(index);
            Some(d.document.id.clone())
        });
        match owner {
            Some(id) => state.touch(&id),
            None => Err(GatewayError::NotFound(block_id.to_string())),
        }
    }

    async fn append_block_children(&self, document_id: &str, blocks: &[Block]) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.calls.append += 1;
        check_batch(blocks)?;
        let doc = state.find_mut(document_id)?;
        doc.blocks.extend(blocks.iter().cloned().map(new_block));
        state.touch(document_id)
    }

    async fn create_document(
        &self,
        collection_id: &str,
        properties: &DocumentProperties,
        blocks: &[Block],
    ) -> Result<CreatedDocument> {
        let mut state = self.state.write().unwrap();
        state.calls.create += 1;
        check_batch(blocks)?;

        let id = Uuid::new_v4().to_string();
        let url = page_url(&id);
        let mut document = RemoteDocument {
            id: id.clone(),
            title: String::new(),
            doc_type: String::new(),
            status: String::new(),
            url: url.clone(),
            last_edited: state.next_marker(),
        };
        apply_properties(&mut document, properties);
        state.documents.push(StoredDocument {
            collection_id: collection_id.to_string(),
            document,
            blocks: blocks.iter().cloned().map(new_block).collect(),
        });
        Ok(CreatedDocument { id, url })
    }

    async fn patch_properties(
        &self,
        document_id: &str,
        properties: &DocumentProperties,
    ) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.calls.patch += 1;
        let doc = state.find_mut(document_id)?;
        apply_properties(&mut doc.document, properties);
        state.touch(document_id)
    }
}
