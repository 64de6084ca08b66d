//! kb-sync: Bidirectional sync between a local markdown store and a hosted
//! block-based document database.
//!
//! This crate provides:
//! - Content fingerprints and the metadata header of local documents
//! - The block model and a block ↔ markdown transcoder
//! - The RemoteGateway and FileSystem trait abstractions (plus in-memory versions)
//! - The sync ledger, the pull and push engines and the conflict report
//! - A leaky-bucket pacer for remote requests

pub mod blocks;
pub mod conflicts;
pub mod document;
pub mod engine;
pub mod fingerprint;
pub mod fs;
pub mod gateway;
pub mod header;
pub mod ledger;
pub mod pacer;
pub mod transcode;

pub use blocks::{Annotations, Block, MAX_BLOCKS_PER_REQUEST, RemoteBlock, RichText, Span};
pub use conflicts::ConflictRecord;
pub use document::LocalDocument;
pub use engine::{
    Classification, PullReport, PushReport, SyncEngine, SyncError, SyncOptions, classify,
};
pub use fingerprint::Fingerprint;
pub use fs::{FileEntry, FileSystem, FsError, InMemoryFs};
pub use gateway::{
    CreatedDocument, DocumentProperties, GatewayError, MemoryGateway, Page, RemoteDocument,
    RemoteGateway,
};
pub use header::DocumentHeader;
pub use ledger::{Ledger, LedgerEntry, LedgerError};
pub use pacer::{Clock, ManualClock, Pacer, PacerConfig, TokioClock};
