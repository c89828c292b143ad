//! swc-core: Core library for the swc Swift CLI client
//!
//! This crate provides the core functionality for the swc CLI, including:
//! - Configuration and profile management
//! - Object path parsing
//! - Segment planning and manifest naming
//! - The transfer engine for segmented uploads and bulk operations
//! - ObjectStore trait for Swift operations
//!
//! This crate is independent of any HTTP client; the engine only talks to
//! an [`ObjectStore`].

pub mod config;
pub mod error;
pub mod path;
pub mod profile;
pub mod segment;
pub mod session;
pub mod traits;
pub mod transfer;

#[cfg(test)]
mod memory;

pub use config::{Config, ConfigManager, Defaults, SegmentFailurePolicy, TimeoutConfig};
pub use error::{Error, Result};
pub use path::{ObjectPath, parse_path};
pub use profile::{Profile, ProfileManager};
pub use segment::{ManifestPrefix, ManifestRef, Segment, plan_segments};
pub use session::Session;
pub use traits::{
    ContainerInfo, ListOptions, ListingEntry, ObjectInfo, ObjectStore, PutOptions,
};
pub use transfer::{
    BulkOutcome, DeleteOutcome, FailedItem, NoProgress, SegmentCleanup, TransferEngine,
    TransferProgress, TransferRequest, TransferSettings, UploadOutcome,
};
