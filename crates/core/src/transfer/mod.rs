//! Segmented transfer engine
//!
//! [`TransferEngine`] drives uploads, downloads, listings and deletes through an
//! [`ObjectStore`]. Uploads larger than the segment size are split into
//! segment objects plus a manifest; segments orphaned by an overwrite or a
//! delete are reclaimed once nothing points at them anymore.

mod bulk;
mod upload;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{DEFAULT_CONCURRENCY, DEFAULT_SEGMENT_SIZE, Defaults, SegmentFailurePolicy};
use crate::error::Error;
use crate::path::{normalize_object_name, object_name_for};
use crate::traits::{ListingEntry, ObjectStore};

pub use bulk::LIST_PAGE_SIZE;

/// One logical upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Target container
    pub bucket: String,

    /// Local file, or directory root for tree uploads
    pub local_path: PathBuf,

    /// Object name; defaults to the local path
    pub remote_name: Option<String>,

    /// Files larger than this are segmented; must be > 0
    pub segment_size: u64,

    /// Listing filter for bulk operations
    pub prefix: Option<String>,

    /// Keep segments of the previous generation
    pub leave_segments: bool,

    /// User metadata, sent as `X-Object-Meta-*`
    pub metadata: BTreeMap<String, String>,
}

impl TransferRequest {
    pub fn new(bucket: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
        Self {
            bucket: bucket.into(),
            local_path: local_path.into(),
            remote_name: None,
            segment_size: DEFAULT_SEGMENT_SIZE,
            prefix: None,
            leave_segments: false,
            metadata: BTreeMap::new(),
        }
    }

    pub fn remote_name(mut self, name: impl Into<String>) -> Self {
        self.remote_name = Some(name.into());
        self
    }

    pub fn segment_size(mut self, size: u64) -> Self {
        self.segment_size = size;
        self
    }

    pub fn leave_segments(mut self, leave: bool) -> Self {
        self.leave_segments = leave;
        self
    }

    pub fn metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Object name the upload writes to, without leading separators
    pub fn effective_remote_name(&self) -> String {
        match &self.remote_name {
            Some(name) if !name.trim_start_matches('/').is_empty() => normalize_object_name(name),
            _ => object_name_for(&self.local_path),
        }
    }

    /// Derive the request for one file of a tree upload
    pub fn for_file(&self, local_path: &Path, remote_name: String) -> Self {
        Self {
            local_path: local_path.to_path_buf(),
            remote_name: Some(remote_name),
            ..self.clone()
        }
    }
}

/// Engine tuning shared by every operation of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSettings {
    /// Segment uploads in flight at once
    pub concurrency: usize,
    pub segment_failure: SegmentFailurePolicy,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            segment_failure: SegmentFailurePolicy::Abort,
        }
    }
}

impl From<&Defaults> for TransferSettings {
    fn from(defaults: &Defaults) -> Self {
        Self {
            concurrency: defaults.concurrency.max(1),
            segment_failure: defaults.segment_failure,
        }
    }
}

/// Result of reclaiming the segments behind one manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SegmentCleanup {
    pub container: String,
    pub deleted: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<String>,
}

impl SegmentCleanup {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of one [`TransferEngine::upload`] call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub remote_name: String,
    pub size_bytes: u64,
    /// Manifest header value, for segmented uploads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
    /// Number of segments planned (0 for single-shot uploads)
    pub segments: usize,
    /// Indices of segments that failed under the `continue` policy
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_segments: Vec<usize>,
    /// Reclaimed segments of the previous generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<SegmentCleanup>,
}

impl UploadOutcome {
    /// Whether every step of the upload succeeded
    pub fn is_complete(&self) -> bool {
        self.failed_segments.is_empty()
            && self.cleanup.as_ref().is_none_or(SegmentCleanup::is_complete)
    }
}

/// Result of deleting one object and its segments
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<SegmentCleanup>,
}

/// An item a bulk operation could not process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedItem {
    pub name: String,
    pub error: String,
}

/// Per-item results of a bulk operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub succeeded: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<FailedItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

impl BulkOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn fail(&mut self, name: impl Into<String>, error: impl ToString) {
        self.failed.push(FailedItem {
            name: name.into(),
            error: error.to_string(),
        });
    }
}

/// Observer for transfer progress
///
/// All methods default to no-ops. Implementations must be cheap; they are
/// called from inside the upload loop.
pub trait TransferProgress: Send + Sync {
    fn upload_started(&self, _local: &Path, _remote: &str, _size: u64) {}

    fn bytes_sent(&self, _bytes: u64) {}

    fn segment_failed(&self, _index: usize, _error: &Error) {}

    fn upload_finished(&self, _outcome: &UploadOutcome) {}

    fn segment_deleted(&self, _container: &str, _entry: &ListingEntry) {}

    fn object_deleted(&self, _bucket: &str, _name: &str) {}

    fn object_downloaded(&self, _bucket: &str, _name: &str, _target: &Path, _bytes: u64) {}
}

/// Progress observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl TransferProgress for NoProgress {}

/// Upload, download, list and delete engine over an [`ObjectStore`]
pub struct TransferEngine<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    settings: TransferSettings,
    progress: &'a dyn TransferProgress,
}

impl<'a, S: ObjectStore + ?Sized> TransferEngine<'a, S> {
    pub fn new(store: &'a S, settings: TransferSettings) -> Self {
        Self {
            store,
            settings,
            progress: &NoProgress,
        }
    }

    /// Report progress to `progress`
    pub fn with_progress(mut self, progress: &'a dyn TransferProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }
}
