//! Single-object upload: single-shot or segmented, then reclaim

use std::io::SeekFrom;
use std::path::Path;

use futures::stream::{self, StreamExt};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, warn};

use super::{SegmentCleanup, TransferEngine, TransferRequest, UploadOutcome};
use crate::config::SegmentFailurePolicy;
use crate::error::{Error, Result};
use crate::path::has_dot_segment;
use crate::segment::{
    ManifestPrefix, ManifestRef, Segment, generation_timestamp, needs_segmentation, plan_segments,
};
use crate::traits::{ObjectStore, PutOptions};

impl<S: ObjectStore + ?Sized> TransferEngine<'_, S> {
    /// Upload one local file
    ///
    /// Files up to `segment_size` bytes go up in a single PUT. Larger files are
    /// split into segments under a fresh manifest prefix, and the manifest is
    /// written once every segment is acknowledged. If the object previously
    /// pointed at segments, those are deleted afterwards unless
    /// `leave_segments` is set.
    #[tracing::instrument(
        skip_all,
        fields(bucket = %request.bucket, local = %request.local_path.display())
    )]
    pub async fn upload(&self, request: &TransferRequest) -> Result<UploadOutcome> {
        let remote_name = request.effective_remote_name();
        if remote_name.is_empty() {
            return Err(Error::InvalidPath(format!(
                "cannot derive an object name from '{}'",
                request.local_path.display()
            )));
        }
        if has_dot_segment(&remote_name) {
            return Err(Error::InvalidPath(format!(
                "object name '{remote_name}' has '.' or '..' components"
            )));
        }
        if request.segment_size == 0 {
            return Err(Error::Config("segment size must be greater than 0".into()));
        }

        let file_size = local_file_size(&request.local_path).await?;
        let previous = self.existing_manifest(&request.bucket, &remote_name).await;

        let put_options = PutOptions {
            metadata: request.metadata.clone(),
            manifest: None,
            content_type: mime_guess::from_path(&request.local_path)
                .first()
                .map(|m| m.essence_str().to_string()),
        };

        self.progress
            .upload_started(&request.local_path, &remote_name, file_size);

        let mut outcome = UploadOutcome {
            remote_name: remote_name.clone(),
            size_bytes: file_size,
            manifest: None,
            segments: 0,
            failed_segments: Vec::new(),
            cleanup: None,
        };

        let current = if needs_segmentation(file_size, request.segment_size) {
            let prefix = ManifestPrefix::new(
                &request.bucket,
                remote_name.as_str(),
                generation_timestamp(),
                file_size,
            );
            let plan = plan_segments(file_size, request.segment_size)?;
            outcome.segments = plan.len();
            outcome.failed_segments = self
                .upload_segments(&request.local_path, &prefix, plan)
                .await?;

            let manifest_options = PutOptions {
                manifest: Some(prefix.header_value()),
                ..put_options
            };
            self.store
                .put_object(&request.bucket, &remote_name, Vec::new(), &manifest_options)
                .await?;
            debug!(manifest = %prefix, "manifest written");

            outcome.manifest = Some(prefix.header_value());
            Some(prefix.to_ref())
        } else {
            let data = tokio::fs::read(&request.local_path)
                .await
                .map_err(|e| file_error(&request.local_path, e))?;
            self.store
                .put_object(&request.bucket, &remote_name, data, &put_options)
                .await?;
            self.progress.bytes_sent(file_size);
            None
        };

        if let Some(old) = previous {
            if request.leave_segments {
                debug!(manifest = ?old, "leaving previous segments in place");
            } else {
                outcome.cleanup = Some(self.delete_segments(&old, current.as_ref()).await);
            }
        }

        self.progress.upload_finished(&outcome);
        Ok(outcome)
    }

    /// Manifest the object currently points at, if any
    ///
    /// Lookup failures are not fatal: they only mean there is nothing to reclaim.
    async fn existing_manifest(&self, bucket: &str, name: &str) -> Option<ManifestRef> {
        let info = match self.store.head_object(bucket, name).await {
            Ok(info) => info,
            Err(e) if e.is_not_found() => return None,
            Err(e) => {
                warn!(error = %e, "could not check for an existing manifest");
                return None;
            }
        };

        let manifest = info.manifest?;
        debug!(%manifest, "found previous manifest");
        match ManifestRef::parse(&manifest) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(error = %e, "ignoring unparsable manifest");
                None
            }
        }
    }

    /// Upload all segments through a bounded pool
    ///
    /// Returns the indices of failed segments under the `continue` policy.
    /// Under `abort` the first failure cancels the uploads still in flight.
    async fn upload_segments(
        &self,
        local_path: &Path,
        prefix: &ManifestPrefix,
        plan: Vec<Segment>,
    ) -> Result<Vec<usize>> {
        let total = plan.len();

        if let Err(e) = self.store.create_container(prefix.container()).await {
            warn!(container = prefix.container(), error = %e, "could not create segment container");
        }

        let mut uploads = stream::iter(plan)
            .map(|segment| async move {
                let result = self.upload_segment(local_path, prefix, segment).await;
                (segment, result)
            })
            .buffer_unordered(self.settings.concurrency.max(1));

        let mut failed = Vec::new();
        while let Some((segment, result)) = uploads.next().await {
            match result {
                Ok(()) => {
                    debug!(index = segment.index, bytes = segment.length, "segment uploaded");
                    self.progress.bytes_sent(segment.length);
                }
                Err(e) => {
                    warn!(index = segment.index, error = %e, "segment upload failed");
                    self.progress.segment_failed(segment.index, &e);
                    failed.push(segment.index);
                    if self.settings.segment_failure == SegmentFailurePolicy::Abort {
                        break;
                    }
                }
            }
        }
        drop(uploads);

        if !failed.is_empty() && self.settings.segment_failure == SegmentFailurePolicy::Abort {
            // No manifest will point at this generation, so reclaim it now
            let cleanup = self.delete_segments(&prefix.to_ref(), None).await;
            debug!(
                deleted = cleanup.deleted.len(),
                failed = cleanup.failed.len(),
                "removed segments of aborted upload"
            );
            if !cleanup.is_complete() {
                warn!(prefix = %prefix, "segments of aborted upload left behind");
            }
            return Err(Error::SegmentUploadFailed {
                failed: failed.len(),
                total,
            });
        }

        failed.sort_unstable();
        Ok(failed)
    }

    async fn upload_segment(
        &self,
        local_path: &Path,
        prefix: &ManifestPrefix,
        segment: Segment,
    ) -> Result<()> {
        let data = read_range(local_path, segment.offset, segment.length).await?;
        self.store
            .put_object(
                prefix.container(),
                &prefix.segment_name(segment.index),
                data,
                &PutOptions::default(),
            )
            .await
    }

    /// Delete every segment under `manifest`, sparing those under `keep`
    pub(super) async fn delete_segments(
        &self,
        manifest: &ManifestRef,
        keep: Option<&ManifestRef>,
    ) -> SegmentCleanup {
        let mut cleanup = SegmentCleanup {
            container: manifest.container.clone(),
            ..Default::default()
        };

        if keep == Some(manifest) {
            return cleanup;
        }

        let entries = match self
            .list_all(&manifest.container, Some(&manifest.prefix))
            .await
        {
            Ok(entries) => entries,
            Err(e) => {
                warn!(container = %manifest.container, error = %e, "could not list segments");
                cleanup.failed.push(manifest.prefix.clone());
                return cleanup;
            }
        };

        for entry in entries {
            if keep.is_some_and(|k| k.covers(&manifest.container, &entry.name)) {
                continue;
            }
            match self
                .store
                .delete_object(&manifest.container, &entry.name)
                .await
            {
                Ok(()) => {
                    debug!(segment = %entry.name, bytes = entry.size_bytes, "segment deleted");
                    self.progress.segment_deleted(&manifest.container, &entry);
                    cleanup.deleted.push(entry.name);
                }
                Err(e) => {
                    warn!(segment = %entry.name, error = %e, "could not delete segment");
                    cleanup.failed.push(entry.name);
                }
            }
        }

        cleanup
    }
}

/// Size of a local regular file; missing, unreadable and empty files are errors
async fn local_file_size(path: &Path) -> Result<u64> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| file_error(path, e))?;
    if !metadata.is_file() {
        return Err(Error::File(format!("{} is not a regular file", path.display())));
    }
    if metadata.len() == 0 {
        return Err(Error::File(format!("{} is empty", path.display())));
    }
    Ok(metadata.len())
}

/// Read `length` bytes at `offset` through a dedicated handle
async fn read_range(path: &Path, offset: u64, length: u64) -> Result<Vec<u8>> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| file_error(path, e))?;
    file.seek(SeekFrom::Start(offset)).await?;

    let length = usize::try_from(length)
        .map_err(|_| Error::File(format!("segment of {length} bytes does not fit in memory")))?;
    let mut buffer = vec![0u8; length];
    file.read_exact(&mut buffer)
        .await
        .map_err(|e| file_error(path, e))?;
    Ok(buffer)
}

fn file_error(path: &Path, error: std::io::Error) -> Error {
    Error::File(format!("{}: {error}", path.display()))
}
