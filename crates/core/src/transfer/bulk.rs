//! Prefix-scoped listing, deletion and download, and directory-tree upload

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{BulkOutcome, DeleteOutcome, TransferEngine, TransferRequest};
use crate::error::{Error, Result};
use crate::path::{listing_prefix, local_target, tree_object_name};
use crate::segment::ManifestRef;
use crate::traits::{ContainerInfo, ListOptions, ListingEntry, ObjectInfo, ObjectStore};

/// Entries requested per listing page
pub const LIST_PAGE_SIZE: usize = 10_000;

impl<S: ObjectStore + ?Sized> TransferEngine<'_, S> {
    /// List every object of `bucket` starting with `prefix`
    ///
    /// An empty prefix, or the match-all pattern, lists the whole container.
    pub async fn list_with_prefix(&self, bucket: &str, prefix: &str) -> Result<Vec<ListingEntry>> {
        let prefix = listing_prefix(prefix);
        self.list_all(bucket, prefix.as_deref()).await
    }

    /// List a container, following pagination markers to the end
    pub async fn list_all(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<ListingEntry>> {
        self.list_paged(bucket, prefix, LIST_PAGE_SIZE).await
    }

    async fn list_paged(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        page_size: usize,
    ) -> Result<Vec<ListingEntry>> {
        let mut entries = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let options = ListOptions {
                prefix: prefix.map(str::to_string),
                marker: marker.take(),
                limit: Some(page_size),
            };
            debug!(bucket, ?options, "listing page");

            let page = self.store.list_objects(bucket, &options).await?;
            let full_page = page.len() >= page_size;
            marker = page.last().map(|e| e.name.clone());
            entries.extend(page);

            if !full_page || marker.is_none() {
                break;
            }
        }

        Ok(entries)
    }

    /// Object metadata, including the manifest header of segmented objects
    pub async fn stat_object(&self, bucket: &str, name: &str) -> Result<ObjectInfo> {
        self.store.head_object(bucket, name).await
    }

    /// Container statistics
    pub async fn stat_container(&self, bucket: &str) -> Result<ContainerInfo> {
        self.store.head_container(bucket).await
    }

    /// Delete an object, and first the segments its manifest points at
    ///
    /// Segments go before the manifest, so an interruption leaves at worst
    /// unreferenced segments, never a manifest without data.
    #[tracing::instrument(skip(self))]
    pub async fn delete_with_segments(
        &self,
        bucket: &str,
        name: &str,
        leave_segments: bool,
    ) -> Result<DeleteOutcome> {
        let manifest = match self.store.head_object(bucket, name).await {
            Ok(info) => info.manifest,
            Err(e) if e.is_not_found() => return Err(e),
            Err(e) => {
                warn!(error = %e, "could not check for a manifest, deleting object only");
                None
            }
        };

        let mut outcome = DeleteOutcome {
            name: name.to_string(),
            cleanup: None,
        };

        if let Some(manifest) = manifest {
            if leave_segments {
                debug!(%manifest, "leaving segments in place");
            } else {
                let manifest = ManifestRef::parse(&manifest)?;
                outcome.cleanup = Some(self.delete_segments(&manifest, None).await);
            }
        }

        self.store.delete_object(bucket, name).await?;
        info!("deleted {bucket}/{name}");
        self.progress.object_deleted(bucket, name);

        Ok(outcome)
    }

    /// Delete every object under `prefix`, with segments
    ///
    /// Confirmation for the match-all prefix belongs to the caller.
    #[tracing::instrument(skip(self))]
    pub async fn delete_with_prefix(
        &self,
        bucket: &str,
        prefix: &str,
        leave_segments: bool,
    ) -> Result<BulkOutcome> {
        let entries = self.list_with_prefix(bucket, prefix).await?;
        let mut outcome = BulkOutcome::default();

        for entry in entries {
            match self
                .delete_with_segments(bucket, &entry.name, leave_segments)
                .await
            {
                Ok(deleted) if deleted.cleanup.as_ref().is_none_or(|c| c.is_complete()) => {
                    outcome.succeeded.push(entry.name);
                }
                Ok(_) => outcome.fail(entry.name, "some segments could not be deleted"),
                Err(e) => {
                    warn!(object = %entry.name, error = %e, "delete failed");
                    outcome.fail(entry.name, e);
                }
            }
        }

        Ok(outcome)
    }

    /// Download one object to `target`, creating parent directories
    ///
    /// An empty response produces an empty file.
    pub async fn download_object(&self, bucket: &str, name: &str, target: &Path) -> Result<u64> {
        let data = self.store.get_object(bucket, name).await?;

        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(target, &data).await?;

        let bytes = data.len() as u64;
        debug!(object = name, target = %target.display(), bytes, "downloaded");
        self.progress.object_downloaded(bucket, name, target, bytes);
        Ok(bytes)
    }

    /// Download every object under `prefix` below `local_root`
    #[tracing::instrument(skip(self, local_root), fields(local_root = %local_root.display()))]
    pub async fn download_with_prefix(
        &self,
        bucket: &str,
        prefix: &str,
        local_root: &Path,
    ) -> Result<BulkOutcome> {
        let entries = self.list_with_prefix(bucket, prefix).await?;
        let mut outcome = BulkOutcome::default();

        for entry in entries {
            let Some(target) = local_target(local_root, &entry.name) else {
                warn!(object = %entry.name, "skipping object that has no safe local path");
                outcome.skipped.push(entry.name);
                continue;
            };

            match self.download_object(bucket, &entry.name, &target).await {
                Ok(_) => outcome.succeeded.push(entry.name),
                Err(e) => {
                    warn!(object = %entry.name, error = %e, "download failed");
                    outcome.fail(entry.name, e);
                }
            }
        }

        Ok(outcome)
    }

    /// Upload every regular file below `request.local_path`
    ///
    /// Symbolic links are followed and uploaded under the link's name.
    /// Each file goes through [`TransferEngine::upload`] with its object name
    /// rebased from the local root onto `remote_root`. The tree is walked
    /// completely before the first upload; a walk error uploads nothing.
    #[tracing::instrument(skip_all, fields(bucket = %request.bucket, root = %request.local_path.display()))]
    pub async fn upload_tree(
        &self,
        request: &TransferRequest,
        remote_root: Option<&str>,
    ) -> Result<BulkOutcome> {
        let root = request.local_path.as_path();
        if !root.is_dir() {
            return Err(Error::File(format!("{} is not a directory", root.display())));
        }

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            } else if entry.file_type().is_dir() {
                debug!(dir = %entry.path().display(), "entering directory");
            }
        }

        let mut outcome = BulkOutcome::default();
        for file in files {
            let name = tree_object_name(root, &file, remote_root);
            let file_request = request.for_file(&file, name.clone());

            match self.upload(&file_request).await {
                Ok(uploaded) if uploaded.is_complete() => outcome.succeeded.push(name),
                Ok(_) => outcome.fail(name, "upload finished with errors"),
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "upload failed");
                    outcome.fail(name, e);
                }
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::transfer::TransferSettings;

    #[tokio::test]
    async fn test_list_follows_markers() {
        let store = MemoryStore::default();
        for i in 0..7 {
            store.insert("b", &format!("logs/{i}"), b"x");
        }
        store.insert("b", "other", b"x");

        let engine = TransferEngine::new(&store, TransferSettings::default());
        let entries = engine.list_paged("b", Some("logs/"), 3).await.unwrap();

        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["logs/0", "logs/1", "logs/2", "logs/3", "logs/4", "logs/5", "logs/6"]
        );
        assert_eq!(store.count_calls("LIST b"), 3);
    }

    #[tokio::test]
    async fn test_list_match_all_prefix() {
        let store = MemoryStore::default();
        store.insert("b", "a", b"1");
        store.insert("b", "z/y", b"2");

        let engine = TransferEngine::new(&store, TransferSettings::default());
        assert_eq!(engine.list_with_prefix("b", "**/*").await.unwrap().len(), 2);
        assert_eq!(engine.list_with_prefix("b", "").await.unwrap().len(), 2);
        assert_eq!(engine.list_with_prefix("b", "z/").await.unwrap().len(), 1);
    }

    fn write_file(path: &Path, len: usize) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, vec![7u8; len]).unwrap();
    }

    async fn upload_segmented(store: &MemoryStore, name: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        write_file(&path, 25);
        let engine = TransferEngine::new(store, TransferSettings::default());
        let request = TransferRequest::new("b", &path)
            .remote_name(name)
            .segment_size(10);
        engine.upload(&request).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_removes_segments_before_manifest() {
        let store = MemoryStore::default();
        upload_segmented(&store, "big").await;
        assert_eq!(store.names("b_segments").len(), 3);

        let engine = TransferEngine::new(&store, TransferSettings::default());
        let outcome = engine.delete_with_segments("b", "big", false).await.unwrap();

        assert_eq!(outcome.cleanup.unwrap().deleted.len(), 3);
        assert!(store.names("b_segments").is_empty());
        assert!(!store.contains("b", "big"));

        let calls = store.calls();
        let manifest_delete = calls.iter().position(|c| c == "DELETE b/big").unwrap();
        let last_segment_delete = calls
            .iter()
            .rposition(|c| c.starts_with("DELETE b_segments/"))
            .unwrap();
        assert!(manifest_delete > last_segment_delete);
    }

    #[tokio::test]
    async fn test_delete_leave_segments() {
        let store = MemoryStore::default();
        upload_segmented(&store, "big").await;

        let engine = TransferEngine::new(&store, TransferSettings::default());
        let outcome = engine.delete_with_segments("b", "big", true).await.unwrap();

        assert!(outcome.cleanup.is_none());
        assert!(!store.contains("b", "big"));
        assert_eq!(store.names("b_segments").len(), 3);
    }

    #[tokio::test]
    async fn test_delete_missing_object_is_not_found() {
        let store = MemoryStore::default();
        let engine = TransferEngine::new(&store, TransferSettings::default());
        let result = engine.delete_with_segments("b", "nope", false).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_with_prefix_is_scoped() {
        let store = MemoryStore::default();
        store.insert("b", "logs/a", b"1");
        store.insert("b", "logs/b", b"2");
        store.insert("b", "keep/c", b"3");
        upload_segmented(&store, "logs/big").await;

        let engine = TransferEngine::new(&store, TransferSettings::default());
        let outcome = engine.delete_with_prefix("b", "logs/", false).await.unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.succeeded, vec!["logs/a", "logs/b", "logs/big"]);
        assert_eq!(store.names("b"), vec!["keep/c"]);
        assert!(store.names("b_segments").is_empty());
    }

    #[tokio::test]
    async fn test_delete_match_all_empties_container() {
        let store = MemoryStore::default();
        store.insert("b", "a", b"1");
        store.insert("b", "d/e", b"2");

        let engine = TransferEngine::new(&store, TransferSettings::default());
        let outcome = engine.delete_with_prefix("b", "**/*", false).await.unwrap();

        assert_eq!(outcome.succeeded.len(), 2);
        assert!(store.names("b").is_empty());
    }

    #[tokio::test]
    async fn test_download_with_prefix_recreates_tree() {
        let store = MemoryStore::default();
        store.insert("b", "data/x.txt", b"hello");
        store.insert("b", "data/sub/y.txt", b"");
        store.insert("b", "data/dir/", b"");
        store.insert("b", "data/../escape", b"bad");
        store.insert("b", "other.txt", b"no");
        upload_segmented(&store, "data/big.bin").await;

        let dir = tempfile::tempdir().unwrap();
        let engine = TransferEngine::new(&store, TransferSettings::default());
        let outcome = engine
            .download_with_prefix("b", "data/", dir.path())
            .await
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.succeeded.len(), 3);
        assert_eq!(outcome.skipped, vec!["data/../escape", "data/dir/"]);
        assert_eq!(
            std::fs::read(dir.path().join("data/x.txt")).unwrap(),
            b"hello"
        );
        assert!(dir.path().join("data/sub/y.txt").is_file());
        assert_eq!(
            std::fs::read(dir.path().join("data/big.bin")).unwrap(),
            vec![7u8; 25]
        );
        assert!(!dir.path().join("other.txt").exists());
        assert!(!dir.path().join("escape").exists());
    }

    #[tokio::test]
    async fn test_download_missing_object() {
        let store = MemoryStore::default();
        let dir = tempfile::tempdir().unwrap();
        let engine = TransferEngine::new(&store, TransferSettings::default());
        let result = engine
            .download_object("b", "nope", &dir.path().join("nope"))
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_upload_tree_rebases_names() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("site");
        write_file(&root.join("index.html"), 3);
        write_file(&root.join("css/main.css"), 30);
        write_file(&root.join("empty.txt"), 0);

        let store = MemoryStore::default();
        let engine = TransferEngine::new(&store, TransferSettings::default());
        let request = TransferRequest::new("b", &root).segment_size(10);
        let outcome = engine.upload_tree(&request, Some("www")).await.unwrap();

        assert_eq!(outcome.succeeded, vec!["www/css/main.css", "www/index.html"]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].name, "www/empty.txt");
        assert!(store.manifest("b", "www/css/main.css").is_some());
        assert_eq!(store.names("b_segments").len(), 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_upload_tree_follows_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("outside.txt");
        write_file(&target, 4);
        let root = dir.path().join("site");
        write_file(&root.join("index.html"), 3);
        std::os::unix::fs::symlink(&target, root.join("linked.txt")).unwrap();

        let store = MemoryStore::default();
        let engine = TransferEngine::new(&store, TransferSettings::default());
        let request = TransferRequest::new("b", &root);
        let outcome = engine.upload_tree(&request, Some("www")).await.unwrap();

        assert_eq!(outcome.succeeded, vec!["www/index.html", "www/linked.txt"]);
        assert!(outcome.failed.is_empty());
    }

    #[tokio::test]
    async fn test_upload_tree_requires_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        write_file(&file, 1);

        let store = MemoryStore::default();
        let engine = TransferEngine::new(&store, TransferSettings::default());
        let result = engine.upload_tree(&TransferRequest::new("b", &file), None).await;
        assert!(matches!(result, Err(Error::File(_))));
    }

    #[tokio::test]
    async fn test_stat_reports_manifest() {
        let store = MemoryStore::default();
        upload_segmented(&store, "big").await;

        let engine = TransferEngine::new(&store, TransferSettings::default());
        let info = engine.stat_object("b", "big").await.unwrap();
        assert!(info.is_segmented());
        assert_eq!(info.size_bytes, 25);

        let container = engine.stat_container("b").await.unwrap();
        assert_eq!(container.object_count, 1);
    }
}
