//! In-memory ObjectStore for engine tests
//!
//! Behaves like a Swift account: containers hold objects sorted by name,
//! listings honour prefix, marker and limit, and a GET on a manifest
//! returns the concatenation of the segments under its prefix.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::segment::ManifestRef;
use crate::traits::{ContainerInfo, ListOptions, ListingEntry, ObjectInfo, ObjectStore, PutOptions};

#[derive(Debug, Clone)]
struct Stored {
    data: Vec<u8>,
    options: PutOptions,
}

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    objects: Mutex<BTreeMap<(String, String), Stored>>,
    calls: Mutex<Vec<String>>,
    failing_puts: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn insert(&self, bucket: &str, name: &str, data: &[u8]) {
        self.insert_with(bucket, name, data, PutOptions::default());
    }

    pub fn insert_with(&self, bucket: &str, name: &str, data: &[u8], options: PutOptions) {
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), name.to_string()),
            Stored {
                data: data.to_vec(),
                options,
            },
        );
    }

    /// Make every PUT whose `bucket/name` contains `pattern` fail with a 503
    pub fn fail_puts_matching(&self, pattern: &str) {
        self.failing_puts.lock().unwrap().push(pattern.to_string());
    }

    pub fn contains(&self, bucket: &str, name: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&(bucket.to_string(), name.to_string()))
    }

    pub fn manifest(&self, bucket: &str, name: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), name.to_string()))
            .and_then(|s| s.options.manifest.clone())
    }

    pub fn options(&self, bucket: &str, name: &str) -> Option<PutOptions> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), name.to_string()))
            .map(|s| s.options.clone())
    }

    /// Names stored in `bucket`, sorted
    pub fn names(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, n)| n.clone())
            .collect()
    }

    /// Every request seen so far, as `VERB bucket[/name]`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn stored(&self, bucket: &str, name: &str) -> Result<Stored> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("{bucket}/{name}")))
    }

    fn content(&self, bucket: &str, name: &str) -> Result<Vec<u8>> {
        let stored = self.stored(bucket, name)?;
        let Some(manifest) = stored.options.manifest else {
            return Ok(stored.data);
        };

        let manifest = ManifestRef::parse(&manifest)?;
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .iter()
            .filter(|((b, n), _)| manifest.covers(b, n))
            .flat_map(|(_, s)| s.data.iter().copied())
            .collect())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head_object(&self, bucket: &str, name: &str) -> Result<ObjectInfo> {
        self.record(format!("HEAD {bucket}/{name}"));
        let stored = self.stored(bucket, name)?;
        let size = self.content(bucket, name)?.len() as u64;

        let mut info = ObjectInfo::new(name, size);
        info.manifest = stored.options.manifest;
        info.content_type = stored.options.content_type;
        info.metadata = stored.options.metadata;
        Ok(info)
    }

    async fn head_container(&self, bucket: &str) -> Result<ContainerInfo> {
        self.record(format!("HEAD {bucket}"));
        let objects = self.objects.lock().unwrap();
        let (count, bytes) = objects
            .iter()
            .filter(|((b, _), _)| b == bucket)
            .fold((0u64, 0u64), |(c, n), (_, s)| (c + 1, n + s.data.len() as u64));

        if count == 0 {
            return Err(Error::NotFound(bucket.to_string()));
        }
        Ok(ContainerInfo {
            name: bucket.to_string(),
            object_count: count,
            bytes_used: bytes,
            metadata: BTreeMap::new(),
        })
    }

    async fn get_object(&self, bucket: &str, name: &str) -> Result<Vec<u8>> {
        self.record(format!("GET {bucket}/{name}"));
        self.content(bucket, name)
    }

    async fn put_object(
        &self,
        bucket: &str,
        name: &str,
        data: Vec<u8>,
        options: &PutOptions,
    ) -> Result<()> {
        let key = format!("{bucket}/{name}");
        self.record(format!("PUT {key}"));

        if self
            .failing_puts
            .lock()
            .unwrap()
            .iter()
            .any(|p| key.contains(p.as_str()))
        {
            return Err(Error::Remote {
                status: 503,
                message: "injected failure".into(),
            });
        }

        self.insert_with(bucket, name, &data, options.clone());
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, name: &str) -> Result<()> {
        self.record(format!("DELETE {bucket}/{name}"));
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("{bucket}/{name}")))
    }

    async fn list_objects(&self, bucket: &str, options: &ListOptions) -> Result<Vec<ListingEntry>> {
        self.record(format!("LIST {bucket}"));
        let objects = self.objects.lock().unwrap();
        let prefix = options.prefix.as_deref().unwrap_or("");

        Ok(objects
            .iter()
            .filter(|((b, n), _)| b == bucket && n.starts_with(prefix))
            .filter(|((_, n), _)| options.marker.as_ref().is_none_or(|m| n > m))
            .take(options.limit.unwrap_or(usize::MAX))
            .map(|((_, n), s)| ListingEntry {
                name: n.clone(),
                size_bytes: s.data.len() as u64,
                last_modified: String::new(),
                etag: String::new(),
                content_type: s.options.content_type.clone().unwrap_or_default(),
            })
            .collect())
    }

    async fn create_container(&self, bucket: &str) -> Result<()> {
        self.record(format!("CREATE {bucket}"));
        Ok(())
    }
}
