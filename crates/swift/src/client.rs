//! Swift client implementation
//!
//! Implements the ObjectStore trait from swc-core over the Swift HTTP API.
//! Every trait method maps to exactly one request against the session's
//! storage URL.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::header::{AsHeaderName, CONTENT_LENGTH, CONTENT_TYPE, ETAG, HeaderMap, LAST_MODIFIED};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use url::Url;

use swc_core::path::has_dot_segment;
use swc_core::{
    ContainerInfo, Error, ListOptions, ListingEntry, ObjectInfo, ObjectStore, PutOptions, Result,
    Session, TimeoutConfig,
};

use crate::{http_client, map_status, map_transport};

const AUTH_TOKEN: &str = "X-Auth-Token";
const OBJECT_MANIFEST: &str = "X-Object-Manifest";
const OBJECT_META_PREFIX: &str = "x-object-meta-";
const CONTAINER_META_PREFIX: &str = "x-container-meta-";
const CONTAINER_OBJECT_COUNT: &str = "x-container-object-count";
const CONTAINER_BYTES_USED: &str = "x-container-bytes-used";

/// Swift client bound to one authenticated session
pub struct SwiftClient {
    http: Client,
    session: Session,
}

impl SwiftClient {
    /// Create a new client for `session`
    pub fn new(session: Session, timeout: &TimeoutConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// URL of a container, or of an object when `name` is given
    ///
    /// Object names keep their `/` separators; every other reserved
    /// character is percent-encoded. Names with `.` or `..` components are
    /// refused since the URL would address a different object.
    fn url(&self, bucket: &str, name: Option<&str>) -> Result<Url> {
        if let Some(name) = name.filter(|n| has_dot_segment(n)) {
            return Err(Error::InvalidPath(format!(
                "object name '{name}' has '.' or '..' components"
            )));
        }
        let mut url = Url::parse(self.session.endpoint())?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                Error::Config(format!(
                    "storage URL cannot hold paths: {}",
                    self.session.endpoint()
                ))
            })?;
            segments.pop_if_empty().push(bucket);
            if let Some(name) = name {
                segments.extend(name.split('/'));
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(AUTH_TOKEN, self.session.token())
    }

    /// Send a request and require one of the `expected` statuses
    async fn send(
        &self,
        request: RequestBuilder,
        expected: &[StatusCode],
        resource: &str,
    ) -> Result<Response> {
        let response = request.send().await.map_err(map_transport)?;
        let status = response.status();
        tracing::debug!(resource, status = status.as_u16(), "swift response");

        if expected.contains(&status) {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_status(status, resource, &body))
    }
}

#[async_trait]
impl ObjectStore for SwiftClient {
    async fn head_object(&self, bucket: &str, name: &str) -> Result<ObjectInfo> {
        let target = format!("{bucket}/{name}");
        let request = self.request(Method::HEAD, self.url(bucket, Some(name))?);
        let response = self
            .send(request, &[StatusCode::OK, StatusCode::NO_CONTENT], &target)
            .await?;

        Ok(object_info(name, response.headers()))
    }

    async fn head_container(&self, bucket: &str) -> Result<ContainerInfo> {
        let request = self.request(Method::HEAD, self.url(bucket, None)?);
        let response = self
            .send(request, &[StatusCode::OK, StatusCode::NO_CONTENT], bucket)
            .await?;

        Ok(container_info(bucket, response.headers()))
    }

    async fn get_object(&self, bucket: &str, name: &str) -> Result<Vec<u8>> {
        let target = format!("{bucket}/{name}");
        let request = self.request(Method::GET, self.url(bucket, Some(name))?);
        let response = self
            .send(request, &[StatusCode::OK, StatusCode::NO_CONTENT], &target)
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        let body = response.bytes().await.map_err(map_transport)?;
        Ok(body.to_vec())
    }

    async fn put_object(
        &self,
        bucket: &str,
        name: &str,
        data: Vec<u8>,
        options: &PutOptions,
    ) -> Result<()> {
        let target = format!("{bucket}/{name}");
        let mut request = self.request(Method::PUT, self.url(bucket, Some(name))?);

        for (key, value) in &options.metadata {
            request = request.header(format!("X-Object-Meta-{key}"), value);
        }
        if let Some(manifest) = &options.manifest {
            request = request.header(OBJECT_MANIFEST, manifest);
        }
        if let Some(content_type) = &options.content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }

        self.send(request.body(data), &[StatusCode::CREATED], &target)
            .await?;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, name: &str) -> Result<()> {
        let target = format!("{bucket}/{name}");
        let request = self.request(Method::DELETE, self.url(bucket, Some(name))?);
        self.send(request, &[StatusCode::NO_CONTENT], &target).await?;
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, options: &ListOptions) -> Result<Vec<ListingEntry>> {
        let mut url = self.url(bucket, None)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("format", "json");
            if let Some(prefix) = &options.prefix {
                query.append_pair("prefix", prefix);
            }
            if let Some(marker) = &options.marker {
                query.append_pair("marker", marker);
            }
            if let Some(limit) = options.limit {
                query.append_pair("limit", &limit.to_string());
            }
        }

        let request = self.request(Method::GET, url);
        let response = self
            .send(request, &[StatusCode::OK, StatusCode::NO_CONTENT], bucket)
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        let body = response.text().await.map_err(map_transport)?;
        parse_listing(&body)
    }

    async fn create_container(&self, bucket: &str) -> Result<()> {
        let request = self
            .request(Method::PUT, self.url(bucket, None)?)
            .body(Vec::new());
        self.send(request, &[StatusCode::CREATED, StatusCode::ACCEPTED], bucket)
            .await?;
        Ok(())
    }
}

/// Decode a JSON container listing; an empty body is an empty listing
fn parse_listing(body: &str) -> Result<Vec<ListingEntry>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(body).map_err(|e| Error::Decode(format!("container listing: {e}")))
}

fn header(headers: &HeaderMap, name: impl AsHeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn header_u64(headers: &HeaderMap, name: &str) -> u64 {
    header(headers, name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

/// Headers starting with `prefix`, keyed by the rest of the name
fn prefixed_headers(headers: &HeaderMap, prefix: &str) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let key = name.as_str().strip_prefix(prefix)?;
            let value = value.to_str().ok()?;
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

fn object_info(name: &str, headers: &HeaderMap) -> ObjectInfo {
    let mut info = ObjectInfo::new(name, header_u64(headers, CONTENT_LENGTH.as_str()));
    info.last_modified = header(headers, LAST_MODIFIED).map(str::to_string);
    info.etag = header(headers, ETAG).map(|v| v.trim_matches('"').to_string());
    info.content_type = header(headers, CONTENT_TYPE).map(str::to_string);
    info.manifest = header(headers, OBJECT_MANIFEST).map(str::to_string);
    info.metadata = prefixed_headers(headers, OBJECT_META_PREFIX);
    info
}

fn container_info(name: &str, headers: &HeaderMap) -> ContainerInfo {
    ContainerInfo {
        name: name.to_string(),
        object_count: header_u64(headers, CONTAINER_OBJECT_COUNT),
        bytes_used: header_u64(headers, CONTAINER_BYTES_USED),
        metadata: prefixed_headers(headers, CONTAINER_META_PREFIX),
    }
}
