//! Path parsing and name mapping
//!
//! Remote objects are addressed as `bucket/name`. This module also owns the
//! rules that map local files to object names and back.

use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Suffix of the container holding a bucket's segments
pub const SEGMENTS_SUFFIX: &str = "_segments";

/// Prefix value meaning "every object in the bucket"
pub const MATCH_ALL_PREFIX: &str = "**/*";

/// A parsed remote path pointing to a Swift location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPath {
    /// Container name
    pub bucket: String,
    /// Object name (empty for the container itself)
    pub name: String,
}

impl ObjectPath {
    /// Create a new ObjectPath, normalizing the object name
    pub fn new(bucket: impl Into<String>, name: impl AsRef<str>) -> Self {
        Self {
            bucket: bucket.into(),
            name: normalize_object_name(name.as_ref()),
        }
    }

    /// Whether this path addresses the container rather than an object
    pub fn is_container(&self) -> bool {
        self.name.is_empty()
    }
}

impl std::fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.bucket)
        } else {
            write!(f, "{}/{}", self.bucket, self.name)
        }
    }
}

/// Parse `bucket[/name]` into an ObjectPath
pub fn parse_path(path: &str) -> Result<ObjectPath> {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return Err(Error::InvalidPath("Path cannot be empty".into()));
    }

    let (bucket, name) = path.split_once('/').unwrap_or((path, ""));
    if bucket.is_empty() {
        return Err(Error::InvalidPath("Bucket name cannot be empty".into()));
    }

    Ok(ObjectPath::new(bucket, name))
}

/// Strip leading separators from an object name
pub fn normalize_object_name(name: &str) -> String {
    name.trim_start_matches('/').to_string()
}

/// Name of the container that stores the segments of `bucket`
pub fn segments_container(bucket: &str) -> String {
    format!("{bucket}{SEGMENTS_SUFFIX}")
}

/// Turn a user supplied prefix into a listing prefix
///
/// Returns `None` when every object should match: for an empty prefix and
/// for [`MATCH_ALL_PREFIX`].
pub fn listing_prefix(prefix: &str) -> Option<String> {
    match prefix {
        "" | MATCH_ALL_PREFIX => None,
        p => Some(p.to_string()),
    }
}

/// True when `name` has a `.` or `..` component
///
/// URL path normalisation collapses such components, percent-encoded or
/// not, so these names cannot be addressed exactly over HTTP.
pub fn has_dot_segment(name: &str) -> bool {
    name.split('/').any(|part| matches!(part, "." | ".."))
}

/// Object name for a local file, using forward slashes
pub fn object_name_for(local: &Path) -> String {
    let joined = local
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    normalize_object_name(&joined)
}

/// Object name for `file` found while walking `local_root`
///
/// The `local_root` part of the path is replaced by `remote_root`. Without a
/// remote root the file path itself becomes the name.
pub fn tree_object_name(local_root: &Path, file: &Path, remote_root: Option<&str>) -> String {
    let Some(remote_root) = remote_root else {
        return object_name_for(file);
    };

    let relative = file.strip_prefix(local_root).unwrap_or(file);
    let relative = object_name_for(relative);
    let root = normalize_object_name(remote_root);
    let root = root.trim_end_matches('/');

    if root.is_empty() {
        relative
    } else if relative.is_empty() {
        root.to_string()
    } else {
        format!("{root}/{relative}")
    }
}

/// Local destination for a downloaded object
///
/// Returns `None` for names that cannot map safely below `local_root`:
/// pseudo-directory markers and names with `.` or `..` components.
pub fn local_target(local_root: &Path, object_name: &str) -> Option<PathBuf> {
    if object_name.is_empty() || object_name.ends_with('/') {
        return None;
    }

    let mut target = local_root.to_path_buf();
    for part in object_name.split('/') {
        match part {
            "" => continue,
            "." | ".." => return None,
            p => target.push(p),
        }
    }
    Some(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_path() {
        let path = parse_path("bucket/dir/file.txt").unwrap();
        assert_eq!(path.bucket, "bucket");
        assert_eq!(path.name, "dir/file.txt");
        assert!(!path.is_container());
        assert_eq!(path.to_string(), "bucket/dir/file.txt");
    }

    #[test]
    fn test_parse_bucket_only() {
        let path = parse_path("bucket").unwrap();
        assert_eq!(path.bucket, "bucket");
        assert!(path.is_container());
        assert_eq!(path.to_string(), "bucket");
    }

    #[test]
    fn test_parse_strips_leading_slashes() {
        let path = parse_path("/bucket//file").unwrap();
        assert_eq!(path.bucket, "bucket");
        assert_eq!(path.name, "file");
    }

    #[test]
    fn test_parse_empty_path() {
        assert!(parse_path("").is_err());
        assert!(parse_path("/").is_err());
    }

    #[test]
    fn test_segments_container() {
        assert_eq!(segments_container("photos"), "photos_segments");
    }

    #[test]
    fn test_listing_prefix() {
        assert_eq!(listing_prefix(""), None);
        assert_eq!(listing_prefix(MATCH_ALL_PREFIX), None);
        assert_eq!(listing_prefix("logs/"), Some("logs/".to_string()));
    }

    #[test]
    fn test_object_name_for() {
        assert_eq!(object_name_for(Path::new("/tmp/data/a.bin")), "tmp/data/a.bin");
        assert_eq!(object_name_for(Path::new("./a/b.txt")), "a/b.txt");
        assert_eq!(object_name_for(Path::new("file.txt")), "file.txt");
    }

    #[test]
    fn test_tree_object_name_with_remote_root() {
        let name = tree_object_name(
            Path::new("/data/run1"),
            Path::new("/data/run1/reads/a.fq"),
            Some("/archive/run1"),
        );
        assert_eq!(name, "archive/run1/reads/a.fq");
    }

    #[test]
    fn test_tree_object_name_without_remote_root() {
        let name = tree_object_name(Path::new("run1"), Path::new("run1/a.fq"), None);
        assert_eq!(name, "run1/a.fq");
    }

    #[test]
    fn test_tree_object_name_empty_remote_root() {
        let name = tree_object_name(Path::new("run1"), Path::new("run1/x/a.fq"), Some("/"));
        assert_eq!(name, "x/a.fq");
    }

    #[test]
    fn test_local_target() {
        let root = Path::new("/out");
        assert_eq!(
            local_target(root, "a/b/c.txt"),
            Some(PathBuf::from("/out/a/b/c.txt"))
        );
        assert_eq!(local_target(root, "dir/"), None);
        assert_eq!(local_target(root, "../etc/passwd"), None);
        assert_eq!(local_target(root, "a/./b"), None);
    }

    #[test]
    fn test_has_dot_segment() {
        assert!(has_dot_segment("data/../escape"));
        assert!(has_dot_segment("a/./b"));
        assert!(has_dot_segment(".."));
        assert!(!has_dot_segment("a/.hidden/b..c"));
        assert!(!has_dot_segment("dir/file.txt"));
    }
}
