//! Segment planning and manifest naming
//!
//! Large files are stored as independent segment objects in the
//! `{bucket}_segments` container, tied together by a zero-byte manifest whose
//! `X-Object-Manifest` header names the segments' common prefix.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::error::{Error, Result};
use crate::path::segments_container;

/// Width of the zero-padded segment index
pub const SEGMENT_INDEX_WIDTH: usize = 10;

/// One contiguous byte range of a local file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Position in the upload, starting at 0
    pub index: usize,
    /// First byte of the range
    pub offset: u64,
    /// Number of bytes, always > 0
    pub length: u64,
}

/// Whether a file of `file_size` bytes must be split
pub fn needs_segmentation(file_size: u64, segment_size: u64) -> bool {
    file_size > segment_size
}

/// Split `[0, file_size)` into ordered, contiguous segments
///
/// Every segment is `segment_size` bytes long except the last, which holds
/// the remainder. The count is `ceil(file_size / segment_size)`, so a file
/// whose size is an exact multiple never gets an empty trailing segment.
pub fn plan_segments(file_size: u64, segment_size: u64) -> Result<Vec<Segment>> {
    if segment_size == 0 {
        return Err(Error::Config("segment size must be greater than 0".into()));
    }
    if file_size == 0 {
        return Err(Error::File("cannot plan segments for an empty file".into()));
    }

    let count = file_size.div_ceil(segment_size);
    let segments = (0..count)
        .map(|i| {
            let offset = i * segment_size;
            Segment {
                index: i as usize,
                offset,
                length: segment_size.min(file_size - offset),
            }
        })
        .collect();

    Ok(segments)
}

static LAST_GENERATION: AtomicI64 = AtomicI64::new(0);

/// Nanosecond timestamp identifying one upload generation
///
/// Strictly increasing within the process.
pub fn generation_timestamp() -> i64 {
    let now = i64::try_from(jiff::Timestamp::now().as_nanosecond()).unwrap_or(i64::MAX);
    let mut last = LAST_GENERATION.load(Ordering::Relaxed);
    loop {
        let next = now.max(last.saturating_add(1));
        match LAST_GENERATION.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// Generation-unique prefix of one segmented upload
///
/// Segments are named `{object}/{timestamp}/{file_size}/{index:010}` inside
/// the segments container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestPrefix {
    container: String,
    object: String,
    timestamp: i64,
    file_size: u64,
}

impl ManifestPrefix {
    pub fn new(bucket: &str, object: impl Into<String>, timestamp: i64, file_size: u64) -> Self {
        Self {
            container: segments_container(bucket),
            object: object.into(),
            timestamp,
            file_size,
        }
    }

    /// Container holding the segments
    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Common prefix of the segment names, relative to the container
    pub fn segment_prefix(&self) -> String {
        format!("{}/{}/{}", self.object, self.timestamp, self.file_size)
    }

    /// Name of segment `index`
    pub fn segment_name(&self, index: usize) -> String {
        format!(
            "{}/{:0width$}",
            self.segment_prefix(),
            index,
            width = SEGMENT_INDEX_WIDTH
        )
    }

    /// Value of the `X-Object-Manifest` header
    pub fn header_value(&self) -> String {
        format!("{}/{}", self.container, self.segment_prefix())
    }

    /// The same prefix as a parsed manifest reference
    pub fn to_ref(&self) -> ManifestRef {
        ManifestRef {
            container: self.container.clone(),
            prefix: self.segment_prefix(),
        }
    }
}

impl std::fmt::Display for ManifestPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.header_value())
    }
}

/// A parsed `X-Object-Manifest` value: `{container}/{prefix}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRef {
    pub container: String,
    pub prefix: String,
}

impl ManifestRef {
    /// Parse a manifest header value
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim().trim_start_matches('/');
        match value.split_once('/') {
            Some((container, prefix)) if !container.is_empty() && !prefix.is_empty() => {
                Ok(Self {
                    container: container.to_string(),
                    prefix: prefix.to_string(),
                })
            }
            _ => Err(Error::Decode(format!("malformed manifest value '{value}'"))),
        }
    }

    /// Whether a segment listed in `container` belongs to this manifest
    pub fn covers(&self, container: &str, name: &str) -> bool {
        self.container == container && name.starts_with(&self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(segments: &[Segment]) -> Vec<(u64, u64)> {
        segments.iter().map(|s| (s.offset, s.length)).collect()
    }

    #[test]
    fn test_needs_segmentation_threshold() {
        assert!(!needs_segmentation(10, 10));
        assert!(!needs_segmentation(9, 10));
        assert!(needs_segmentation(11, 10));
    }

    #[test]
    fn test_plan_with_remainder() {
        let segments = plan_segments(25, 10).unwrap();
        assert_eq!(pairs(&segments), vec![(0, 10), (10, 10), (20, 5)]);
        assert_eq!(
            segments.iter().map(|s| s.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_plan_exact_multiple_has_no_empty_segment() {
        let segments = plan_segments(20, 10).unwrap();
        assert_eq!(pairs(&segments), vec![(0, 10), (10, 10)]);
        assert!(segments.iter().all(|s| s.length > 0));
    }

    #[test]
    fn test_plan_single_segment() {
        let segments = plan_segments(7, 10).unwrap();
        assert_eq!(pairs(&segments), vec![(0, 7)]);
    }

    #[test]
    fn test_plan_covers_file() {
        for (file_size, segment_size) in [(1, 1), (99, 7), (1000, 1), (1_000_001, 4096), (64, 63)]
        {
            let segments = plan_segments(file_size, segment_size).unwrap();
            let mut expected_offset = 0;
            for segment in &segments {
                assert_eq!(segment.offset, expected_offset);
                assert!(segment.length > 0 && segment.length <= segment_size);
                expected_offset += segment.length;
            }
            assert_eq!(expected_offset, file_size);
            assert_eq!(segments.len() as u64, file_size.div_ceil(segment_size));
        }
    }

    #[test]
    fn test_plan_rejects_zero_sizes() {
        assert!(matches!(plan_segments(10, 0), Err(Error::Config(_))));
        assert!(matches!(plan_segments(0, 10), Err(Error::File(_))));
    }

    #[test]
    fn test_manifest_prefix_naming() {
        let prefix = ManifestPrefix::new("photos", "2024/big.tar", 1700000000123456789, 25);
        assert_eq!(prefix.container(), "photos_segments");
        assert_eq!(prefix.segment_prefix(), "2024/big.tar/1700000000123456789/25");
        assert_eq!(
            prefix.segment_name(2),
            "2024/big.tar/1700000000123456789/25/0000000002"
        );
        assert_eq!(
            prefix.header_value(),
            "photos_segments/2024/big.tar/1700000000123456789/25"
        );
        assert_eq!(prefix.to_string(), prefix.header_value());
    }

    #[test]
    fn test_manifest_ref_round_trips_prefix() {
        let prefix = ManifestPrefix::new("photos", "big.tar", 42, 25);
        let parsed = ManifestRef::parse(&prefix.header_value()).unwrap();
        assert_eq!(parsed, prefix.to_ref());
        assert_eq!(parsed.container, "photos_segments");
        assert_eq!(parsed.prefix, "big.tar/42/25");
    }

    #[test]
    fn test_manifest_ref_rejects_malformed() {
        assert!(ManifestRef::parse("").is_err());
        assert!(ManifestRef::parse("container").is_err());
        assert!(ManifestRef::parse("container/").is_err());
    }

    #[test]
    fn test_manifest_ref_covers() {
        let parsed = ManifestRef::parse("b_segments/obj/42/25").unwrap();
        assert!(parsed.covers("b_segments", "obj/42/25/0000000000"));
        assert!(!parsed.covers("b_segments", "obj/43/25/0000000000"));
        assert!(!parsed.covers("other", "obj/42/25/0000000000"));
    }

    #[test]
    fn test_generation_timestamp_strictly_increases() {
        let mut last = generation_timestamp();
        for _ in 0..1000 {
            let next = generation_timestamp();
            assert!(next > last);
            last = next;
        }
    }
}
