//! upload command - Upload a file or directory tree
//!
//! Files larger than the segment size are uploaded as segments plus a
//! manifest. Directories are walked and every file is uploaded under the
//! target name.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use serde::Serialize;
use swc_core::{
    SegmentFailurePolicy, TransferEngine, TransferRequest, UploadOutcome, parse_path,
};

use super::{Context, report_bulk};
use crate::exit_code::ExitCode;
use crate::output::ProgressBar;

/// Upload a file or a directory tree
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Local file or directory
    pub local: PathBuf,

    /// Destination: container[/object-name]; for directories the name is the remote root
    pub target: String,

    /// Segment files larger than this (e.g. 500M, 2GiB, 1000000)
    #[arg(long, value_parser = parse_size)]
    pub segment_size: Option<u64>,

    /// Keep the segments of a previous version of the object
    #[arg(long)]
    pub leave_segments: bool,

    /// Object metadata as key:value (repeatable)
    #[arg(long = "meta", value_name = "KEY:VALUE", value_parser = parse_meta)]
    pub meta: Vec<(String, String)>,

    /// Segment uploads in flight at once
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: Option<u16>,

    /// What to do when a segment fails to upload
    #[arg(long, value_enum)]
    pub segment_failure: Option<FailurePolicy>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop and do not write the manifest
    Abort,
    /// Keep going and write the manifest anyway
    Continue,
}

impl From<FailurePolicy> for SegmentFailurePolicy {
    fn from(policy: FailurePolicy) -> Self {
        match policy {
            FailurePolicy::Abort => SegmentFailurePolicy::Abort,
            FailurePolicy::Continue => SegmentFailurePolicy::Continue,
        }
    }
}

#[derive(Debug, Serialize)]
struct UploadOutput<'a> {
    status: &'static str,
    local: String,
    container: &'a str,
    #[serde(flatten)]
    outcome: &'a UploadOutcome,
}

/// Execute the upload command
pub async fn execute(args: UploadArgs, ctx: &Context) -> ExitCode {
    let formatter = &ctx.formatter;

    let target = match parse_path(&args.target) {
        Ok(p) => p,
        Err(e) => return ctx.fail(&e),
    };

    if !args.local.exists() {
        formatter.error(&format!("Source not found: {}", args.local.display()));
        return ExitCode::NotFound;
    }

    let client = match ctx.client().await {
        Ok(c) => c,
        Err(e) => return ctx.fail(&e),
    };

    let defaults = &ctx.config.defaults;
    let mut settings = ctx.settings();
    if let Some(concurrency) = args.concurrency {
        settings.concurrency = usize::from(concurrency);
    }
    if let Some(policy) = args.segment_failure {
        settings.segment_failure = policy.into();
    }

    let mut request = TransferRequest::new(&target.bucket, &args.local)
        .segment_size(args.segment_size.unwrap_or(defaults.segment_size))
        .leave_segments(args.leave_segments || defaults.leave_segments)
        .metadata(args.meta.into_iter().collect::<BTreeMap<_, _>>());

    let progress = ProgressBar::bytes(formatter.config());
    let engine = TransferEngine::new(&client, settings).with_progress(&progress);

    if args.local.is_dir() {
        let remote_root = (!target.name.is_empty()).then_some(target.name.as_str());
        let result = engine.upload_tree(&request, remote_root).await;
        progress.finish_and_clear();
        return match result {
            Ok(outcome) => report_bulk(formatter, "Uploaded", &outcome),
            Err(e) => ctx.fail(&e),
        };
    }

    if !target.name.is_empty() {
        request = request.remote_name(target.name.as_str());
    }
    let result = engine.upload(&request).await;
    progress.finish_and_clear();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => return ctx.fail(&e),
    };

    let local = args.local.display().to_string();
    if formatter.is_json() {
        formatter.json(&UploadOutput {
            status: if outcome.is_complete() { "success" } else { "partial" },
            local,
            container: &target.bucket,
            outcome: &outcome,
        });
    } else {
        let size = humansize::format_size(outcome.size_bytes, humansize::BINARY);
        let detail = if outcome.segments > 0 {
            format!("{size}, {} segments", outcome.segments)
        } else {
            size
        };
        formatter.println(&format!(
            "{local} -> {}/{} {}",
            target.bucket,
            outcome.remote_name,
            formatter.dim(&format!("({detail})"))
        ));
        if !outcome.failed_segments.is_empty() {
            formatter.warning(&format!(
                "segment(s) {:?} failed; the manifest references missing data",
                outcome.failed_segments
            ));
        }
        if let Some(cleanup) = outcome.cleanup.as_ref().filter(|c| !c.is_complete()) {
            formatter.warning(&format!(
                "{} old segment(s) in {} could not be deleted",
                cleanup.failed.len(),
                cleanup.container
            ));
        }
    }

    if outcome.is_complete() {
        ExitCode::Success
    } else {
        ExitCode::GeneralError
    }
}

/// Parse a byte size with an optional decimal (K, M, G, T) or binary
/// (Ki, Mi, Gi, Ti) suffix
pub fn parse_size(value: &str) -> Result<u64, String> {
    let trimmed = value.trim();
    let upper = trimmed.to_ascii_uppercase();
    let upper = upper.strip_suffix('B').unwrap_or(&upper);

    let split = upper
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(upper.len());
    let (digits, suffix) = upper.split_at(split);

    let number: u64 = digits
        .parse()
        .map_err(|_| format!("invalid size '{trimmed}'"))?;
    let multiplier: u64 = match suffix {
        "" => 1,
        "K" => 1_000,
        "M" => 1_000_000,
        "G" => 1_000_000_000,
        "T" => 1_000_000_000_000,
        "KI" => 1 << 10,
        "MI" => 1 << 20,
        "GI" => 1 << 30,
        "TI" => 1 << 40,
        _ => return Err(format!("unknown size suffix in '{trimmed}'")),
    };

    let size = number
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size '{trimmed}' is too large"))?;
    if size == 0 {
        return Err("size must be greater than 0".to_string());
    }
    Ok(size)
}

/// Parse `key:value` metadata
pub fn parse_meta(value: &str) -> Result<(String, String), String> {
    match value.split_once(':') {
        Some((key, val)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), val.to_string()))
        }
        _ => Err(format!("expected key:value, got '{value}'")),
    }
}
