//! download command - Download objects
//!
//! Downloads one object, or every object under a prefix while recreating the
//! name hierarchy below a local directory.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;
use swc_core::path::local_target;
use swc_core::{Error, TransferEngine, parse_path};

use super::{Context, report_bulk};
use crate::exit_code::ExitCode;
use crate::output::ProgressBar;

/// Download objects
#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Source: container/object, or a container together with --prefix
    pub source: String,

    /// Local file for a single object, or destination directory with --prefix
    pub local: Option<PathBuf>,

    /// Download every object whose name starts with this prefix ('**/*' for all)
    #[arg(long)]
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize)]
struct DownloadOutput {
    status: &'static str,
    source: String,
    target: String,
    size_bytes: u64,
    size_human: String,
}

/// Execute the download command
pub async fn execute(args: DownloadArgs, ctx: &Context) -> ExitCode {
    let formatter = &ctx.formatter;

    let source = match parse_path(&args.source) {
        Ok(p) => p,
        Err(e) => return ctx.fail(&e),
    };

    if args.prefix.is_some() && !source.is_container() {
        formatter.error("Use either container/object or container with --prefix, not both");
        return ExitCode::UsageError;
    }
    if args.prefix.is_none() && source.is_container() {
        formatter.error("Missing object name: expected container/object or --prefix");
        return ExitCode::UsageError;
    }

    let client = match ctx.client().await {
        Ok(c) => c,
        Err(e) => return ctx.fail(&e),
    };

    if let Some(prefix) = &args.prefix {
        let dest = args.local.unwrap_or_else(|| PathBuf::from("."));
        let progress = ProgressBar::spinner(formatter.config(), "downloading");
        let engine = TransferEngine::new(&client, ctx.settings()).with_progress(&progress);
        let result = engine
            .download_with_prefix(&source.bucket, prefix, &dest)
            .await;
        progress.finish_and_clear();

        return match result {
            Ok(outcome) => report_bulk(formatter, "Downloaded", &outcome),
            Err(e) => ctx.fail(&e),
        };
    }

    let target = match single_target(args.local.as_deref(), &source.name) {
        Ok(t) => t,
        Err(e) => return ctx.fail(&e),
    };

    let engine = TransferEngine::new(&client, ctx.settings());
    match engine
        .download_object(&source.bucket, &source.name, &target)
        .await
    {
        Ok(bytes) => {
            let output = DownloadOutput {
                status: "success",
                source: source.to_string(),
                target: target.display().to_string(),
                size_bytes: bytes,
                size_human: humansize::format_size(bytes, humansize::BINARY),
            };
            if formatter.is_json() {
                formatter.json(&output);
            } else {
                formatter.println(&format!(
                    "{} -> {} {}",
                    output.source,
                    output.target,
                    formatter.dim(&format!("({})", output.size_human))
                ));
            }
            ExitCode::Success
        }
        Err(e) => ctx.fail(&e),
    }
}

/// Local path for a single download
///
/// Without an explicit path, or with an existing directory, the object name
/// is mapped below it.
fn single_target(local: Option<&Path>, name: &str) -> Result<PathBuf, Error> {
    match local {
        Some(path) if !path.is_dir() => Ok(path.to_path_buf()),
        Some(dir) => local_target(dir, name).ok_or_else(|| unsafe_name(name)),
        None => local_target(Path::new("."), name).ok_or_else(|| unsafe_name(name)),
    }
}

fn unsafe_name(name: &str) -> Error {
    Error::InvalidPath(format!(
        "object name '{name}' does not map to a local file; pass a local path"
    ))
}
