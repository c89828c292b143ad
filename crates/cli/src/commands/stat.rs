//! stat command - Show container or object metadata
//!
//! For segmented objects the manifest header is shown, so it is visible which
//! segments container and prefix back the object.

use clap::Args;
use serde::Serialize;
use swc_core::{ContainerInfo, ObjectInfo, TransferEngine, parse_path};

use super::Context;
use crate::exit_code::ExitCode;

/// Show container or object metadata
#[derive(Args, Debug)]
pub struct StatArgs {
    /// container or container/object
    pub path: String,
}

#[derive(Debug, Serialize)]
struct ObjectStatOutput<'a> {
    container: &'a str,
    segmented: bool,
    #[serde(flatten)]
    info: &'a ObjectInfo,
}

/// Execute the stat command
pub async fn execute(args: StatArgs, ctx: &Context) -> ExitCode {
    let formatter = &ctx.formatter;

    let path = match parse_path(&args.path) {
        Ok(p) => p,
        Err(e) => return ctx.fail(&e),
    };

    let client = match ctx.client().await {
        Ok(c) => c,
        Err(e) => return ctx.fail(&e),
    };
    let engine = TransferEngine::new(&client, ctx.settings());

    if path.is_container() {
        return match engine.stat_container(&path.bucket).await {
            Ok(info) => {
                if formatter.is_json() {
                    formatter.json(&info);
                } else {
                    for line in container_lines(&info) {
                        formatter.println(&line);
                    }
                }
                ExitCode::Success
            }
            Err(e) => ctx.fail(&e),
        };
    }

    match engine.stat_object(&path.bucket, &path.name).await {
        Ok(info) => {
            if formatter.is_json() {
                formatter.json(&ObjectStatOutput {
                    container: &path.bucket,
                    segmented: info.is_segmented(),
                    info: &info,
                });
            } else {
                for line in object_lines(&path.bucket, &info) {
                    formatter.println(&line);
                }
            }
            ExitCode::Success
        }
        Err(e) => ctx.fail(&e),
    }
}

fn container_lines(info: &ContainerInfo) -> Vec<String> {
    let mut lines = vec![
        format!("Container : {}", info.name),
        format!("Objects   : {}", info.object_count),
        format!(
            "Bytes     : {} ({})",
            info.bytes_used,
            humansize::format_size(info.bytes_used, humansize::BINARY)
        ),
    ];
    lines.extend(meta_lines(info.metadata.iter()));
    lines
}

fn object_lines(container: &str, info: &ObjectInfo) -> Vec<String> {
    let mut lines = vec![
        format!("Container : {container}"),
        format!("Object    : {}", info.name),
        format!("Size      : {} ({})", info.size_bytes, info.size_human),
    ];
    if let Some(modified) = &info.last_modified {
        lines.push(format!("Modified  : {modified}"));
    }
    if let Some(etag) = &info.etag {
        lines.push(format!("ETag      : {etag}"));
    }
    if let Some(ct) = &info.content_type {
        lines.push(format!("Type      : {ct}"));
    }
    if let Some(manifest) = &info.manifest {
        lines.push(format!("Manifest  : {manifest}"));
    }
    lines.extend(meta_lines(info.metadata.iter()));
    lines
}

fn meta_lines<'a>(metadata: impl Iterator<Item = (&'a String, &'a String)>) -> Vec<String> {
    metadata
        .map(|(key, value)| format!("Meta      : {key}: {value}"))
        .collect()
}
