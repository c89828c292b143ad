//! delete command - Delete objects with their segments
//!
//! Deleting a manifest also deletes the segments it points at unless
//! --leave-segments is given. With --prefix every matching object is deleted.

use clap::Args;
use serde::Serialize;
use swc_core::path::listing_prefix;
use swc_core::{DeleteOutcome, TransferEngine, parse_path};

use super::{Context, report_bulk};
use crate::exit_code::ExitCode;
use crate::output::ProgressBar;

/// Delete objects
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Target: container/object, or a container together with --prefix
    pub target: String,

    /// Delete every object whose name starts with this prefix ('**/*' for all)
    #[arg(long)]
    pub prefix: Option<String>,

    /// Keep the segments behind deleted manifests
    #[arg(long)]
    pub leave_segments: bool,

    /// Required to delete every object in the container with --prefix '**/*'
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct DeleteOutput<'a> {
    status: &'static str,
    container: &'a str,
    #[serde(flatten)]
    outcome: &'a DeleteOutcome,
}

/// Whether `prefix` selects every object in the container
fn matches_everything(prefix: &str) -> bool {
    listing_prefix(prefix).is_none()
}

/// Execute the delete command
pub async fn execute(args: DeleteArgs, ctx: &Context) -> ExitCode {
    let formatter = &ctx.formatter;

    let target = match parse_path(&args.target) {
        Ok(p) => p,
        Err(e) => return ctx.fail(&e),
    };

    if args.prefix.is_some() && !target.is_container() {
        formatter.error("Use either container/object or container with --prefix, not both");
        return ExitCode::UsageError;
    }
    if args.prefix.is_none() && target.is_container() {
        formatter.error("Missing object name: expected container/object or --prefix");
        return ExitCode::UsageError;
    }

    if args.prefix.as_deref().is_some_and(matches_everything) && !args.force {
        formatter.error(&format!(
            "Refusing to delete every object in '{}' without --force",
            target.bucket
        ));
        return ExitCode::UsageError;
    }

    let client = match ctx.client().await {
        Ok(c) => c,
        Err(e) => return ctx.fail(&e),
    };
    let leave_segments = args.leave_segments || ctx.config.defaults.leave_segments;

    if let Some(prefix) = &args.prefix {
        let progress = ProgressBar::spinner(formatter.config(), "deleting");
        let engine = TransferEngine::new(&client, ctx.settings()).with_progress(&progress);
        let result = engine
            .delete_with_prefix(&target.bucket, prefix, leave_segments)
            .await;
        progress.finish_and_clear();

        return match result {
            Ok(outcome) => report_bulk(formatter, "Deleted", &outcome),
            Err(e) => ctx.fail(&e),
        };
    }

    let engine = TransferEngine::new(&client, ctx.settings());
    let outcome = match engine
        .delete_with_segments(&target.bucket, &target.name, leave_segments)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => return ctx.fail(&e),
    };

    let complete = outcome.cleanup.as_ref().is_none_or(|c| c.is_complete());
    if formatter.is_json() {
        formatter.json(&DeleteOutput {
            status: if complete { "success" } else { "partial" },
            container: &target.bucket,
            outcome: &outcome,
        });
    } else {
        match &outcome.cleanup {
            Some(cleanup) => formatter.success(&format!(
                "Deleted {target} and {} segment(s) from {}",
                cleanup.deleted.len(),
                cleanup.container
            )),
            None => formatter.success(&format!("Deleted {target}")),
        }
        if let Some(cleanup) = outcome.cleanup.as_ref().filter(|c| !c.is_complete()) {
            for name in &cleanup.failed {
                formatter.warning(&format!("Could not delete segment {}/{name}", cleanup.container));
            }
        }
    }

    if complete {
        ExitCode::Success
    } else {
        ExitCode::GeneralError
    }
}
