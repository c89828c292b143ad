//! list command - List the objects of a container
//!
//! The listing follows markers until the last page, so containers of any size
//! are listed completely.

use clap::Args;
use comfy_table::{Cell, CellAlignment, Table, presets::NOTHING};
use serde::Serialize;
use swc_core::{ListingEntry, TransferEngine, parse_path};

use super::Context;
use crate::exit_code::ExitCode;

/// List objects
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Container, optionally followed by a name prefix: container[/prefix]
    pub path: String,

    /// Only list names starting with this prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// Show size, modification time and etag
    #[arg(short, long)]
    pub long: bool,
}

#[derive(Debug, Serialize)]
struct ListOutput<'a> {
    container: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    prefix: Option<&'a str>,
    items: &'a [ListingEntry],
    total_objects: usize,
    total_size_bytes: u64,
}

/// Execute the list command
pub async fn execute(args: ListArgs, ctx: &Context) -> ExitCode {
    let formatter = &ctx.formatter;

    let path = match parse_path(&args.path) {
        Ok(p) => p,
        Err(e) => return ctx.fail(&e),
    };

    if args.prefix.is_some() && !path.is_container() {
        formatter.error("Give the prefix either in the path or with --prefix, not both");
        return ExitCode::UsageError;
    }
    let prefix = args
        .prefix
        .as_deref()
        .or((!path.is_container()).then_some(path.name.as_str()));

    let client = match ctx.client().await {
        Ok(c) => c,
        Err(e) => return ctx.fail(&e),
    };

    let engine = TransferEngine::new(&client, ctx.settings());
    let entries = match engine.list_all(&path.bucket, prefix).await {
        Ok(entries) => entries,
        Err(e) => return ctx.fail(&e),
    };

    let total_size_bytes = entries.iter().map(|e| e.size_bytes).sum();
    if formatter.is_json() {
        formatter.json(&ListOutput {
            container: &path.bucket,
            prefix,
            items: &entries,
            total_objects: entries.len(),
            total_size_bytes,
        });
    } else if args.long {
        if !entries.is_empty() {
            formatter.println(&long_table(&entries).to_string());
        }
        formatter.println(&format!(
            "Total: {} object(s), {}",
            entries.len(),
            humansize::format_size(total_size_bytes, humansize::BINARY)
        ));
    } else {
        for entry in &entries {
            formatter.println(&entry.name);
        }
    }

    ExitCode::Success
}

fn long_table(entries: &[ListingEntry]) -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    for entry in entries {
        table.add_row(vec![
            Cell::new(humansize::format_size(entry.size_bytes, humansize::BINARY))
                .set_alignment(CellAlignment::Right),
            Cell::new(display_time(&entry.last_modified)),
            Cell::new(&entry.etag),
            Cell::new(&entry.name),
        ]);
    }
    table
}

/// Render a listing timestamp as `YYYY-MM-DD HH:MM:SS`
///
/// Listings carry naive UTC times with microseconds; anything unparseable is
/// shown as sent.
fn display_time(raw: &str) -> String {
    match raw.parse::<jiff::civil::DateTime>() {
        Ok(dt) => dt.strftime("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, size: u64) -> ListingEntry {
        ListingEntry {
            name: name.to_string(),
            size_bytes: size,
            last_modified: "2024-03-01T12:30:45.123456".to_string(),
            etag: "abc".to_string(),
            content_type: "text/plain".to_string(),
        }
    }

    #[test]
    fn test_display_time() {
        assert_eq!(
            display_time("2024-03-01T12:30:45.123456"),
            "2024-03-01 12:30:45"
        );
        assert_eq!(display_time("yesterday"), "yesterday");
    }

    #[test]
    fn test_long_table_rows() {
        let table = long_table(&[entry("a.txt", 2048), entry("b/c.bin", 1)]);
        let rendered = table.to_string();
        assert!(rendered.contains("a.txt"));
        assert!(rendered.contains("2 KiB"));
        assert!(rendered.contains("b/c.bin"));
        assert!(rendered.contains("2024-03-01 12:30:45"));
    }
}
