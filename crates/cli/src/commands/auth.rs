//! auth command - Resolve credentials and print the session
//!
//! Runs the identity exchange (or takes the given token) and shows the
//! storage URL every other command would talk to.

use clap::Args;
use serde::Serialize;
use swc_core::Session;

use super::Context;
use crate::exit_code::ExitCode;

const REDACTED: &str = "<redacted>";

/// Authenticate and print the resolved session
#[derive(Args, Debug)]
pub struct AuthArgs {
    /// Print the token instead of a placeholder
    #[arg(long)]
    pub show_token: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct AuthOutput<'a> {
    storage_url: &'a str,
    token: &'a str,
}

impl<'a> AuthOutput<'a> {
    fn new(session: &'a Session, show_token: bool) -> Self {
        Self {
            storage_url: session.endpoint(),
            token: if show_token { session.token() } else { REDACTED },
        }
    }
}

/// Execute the auth command
pub async fn execute(args: AuthArgs, ctx: &Context) -> ExitCode {
    let formatter = &ctx.formatter;

    let session = match ctx.session().await {
        Ok(s) => s,
        Err(e) => return ctx.fail(&e),
    };

    let output = AuthOutput::new(&session, args.show_token);
    if formatter.is_json() {
        formatter.json(&output);
    } else {
        formatter.println(&format!("Storage URL : {}", output.storage_url));
        formatter.println(&format!("Auth Token  : {}", output.token));
    }
    ExitCode::Success
}
