//! CLI command definitions and execution
//!
//! This module contains all CLI commands and their implementations, plus the
//! shared plumbing every remote command goes through: loading the config,
//! resolving credentials into a session and building the Swift client.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use swc_core::{
    BulkOutcome, Config, ConfigManager, Error, Profile, ProfileManager, Result, Session,
    TransferSettings,
};
use swc_swift::{KeystoneClient, SwiftClient};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod auth;
pub mod completions;
mod delete;
mod download;
mod list;
mod profile;
mod stat;
pub mod upload;

/// swc - Swift object storage CLI
///
/// Uploads, downloads, lists and deletes objects in Swift-compatible object
/// storage. Large files are split into segments behind a manifest.
#[derive(Parser, Debug)]
#[command(name = "swc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress bar
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    /// Use the credentials of a saved profile
    #[arg(long, global = true, env = "SWC_PROFILE")]
    pub profile: Option<String>,

    #[command(flatten)]
    pub credentials: CredentialArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Identity and storage credentials
#[derive(Args, Debug, Default, Clone)]
pub struct CredentialArgs {
    /// Pre-issued token; skips the identity exchange when combined with --os-storage-url
    #[arg(long, global = true, env = "OS_AUTH_TOKEN", hide_env_values = true)]
    pub os_auth_token: Option<String>,

    /// Storage URL, e.g. https://swift.example.org/v1/AUTH_xxx
    #[arg(long, global = true, env = "OS_STORAGE_URL")]
    pub os_storage_url: Option<String>,

    /// Identity service URL, e.g. https://keystone.example.org/v3
    #[arg(long, global = true, env = "OS_AUTH_URL")]
    pub os_auth_url: Option<String>,

    /// User name
    #[arg(long, global = true, env = "OS_USERNAME")]
    pub os_username: Option<String>,

    /// User password
    #[arg(long, global = true, env = "OS_PASSWORD", hide_env_values = true)]
    pub os_password: Option<String>,

    /// Project name
    #[arg(long, global = true, env = "OS_PROJECT_NAME")]
    pub os_project_name: Option<String>,

    /// User domain name
    #[arg(long, global = true, env = "OS_USER_DOMAIN_NAME")]
    pub os_user_domain_name: Option<String>,

    /// User domain id
    #[arg(long, global = true, env = "OS_USER_DOMAIN_ID")]
    pub os_user_domain_id: Option<String>,

    /// Project domain name
    #[arg(long, global = true, env = "OS_PROJECT_DOMAIN_NAME")]
    pub os_project_domain_name: Option<String>,

    /// Project domain id
    #[arg(long, global = true, env = "OS_PROJECT_DOMAIN_ID")]
    pub os_project_domain_id: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a file or a directory tree
    Upload(upload::UploadArgs),

    /// Download an object, or every object under a prefix
    Download(download::DownloadArgs),

    /// Delete an object with its segments, or every object under a prefix
    Delete(delete::DeleteArgs),

    /// List the objects of a container
    List(list::ListArgs),

    /// Show container or object metadata
    Stat(stat::StatArgs),

    /// Authenticate and print the resolved session
    Auth(auth::AuthArgs),

    /// Manage saved credential profiles
    #[command(subcommand)]
    Profile(profile::ProfileCommands),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// Everything a remote command needs
pub struct Context {
    pub config: Config,
    pub formatter: Formatter,
    pub profile: Option<String>,
    pub credentials: CredentialArgs,
}

impl Context {
    /// Engine settings from the config file
    pub fn settings(&self) -> TransferSettings {
        TransferSettings::from(&self.config.defaults)
    }

    /// Resolve credentials into a session
    pub async fn session(&self) -> Result<Session> {
        match resolve_credentials(&self.credentials, self.profile.as_deref(), profile_manager)? {
            Credentials::Token {
                token,
                storage_url,
            } => Session::new(token, storage_url),
            Credentials::Keystone(profile) => {
                let keystone = KeystoneClient::new(&self.config.defaults.timeout)?;
                keystone.authenticate(&profile).await
            }
        }
    }

    /// Authenticated Swift client
    pub async fn client(&self) -> Result<SwiftClient> {
        let session = self.session().await?;
        tracing::debug!(?session, "session resolved");
        SwiftClient::new(session, &self.config.defaults.timeout)
    }

    /// Print an error and map it to its exit code
    pub fn fail(&self, error: &Error) -> ExitCode {
        self.formatter.error(&error.to_string());
        ExitCode::from(error)
    }
}

/// Where the session comes from
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Credentials {
    Token { token: String, storage_url: String },
    Keystone(Profile),
}

fn profile_manager() -> Result<ProfileManager> {
    ProfileManager::new()
}

/// Pick the credential source
///
/// A token with a storage URL wins, then a profile selected with `--profile`
/// or `SWC_PROFILE`, then Keystone flags or `OS_*` variables. A storage URL
/// given alongside a profile overrides the profile's.
pub(crate) fn resolve_credentials(
    args: &CredentialArgs,
    profile: Option<&str>,
    profiles: impl FnOnce() -> Result<ProfileManager>,
) -> Result<Credentials> {
    let non_empty = |v: &Option<String>| v.as_ref().filter(|s| !s.trim().is_empty()).cloned();

    if let (Some(token), Some(storage_url)) =
        (non_empty(&args.os_auth_token), non_empty(&args.os_storage_url))
    {
        return Ok(Credentials::Token { token, storage_url });
    }

    if let Some(name) = profile {
        let mut saved = profiles()?.get(name)?;
        if let Some(storage_url) = non_empty(&args.os_storage_url) {
            saved.storage_url = Some(storage_url);
        }
        return Ok(Credentials::Keystone(saved));
    }

    if let Some(auth_url) = non_empty(&args.os_auth_url) {
        let mut keystone = Profile::new(
            "",
            auth_url,
            non_empty(&args.os_username).unwrap_or_default(),
            non_empty(&args.os_password).unwrap_or_default(),
        );
        keystone.project_name = non_empty(&args.os_project_name).unwrap_or_default();
        keystone.user_domain_name = non_empty(&args.os_user_domain_name);
        keystone.user_domain_id = non_empty(&args.os_user_domain_id);
        keystone.project_domain_name = non_empty(&args.os_project_domain_name);
        keystone.project_domain_id = non_empty(&args.os_project_domain_id);
        keystone.storage_url = non_empty(&args.os_storage_url);
        return Ok(Credentials::Keystone(keystone));
    }

    Err(Error::Auth(
        "no credentials: pass --os-auth-token with --os-storage-url, --os-auth-url, or --profile"
            .into(),
    ))
}

#[derive(Serialize)]
struct BulkOutput<'a> {
    status: &'static str,
    #[serde(flatten)]
    outcome: &'a BulkOutcome,
}

/// Print the per-item results of a bulk operation
pub(crate) fn report_bulk(formatter: &Formatter, verb: &str, outcome: &BulkOutcome) -> ExitCode {
    if formatter.is_json() {
        formatter.json(&BulkOutput {
            status: if outcome.is_complete() { "success" } else { "partial" },
            outcome,
        });
    } else {
        for name in &outcome.skipped {
            formatter.warning(&format!("Skipped {name}"));
        }
        for failed in &outcome.failed {
            formatter.error(&format!("{}: {}", failed.name, failed.error));
        }
        formatter.success(&format!("{verb} {} object(s).", outcome.succeeded.len()));
    }

    if outcome.is_complete() {
        ExitCode::Success
    } else {
        ExitCode::GeneralError
    }
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let flags = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    };

    // Commands that never touch the config file
    let command = match cli.command {
        Commands::Completions(args) => return completions::execute(args),
        command => command,
    };

    let config = match ConfigManager::new().and_then(|m| m.load()) {
        Ok(config) => config,
        Err(e) => {
            let formatter = Formatter::new(flags);
            formatter.error(&format!("Failed to load configuration: {e}"));
            return ExitCode::from(&e);
        }
    };

    let output = flags.with_defaults(&config.defaults);
    if output.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let ctx = Context {
        formatter: Formatter::new(output),
        config,
        profile: cli.profile,
        credentials: cli.credentials,
    };

    match command {
        Commands::Upload(args) => upload::execute(args, &ctx).await,
        Commands::Download(args) => download::execute(args, &ctx).await,
        Commands::Delete(args) => delete::execute(args, &ctx).await,
        Commands::List(args) => list::execute(args, &ctx).await,
        Commands::Stat(args) => stat::execute(args, &ctx).await,
        Commands::Auth(args) => auth::execute(args, &ctx).await,
        Commands::Profile(cmd) => profile::execute(cmd, &ctx),
        Commands::Completions(args) => completions::execute(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_profiles() -> Result<ProfileManager> {
        Err(Error::General("profiles must not be loaded".into()))
    }

    #[test]
    fn test_token_and_storage_url_win() {
        let args = CredentialArgs {
            os_auth_token: Some("tok".into()),
            os_storage_url: Some("https://swift/v1/AUTH_a".into()),
            os_auth_url: Some("https://keystone/v3".into()),
            ..Default::default()
        };
        let credentials = resolve_credentials(&args, Some("prod"), no_profiles).unwrap();
        assert_eq!(
            credentials,
            Credentials::Token {
                token: "tok".into(),
                storage_url: "https://swift/v1/AUTH_a".into()
            }
        );
    }

    #[test]
    fn test_keystone_flags() {
        let args = CredentialArgs {
            os_auth_token: Some("tok".into()),
            os_auth_url: Some("https://keystone/v3".into()),
            os_username: Some("alice".into()),
            os_password: Some("pw".into()),
            os_project_name: Some("science".into()),
            os_user_domain_id: Some("default".into()),
            ..Default::default()
        };
        let Credentials::Keystone(profile) = resolve_credentials(&args, None, no_profiles).unwrap()
        else {
            panic!("expected keystone credentials");
        };
        assert_eq!(profile.auth_url, "https://keystone/v3");
        assert_eq!(profile.username, "alice");
        assert_eq!(profile.project_name, "science");
        assert_eq!(profile.user_domain_id.as_deref(), Some("default"));
        assert!(profile.storage_url.is_none());
    }

    #[test]
    fn test_saved_profile() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ProfileManager::with_config_manager(ConfigManager::with_path(
            dir.path().join("config.toml"),
        ));
        let mut saved = Profile::new("prod", "https://keystone/v3", "bob", "pw");
        saved.project_name = "p".into();
        manager.set(saved).unwrap();

        let args = CredentialArgs {
            os_storage_url: Some("https://swift/v1/AUTH_x".into()),
            ..Default::default()
        };
        let Credentials::Keystone(profile) =
            resolve_credentials(&args, Some("prod"), || Ok(manager)).unwrap()
        else {
            panic!("expected keystone credentials");
        };
        assert_eq!(profile.username, "bob");
        assert_eq!(profile.storage_url.as_deref(), Some("https://swift/v1/AUTH_x"));
    }

    #[test]
    fn test_profile_beats_keystone_environment() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ProfileManager::with_config_manager(ConfigManager::with_path(
            dir.path().join("config.toml"),
        ));
        manager
            .set(Profile::new("prod", "https://keystone.prod/v3", "bob", "pw"))
            .unwrap();

        let args = CredentialArgs {
            os_auth_url: Some("https://keystone.dev/v3".into()),
            os_username: Some("alice".into()),
            ..Default::default()
        };
        let Credentials::Keystone(profile) =
            resolve_credentials(&args, Some("prod"), || Ok(manager)).unwrap()
        else {
            panic!("expected keystone credentials");
        };
        assert_eq!(profile.auth_url, "https://keystone.prod/v3");
        assert_eq!(profile.username, "bob");
    }

    #[test]
    fn test_missing_profile() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ProfileManager::with_config_manager(ConfigManager::with_path(
            dir.path().join("config.toml"),
        ));
        let result = resolve_credentials(&CredentialArgs::default(), Some("nope"), || Ok(manager));
        assert!(matches!(result, Err(Error::ProfileNotFound(_))));
    }

    #[test]
    fn test_no_credentials() {
        let args = CredentialArgs {
            os_auth_token: Some("tok".into()),
            os_storage_url: Some("  ".into()),
            ..Default::default()
        };
        let result = resolve_credentials(&args, None, no_profiles);
        assert!(matches!(result, Err(Error::Auth(_))));
    }

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from([
            "swc",
            "list",
            "photos",
            "--json",
            "--os-auth-token",
            "tok",
            "--os-storage-url",
            "https://swift/v1/AUTH_a",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.credentials.os_auth_token.as_deref(), Some("tok"));
        assert!(matches!(cli.command, Commands::List(_)));
    }
}
