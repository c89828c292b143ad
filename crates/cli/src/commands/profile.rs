//! Profile management commands
//!
//! Profiles are named Keystone credential sets stored in the config file and
//! selected with `--profile NAME` or `SWC_PROFILE`.

use clap::Subcommand;
use serde::Serialize;
use swc_core::{Error, Profile, ProfileManager, Result};

use super::Context;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Profile subcommands for managing saved credentials
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Add or update a profile
    Set(SetArgs),

    /// List all saved profiles
    List(ListArgs),

    /// Remove a profile
    Remove(RemoveArgs),
}

/// Arguments for the `profile set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Profile name (letters, digits, '_' or '-')
    pub name: String,

    /// Identity service URL, e.g. https://keystone.example.org/v3
    #[arg(long)]
    pub auth_url: String,

    /// User name
    #[arg(long)]
    pub username: String,

    /// User password
    #[arg(long)]
    pub password: String,

    /// Project to scope the token to
    #[arg(long, default_value = "")]
    pub project_name: String,

    #[arg(long)]
    pub user_domain_name: Option<String>,

    #[arg(long)]
    pub user_domain_id: Option<String>,

    #[arg(long)]
    pub project_domain_name: Option<String>,

    #[arg(long)]
    pub project_domain_id: Option<String>,

    /// Storage URL to use instead of the one in the service catalog
    #[arg(long)]
    pub storage_url: Option<String>,

    /// Replace an existing profile with the same name
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the `profile list` command
#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show user, project and storage URL
    #[arg(short, long)]
    pub long: bool,
}

/// Arguments for the `profile remove` command
#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Name of the profile to remove
    pub name: String,
}

/// Profile information for output (without the password)
#[derive(Debug, Serialize, PartialEq, Eq)]
struct ProfileInfo {
    name: String,
    auth_url: String,
    username: String,
    project_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage_url: Option<String>,
}

impl From<&Profile> for ProfileInfo {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            auth_url: profile.auth_url.clone(),
            username: profile.username.clone(),
            project_name: profile.project_name.clone(),
            storage_url: profile.storage_url.clone(),
        }
    }
}

#[derive(Serialize)]
struct ProfileListOutput {
    profiles: Vec<ProfileInfo>,
}

#[derive(Serialize)]
struct ProfileOperationOutput {
    success: bool,
    profile: String,
    message: String,
}

/// Execute a profile subcommand
pub fn execute(cmd: ProfileCommands, ctx: &Context) -> ExitCode {
    match ProfileManager::new() {
        Ok(manager) => run(cmd, &manager, &ctx.formatter),
        Err(e) => ctx.fail(&e),
    }
}

fn run(cmd: ProfileCommands, manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    let result = match cmd {
        ProfileCommands::Set(args) => set(args, manager, formatter),
        ProfileCommands::List(args) => list(&args, manager, formatter),
        ProfileCommands::Remove(args) => remove(&args.name, manager, formatter),
    };

    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::from(&e)
        }
    }
}

fn set(args: SetArgs, manager: &ProfileManager, formatter: &Formatter) -> Result<()> {
    if args.auth_url.trim().is_empty() {
        return Err(Error::Config("Identity URL cannot be empty".into()));
    }
    if !args.force && manager.exists(&args.name)? {
        return Err(Error::ProfileExists(args.name));
    }

    let name = args.name.clone();
    let mut profile = Profile::new(args.name, args.auth_url, args.username, args.password);
    profile.project_name = args.project_name;
    profile.user_domain_name = args.user_domain_name;
    profile.user_domain_id = args.user_domain_id;
    profile.project_domain_name = args.project_domain_name;
    profile.project_domain_id = args.project_domain_id;
    profile.storage_url = args.storage_url;
    manager.set(profile)?;

    report(formatter, name, "saved");
    Ok(())
}

fn list(args: &ListArgs, manager: &ProfileManager, formatter: &Formatter) -> Result<()> {
    let profiles = manager.list()?;

    if formatter.is_json() {
        formatter.json(&ProfileListOutput {
            profiles: profiles.iter().map(ProfileInfo::from).collect(),
        });
    } else if profiles.is_empty() {
        formatter.println("No profiles configured.");
    } else {
        for profile in &profiles {
            if args.long {
                formatter.println(&format!(
                    "{:<12} {} (user: {}, project: {}{})",
                    profile.name,
                    profile.auth_url,
                    profile.username,
                    profile.project_name,
                    profile
                        .storage_url
                        .as_deref()
                        .map(|u| format!(", storage: {u}"))
                        .unwrap_or_default()
                ));
            } else {
                formatter.println(&format!("{:<12} {}", profile.name, profile.auth_url));
            }
        }
    }
    Ok(())
}

fn remove(name: &str, manager: &ProfileManager, formatter: &Formatter) -> Result<()> {
    manager.remove(name)?;
    report(formatter, name.to_string(), "removed");
    Ok(())
}

fn report(formatter: &Formatter, profile: String, action: &str) {
    let message = format!("Profile '{profile}' {action}");
    if formatter.is_json() {
        formatter.json(&ProfileOperationOutput {
            success: true,
            profile,
            message,
        });
    } else {
        formatter.success(&message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_core::ConfigManager;
    use tempfile::TempDir;

    fn temp_manager() -> (TempDir, ProfileManager) {
        let dir = TempDir::new().unwrap();
        let manager = ProfileManager::with_config_manager(ConfigManager::with_path(
            dir.path().join("config.toml"),
        ));
        (dir, manager)
    }

    fn set_args(name: &str) -> SetArgs {
        SetArgs {
            name: name.to_string(),
            auth_url: "https://keystone.example.org/v3".to_string(),
            username: "alice".to_string(),
            password: "secret".to_string(),
            project_name: "science".to_string(),
            user_domain_name: None,
            user_domain_id: Some("default".to_string()),
            project_domain_name: None,
            project_domain_id: None,
            storage_url: None,
            force: false,
        }
    }

    fn quiet() -> Formatter {
        Formatter::new(crate::output::OutputConfig {
            quiet: true,
            ..Default::default()
        })
    }

    #[test]
    fn test_set_and_list() {
        let (_dir, manager) = temp_manager();
        let code = run(ProfileCommands::Set(set_args("prod")), &manager, &quiet());
        assert_eq!(code, ExitCode::Success);

        let saved = manager.get("prod").unwrap();
        assert_eq!(saved.username, "alice");
        assert_eq!(saved.user_domain_id.as_deref(), Some("default"));

        let code = run(ProfileCommands::List(ListArgs { long: true }), &manager, &quiet());
        assert_eq!(code, ExitCode::Success);
    }

    #[test]
    fn test_set_existing_needs_force() {
        let (_dir, manager) = temp_manager();
        run(ProfileCommands::Set(set_args("prod")), &manager, &quiet());

        let code = run(ProfileCommands::Set(set_args("prod")), &manager, &quiet());
        assert_eq!(code, ExitCode::Conflict);

        let mut args = set_args("prod");
        args.username = "bob".to_string();
        args.force = true;
        let code = run(ProfileCommands::Set(args), &manager, &quiet());
        assert_eq!(code, ExitCode::Success);
        assert_eq!(manager.get("prod").unwrap().username, "bob");
    }

    #[test]
    fn test_set_invalid_name() {
        let (_dir, manager) = temp_manager();
        let code = run(ProfileCommands::Set(set_args("bad name")), &manager, &quiet());
        assert_eq!(code, ExitCode::UsageError);
    }

    #[test]
    fn test_remove_missing_profile() {
        let (_dir, manager) = temp_manager();
        let code = run(
            ProfileCommands::Remove(RemoveArgs {
                name: "ghost".to_string(),
            }),
            &manager,
            &quiet(),
        );
        assert_eq!(code, ExitCode::NotFound);
    }

    #[test]
    fn test_profile_info_hides_password() {
        let profile = Profile::new("p", "https://k/v3", "u", "hunter2");
        let json = serde_json::to_string(&ProfileInfo::from(&profile)).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("\"username\":\"u\""));
    }
}
