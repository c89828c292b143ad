//! Profile management
//!
//! Profiles are named Keystone credential sets, so that `--profile NAME`
//! can stand in for the full list of `--os-*` flags.

use serde::{Deserialize, Serialize};

use crate::config::ConfigManager;
use crate::error::{Error, Result};

/// A named set of identity-service credentials
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// Unique name for this profile
    pub name: String,

    /// Identity service URL, e.g. https://keystone.example.org/v3
    pub auth_url: String,

    /// User name
    pub username: String,

    /// User password
    pub password: String,

    /// Project to scope the token to
    #[serde(default)]
    pub project_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_domain_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_domain_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_domain_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_domain_id: Option<String>,

    /// Storage URL overriding the one found in the service catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_url: Option<String>,
}

impl Profile {
    /// Create a new profile with required fields
    pub fn new(
        name: impl Into<String>,
        auth_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            auth_url: auth_url.into(),
            username: username.into(),
            password: password.into(),
            project_name: String::new(),
            user_domain_name: None,
            user_domain_id: None,
            project_domain_name: None,
            project_domain_id: None,
            storage_url: None,
        }
    }
}

/// Manager for profile operations
pub struct ProfileManager {
    config_manager: ConfigManager,
}

impl ProfileManager {
    /// Create a new ProfileManager with a specific ConfigManager
    pub fn with_config_manager(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// Create a new ProfileManager using the default config location
    pub fn new() -> Result<Self> {
        let config_manager = ConfigManager::new()?;
        Ok(Self { config_manager })
    }

    /// List all configured profiles
    pub fn list(&self) -> Result<Vec<Profile>> {
        let config = self.config_manager.load()?;
        Ok(config.profiles)
    }

    /// Get a profile by name
    pub fn get(&self, name: &str) -> Result<Profile> {
        let config = self.config_manager.load()?;
        config
            .profiles
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::ProfileNotFound(name.to_string()))
    }

    /// Add or replace a profile
    pub fn set(&self, profile: Profile) -> Result<()> {
        if !is_valid_profile_name(&profile.name) {
            return Err(Error::Config(format!(
                "Invalid profile name '{}': use letters, digits, '_' or '-'",
                profile.name
            )));
        }

        let mut config = self.config_manager.load()?;
        config.profiles.retain(|p| p.name != profile.name);
        config.profiles.push(profile);

        self.config_manager.save(&config)
    }

    /// Remove a profile
    pub fn remove(&self, name: &str) -> Result<()> {
        let mut config = self.config_manager.load()?;
        let original_len = config.profiles.len();

        config.profiles.retain(|p| p.name != name);

        if config.profiles.len() == original_len {
            return Err(Error::ProfileNotFound(name.to_string()));
        }

        self.config_manager.save(&config)
    }

    /// Check if a profile exists
    pub fn exists(&self, name: &str) -> Result<bool> {
        let config = self.config_manager.load()?;
        Ok(config.profiles.iter().any(|p| p.name == name))
    }
}

fn is_valid_profile_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_profile_manager() -> (ProfileManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let config_manager = ConfigManager::with_path(config_path);
        (ProfileManager::with_config_manager(config_manager), temp_dir)
    }

    #[test]
    fn test_profile_new() {
        let profile = Profile::new("test", "https://ks/v3", "user", "pass");
        assert_eq!(profile.name, "test");
        assert_eq!(profile.auth_url, "https://ks/v3");
        assert!(profile.project_name.is_empty());
        assert!(profile.storage_url.is_none());
    }

    #[test]
    fn test_set_and_get() {
        let (manager, _temp_dir) = temp_profile_manager();

        let mut profile = Profile::new("lab", "https://ks/v3", "alice", "pw");
        profile.project_name = "genomics".into();
        profile.user_domain_name = Some("Default".into());
        manager.set(profile).unwrap();

        let retrieved = manager.get("lab").unwrap();
        assert_eq!(retrieved.project_name, "genomics");
        assert_eq!(retrieved.user_domain_name.as_deref(), Some("Default"));
    }

    #[test]
    fn test_set_replaces_existing() {
        let (manager, _temp_dir) = temp_profile_manager();

        manager
            .set(Profile::new("lab", "https://old/v3", "a", "b"))
            .unwrap();
        manager
            .set(Profile::new("lab", "https://new/v3", "c", "d"))
            .unwrap();

        let profiles = manager.list().unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].auth_url, "https://new/v3");
    }

    #[test]
    fn test_invalid_name_rejected() {
        let (manager, _temp_dir) = temp_profile_manager();
        let result = manager.set(Profile::new("bad name", "https://ks/v3", "a", "b"));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_remove() {
        let (manager, _temp_dir) = temp_profile_manager();

        manager
            .set(Profile::new("lab", "https://ks/v3", "a", "b"))
            .unwrap();
        assert!(manager.exists("lab").unwrap());

        manager.remove("lab").unwrap();
        assert!(!manager.exists("lab").unwrap());
    }

    #[test]
    fn test_remove_not_found() {
        let (manager, _temp_dir) = temp_profile_manager();
        let result = manager.remove("missing");
        assert!(matches!(result, Err(Error::ProfileNotFound(_))));
    }

    #[test]
    fn test_get_not_found() {
        let (manager, _temp_dir) = temp_profile_manager();
        let result = manager.get("missing");
        assert!(matches!(result, Err(Error::ProfileNotFound(_))));
    }
}
