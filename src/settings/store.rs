use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::{from_str, to_string_pretty};
use std::{fs, path::PathBuf};
use tracing::warn;

use crate::settings::consts::{
    APP_NAME, APP_ORGANIZATION, APP_QUALIFIER, ENV_EMAILS, ENV_EMAIL_PORT, ENV_EMAIL_SENDER,
    ENV_EMAIL_SERVER, ENV_LOGIN, ENV_PASSWORD, SETTINGS_FILE,
};

#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Settings {
    #[serde(rename = "login")]
    pub login: Option<String>,
    #[serde(rename = "password")]
    pub password: Option<String>,
    #[serde(rename = "emailServer")]
    pub email_server: Option<String>,
    #[serde(rename = "emailPort")]
    pub email_port: Option<u16>,
    #[serde(rename = "emailSender")]
    pub email_sender: Option<String>,
    /// Comma separated recipient list
    #[serde(rename = "emails")]
    pub emails: Option<String>,
    #[serde(rename = "outputDir")]
    pub output_dir: Option<PathBuf>,
    /// Alternate kiosk root, mostly useful against a staging site
    #[serde(rename = "kioskUrl", skip_serializing_if = "Option::is_none")]
    pub kiosk_url: Option<String>,
}

impl Settings {
    /// Overlay the `BRAND_*` variables on top of the stored settings.
    ///
    /// `lookup` is usually `|key| std::env::var(key).ok()`. Empty values are ignored.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(login) = var(ENV_LOGIN) {
            self.login = Some(login);
        }
        if let Some(password) = var(ENV_PASSWORD) {
            self.password = Some(password);
        }
        if let Some(server) = var(ENV_EMAIL_SERVER) {
            self.email_server = Some(server);
        }
        if let Some(port) = var(ENV_EMAIL_PORT) {
            match port.trim().parse() {
                Ok(port) => self.email_port = Some(port),
                Err(_) => warn!("Ignoring {}={}, not a port number", ENV_EMAIL_PORT, port),
            }
        }
        if let Some(sender) = var(ENV_EMAIL_SENDER) {
            self.email_sender = Some(sender);
        }
        if let Some(emails) = var(ENV_EMAILS) {
            self.emails = Some(emails);
        }
        self
    }
}

pub trait SettingsStore {
    fn load(&self) -> Result<Settings>;
    fn save(&self, settings: &Settings) -> Result<()>;
}

pub struct FileSettingsStore {
    directory: PathBuf, // platform config directory (from ProjectDirs)
    file: &'static str, // "settings.json"
}

impl FileSettingsStore {
    /// Build from ProjectDirs config directory:
    ///   - Windows:   %APPDATA%\brandeins\kiosk-cli\config\settings.json
    ///   - macOS:     ~/Library/Application Support/de.brandeins.kiosk-cli/settings.json
    ///   - Linux:     ~/.config/kiosk-cli/settings.json
    pub fn new() -> Result<Self> {
        let project_dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .ok_or_else(|| anyhow!("Could not determine project directories"))?;

        Ok(Self::with_directory(project_dirs.config_dir().to_path_buf()))
    }

    pub fn with_directory(directory: PathBuf) -> Self {
        Self {
            directory,
            file: SETTINGS_FILE,
        }
    }

    fn path(&self) -> PathBuf {
        self.directory.join(self.file)
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<Settings> {
        fs::create_dir_all(&self.directory).with_context(|| {
            format!(
                "Failed to create settings directory: {}",
                self.directory.display()
            )
        })?;
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => {
                let defaults = Settings::default();
                self.save(&defaults)?;
                return Ok(defaults);
            }
        };
        from_str(&content)
            .with_context(|| format!("Failed to deserialize settings: {}", path.display()))
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        fs::create_dir_all(&self.directory).with_context(|| {
            format!(
                "Failed to create settings directory: {}",
                self.directory.display()
            )
        })?;
        fs::write(self.path(), to_string_pretty(settings)?)
            .with_context(|| format!("Failed to persist settings file: {}", self.path().display()))
    }
}

/// Settings file given explicitly with `--credentials`. Must exist.
pub struct JsonFileSettingsStore {
    path: PathBuf,
}

impl JsonFileSettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SettingsStore for JsonFileSettingsStore {
    fn load(&self) -> Result<Settings> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings file: {}", self.path.display()))?;
        from_str(&content).context("Failed to deserialize settings")
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        fs::write(&self.path, to_string_pretty(settings)?)
            .with_context(|| format!("Failed to persist settings file: {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_creates_defaults() {
        let dir = TempDir::new().unwrap();
        let store = FileSettingsStore::with_directory(dir.path().join("kiosk-cli"));

        let settings = store.load().unwrap();
        assert_eq!(settings, Settings::default());
        assert!(dir.path().join("kiosk-cli/settings.json").exists());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileSettingsStore::with_directory(dir.path().to_path_buf());
        let settings = Settings {
            login: Some("reader@example.org".to_string()),
            email_server: Some("mail.example.org".to_string()),
            email_port: Some(2525),
            emails: Some("a@example.org,b@example.org".to_string()),
            ..Default::default()
        };

        store.save(&settings).unwrap();
        assert_eq!(store.load().unwrap(), settings);
    }

    #[test]
    fn test_json_store_reads_camel_case_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(
            &path,
            r#"{"login": "reader@example.org", "password": "hunter2", "emailSender": "kiosk@example.org", "outputDir": "/srv/issues"}"#,
        )
        .unwrap();

        let settings = JsonFileSettingsStore::new(path).load().unwrap();
        assert_eq!(settings.login.as_deref(), Some("reader@example.org"));
        assert_eq!(settings.password.as_deref(), Some("hunter2"));
        assert_eq!(settings.email_sender.as_deref(), Some("kiosk@example.org"));
        assert_eq!(settings.output_dir, Some(PathBuf::from("/srv/issues")));
        assert_eq!(settings.email_server, None);
    }

    #[test]
    fn test_json_store_requires_file() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileSettingsStore::new(dir.path().join("missing.json"));
        assert!(store.load().is_err());
    }

    #[test]
    fn test_env_overrides_stored_settings() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("BRAND_LOGIN", "env@example.org"),
            ("BRAND_PWD", "from-env"),
            ("BRAND_EMAIL_SERVER", "smtp.example.org"),
            ("BRAND_EMAIL_PORT", "587"),
            ("BRAND_EMAILS", ""),
        ]);
        let stored = Settings {
            login: Some("file@example.org".to_string()),
            emails: Some("a@example.org".to_string()),
            email_sender: Some("kiosk@example.org".to_string()),
            ..Default::default()
        };

        let settings = stored.with_env(|key| env.get(key).map(|value| value.to_string()));
        assert_eq!(settings.login.as_deref(), Some("env@example.org"));
        assert_eq!(settings.password.as_deref(), Some("from-env"));
        assert_eq!(settings.email_server.as_deref(), Some("smtp.example.org"));
        assert_eq!(settings.email_port, Some(587));
        assert_eq!(settings.email_sender.as_deref(), Some("kiosk@example.org"));
        assert_eq!(settings.emails.as_deref(), Some("a@example.org"));
    }

    #[test]
    fn test_env_ignores_bad_port() {
        let settings = Settings::default().with_env(|key| match key {
            "BRAND_EMAIL_PORT" => Some("smtp".to_string()),
            _ => None,
        });
        assert_eq!(settings.email_port, None);
    }
}
