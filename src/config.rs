use dirs::home_dir;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Environment switch that replaces both external services with in-process
/// mocks. Mock mode needs no credentials.
pub const MOCK_ENV: &str = "BIRDSONG_USE_MOCK";

const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
const TWITTER_API_KEY: &str = "TWITTER_API_KEY";
const TWITTER_API_SECRET: &str = "TWITTER_API_SECRET";
const TWITTER_ACCESS_TOKEN: &str = "TWITTER_ACCESS_TOKEN";
const TWITTER_ACCESS_SECRET: &str = "TWITTER_ACCESS_SECRET";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<String>),
    #[error("could not read config file: {0}")]
    File(String),
    #[error("could not parse config file: {0}")]
    Parse(String),
    #[error("could not find home directory")]
    NoHomeDir,
}

/// The four posting-service secrets, used as a set by the OAuth signer.
#[derive(Clone)]
pub struct TwitterKeys {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_secret: String,
}

/// Secret material loaded once at process start. Immutable for the lifetime
/// of the run. Deliberately no `Debug` derive so the values cannot end up in
/// log lines by accident.
pub struct Credentials {
    pub anthropic_api_key: String,
    pub twitter: TwitterKeys,
}

/// Raw shape of `~/.birdsong/config.toml`. Every field is optional; the
/// environment takes precedence over anything found here.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    #[serde(default)]
    anthropic_api_key: Option<String>,
    #[serde(default)]
    twitter_api_key: Option<String>,
    #[serde(default)]
    twitter_api_secret: Option<String>,
    #[serde(default)]
    twitter_access_token: Option<String>,
    #[serde(default)]
    twitter_access_secret: Option<String>,
    #[serde(default)]
    use_mock: bool,
}

pub struct Config {
    use_mock: bool,
    credentials: Option<Credentials>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("use_mock", &self.use_mock)
            .field("credentials", &self.credentials.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Config {
    /// Load configuration from the config file and the environment.
    ///
    /// Outside mock mode every credential must be present; missing ones fail
    /// fast here, before any network call, with each absent name listed.
    pub fn load() -> Result<Self, ConfigError> {
        let file = Self::load_file_settings()?;
        Self::from_sources(file, |name| std::env::var(name).ok())
    }

    fn load_file_settings() -> Result<FileSettings, ConfigError> {
        let Ok(path) = Self::config_path() else {
            // No home directory: the environment is the only source.
            return Ok(FileSettings::default());
        };
        if !path.exists() {
            info!("No config file at {}, using environment only", path.display());
            return Ok(FileSettings::default());
        }
        let settings = Self::read_file_settings(&path)?;
        info!("Loaded config from {}", path.display());
        Ok(settings)
    }

    fn read_file_settings(path: &Path) -> Result<FileSettings, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::File(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Resolve settings from a parsed file and an environment lookup. The
    /// lookup is injected so tests never touch process-global variables.
    fn from_sources(
        file: FileSettings,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let use_mock = file.use_mock || env(MOCK_ENV).is_some();
        if use_mock {
            return Ok(Self {
                use_mock: true,
                credentials: None,
            });
        }

        let anthropic_api_key = env(ANTHROPIC_API_KEY).or(file.anthropic_api_key);
        let api_key = env(TWITTER_API_KEY).or(file.twitter_api_key);
        let api_secret = env(TWITTER_API_SECRET).or(file.twitter_api_secret);
        let access_token = env(TWITTER_ACCESS_TOKEN).or(file.twitter_access_token);
        let access_secret = env(TWITTER_ACCESS_SECRET).or(file.twitter_access_secret);

        let mut missing = Vec::new();
        for (name, value) in [
            (ANTHROPIC_API_KEY, &anthropic_api_key),
            (TWITTER_API_KEY, &api_key),
            (TWITTER_API_SECRET, &api_secret),
            (TWITTER_ACCESS_TOKEN, &access_token),
            (TWITTER_ACCESS_SECRET, &access_secret),
        ] {
            if value.is_none() {
                missing.push(name.to_string());
            }
        }
        if !missing.is_empty() {
            return Err(ConfigError::MissingCredentials(missing));
        }

        // All five are present past the check above.
        let credentials = Credentials {
            anthropic_api_key: anthropic_api_key.unwrap_or_default(),
            twitter: TwitterKeys {
                api_key: api_key.unwrap_or_default(),
                api_secret: api_secret.unwrap_or_default(),
                access_token: access_token.unwrap_or_default(),
                access_secret: access_secret.unwrap_or_default(),
            },
        };
        Ok(Self {
            use_mock: false,
            credentials: Some(credentials),
        })
    }

    /// The loaded secrets, or `None` in mock mode.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn is_mock_mode(&self) -> bool {
        self.use_mock
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let home = home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".birdsong").join("config.toml"))
    }

    /// Print where configuration comes from and which credentials are set.
    /// Secret values themselves are never printed.
    pub fn show_config_info() -> Result<(), ConfigError> {
        let path = Self::config_path()?;
        println!("Configuration file: {}", path.display());
        println!(
            "Status: {}",
            if path.exists() { "Found" } else { "Not found" }
        );

        let file = Self::load_file_settings()?;
        let env = |name: &str| std::env::var(name).ok();
        let entries = [
            (ANTHROPIC_API_KEY, env(ANTHROPIC_API_KEY).or(file.anthropic_api_key)),
            (TWITTER_API_KEY, env(TWITTER_API_KEY).or(file.twitter_api_key)),
            (TWITTER_API_SECRET, env(TWITTER_API_SECRET).or(file.twitter_api_secret)),
            (TWITTER_ACCESS_TOKEN, env(TWITTER_ACCESS_TOKEN).or(file.twitter_access_token)),
            (TWITTER_ACCESS_SECRET, env(TWITTER_ACCESS_SECRET).or(file.twitter_access_secret)),
        ];
        println!();
        for (name, value) in entries {
            println!("{}: {}", name, if value.is_some() { "Set" } else { "Not set" });
        }
        println!("Mock mode: {}", file.use_mock || env(MOCK_ENV).is_some());

        println!("\nCredentials can be set as environment variables, or in the");
        println!("config file using the same names in lowercase.");
        Ok(())
    }
}
