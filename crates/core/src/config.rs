//! Mixer integration settings and the JSON file they persist to.

use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::MixerError;
use crate::mapping::HardwareVariant;

/// Console OSC command port.
pub const DEFAULT_CONSOLE_PORT: u16 = 2223;

/// Mixer integration settings as stored by the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MixerSettings {
    pub mixer_integration_enabled: bool,
    pub mixer_type: HardwareVariant,
    pub target_ip_address: Option<String>,
    pub target_port: u16,
    /// Overrides the variant's default listen port. 0 binds an ephemeral port.
    pub listen_port: Option<u16>,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            mixer_integration_enabled: false,
            mixer_type: HardwareVariant::Compact,
            target_ip_address: None,
            target_port: DEFAULT_CONSOLE_PORT,
            listen_port: None,
        }
    }
}

/// Everything a console link needs to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    pub variant: HardwareVariant,
    pub target: SocketAddr,
    pub listen_port: u16,
}

impl MixerSettings {
    /// Turn settings into a link configuration.
    ///
    /// Disabled settings, or enabled settings without a target address,
    /// resolve to `None`. A target address that isn't an IP address is a
    /// configuration error.
    pub fn resolve(&self) -> Result<Option<LinkConfig>, MixerError> {
        if !self.mixer_integration_enabled {
            return Ok(None);
        }
        let Some(ip) = self
            .target_ip_address
            .as_deref()
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
        else {
            return Ok(None);
        };

        let ip: IpAddr = ip.parse().map_err(|_| {
            MixerError::Configuration(format!("'{}' is not a valid IP address", ip))
        })?;
        if self.target_port == 0 {
            return Err(MixerError::Configuration(
                "target port must not be 0".to_string(),
            ));
        }

        Ok(Some(LinkConfig {
            variant: self.mixer_type,
            target: SocketAddr::new(ip, self.target_port),
            listen_port: self
                .listen_port
                .unwrap_or_else(|| self.mixer_type.default_listen_port()),
        }))
    }
}

/// Configuration manager for the mixer settings file.
///
/// Settings are stored as pretty-printed JSON inside a versioned envelope,
/// by default under the user's config directory.
pub struct SettingsStore {
    path: PathBuf,
    settings: MixerSettings,
    created_at: Option<String>,
}

/// Available configuration options with validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsSchema {
    pub mixer_integration_enabled: ConfigOption<bool>,
    pub mixer_type: ConfigOption<String>,
    pub target_ip_address: ConfigOption<String>,
    pub target_port: ConfigOption<u16>,
    pub listen_port: ConfigOption<u16>,
}

/// Configuration option with validation and available choices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOption<T> {
    pub default: T,
    pub valid_range: Option<(T, T)>,
    pub valid_choices: Option<Vec<T>>,
    pub description: String,
    pub requires_restart: bool,
}

/// Persisted settings file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsFile {
    pub version: String,
    pub settings: MixerSettings,
    pub created_at: String,
    pub modified_at: String,
}

impl SettingsStore {
    /// Create a store for `path`, or the default location when `None`.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path: path.unwrap_or_else(Self::default_path),
            settings: MixerSettings::default(),
            created_at: None,
        }
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cuebridge")
            .join("settings.json")
    }

    /// Load settings, writing a default file first if none exists.
    pub fn load(&mut self) -> Result<MixerSettings, ConfigError> {
        if !self.path.exists() {
            self.save()?;
            return Ok(self.settings.clone());
        }

        let content =
            fs::read_to_string(&self.path).map_err(|e| ConfigError::Read(e.to_string()))?;
        let file: SettingsFile =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        if file.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "Settings file version {} doesn't match {}, missing fields use defaults",
                file.version,
                env!("CARGO_PKG_VERSION")
            );
        }

        self.settings = file.settings;
        self.created_at = Some(file.created_at);
        Ok(self.settings.clone())
    }

    pub fn save(&mut self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            if parent != Path::new("") && parent != Path::new(".") {
                fs::create_dir_all(parent).map_err(|e| ConfigError::Write(e.to_string()))?;
            }
        }

        let now = chrono::Utc::now().to_rfc3339();
        let created_at = self.created_at.get_or_insert_with(|| now.clone()).clone();
        let file = SettingsFile {
            version: env!("CARGO_PKG_VERSION").to_string(),
            settings: self.settings.clone(),
            created_at,
            modified_at: now,
        };

        let content = serde_json::to_string_pretty(&file)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        fs::write(&self.path, content).map_err(|e| ConfigError::Write(e.to_string()))?;
        log::debug!("Saved mixer settings to {}", self.path.display());
        Ok(())
    }

    /// Validate, replace and persist settings.
    pub fn update_settings(&mut self, settings: MixerSettings) -> Result<(), ConfigError> {
        Self::validate_settings(&settings).map_err(ConfigError::Validation)?;
        self.settings = settings;
        self.save()
    }

    pub fn settings(&self) -> &MixerSettings {
        &self.settings
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema() -> SettingsSchema {
        SettingsSchema {
            mixer_integration_enabled: ConfigOption {
                default: false,
                valid_range: None,
                valid_choices: None,
                description: "Control soundboard cues from mixer user buttons".to_string(),
                requires_restart: false,
            },
            mixer_type: ConfigOption {
                default: HardwareVariant::Compact.as_str().to_string(),
                valid_range: None,
                valid_choices: Some(vec![
                    HardwareVariant::Compact.as_str().to_string(),
                    HardwareVariant::Full.as_str().to_string(),
                ]),
                description: "Mixer model family".to_string(),
                requires_restart: false,
            },
            target_ip_address: ConfigOption {
                default: String::new(),
                valid_range: None,
                valid_choices: None,
                description: "IP address of the mixer".to_string(),
                requires_restart: false,
            },
            target_port: ConfigOption {
                default: DEFAULT_CONSOLE_PORT,
                valid_range: Some((1, 65535)),
                valid_choices: None,
                description: "Mixer OSC command port".to_string(),
                requires_restart: false,
            },
            listen_port: ConfigOption {
                default: HardwareVariant::Compact.default_listen_port(),
                valid_range: Some((1024, 65535)),
                valid_choices: None,
                description: "Local port the mixer streams button state to (0 = any)"
                    .to_string(),
                requires_restart: false,
            },
        }
    }

    /// Validate settings against the schema, collecting every violation.
    pub fn validate_settings(settings: &MixerSettings) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let schema = Self::schema();

        if let Some((min, max)) = schema.target_port.valid_range {
            if settings.target_port < min || settings.target_port > max {
                errors.push(format!("targetPort must be between {} and {}", min, max));
            }
        }

        if let (Some((min, max)), Some(port)) = (schema.listen_port.valid_range, settings.listen_port)
        {
            if port != 0 && (port < min || port > max) {
                errors.push(format!(
                    "listenPort must be 0 or between {} and {}",
                    min, max
                ));
            }
        }

        if let Some(ip) = settings.target_ip_address.as_deref().map(str::trim) {
            if !ip.is_empty() && ip.parse::<IpAddr>().is_err() {
                errors.push(format!("targetIpAddress '{}' is not a valid IP address", ip));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.settings = MixerSettings::default();
        self.save()
    }
}

/// Settings file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file: {0}")]
    Read(String),
    #[error("Failed to write settings file: {0}")]
    Write(String),
    #[error("Failed to parse settings file: {0}")]
    Parse(String),
    #[error("Failed to serialize settings: {0}")]
    Serialize(String),
    #[error("Settings validation errors: {}", .0.join(", "))]
    Validation(Vec<String>),
}
