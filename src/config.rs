use crate::core::input::DEFAULT_KEY_BINDINGS;
use crate::game::judgment::{AccuracySettings, AccuracyWindow};
use configparser::ini::Ini;
use log::{info, warn};
use std::error::Error;
use std::fmt;
use std::io;
use std::path::Path;

pub const CONFIG_PATH: &str = "stepsync.ini";

const GAMEPLAY: &str = "Gameplay";
const KEYBINDINGS: &str = "Keybindings";

// Time the first note needs on screen before it reaches the receptors.
pub const DEFAULT_LEAD_IN_MS: f64 = 1000.0;

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Ini(String),
    Json(serde_json::Error),
    InvalidAccuracySettings(String),
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Json(err)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO Error: {}", e),
            ConfigError::Ini(e) => write!(f, "Malformed config file: {}", e),
            ConfigError::Json(e) => write!(f, "Malformed accuracy settings JSON: {}", e),
            ConfigError::InvalidAccuracySettings(msg) => write!(f, "Invalid accuracy settings: {}", msg),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Json(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub accuracy_settings: AccuracySettings,
    pub additional_offset_sec: f64,
    /// `None` means "pick a pause so the first note starts outside its window".
    pub pause_at_start_sec: Option<f64>,
    pub lead_in_sec: f64,
    /// Key name per track, in track order.
    pub key_bindings: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            accuracy_settings: AccuracySettings::default(),
            additional_offset_sec: 0.0,
            pause_at_start_sec: None,
            lead_in_sec: DEFAULT_LEAD_IN_MS / 1000.0,
            key_bindings: DEFAULT_KEY_BINDINGS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

fn parse_ms(conf: &Ini, key: &str) -> Option<Option<f64>> {
    let raw = conf.get(GAMEPLAY, key)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(None);
    }
    match raw.parse::<f64>() {
        Ok(ms) if ms.is_finite() => Some(Some(ms / 1000.0)),
        _ => {
            warn!("Invalid value '{}' for {}, using default.", raw, key);
            None
        }
    }
}

pub fn parse_accuracy_settings(json: &str) -> Result<AccuracySettings, ConfigError> {
    let windows: Vec<AccuracyWindow> = serde_json::from_str(json)?;
    AccuracySettings::new(windows)
}

impl Config {
    pub fn from_ini(conf: &Ini) -> Self {
        let mut config = Config::default();

        if let Some(Some(offset)) = parse_ms(conf, "AdditionalOffsetMs") {
            config.additional_offset_sec = offset;
        }
        if let Some(pause) = parse_ms(conf, "PauseAtStartMs") {
            config.pause_at_start_sec = pause.map(|p| p.max(0.0));
        }
        if let Some(Some(lead_in)) = parse_ms(conf, "LeadInMs") {
            config.lead_in_sec = lead_in.max(0.0);
        }
        if let Some(json) = conf.get(GAMEPLAY, "AccuracySettings") {
            match parse_accuracy_settings(&json) {
                Ok(settings) => config.accuracy_settings = settings,
                Err(e) => warn!("{}; using default accuracy settings.", e),
            }
        }

        let keys: Vec<String> = (0..)
            .map_while(|track| conf.get(KEYBINDINGS, &format!("Track{}", track)))
            .map(|k| k.trim().to_string())
            .collect();
        if keys.iter().any(String::is_empty) {
            warn!("Empty key binding in [{}], using default bindings.", KEYBINDINGS);
        } else if !keys.is_empty() {
            config.key_bindings = keys;
        }

        config
    }

    pub fn to_ini(&self) -> Result<Ini, ConfigError> {
        let mut conf = Ini::new();
        let ms = |sec: f64| Some(format!("{}", sec * 1000.0));
        conf.set(GAMEPLAY, "AdditionalOffsetMs", ms(self.additional_offset_sec));
        conf.set(
            GAMEPLAY,
            "PauseAtStartMs",
            Some(self.pause_at_start_sec.map_or(String::new(), |p| format!("{}", p * 1000.0))),
        );
        conf.set(GAMEPLAY, "LeadInMs", ms(self.lead_in_sec));
        conf.set(
            GAMEPLAY,
            "AccuracySettings",
            Some(serde_json::to_string(self.accuracy_settings.windows())?),
        );
        for (track, key) in self.key_bindings.iter().enumerate() {
            conf.set(KEYBINDINGS, &format!("Track{}", track), Some(key.clone()));
        }
        Ok(conf)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.to_ini()?.write(path)?;
        Ok(())
    }

    /// Reads the config at `path`. A missing file is created with defaults; an unreadable one
    /// falls back to defaults.
    pub fn load(path: &Path) -> Config {
        if !path.exists() {
            info!("Config file '{}' not found, creating defaults.", path.display());
            let config = Config::default();
            if let Err(e) = config.save(path) {
                warn!("Failed to write default config: {}", e);
            }
            return config;
        }

        let mut conf = Ini::new();
        match conf.load(path) {
            Ok(_) => {
                let config = Config::from_ini(&conf);
                info!(
                    "Loaded config from '{}' ({} accuracy bands, {} key bindings).",
                    path.display(),
                    config.accuracy_settings.windows().len(),
                    config.key_bindings.len()
                );
                config
            }
            Err(e) => {
                warn!("Failed to load '{}': {}", path.display(), ConfigError::Ini(e));
                Config::default()
            }
        }
    }
}
