// Configuration loading and parsing (config/depthchart.toml).

use chrono::{Datelike, Utc};
use depthchart_sources::sleeper::{default_pick_years, SleeperOptions, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = "depthchart.toml";
const DB_FILE: &str = "depthchart.db";

const DEFAULT_HEADER: &str = "\
# Depth chart configuration.
# storage.path: SQLite file; empty means the platform data directory.
# sleeper.season: empty means the current year.
# sleeper.pick_years: empty means the season and the next two.
";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to write default config to {path}: {message}")]
    WriteError { path: PathBuf, message: String },
}

// ---------------------------------------------------------------------------
// depthchart.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub sleeper: SleeperConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file. Empty means `<platform data dir>/depthchart.db`.
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleeperConfig {
    pub base_url: String,
    /// Empty means the current year.
    #[serde(default)]
    pub season: String,
    /// Empty means the season and the next two.
    #[serde(default)]
    pub pick_years: Vec<String>,
    pub players_cache_days: u32,
    pub default_rookie_rounds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
    pub dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: StorageConfig {
                path: String::new(),
            },
            sleeper: SleeperConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                season: String::new(),
                pick_years: Vec::new(),
                players_cache_days: 7,
                default_rookie_rounds: 5,
            },
            logging: LoggingConfig {
                filter: "depthchart=info,warn".to_string(),
                dir: "logs".to_string(),
            },
        }
    }
}

impl Config {
    /// Resolved season (configured or current year).
    pub fn season(&self) -> String {
        if self.sleeper.season.trim().is_empty() {
            Utc::now().year().to_string()
        } else {
            self.sleeper.season.trim().to_string()
        }
    }

    /// Resolved pick years (configured or derived from the season).
    pub fn pick_years(&self) -> Vec<String> {
        if !self.sleeper.pick_years.is_empty() {
            return self.sleeper.pick_years.clone();
        }
        let season = self.season().parse().unwrap_or_else(|_| Utc::now().year());
        default_pick_years(season)
    }

    pub fn sleeper_options(&self) -> SleeperOptions {
        SleeperOptions {
            base_url: self.sleeper.base_url.clone(),
            season: self.season(),
            pick_years: self.pick_years(),
            players_cache_max_age: chrono::Duration::days(i64::from(self.sleeper.players_cache_days)),
            default_rookie_rounds: self.sleeper.default_rookie_rounds,
        }
    }

    /// Database location: the configured path, else the platform data
    /// directory.
    pub fn db_path(&self) -> Result<PathBuf, ConfigError> {
        if !self.storage.path.trim().is_empty() {
            return Ok(PathBuf::from(self.storage.path.trim()));
        }
        let dirs = directories::ProjectDirs::from("", "", "depthchart").ok_or_else(|| {
            ConfigError::ValidationError {
                field: "storage.path".into(),
                message: "no platform data directory available; set a path".into(),
            }
        })?;
        Ok(dirs.data_dir().join(DB_FILE))
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/depthchart.toml` relative to `base_dir`.
///
/// Does not write a default file; prefer `load_config()`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = config_path(base_dir);
    let text = read_file(&path)?;
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    validate(&config)?;
    Ok(config)
}

/// Write `Config::default()` to `config/depthchart.toml` under `base_dir`
/// unless the file already exists. Returns the path when a file was written.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let path = config_path(base_dir);
    let write_err = |message: String| ConfigError::WriteError {
        path: path.clone(),
        message,
    };

    let body = toml::to_string_pretty(&Config::default()).map_err(|e| write_err(e.to_string()))?;
    std::fs::create_dir_all(base_dir.join("config")).map_err(|e| write_err(e.to_string()))?;

    let mut file = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(None),
        Err(e) => return Err(write_err(e.to_string())),
    };
    std::io::Write::write_all(&mut file, format!("{DEFAULT_HEADER}\n{body}").as_bytes())
        .map_err(|e| write_err(e.to_string()))?;
    Ok(Some(path))
}

/// Load config relative to the current working directory, writing the
/// default file first if there is none.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config_path(base_dir: &Path) -> PathBuf {
    base_dir.join("config").join(CONFIG_FILE)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn is_year(s: &str) -> bool {
    s.len() == 4 && s.chars().all(|c| c.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let invalid = |field: &str, message: String| ConfigError::ValidationError {
        field: field.into(),
        message,
    };

    let base = config.sleeper.base_url.trim();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(invalid(
            "sleeper.base_url",
            format!("must be an http(s) URL, got `{base}`"),
        ));
    }

    let season = config.sleeper.season.trim();
    if !season.is_empty() && !is_year(season) {
        return Err(invalid(
            "sleeper.season",
            format!("must be a four-digit year, got `{season}`"),
        ));
    }

    if let Some(bad) = config.sleeper.pick_years.iter().find(|y| !is_year(y)) {
        return Err(invalid(
            "sleeper.pick_years",
            format!("must be four-digit years, got `{bad}`"),
        ));
    }

    if config.sleeper.players_cache_days == 0 {
        return Err(invalid("sleeper.players_cache_days", "must be > 0".into()));
    }

    let rounds = config.sleeper.default_rookie_rounds;
    if !(1..=10).contains(&rounds) {
        return Err(invalid(
            "sleeper.default_rookie_rounds",
            format!("must be between 1 and 10, got {rounds}"),
        ));
    }

    if config.logging.filter.trim().is_empty() {
        return Err(invalid("logging.filter", "must not be empty".into()));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(format!("depthchart_config_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        tmp
    }

    fn write_text(base: &Path, text: &str) {
        fs::create_dir_all(base.join("config")).unwrap();
        fs::write(config_path(base), text).unwrap();
    }

    fn write_config(base: &Path, config: &Config) {
        write_text(base, &toml::to_string(config).unwrap());
    }

    #[test]
    fn first_run_writes_loadable_defaults() {
        let base = scratch("defaults");
        let written = ensure_config_file(&base).unwrap();
        assert_eq!(written, Some(config_path(&base)));
        let text = fs::read_to_string(config_path(&base)).unwrap();
        assert!(text.starts_with("# Depth chart configuration."));

        let config = load_config_from(&base).unwrap();
        assert_eq!(config.sleeper.base_url, "https://api.sleeper.app/v1");
        assert_eq!(config.sleeper.players_cache_days, 7);
        assert_eq!(config.sleeper.default_rookie_rounds, 5);
        assert_eq!(config.logging.filter, "depthchart=info,warn");
        assert_eq!(config.logging.dir, "logs");
        assert!(config.storage.path.is_empty());

        let opts = config.sleeper_options();
        assert_eq!(opts.players_cache_max_age, chrono::Duration::days(7));
        assert_eq!(opts.season, Utc::now().year().to_string());
        assert_eq!(opts.pick_years, default_pick_years(Utc::now().year()));

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn existing_config_is_left_alone() {
        let base = scratch("skip");
        write_text(&base, "custom");
        assert_eq!(ensure_config_file(&base).unwrap(), None);
        assert_eq!(fs::read_to_string(config_path(&base)).unwrap(), "custom");
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn missing_file_is_reported() {
        let tmp = std::env::temp_dir().join(format!("depthchart_config_missing_{}", std::process::id()));
        let _ = fs::remove_dir_all(&tmp);
        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let base = scratch("parse");
        write_text(&base, "[storage\npath = ");
        assert!(matches!(
            load_config_from(&base),
            Err(ConfigError::ParseError { .. })
        ));
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn rejects_bad_values() {
        let cases: [(&str, fn(&mut Config)); 6] = [
            ("sleeper.base_url", |c| c.sleeper.base_url = "ftp://x".into()),
            ("sleeper.season", |c| c.sleeper.season = "26".into()),
            ("sleeper.players_cache_days", |c| c.sleeper.players_cache_days = 0),
            ("sleeper.default_rookie_rounds", |c| c.sleeper.default_rookie_rounds = 11),
            ("sleeper.pick_years", |c| c.sleeper.pick_years = vec!["2026".into(), "next".into()]),
            ("logging.filter", |c| c.logging.filter = String::new()),
        ];
        for (field, break_it) in cases {
            let base = scratch("invalid");
            let mut config = Config::default();
            break_it(&mut config);
            write_config(&base, &config);
            match load_config_from(&base) {
                Err(ConfigError::ValidationError { field: f, .. }) => assert_eq!(f, field),
                other => panic!("expected validation error for {field}, got {other:?}"),
            }
            let _ = fs::remove_dir_all(&base);
        }
    }

    #[test]
    fn empty_pick_years_follow_season() {
        let base = scratch("years");
        let mut config = Config::default();
        config.sleeper.season = "2030".into();
        write_config(&base, &config);
        let config = load_config_from(&base).unwrap();
        assert_eq!(config.pick_years(), vec!["2030", "2031", "2032"]);
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn explicit_storage_path_wins() {
        let base = scratch("storage");
        let mut config = Config::default();
        config.storage.path = "/tmp/x.db".into();
        write_config(&base, &config);
        let config = load_config_from(&base).unwrap();
        assert_eq!(config.db_path().unwrap(), PathBuf::from("/tmp/x.db"));
        let _ = fs::remove_dir_all(&base);
    }
}
