use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
#[cfg(test)]
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

use crate::types::WeekStart;
use crate::utils::get_local_timezone;

pub const DEFAULT_SERVER_URL: &str = "https://gptwrapped.husaria.dev";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub share: ShareConfig,
    pub formatting: FormattingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    /// IANA time zone for calendar dates. Empty means the system zone.
    pub timezone: String,
    pub week_start: WeekStart,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ShareConfig {
    pub server_url: String,
    /// Anonymous id reused across submissions. Generated on first share.
    pub submission_id: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct FormattingConfig {
    pub number_comma: bool,
    pub number_human: bool,
    pub locale: String,
    pub decimal_places: usize,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            submission_id: String::new(),
            timeout_seconds: 30,
        }
    }
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            number_comma: true,
            number_human: false,
            locale: "en".to_string(),
            decimal_places: 1,
        }
    }
}

#[cfg(test)]
thread_local! {
    static TEST_CONFIG_PATH: RefCell<Option<PathBuf>> = const { RefCell::new(None) };
}

#[cfg(test)]
pub fn set_test_config_path(path: PathBuf) {
    TEST_CONFIG_PATH.with(|p| *p.borrow_mut() = Some(path));
}

fn parse_bool(value: &str) -> Result<bool> {
    value
        .parse::<bool>()
        .context("Invalid boolean value. Use 'true' or 'false'")
}

fn new_submission_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        #[cfg(test)]
        {
            if let Some(path) = TEST_CONFIG_PATH.with(|p| p.borrow().clone()) {
                return Ok(path);
            }
        }

        Ok(dirs::home_dir()
            .context("Could not find home directory")?
            .join(".gptwrapped.toml"))
    }

    pub fn load() -> Result<Option<Config>> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        Ok(Some(config))
    }

    /// Load the config file, falling back to defaults when it is absent.
    pub fn load_or_default() -> Result<Config> {
        Ok(Self::load()?.unwrap_or_default())
    }

    pub fn save(&self, silent: bool) -> Result<()> {
        let config_path = Self::config_path()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, content).context("Failed to write config file")?;

        if !silent {
            println!("✅ Configuration saved to: {}", config_path.display());
        }

        Ok(())
    }

    /// Time zone used for calendar dates.
    pub fn timezone(&self) -> Result<Tz> {
        if self.analysis.timezone.is_empty() {
            return Ok(get_local_timezone().parse::<Tz>().unwrap_or(Tz::UTC));
        }
        self.analysis
            .timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Unknown time zone '{}': {e}", self.analysis.timezone))
    }

    /// Return the persistent submission id, creating it on first use.
    /// The boolean is true when a new id was generated and needs saving.
    pub fn ensure_submission_id(&mut self) -> (String, bool) {
        if self.share.submission_id.is_empty() {
            self.share.submission_id = new_submission_id();
            (self.share.submission_id.clone(), true)
        } else {
            (self.share.submission_id.clone(), false)
        }
    }

    pub fn regenerate_submission_id(&mut self) {
        self.share.submission_id = new_submission_id();
    }

    pub fn is_server_url_missing(&self) -> bool {
        self.share.server_url.trim().is_empty()
    }
}

// CLI helper functions
pub fn create_default_config(overwrite: bool) -> Result<()> {
    let config = Config::default();
    if !std::fs::exists(Config::config_path()?)? || overwrite {
        config.save(true)?;

        println!("📝 Created default configuration file.");
        println!("📍 Adjust it with:");
        println!("   gptwrapped config set timezone Europe/Warsaw");
        println!("or edit");
        println!("   {}", Config::config_path()?.display());
    } else {
        println!("Configuration already exists.  Pass `--overwrite` to overwrite.");
    }

    Ok(())
}

pub fn show_config() -> Result<()> {
    match Config::load()? {
        Some(config) => {
            println!("🔧 Current configuration:");
            println!(
                "   Time Zone: {}",
                if config.analysis.timezone.is_empty() {
                    format!("system ({})", get_local_timezone())
                } else {
                    config.analysis.timezone.clone()
                }
            );
            println!("   Week Start: {:?}", config.analysis.week_start);
            println!("   Share Server: {}", config.share.server_url);
            println!(
                "   Submission Id: {}",
                if config.share.submission_id.is_empty() {
                    "Not created yet"
                } else {
                    "Set"
                }
            );
            println!("   Timeout Seconds: {}", config.share.timeout_seconds);
            println!("   Number Comma: {}", config.formatting.number_comma);
            println!("   Number Human: {}", config.formatting.number_human);
            println!("   Locale: {}", config.formatting.locale);
            println!("   Decimal Places: {}", config.formatting.decimal_places);
        }
        None => {
            println!("❌ No configuration file found.");
            println!("   Run 'gptwrapped config init' to create one.");
        }
    }
    Ok(())
}

pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load_or_default()?;

    match key {
        "timezone" => {
            if !value.is_empty() {
                value
                    .parse::<Tz>()
                    .map_err(|e| anyhow::anyhow!("Unknown time zone '{value}': {e}"))?;
            }
            config.analysis.timezone = value.to_string();
        }
        "week-start" => config.analysis.week_start = value.parse()?,
        "server-url" => config.share.server_url = value.trim_end_matches('/').to_string(),
        "timeout-seconds" => {
            config.share.timeout_seconds = value.parse::<u64>().context("Invalid number value")?;
        }
        "submission-id" => {
            if value != "new" {
                anyhow::bail!("submission-id can only be set to 'new', which generates a fresh id");
            }
            config.regenerate_submission_id();
        }
        "number-comma" => config.formatting.number_comma = parse_bool(value)?,
        "number-human" => config.formatting.number_human = parse_bool(value)?,
        "locale" => config.formatting.locale = value.to_string(),
        "decimal-places" => {
            config.formatting.decimal_places =
                value.parse::<usize>().context("Invalid number value")?;
        }
        _ => anyhow::bail!("Unknown config key: {}", key),
    }

    config.save(false)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_config() -> (TempDir, PathBuf) {
        let dir = TempDir::new().expect("tempdir");
        let config_path = dir.path().join(".gptwrapped.toml");
        set_test_config_path(config_path.clone());
        (dir, config_path)
    }

    #[test]
    fn default_config_round_trip() {
        let (_dir, _path) = setup_test_config();
        create_default_config(true).expect("create_default_config");

        let loaded = Config::load()
            .expect("load config")
            .expect("config should exist");

        assert_eq!(loaded.share.server_url, DEFAULT_SERVER_URL);
        assert!(loaded.share.submission_id.is_empty());
        assert_eq!(loaded.analysis.week_start, WeekStart::Sunday);
        assert_eq!(loaded.formatting.locale, "en");
    }

    #[test]
    fn default_config_overwrites_unparsable_file() {
        let (_dir, path) = setup_test_config();
        fs::write(&path, "this is = = not toml").unwrap();
        assert!(Config::load().is_err());

        create_default_config(true).expect("create_default_config");

        let loaded = Config::load().unwrap().unwrap();
        assert_eq!(loaded.share.timeout_seconds, 30);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let (_dir, path) = setup_test_config();
        fs::write(&path, "[analysis]\nweek_start = \"monday\"\n").unwrap();

        let loaded = Config::load().unwrap().unwrap();

        assert_eq!(loaded.analysis.week_start, WeekStart::Monday);
        assert!(loaded.analysis.timezone.is_empty());
        assert_eq!(loaded.share.timeout_seconds, 30);
        assert_eq!(loaded.formatting.decimal_places, 1);
    }

    #[test]
    fn set_config_value_behaviour() {
        let (_dir, _path) = setup_test_config();
        create_default_config(true).expect("create_default_config");

        set_config_value("timezone", "Europe/Warsaw").expect("set timezone");
        set_config_value("week-start", "monday").expect("set week-start");
        set_config_value("server-url", "http://localhost:8080/").expect("set server-url");
        set_config_value("timeout-seconds", "5").expect("set timeout-seconds");
        set_config_value("number-comma", "false").expect("set number-comma");
        set_config_value("number-human", "true").expect("set number-human");
        set_config_value("locale", "de").expect("set locale");
        set_config_value("decimal-places", "3").expect("set decimal-places");

        let cfg = Config::load()
            .expect("load config")
            .expect("config should exist");

        assert_eq!(cfg.analysis.timezone, "Europe/Warsaw");
        assert_eq!(cfg.timezone().unwrap(), chrono_tz::Europe::Warsaw);
        assert_eq!(cfg.analysis.week_start, WeekStart::Monday);
        assert_eq!(cfg.share.server_url, "http://localhost:8080");
        assert_eq!(cfg.share.timeout_seconds, 5);
        assert!(!cfg.formatting.number_comma);
        assert!(cfg.formatting.number_human);
        assert_eq!(cfg.formatting.locale, "de");
        assert_eq!(cfg.formatting.decimal_places, 3);

        let err = set_config_value("unknown-key", "value").unwrap_err();
        assert!(format!("{err}").contains("Unknown config key"));
        let err = set_config_value("number-human", "not-a-bool").unwrap_err();
        assert!(format!("{err}").contains("Invalid boolean value"));
        let err = set_config_value("timezone", "Mars/Olympus").unwrap_err();
        assert!(format!("{err}").contains("Unknown time zone"));
        let err = set_config_value("week-start", "friday").unwrap_err();
        assert!(format!("{err}").contains("Invalid week start"));
        assert!(set_config_value("submission-id", "abc").is_err());
    }

    #[test]
    fn submission_id_is_created_once_and_reused() {
        let mut config = Config::default();

        let (first, created) = config.ensure_submission_id();
        assert!(created);
        assert_eq!(first.len(), 32);

        let (second, created) = config.ensure_submission_id();
        assert!(!created);
        assert_eq!(first, second);

        config.regenerate_submission_id();
        assert_ne!(config.share.submission_id, first);
    }

    #[test]
    fn submission_id_regeneration_persists() {
        let (_dir, _path) = setup_test_config();
        let mut config = Config::default();
        let (original, _) = config.ensure_submission_id();
        config.save(true).unwrap();

        set_config_value("submission-id", "new").unwrap();

        let reloaded = Config::load().unwrap().unwrap();
        assert!(!reloaded.share.submission_id.is_empty());
        assert_ne!(reloaded.share.submission_id, original);
    }
}
