use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::keyboard::gesture::GestureThresholds;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_long_press_ms")]
    pub long_press_ms: u64,
    #[serde(default = "default_hold_to_clear_ms")]
    pub hold_to_clear_ms: u64,
    #[serde(default = "default_popover_fade_ms")]
    pub popover_fade_ms: u64,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_tick_rate_ms")]
    pub tick_rate_ms: u64,
    /// Empty means the localized placeholder.
    #[serde(default)]
    pub placeholder: String,
    /// Optional TOML glyph set overriding the locale's keyboard.
    #[serde(default)]
    pub glyph_set_path: Option<String>,
}

fn default_long_press_ms() -> u64 {
    400
}
fn default_hold_to_clear_ms() -> u64 {
    1000
}
fn default_popover_fade_ms() -> u64 {
    150
}
fn default_locale() -> String {
    "en".to_string()
}
fn default_tick_rate_ms() -> u64 {
    16
}

impl Default for Config {
    fn default() -> Self {
        Self {
            long_press_ms: default_long_press_ms(),
            hold_to_clear_ms: default_hold_to_clear_ms(),
            popover_fade_ms: default_popover_fade_ms(),
            locale: default_locale(),
            tick_rate_ms: default_tick_rate_ms(),
            placeholder: String::new(),
            glyph_set_path: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quizpad")
            .join("config.toml")
    }

    pub fn thresholds(&self) -> GestureThresholds {
        GestureThresholds {
            long_press: Duration::from_millis(self.long_press_ms),
            hold_to_clear: Duration::from_millis(self.hold_to_clear_ms),
        }
    }

    pub fn popover_fade(&self) -> Duration {
        Duration::from_millis(self.popover_fade_ms)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms.max(1))
    }

    /// Validate `locale` against the compiled locales, resetting to default
    /// if unknown. Region suffixes (`uk-UA`, `en_GB`) map to their language.
    pub fn normalize_locale(&mut self, valid: &[&str]) {
        let lang = self
            .locale
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        self.locale = if valid.contains(&lang.as_str()) {
            lang
        } else {
            default_locale()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde_defaults_from_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.long_press_ms, 400);
        assert_eq!(config.hold_to_clear_ms, 1000);
        assert_eq!(config.popover_fade_ms, 150);
        assert_eq!(config.locale, "en");
        assert!(config.placeholder.is_empty());
        assert!(config.glyph_set_path.is_none());
    }

    #[test]
    fn test_config_serde_partial_file() {
        let toml_str = r#"
long_press_ms = 350
locale = "uk"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.long_press_ms, 350);
        assert_eq!(config.locale, "uk");
        assert_eq!(config.hold_to_clear_ms, 1000);
        assert_eq!(config.thresholds().long_press, Duration::from_millis(350));
    }

    #[test]
    fn test_config_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.locale = "uk".to_string();
        config.popover_fade_ms = 90;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.locale, "uk");
        assert_eq!(loaded.popover_fade_ms, 90);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.tick_rate_ms, 16);
    }

    #[test]
    fn test_normalize_locale() {
        let valid = ["en", "uk"];
        let mut config = Config::default();
        config.locale = "uk-UA".to_string();
        config.normalize_locale(&valid);
        assert_eq!(config.locale, "uk");

        config.locale = "fr".to_string();
        config.normalize_locale(&valid);
        assert_eq!(config.locale, "en");

        config.locale = String::new();
        config.normalize_locale(&valid);
        assert_eq!(config.locale, "en");
    }

    #[test]
    fn test_tick_rate_never_zero() {
        let mut config = Config::default();
        config.tick_rate_ms = 0;
        assert_eq!(config.tick_rate(), Duration::from_millis(1));
    }
}
