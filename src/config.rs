//! Configuration persistence for the flashcards app.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Tunable knobs for card selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// How much more often to show cards below 50% accuracy. Range 1..=10.
    pub wrong_card_multiplier: f64,
    /// How much less often to show cards above 50% accuracy. Range 1..=10.
    pub correct_card_divisor: f64,
    /// Days since last asked before a card counts as forgotten. Range 1..=30.
    pub forgotten_card_threshold: f64,
    /// Chance of boosting a forgotten card on each scoring pass. Range 0..=1.
    pub forgotten_card_chance: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wrong_card_multiplier: 3.0,
            correct_card_divisor: 2.0,
            forgotten_card_threshold: 7.0,
            forgotten_card_chance: 0.2,
        }
    }
}

/// One editable field of [`Settings`], with its range and step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingField {
    WrongCardMultiplier,
    CorrectCardDivisor,
    ForgottenCardThreshold,
    ForgottenCardChance,
}

impl SettingField {
    pub fn all() -> &'static [SettingField] {
        &[
            Self::WrongCardMultiplier,
            Self::CorrectCardDivisor,
            Self::ForgottenCardThreshold,
            Self::ForgottenCardChance,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::WrongCardMultiplier => "Wrong card multiplier",
            Self::CorrectCardDivisor => "Correct card divisor",
            Self::ForgottenCardThreshold => "Forgotten after (days)",
            Self::ForgottenCardChance => "Forgotten card chance",
        }
    }

    pub fn range(&self) -> (f64, f64) {
        match self {
            Self::WrongCardMultiplier | Self::CorrectCardDivisor => (1.0, 10.0),
            Self::ForgottenCardThreshold => (1.0, 30.0),
            Self::ForgottenCardChance => (0.0, 1.0),
        }
    }

    pub fn step(&self) -> f64 {
        match self {
            Self::WrongCardMultiplier | Self::CorrectCardDivisor => 0.5,
            Self::ForgottenCardThreshold => 1.0,
            Self::ForgottenCardChance => 0.05,
        }
    }
}

impl Settings {
    pub fn get(&self, field: SettingField) -> f64 {
        match field {
            SettingField::WrongCardMultiplier => self.wrong_card_multiplier,
            SettingField::CorrectCardDivisor => self.correct_card_divisor,
            SettingField::ForgottenCardThreshold => self.forgotten_card_threshold,
            SettingField::ForgottenCardChance => self.forgotten_card_chance,
        }
    }

    pub fn set(&mut self, field: SettingField, value: f64) {
        let (min, max) = field.range();
        let value = if value.is_finite() { value.clamp(min, max) } else { min };
        match field {
            SettingField::WrongCardMultiplier => self.wrong_card_multiplier = value,
            SettingField::CorrectCardDivisor => self.correct_card_divisor = value,
            SettingField::ForgottenCardThreshold => self.forgotten_card_threshold = value,
            SettingField::ForgottenCardChance => self.forgotten_card_chance = value,
        }
    }

    /// Move a field by `steps` increments, rounding away float drift.
    pub fn adjust(&mut self, field: SettingField, steps: i32) {
        let raw = self.get(field) + field.step() * f64::from(steps);
        let rounded = (raw / field.step()).round() * field.step();
        self.set(field, rounded);
    }

    /// Copy with every field forced into its documented range.
    pub fn clamped(mut self) -> Self {
        for &field in SettingField::all() {
            self.set(field, self.get(field));
        }
        self
    }
}

/// Application configuration that persists between sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The currently selected theme name.
    #[serde(default = "default_theme")]
    pub theme: String,

    /// Selection settings used by decks without an override.
    #[serde(default)]
    pub settings: Settings,

    /// Per-deck overrides keyed by deck filename.
    #[serde(default)]
    pub deck_settings: BTreeMap<String, Settings>,

    #[serde(skip)]
    path: Option<PathBuf>,
}

fn default_theme() -> String {
    "dark".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            settings: Settings::default(),
            deck_settings: BTreeMap::new(),
            path: None,
        }
    }
}

impl Config {
    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hanki")
            .join("config.toml")
    }

    /// Load config from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from disk, returning default if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self {
                path: Some(path.to_path_buf()),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.settings = config.settings.clamped();
        for settings in config.deck_settings.values_mut() {
            *settings = settings.clamped();
        }
        config.path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Save config to the path it was loaded from.
    pub fn save(&self) -> Result<()> {
        let path = self.path.clone().unwrap_or_else(Self::default_path);

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize config")?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Effective settings for a deck: its override, else the global settings.
    pub fn settings_for(&self, deck: Option<&str>) -> Settings {
        deck.and_then(|name| self.deck_settings.get(name))
            .copied()
            .unwrap_or(self.settings)
    }

    pub fn has_deck_override(&self, deck: &str) -> bool {
        self.deck_settings.contains_key(deck)
    }

    pub fn set_global_settings(&mut self, settings: Settings) {
        self.settings = settings.clamped();
    }

    pub fn set_deck_settings(&mut self, deck: &str, settings: Settings) {
        self.deck_settings.insert(deck.to_string(), settings.clamped());
    }

    pub fn clear_deck_settings(&mut self, deck: &str) {
        self.deck_settings.remove(deck);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.wrong_card_multiplier, 3.0);
        assert_eq!(s.correct_card_divisor, 2.0);
        assert_eq!(s.forgotten_card_threshold, 7.0);
        assert_eq!(s.forgotten_card_chance, 0.2);
    }

    #[test]
    fn test_adjust_steps_and_clamps() {
        let mut s = Settings::default();
        s.adjust(SettingField::WrongCardMultiplier, 1);
        assert_eq!(s.wrong_card_multiplier, 3.5);

        s.adjust(SettingField::ForgottenCardChance, 1);
        assert!((s.forgotten_card_chance - 0.25).abs() < 1e-12);

        s.adjust(SettingField::ForgottenCardChance, 100);
        assert_eq!(s.forgotten_card_chance, 1.0);

        s.adjust(SettingField::CorrectCardDivisor, -100);
        assert_eq!(s.correct_card_divisor, 1.0);
    }

    #[test]
    fn test_clamped() {
        let s = Settings {
            wrong_card_multiplier: 50.0,
            correct_card_divisor: 0.0,
            forgotten_card_threshold: f64::NAN,
            forgotten_card_chance: -1.0,
        }
        .clamped();
        assert_eq!(s.wrong_card_multiplier, 10.0);
        assert_eq!(s.correct_card_divisor, 1.0);
        assert_eq!(s.forgotten_card_threshold, 1.0);
        assert_eq!(s.forgotten_card_chance, 0.0);
    }

    #[test]
    fn test_deck_override_falls_back_to_global() {
        let mut config = Config::default();
        config.set_global_settings(Settings {
            wrong_card_multiplier: 5.0,
            ..Settings::default()
        });
        config.set_deck_settings(
            "spanish.csv",
            Settings {
                correct_card_divisor: 8.0,
                ..Settings::default()
            },
        );

        assert_eq!(config.settings_for(None).wrong_card_multiplier, 5.0);
        assert_eq!(config.settings_for(Some("french.csv")).wrong_card_multiplier, 5.0);
        assert_eq!(config.settings_for(Some("spanish.csv")).correct_card_divisor, 8.0);

        config.clear_deck_settings("spanish.csv");
        assert!(!config.has_deck_override("spanish.csv"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::load_from(&path).unwrap();
        config.theme = "light".to_string();
        config.set_deck_settings("maths.csv", Settings {
            forgotten_card_threshold: 14.0,
            ..Settings::default()
        });
        config.save().unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.theme, "light");
        assert_eq!(loaded.settings_for(Some("maths.csv")).forgotten_card_threshold, 14.0);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[settings]\nwrong_card_multiplier = 4.0\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.theme, "dark");
        assert_eq!(config.settings.wrong_card_multiplier, 4.0);
        assert_eq!(config.settings.correct_card_divisor, 2.0);
    }
}
