use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::hint::{self, HintSettings};
use crate::puzzle::{MAX_GRID_SIZE, MIN_GRID_SIZE};
use crate::solver::SolverConfig;

/// Difficulty presets; they only change the size of the hint budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Share of the solution-length bound granted as hints.
    pub fn hint_percentage(&self) -> u8 {
        match self {
            Difficulty::Easy => 15,
            Difficulty::Medium => 10,
            Difficulty::Hard => 5,
        }
    }
}

/// Settings for one game, as supplied by the content source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameConfig {
    pub grid_size: usize,
    /// Picture cut into tiles. Passed through untouched.
    pub image_url: Option<String>,
    pub time_limit_secs: Option<u64>,
    pub difficulty: Difficulty,
    /// Overrides the difficulty preset when set.
    pub hint_percentage: Option<u8>,
    pub hint_timeout_ms: u64,
    pub moves_per_hint: usize,
    pub solver: SolverConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_size: 4,
            image_url: None,
            time_limit_secs: None,
            difficulty: Difficulty::default(),
            hint_percentage: None,
            hint_timeout_ms: 4000,
            moves_per_hint: 1,
            solver: SolverConfig::default(),
        }
    }
}

impl GameConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&self.grid_size) {
            return Err(ConfigError::Invalid(format!(
                "gridSize must be between {MIN_GRID_SIZE} and {MAX_GRID_SIZE}, got {}",
                self.grid_size
            )));
        }
        if let Some(percentage) = self.hint_percentage {
            if percentage > 100 {
                return Err(ConfigError::Invalid(format!(
                    "hintPercentage must be at most 100, got {percentage}"
                )));
            }
        }
        if self.moves_per_hint == 0 {
            return Err(ConfigError::Invalid(
                "movesPerHint must be at least 1".to_string(),
            ));
        }
        if self.solver.node_budget == 0 {
            return Err(ConfigError::Invalid(
                "solver.nodeBudget must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn hint_percentage(&self) -> u8 {
        self.hint_percentage
            .unwrap_or_else(|| self.difficulty.hint_percentage())
    }

    pub fn hint_budget(&self) -> usize {
        hint::hint_budget(self.grid_size, self.hint_percentage())
    }

    pub fn hint_settings(&self) -> HintSettings {
        HintSettings {
            timeout: Duration::from_millis(self.hint_timeout_ms),
            moves_per_hint: self.moves_per_hint,
        }
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.hint_percentage(), 10);
        assert_eq!(config.hint_budget(), 8);
        assert_eq!(config.time_limit(), None);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = GameConfig::from_json_str(
            r#"{
                "gridSize": 3,
                "imageUrl": "https://example.com/cat.png",
                "difficulty": "easy",
                "timeLimitSecs": 120,
                "solver": { "nodeBudget": 1000 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.grid_size, 3);
        assert_eq!(config.image_url.as_deref(), Some("https://example.com/cat.png"));
        assert_eq!(config.difficulty, Difficulty::Easy);
        assert_eq!(config.hint_budget(), 5);
        assert_eq!(config.time_limit(), Some(Duration::from_secs(120)));
        assert_eq!(config.solver.node_budget, 1000);
        assert_eq!(
            config.solver.lookahead_depth,
            SolverConfig::default().lookahead_depth
        );
        assert_eq!(config.hint_settings().timeout, Duration::from_millis(4000));
    }

    #[test]
    fn test_percentage_overrides_difficulty() {
        let config =
            GameConfig::from_json_str(r#"{"difficulty": "hard", "hintPercentage": 50}"#).unwrap();
        assert_eq!(config.hint_percentage(), 50);
        assert_eq!(config.hint_budget(), 40);
    }

    #[test]
    fn test_invalid_values() {
        for json in [
            r#"{"gridSize": 1}"#,
            r#"{"gridSize": 11}"#,
            r#"{"hintPercentage": 101}"#,
            r#"{"movesPerHint": 0}"#,
            r#"{"solver": {"nodeBudget": 0}}"#,
        ] {
            assert!(
                matches!(GameConfig::from_json_str(json), Err(ConfigError::Invalid(_))),
                "{json} should be rejected"
            );
        }
        assert!(matches!(
            GameConfig::from_json_str("{"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            GameConfig::from_json_file("/nonexistent/slider.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
