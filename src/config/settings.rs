//! Configuration settings for Klipp.

use crate::dedup::DedupConfig;
use crate::scoring::CompositeWeights;
use crate::sequence::SequencingConfig;
use crate::store::RankingWeights;
use crate::timeline::TimelineConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub scoring: ScoringSettings,
    pub dedup: DedupConfig,
    pub ranking: RankingSettings,
    pub timeline: TimelineConfig,
    pub sequencing: SequencingConfig,
    pub prompts: PromptSettings,
}


/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.klipp".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Oracle scoring settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    /// Chat model used for all oracle calls.
    pub model: String,
    /// Default topic prompt when none is given on the command line.
    pub topic: String,
    /// Per-call request timeout in seconds.
    pub timeout_seconds: u64,
    /// Maximum concurrent oracle calls.
    pub max_concurrent: usize,
    /// Weights for the internal take-selection composite.
    pub composite_weights: CompositeWeights,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            topic: String::new(),
            timeout_seconds: 30,
            max_concurrent: 4,
            composite_weights: CompositeWeights::default(),
        }
    }
}

/// Presentation-order ranking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingSettings {
    /// Relevance/novelty tradeoff for the MMR rerank, in [0, 1].
    pub lambda: f64,
    /// Per-dimension weights for the presentation blend.
    pub weights: RankingWeights,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            lambda: 0.7,
            weights: RankingWeights::default(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}


impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::KlippError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("klipp")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_toml() {
        let settings = Settings::default();
        let rendered = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.scoring.model, settings.scoring.model);
        assert_eq!(parsed.sequencing.outer_chunk_size, 20);
        assert_eq!(parsed.sequencing.inner_chunk_size, 10);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Settings = toml::from_str("[ranking]\nlambda = 0.4\n").unwrap();
        assert_eq!(parsed.ranking.lambda, 0.4);
        assert_eq!(parsed.dedup.cosine_threshold, 0.8);
        assert_eq!(parsed.timeline.duration_budget_seconds, 60.0);
    }
}
