use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use alpha_beta_bot::{Level, SearchConfig};
use anyhow::Context;
use serde::{Deserialize, Serialize};

/// A computer player for local matches, as read from a JSON file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub nick: String,
    #[serde(default)]
    pub level: Level,
    /// Overrides the depth of the level.
    #[serde(default)]
    pub depth: Option<u32>,
    #[serde(default)]
    pub tie_break_probability: Option<f64>,
    #[serde(default)]
    pub cache_capacity: Option<usize>,
}

impl PlayerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Could not open player config {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Invalid player config {}", path.display()))
    }

    pub fn search_config(&self) -> anyhow::Result<SearchConfig> {
        let mut config = SearchConfig::from(self.level);
        if let Some(depth) = self.depth {
            config.depth = depth;
        }
        if let Some(probability) = self.tie_break_probability {
            config.tie_break_probability = probability;
        }
        if let Some(capacity) = self.cache_capacity {
            config.cache_capacity = capacity;
        }
        config
            .validate()
            .with_context(|| format!("Invalid search settings for {}", self.nick))?;
        Ok(config)
    }
}
