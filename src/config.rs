//! Configuration loader - YAML settings + .env environment

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::{MarkerId, MarkerRecord};
use crate::projection::Extent;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Main configuration loaded from visit_map.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub reveal: RevealConfig,
    pub tooltip: TooltipConfig,
    pub canvas: CanvasConfig,
}

/// Collision layout tuning and radius classes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Relaxation passes; 0 leaves every marker on its anchor
    pub passes: usize,
    /// Fraction of the anchor offset restored per pass
    pub pull_strength: f64,
    /// Fraction of velocity dropped after each pass
    pub velocity_decay: f64,
    /// Extra clearance added to the sum of radii
    pub collision_margin: f64,
    /// Share of an overlap pushed onto the first marker of a pair
    pub split_ratio: f64,
    pub default_radius: f64,
    pub small_radius: f64,
    pub small_ids: BTreeSet<MarkerId>,
    pub small_categories: BTreeSet<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            passes: 3,
            pull_strength: 1.0,
            velocity_decay: 0.4,
            collision_margin: 1.0,
            split_ratio: 0.5,
            default_radius: 14.0,
            small_radius: 9.0,
            small_ids: BTreeSet::new(),
            small_categories: BTreeSet::new(),
        }
    }
}

impl LayoutConfig {
    /// Radius class for a marker: small if listed by id or category
    pub fn radius_for(&self, record: &MarkerRecord) -> f64 {
        if self.small_ids.contains(&record.id) || self.small_categories.contains(&record.category) {
            self.small_radius
        } else {
            self.default_radius
        }
    }
}

/// Reveal timeline durations in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    pub duration_ms: f64,
    pub pop_in_ms: f64,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            duration_ms: 6000.0,
            pop_in_ms: 600.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TooltipConfig {
    /// Minimum distance kept between the tooltip and the viewport edge
    pub padding: f64,
    /// Distance between the pointer and the tooltip corner
    pub gap: f64,
}

impl Default for TooltipConfig {
    fn default() -> Self {
        Self {
            padding: 8.0,
            gap: 12.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionKind {
    Equirectangular,
    Mercator,
}

/// Layout plane the projection is fitted to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
    pub projection: ProjectionKind,
    pub extent: Extent,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 600.0,
            projection: ProjectionKind::Mercator,
            extent: Extent::default(),
        }
    }
}

/// Environment loaded from .env
#[derive(Debug, Clone)]
pub struct Env {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }
}

impl Env {
    /// Load environment from .env file
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Env {
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            log_dir: std::env::var("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("logs")),
        }
    }
}
