//! Engine tunables.
//!
//! Every field has a default matching the shipped experience, so a config
//! file only needs the values it changes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Velocity above which scrolling reads as rushing, in px/ms.
pub const DEFAULT_RUSHING_THRESHOLD: f64 = 1.5;

/// Stillness delay for pointer movement, in milliseconds.
pub const DEFAULT_IDLE_DELAY_MS: u64 = 800;

/// Scroll velocity settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityConfig {
    /// Velocity above which the pace is rushing, in px/ms.
    pub rushing_threshold: f64,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            rushing_threshold: DEFAULT_RUSHING_THRESHOLD,
        }
    }
}

/// Stillness detector settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleConfig {
    /// Quiet time before the input counts as still, in milliseconds.
    pub delay_ms: u64,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_IDLE_DELAY_MS,
        }
    }
}

/// Drag-to-target settings. Distances are in pixels, speeds in px/ms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    /// Moves faster than this are rejected.
    pub velocity_ceiling: f64,
    /// Center distance below which the draggable snaps to the target.
    pub snap_radius: f64,
    /// Center distance below which the target scales up in anticipation.
    pub feedback_radius: f64,
    /// Largest anticipation scale of the target.
    pub max_feedback_scale: f64,
    /// Scale of the draggable once fully inserted.
    pub insert_scale: f64,
    pub feedback_ms: u64,
    pub snap_ms: u64,
    pub insert_ms: u64,
    pub return_ms: u64,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            velocity_ceiling: 2.0,
            snap_radius: 80.0,
            feedback_radius: 120.0,
            max_feedback_scale: 1.05,
            insert_scale: 0.95,
            feedback_ms: 200,
            snap_ms: 300,
            insert_ms: 800,
            return_ms: 500,
        }
    }
}

impl DragConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        let positive = [
            ("velocity_ceiling", self.velocity_ceiling),
            ("snap_radius", self.snap_radius),
            ("feedback_radius", self.feedback_radius),
            ("max_feedback_scale", self.max_feedback_scale),
            ("insert_scale", self.insert_scale),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "drag.{name} must be a positive number, got {value}"
                )));
            }
        }
        if self.feedback_radius < self.snap_radius {
            return Err(ConfigError::Invalid(format!(
                "drag.feedback_radius ({}) must not be smaller than drag.snap_radius ({})",
                self.feedback_radius, self.snap_radius
            )));
        }
        Ok(())
    }
}

/// All engine settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub velocity: VelocityConfig,
    pub scroll_idle: IdleConfig,
    pub pointer_idle: IdleConfig,
    pub drag: DragConfig,
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let threshold = self.velocity.rushing_threshold;
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "velocity.rushing_threshold must be a non-negative number, got {threshold}"
            )));
        }
        let channels = [
            ("scroll_idle", self.scroll_idle),
            ("pointer_idle", self.pointer_idle),
        ];
        for (name, idle) in channels {
            if idle.delay_ms == 0 {
                return Err(ConfigError::Invalid(format!("{name}.delay_ms must be positive")));
            }
        }
        self.drag.validate()
    }
}
