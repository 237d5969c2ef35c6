//! Renderer configuration, stored as RON.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::device::DepthFunc;
use crate::state::{ClearState, DepthTestState};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

/// Clear values given to new framebuffers and canvases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClearConfig {
    pub color: [f32; 3],
    pub alpha: f32,
    pub depth: f32,
    pub stencil: i32,
}

impl Default for ClearConfig {
    fn default() -> Self {
        Self {
            color: [0.0, 0.0, 0.0],
            alpha: 1.0,
            depth: 1.0,
            stencil: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub clear: ClearConfig,
    /// Depth test for new draw targets; `None` leaves it disabled.
    pub depth_test: Option<DepthFunc>,
    /// Texture units one draw may bind.
    pub max_texture_units: u32,
    /// Edge length of the full-screen pass quad.
    pub pass_geometry_size: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear: ClearConfig::default(),
            depth_test: Some(DepthFunc::Less),
            max_texture_units: 16,
            pass_geometry_size: 2.0,
        }
    }
}

impl RendererConfig {
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        ron::from_str(source).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = self.to_ron_string()?;
        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Io(e.to_string()))
    }

    pub fn clear_state(&self) -> ClearState {
        ClearState {
            color: Vec3::from_array(self.clear.color),
            alpha: self.clear.alpha,
            depth: self.clear.depth,
            stencil: self.clear.stencil,
        }
    }

    pub fn depth_test_state(&self) -> DepthTestState {
        match self.depth_test {
            Some(func) => DepthTestState::enabled(func),
            None => DepthTestState::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = RendererConfig::from_ron_str("(max_texture_units: 8)").unwrap();
        assert_eq!(config.max_texture_units, 8);
        assert_eq!(config.depth_test, Some(DepthFunc::Less));
        assert_eq!(config.clear, ClearConfig::default());
    }

    #[test]
    fn test_config_ron_round_trip() {
        let config = RendererConfig {
            clear: ClearConfig {
                color: [0.1, 0.2, 0.3],
                ..Default::default()
            },
            depth_test: None,
            ..Default::default()
        };
        let text = config.to_ron_string().unwrap();
        assert_eq!(RendererConfig::from_ron_str(&text).unwrap(), config);
    }

    #[test]
    fn test_malformed_config_is_rejected() {
        assert!(matches!(
            RendererConfig::from_ron_str("(max_texture_units: \"many\")"),
            Err(ConfigError::Deserialize(_))
        ));
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("prism-config-{}.ron", std::process::id()));
        let config = RendererConfig {
            max_texture_units: 4,
            ..Default::default()
        };
        config.save(&path).unwrap();
        let loaded = RendererConfig::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            RendererConfig::load("/nonexistent/prism.ron"),
            Err(ConfigError::Io(_))
        ));
    }
}
