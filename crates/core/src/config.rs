//! Application configuration.
//!
//! Configuration is read from a TOML file. Every field has a default, so an
//! empty file (or no file at all) yields the stock demo setup.
//!
//! ```toml
//! [window]
//! width = 1280
//! height = 720
//!
//! [frames]
//! frame_resources = 3
//! fence_timeout_ms = 5000
//!
//! [render]
//! backend = "software"
//! ```

use std::f32::consts::PI;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`AppConfig`]
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The values parse but cannot be used
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which rendering backend drives the frame loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Vulkan 1.3 on a window surface.
    #[default]
    Vulkan,
    /// Headless simulated GPU.
    Software,
}

/// Window settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "Shapes".to_string(),
        }
    }
}

/// Frame pipelining settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Number of frame resources in the ring.
    pub frame_resources: usize,
    /// Upper bound on a single fence wait. `None` waits forever.
    pub fence_timeout_ms: Option<u64>,
}

impl FrameConfig {
    pub fn fence_timeout(&self) -> Option<Duration> {
        self.fence_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            frame_resources: 3,
            fence_timeout_ms: None,
        }
    }
}

/// Rendering settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub backend: BackendKind,
    pub clear_color: [f32; 4],
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    pub validation: bool,
    /// Wait for vertical blank when presenting.
    pub vsync: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            // LightSteelBlue
            clear_color: [0.690_196, 0.768_627, 0.870_588, 1.0],
            vertex_shader: PathBuf::from("shaders/spirv/shapes.vert.spv"),
            fragment_shader: PathBuf::from("shaders/spirv/shapes.frag.spv"),
            validation: cfg!(debug_assertions),
            vsync: false,
        }
    }
}

/// Orbit camera settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub radius: f32,
    pub theta: f32,
    pub phi: f32,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    pub rotate_degrees_per_pixel: f32,
    pub zoom_per_pixel: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            radius: 15.0,
            theta: 1.5 * PI,
            phi: 0.2 * PI,
            fov_y: 0.25 * PI,
            near: 1.0,
            far: 1000.0,
            min_radius: 5.0,
            max_radius: 150.0,
            rotate_degrees_per_pixel: 0.25,
            zoom_per_pixel: 0.05,
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub frames: FrameConfig,
    pub render: RenderConfig,
    pub camera: CameraConfig,
}

impl AppConfig {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Parse`] on malformed TOML and [`ConfigError::Invalid`]
    /// if validation fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&contents)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        debug!("Configuration: {:?}", config);
        Ok(config)
    }

    /// Check values that parse but cannot drive the renderer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frames.frame_resources == 0 {
            return Err(ConfigError::Invalid(
                "frame_resources must be at least 1".to_string(),
            ));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window extent must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if self.camera.min_radius > self.camera.max_radius {
            return Err(ConfigError::Invalid(format!(
                "camera min_radius {} exceeds max_radius {}",
                self.camera.min_radius, self.camera.max_radius
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.frames.frame_resources, 3);
        assert_eq!(config.frames.fence_timeout(), None);
        assert_eq!(config.render.backend, BackendKind::Vulkan);
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::from_toml(
            r#"
            [frames]
            fence_timeout_ms = 250

            [render]
            backend = "software"
            "#,
        )
        .unwrap();
        assert_eq!(config.frames.frame_resources, 3);
        assert_eq!(
            config.frames.fence_timeout(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(config.render.backend, BackendKind::Software);
        assert_eq!(config.window.width, 800);
    }

    #[test]
    fn test_sample_config_parses() {
        let config = AppConfig::from_toml(include_str!("../../../shapes.toml")).unwrap();
        assert_eq!(config.frames.frame_resources, 3);
        assert!(config.render.vsync);
        assert_eq!(config.camera.radius, 15.0);
    }

    #[test]
    fn test_zero_frame_resources_rejected() {
        let err = AppConfig::from_toml("[frames]\nframe_resources = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_zero_window_rejected() {
        let err = AppConfig::from_toml("[window]\nwidth = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = AppConfig::from_toml("[frames\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = AppConfig::default();
        config.camera.radius = 30.0;
        let text = toml::to_string(&config).unwrap();
        assert_eq!(AppConfig::from_toml(&text).unwrap(), config);
    }
}
