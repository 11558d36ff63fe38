//! Viewer configuration loaded from TOML.
//!
//! Every section is optional; missing keys fall back to the stock viewer
//! setup (a 400x400 white surface, camera at `(5, 5, 6)` looking at the origin,
//! 90 degree perspective).
use std::path::Path;

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::projection::{Camera, Projection};
use crate::render::{Color, Renderer};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub surface: SurfaceConfig,
    pub camera: CameraConfig,
    pub projection: ProjectionConfig,
    pub style: StyleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: usize,
    pub height: usize,
    /// Pixels per NDC unit.
    pub scale: f64,
    pub background: [u8; 3],
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 400,
            height: 400,
            scale: 100.0,
            background: [255, 255, 255],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f64; 3],
    pub look_at: [f64; 3],
    pub up: [f64; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [5.0, 5.0, 6.0],
            look_at: [0.0, 0.0, 0.0],
            up: [0.0, 0.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProjectionConfig {
    Perspective(PerspectiveConfig),
    Orthographic(OrthographicConfig),
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self::Perspective(PerspectiveConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerspectiveConfig {
    /// Vertical field of view in degrees.
    pub fov: f64,
    pub aspect_ratio: f64,
    pub near: f64,
    pub far: f64,
}

impl Default for PerspectiveConfig {
    fn default() -> Self {
        Self {
            fov: 90.0,
            aspect_ratio: 1.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrthographicConfig {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
    pub near: f64,
    pub far: f64,
}

impl Default for OrthographicConfig {
    fn default() -> Self {
        Self {
            left: -1.0,
            right: 1.0,
            bottom: -1.0,
            top: 1.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub edge_color: [u8; 3],
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            edge_color: [0, 0, 0],
        }
    }
}

impl ViewerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn camera(&self) -> Camera {
        let CameraConfig {
            position,
            look_at,
            up,
        } = self.camera;
        Camera::new(Point3::from(position), Point3::from(look_at), Vector3::from(up))
    }

    pub fn projection(&self) -> Projection {
        match self.projection {
            ProjectionConfig::Perspective(p) => Projection::Perspective {
                fov: p.fov,
                aspect_ratio: p.aspect_ratio,
                near: p.near,
                far: p.far,
            },
            ProjectionConfig::Orthographic(o) => Projection::Orthographic {
                left: o.left,
                right: o.right,
                bottom: o.bottom,
                top: o.top,
                near: o.near,
                far: o.far,
            },
        }
    }

    pub fn edge_color(&self) -> Color {
        Color::from(self.style.edge_color)
    }

    /// An empty renderer sized and scaled per the `[surface]` section.
    pub fn renderer(&self) -> Renderer {
        let surface = &self.surface;
        Renderer::with_options(
            surface.width,
            surface.height,
            surface.scale,
            Color::from(surface.background),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ProjectionMode;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = ViewerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.camera(), Camera::default());
        assert_eq!(config.projection(), Projection::default_perspective());
        assert_eq!(config.edge_color(), Color::BLACK);

        let renderer = config.renderer();
        assert_eq!(renderer.surface().width(), 400);
        assert_eq!(renderer.surface().background(), Color::WHITE);
        assert_eq!(renderer.viewport().scale, 100.0);
    }

    #[test]
    fn test_partial_sections() {
        let config = ViewerConfig::from_toml_str(
            r#"
[surface]
width = 120
background = [10, 20, 30]

[camera]
position = [0.0, 0.0, 8.0]
up = [0.0, 1.0, 0.0]

[style]
edge_color = [255, 0, 0]
"#,
        )
        .unwrap();

        assert_eq!(config.surface.width, 120);
        assert_eq!(config.surface.height, 400);
        assert_eq!(config.surface.background, [10, 20, 30]);
        let camera = config.camera();
        assert_eq!(camera.position, Point3::new(0.0, 0.0, 8.0));
        assert_eq!(camera.look_at, Point3::origin());
        assert_eq!(camera.up, Vector3::y());
        assert_eq!(config.edge_color(), Color::RED);
    }

    #[test]
    fn test_orthographic_section() {
        let config = ViewerConfig::from_toml_str(
            r#"
[projection]
kind = "orthographic"
left = -4.0
right = 4.0
"#,
        )
        .unwrap();

        let projection = config.projection();
        assert_eq!(projection.mode(), ProjectionMode::Orthographic);
        assert_eq!(
            projection,
            Projection::Orthographic {
                left: -4.0,
                right: 4.0,
                bottom: -1.0,
                top: 1.0,
                near: 0.1,
                far: 1000.0,
            }
        );
    }

    #[test]
    fn test_perspective_section() {
        let config = ViewerConfig::from_toml_str("[projection]\nkind = \"perspective\"\nfov = 60.0\n").unwrap();
        match config.projection() {
            Projection::Perspective { fov, near, .. } => {
                assert_eq!(fov, 60.0);
                assert_eq!(near, 0.1);
            }
            other => panic!("expected perspective, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_documents() {
        assert!(matches!(
            ViewerConfig::from_toml_str("[projection]\nkind = \"fisheye\"\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ViewerConfig::from_toml_str("[surface]\nwidth = \"wide\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.toml");
        std::fs::write(&path, "[surface]\nscale = 40.0\n").unwrap();

        let config = ViewerConfig::load(&path).unwrap();
        assert_eq!(config.surface.scale, 40.0);

        assert!(matches!(
            ViewerConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_serialized_defaults_parse_back() {
        let text = ViewerConfig::default().to_toml_string().unwrap();
        assert!(text.contains("kind = \"perspective\""));
        assert_eq!(ViewerConfig::from_toml_str(&text).unwrap(), ViewerConfig::default());
    }
}
