//! # Config — Renderer Tunables
//!
//! Shadow map resolutions, shadow frustum bounds, multisampling and the
//! clear color. All fields have defaults, so a JSON file only needs the
//! keys it wants to change:
//!
//! ```json
//! { "directional_shadow_size": 4096, "msaa_samples": 1 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RenderError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Width and height of a directional light's depth map.
    pub directional_shadow_size: u32,
    /// Edge length of each face of a point light's depth cubemap.
    pub point_shadow_size: u32,
    /// Half-extent `r` of the directional light's orthographic volume.
    pub shadow_extent: f32,
    pub shadow_near: f32,
    pub shadow_far: f32,
    pub point_shadow_near: f32,
    /// Also the normalisation distance stored in the point depth cubemap.
    pub point_shadow_far: f32,
    pub msaa_samples: u32,
    pub clear_color: [f32; 4],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            directional_shadow_size: 2048,
            point_shadow_size: 1024,
            shadow_extent: 10.0,
            shadow_near: -20.0,
            shadow_far: 20.0,
            point_shadow_near: 0.1,
            point_shadow_far: 25.0,
            msaa_samples: 4,
            clear_color: [0.8, 0.8, 0.8, 0.0],
        }
    }
}

impl RendererConfig {
    pub fn from_json_str(json: &str) -> Result<Self, RenderError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        log::info!("loaded renderer config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = RendererConfig::from_json_str("{}").unwrap();
        assert_eq!(config, RendererConfig::default());
        assert_eq!(config.directional_shadow_size, 2048);
        assert_eq!(config.point_shadow_far, 25.0);
    }

    #[test]
    fn partial_override() {
        let config =
            RendererConfig::from_json_str(r#"{ "msaa_samples": 1, "shadow_extent": 15.0 }"#)
                .unwrap();
        assert_eq!(config.msaa_samples, 1);
        assert_eq!(config.shadow_extent, 15.0);
        assert_eq!(config.point_shadow_size, 1024);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = RendererConfig::from_json_str("{ msaa").unwrap_err();
        assert!(matches!(err, RenderError::Config(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renderer.json");
        std::fs::write(&path, r#"{ "point_shadow_size": 512 }"#).unwrap();
        let config = RendererConfig::from_json_file(&path).unwrap();
        assert_eq!(config.point_shadow_size, 512);
    }
}
